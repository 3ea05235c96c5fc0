//! Gaussian mixture fitting with information-criterion model selection.
//!
//! Fits a Gaussian mixture for every `(n_components, covariance_type)` pair in a
//! configured range, scores each fit with AIC or BIC, and keeps the lowest.
//!
//! # Modules
//!
//! - [`traits`] - Option, result, and algorithm traits per concern
//! - [`impl_generic`] - Runtime-generic implementations (EM, K-Means, selection)
//! - [`estimator`] - [`GaussianMixtureIc`], the configure/fit/predict facade
//!
//! # Determinism
//!
//! Each grid candidate derives its own seed from `random_state` and its grid
//! position, and the winner is chosen by an ordered scan. Results are the
//! same for any `n_jobs`.
//!
//! # Example
//!
//! ```ignore
//! use mixsel::mixture::GaussianMixtureIc;
//! use numr::runtime::cpu::{CpuClient, CpuDevice, CpuRuntime};
//!
//! let device = CpuDevice::new();
//! let client = CpuClient::new(device.clone());
//!
//! let mut est = GaussianMixtureIc::<CpuRuntime>::new();
//! est.set_param("max_components", 5)?.set_param("random_state", 0)?;
//! let labels = est.fit_predict(&client, &data, None)?;
//! println!("{} components, {}", est.n_components()?, est.covariance_type()?);
//! ```

mod cpu;
pub mod error;
pub mod estimator;
pub mod impl_generic;
pub mod traits;
mod validation;

#[cfg(test)]
mod test_support;

pub use error::{MixtureError, MixtureResult};
pub use estimator::{GaussianMixtureIc, ParamValue};
pub use traits::criterion::InformationCriterion;
pub use traits::gmm::{CovarianceType, GmmAlgorithms, GmmInit, GmmModel, GmmOptions};
pub use traits::kmeans::{KMeansAlgorithms, KMeansInit, KMeansOptions, KMeansResult};
pub use traits::metrics::ClusterMetricsAlgorithms;
pub use traits::selection::{
    Candidate, CandidateScore, CovarianceTypeSpec, GmmSelection, GmmSelectionAlgorithms,
    GmmSelectionOptions, ScoredCandidate,
};
pub use validation::*;
