//! mixsel - Gaussian mixture model selection by information criterion
//!
//! mixsel fits Gaussian mixtures over a grid of component counts and covariance
//! structures, scores every fit with AIC or BIC, and keeps the best one. Built on
//! numr's tensor primitives, the algorithms are generic over numr's `Runtime`.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                       mixsel                             │
//! │   (grid search, EM fitting, AIC/BIC, estimator facade)  │
//! └──────────────────────────┬──────────────────────────────┘
//!                            │ uses
//! ┌──────────────────────────▼──────────────────────────────┐
//! │                        numr                              │
//! │     (tensors, matmul, linalg, reductions, random)       │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`mixture`] - Candidate grid, EM fitter, criterion scoring, parallel selection,
//!   and the [`GaussianMixtureIc`] estimator
//!
//! # Logging
//!
//! Search progress is reported through `tracing`: `debug` for the grid and each
//! candidate's score, `warn` for excluded or non-converged candidates, `info` for
//! the selected model, and `trace` for individual EM restarts. Install any
//! `tracing` subscriber to see it.
//!
//! # Example
//!
//! ```ignore
//! use mixsel::{GaussianMixtureIc, Tensor};
//! use numr::runtime::cpu::{CpuClient, CpuDevice, CpuRuntime};
//!
//! let device = CpuDevice::new();
//! let client = CpuClient::new(device.clone());
//! let data = Tensor::<CpuRuntime>::from_slice(&values, &[n, d], &device);
//!
//! let mut est = GaussianMixtureIc::<CpuRuntime>::new();
//! est.set_param("criterion", "bic")?;
//! est.fit(&client, &data, None)?;
//! let proba = est.predict_proba(&client, &data)?;
//! ```

pub mod mixture;

// Re-export main types for convenience
pub use mixture::{
    Candidate, CandidateScore, ClusterMetricsAlgorithms, CovarianceType, CovarianceTypeSpec,
    GaussianMixtureIc, GmmAlgorithms, GmmInit, GmmModel, GmmOptions, GmmSelection,
    GmmSelectionAlgorithms, GmmSelectionOptions, InformationCriterion, KMeansAlgorithms,
    KMeansInit, KMeansOptions, KMeansResult, MixtureError, MixtureResult, ParamValue,
    ScoredCandidate,
};

// Re-export numr types that users will commonly need
pub use numr::dtype::DType;
pub use numr::runtime::{Runtime, RuntimeClient};
pub use numr::tensor::Tensor;
