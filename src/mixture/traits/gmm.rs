//! Gaussian Mixture Model trait.

use crate::mixture::error::{MixtureError, MixtureResult};
use numr::runtime::Runtime;
use numr::tensor::Tensor;
use std::fmt;
use std::str::FromStr;

/// Covariance parameterization.
///
/// Variants are declared in canonical enumeration order (most to least
/// restrictive); the derived `Ord` is what the candidate grid sorts by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum CovarianceType {
    /// Scalar variance per component [k].
    Spherical,
    /// Diagonal covariance [k, d].
    Diagonal,
    /// All components share one covariance [d, d].
    Tied,
    /// Each component has its own full covariance [k, d, d].
    #[default]
    Full,
}

impl CovarianceType {
    /// All four structures in canonical order.
    pub const ALL: [CovarianceType; 4] = [
        CovarianceType::Spherical,
        CovarianceType::Diagonal,
        CovarianceType::Tied,
        CovarianceType::Full,
    ];

    /// Canonical short name ("spherical", "diag", "tied", "full").
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Spherical => "spherical",
            Self::Diagonal => "diag",
            Self::Tied => "tied",
            Self::Full => "full",
        }
    }

    /// Number of free covariance parameters for `k` components in `d` dimensions.
    pub fn n_covariance_parameters(&self, k: usize, d: usize) -> usize {
        match self {
            Self::Spherical => k,
            Self::Diagonal => k * d,
            Self::Tied => d * (d + 1) / 2,
            Self::Full => k * d * (d + 1) / 2,
        }
    }

    /// Number of free parameters of a `k`-component mixture in `d` dimensions:
    /// means, mixing weights (which sum to one), and covariances.
    pub fn n_parameters(&self, k: usize, d: usize) -> usize {
        let mean_params = k * d;
        let weight_params = k - 1;
        mean_params + weight_params + self.n_covariance_parameters(k, d)
    }

    /// Expected shape of the covariance tensor.
    pub fn covariance_shape(&self, k: usize, d: usize) -> Vec<usize> {
        match self {
            Self::Spherical => vec![k],
            Self::Diagonal => vec![k, d],
            Self::Tied => vec![d, d],
            Self::Full => vec![k, d, d],
        }
    }
}

impl fmt::Display for CovarianceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CovarianceType {
    type Err = MixtureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "spherical" => Ok(Self::Spherical),
            "diag" | "diagonal" => Ok(Self::Diagonal),
            "tied" => Ok(Self::Tied),
            "full" => Ok(Self::Full),
            other => Err(MixtureError::invalid_parameter(
                "covariance_type",
                format!(
                    "expected one of 'spherical', 'diag', 'tied', 'full' or 'all', got '{other}'"
                ),
            )),
        }
    }
}

/// Initialization method for GMM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GmmInit {
    /// Initialize via K-Means.
    #[default]
    KMeans,
    /// Random selection of data points as initial means.
    Random,
}

impl FromStr for GmmInit {
    type Err = MixtureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "kmeans" => Ok(Self::KMeans),
            "random" => Ok(Self::Random),
            other => Err(MixtureError::invalid_parameter(
                "init_params",
                format!("expected 'kmeans' or 'random', got '{other}'"),
            )),
        }
    }
}

/// Options for Gaussian Mixture Model.
#[derive(Debug, Clone)]
pub struct GmmOptions {
    /// Number of mixture components.
    pub n_components: usize,
    /// Covariance type.
    pub covariance_type: CovarianceType,
    /// Maximum EM iterations.
    pub max_iter: usize,
    /// Convergence tolerance on log-likelihood.
    pub tol: f64,
    /// Number of random restarts.
    pub n_init: usize,
    /// Initialization method.
    pub init: GmmInit,
    /// Regularization added to covariance diagonal.
    pub reg_covar: f64,
    /// Seed for reproducible initialization. `None` draws from the unseeded backend RNG.
    pub seed: Option<u64>,
}

impl Default for GmmOptions {
    fn default() -> Self {
        Self {
            n_components: 1,
            covariance_type: CovarianceType::Full,
            max_iter: 100,
            tol: 1e-3,
            n_init: 1,
            init: GmmInit::KMeans,
            reg_covar: 1e-6,
            seed: None,
        }
    }
}

/// Fitted Gaussian Mixture Model.
#[derive(Debug, Clone)]
pub struct GmmModel<R: Runtime> {
    /// Mixture weights [k] (sum = 1).
    pub weights: Tensor<R>,
    /// Component means [k, d].
    pub means: Tensor<R>,
    /// Covariances; shape given by [`CovarianceType::covariance_shape`].
    pub covariances: Tensor<R>,
    /// Covariance structure the model was fitted with.
    pub covariance_type: CovarianceType,
    /// Whether EM converged.
    pub converged: bool,
    /// Number of iterations run.
    pub n_iter: usize,
    /// Mean per-sample log-likelihood of the training data under the final parameters.
    pub lower_bound: f64,
    /// Total log-likelihood of the training data (`lower_bound * n_samples`).
    pub log_likelihood: f64,
}

impl<R: Runtime> GmmModel<R> {
    /// Number of mixture components.
    pub fn n_components(&self) -> usize {
        self.weights.shape()[0]
    }

    /// Dimensionality of the fitted data.
    pub fn n_features(&self) -> usize {
        self.means.shape()[1]
    }

    /// Number of free parameters.
    pub fn n_parameters(&self) -> usize {
        self.covariance_type
            .n_parameters(self.n_components(), self.n_features())
    }
}

/// Gaussian Mixture Model algorithms.
pub trait GmmAlgorithms<R: Runtime> {
    /// Fit GMM to data [n, d].
    fn gmm_fit(&self, data: &Tensor<R>, options: &GmmOptions) -> MixtureResult<GmmModel<R>>;

    /// Predict most likely component for each point [n] I64.
    fn gmm_predict(&self, model: &GmmModel<R>, data: &Tensor<R>) -> MixtureResult<Tensor<R>>;

    /// Predict component probabilities [n, k].
    fn gmm_predict_proba(&self, model: &GmmModel<R>, data: &Tensor<R>)
    -> MixtureResult<Tensor<R>>;

    /// Compute per-sample log-likelihood [n].
    fn gmm_score(&self, model: &GmmModel<R>, data: &Tensor<R>) -> MixtureResult<Tensor<R>>;

    /// Bayesian information criterion of the model on `data` (lower is better).
    fn gmm_bic(&self, model: &GmmModel<R>, data: &Tensor<R>) -> MixtureResult<f64>;

    /// Akaike information criterion of the model on `data` (lower is better).
    fn gmm_aic(&self, model: &GmmModel<R>, data: &Tensor<R>) -> MixtureResult<f64>;
}
