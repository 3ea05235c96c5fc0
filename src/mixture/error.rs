//! Error types for mixture fitting and model selection.

use std::fmt;

/// Result type for mixture operations.
pub type MixtureResult<T> = Result<T, MixtureError>;

/// Errors that can occur while fitting or selecting mixture models.
#[derive(Debug, Clone, PartialEq)]
pub enum MixtureError {
    /// A configuration value is outside its accepted range or set.
    InvalidParameter { parameter: String, message: String },

    /// A configuration value has the wrong kind (e.g. text where an integer is required).
    InvalidParameterType {
        parameter: String,
        expected: &'static str,
        found: &'static str,
    },

    /// Input data or labels have the wrong rank, dtype, or length.
    InvalidInput { context: String },

    /// A prediction was requested before a successful fit.
    NotFitted { operation: &'static str },

    /// A single fit hit a degenerate state (singular covariance, non-finite likelihood).
    NumericalError { message: String },

    /// Every candidate in the search grid failed numerically.
    NoFeasibleModel { n_candidates: usize },

    /// The worker pool for parallel candidate evaluation could not be built.
    ThreadPool { message: String },

    /// Error from underlying numr operation.
    NumrError(String),
}

impl MixtureError {
    pub(crate) fn invalid_parameter(parameter: &str, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            parameter: parameter.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn numerical(message: impl Into<String>) -> Self {
        Self::NumericalError {
            message: message.into(),
        }
    }

    /// True for value-class and type-class configuration errors.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidParameter { .. } | Self::InvalidParameterType { .. }
        )
    }
}

impl fmt::Display for MixtureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidParameter { parameter, message } => {
                write!(f, "Invalid parameter '{}': {}", parameter, message)
            }
            Self::InvalidParameterType {
                parameter,
                expected,
                found,
            } => {
                write!(
                    f,
                    "Invalid type for parameter '{}': expected {}, found {}",
                    parameter, expected, found
                )
            }
            Self::InvalidInput { context } => {
                write!(f, "Invalid input: {}", context)
            }
            Self::NotFitted { operation } => {
                write!(
                    f,
                    "{} called before fit: this estimator is not fitted yet",
                    operation
                )
            }
            Self::NumericalError { message } => {
                write!(f, "Numerical error: {}", message)
            }
            Self::NoFeasibleModel { n_candidates } => {
                write!(
                    f,
                    "no feasible model found: all {} candidates failed to fit",
                    n_candidates
                )
            }
            Self::ThreadPool { message } => {
                write!(f, "failed to build worker pool: {}", message)
            }
            Self::NumrError(msg) => {
                write!(f, "numr error: {}", msg)
            }
        }
    }
}

impl std::error::Error for MixtureError {}

impl From<numr::error::Error> for MixtureError {
    fn from(err: numr::error::Error) -> Self {
        Self::NumrError(err.to_string())
    }
}

impl From<rayon::ThreadPoolBuildError> for MixtureError {
    fn from(err: rayon::ThreadPoolBuildError) -> Self {
        Self::ThreadPool {
            message: err.to_string(),
        }
    }
}
