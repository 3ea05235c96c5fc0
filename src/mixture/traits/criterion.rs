//! Information criteria for comparing fitted mixtures.

use crate::mixture::error::MixtureError;
use std::fmt;
use std::str::FromStr;

/// Penalized-likelihood criterion. Lower scores are better for both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum InformationCriterion {
    /// Akaike Information Criterion: `2p - 2 ln L`.
    Aic,
    /// Bayesian Information Criterion: `p ln(n) - 2 ln L`.
    #[default]
    Bic,
}

impl InformationCriterion {
    /// Score a fit from its total log-likelihood, free-parameter count, and sample count.
    pub fn score(&self, log_likelihood: f64, n_parameters: usize, n_samples: usize) -> f64 {
        let p = n_parameters as f64;
        let penalty = match self {
            Self::Aic => 2.0 * p,
            Self::Bic => p * (n_samples as f64).ln(),
        };
        -2.0 * log_likelihood + penalty
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Aic => "aic",
            Self::Bic => "bic",
        }
    }
}

impl fmt::Display for InformationCriterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InformationCriterion {
    type Err = MixtureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "aic" => Ok(Self::Aic),
            "bic" => Ok(Self::Bic),
            other => Err(MixtureError::invalid_parameter(
                "criterion",
                format!("expected 'aic' or 'bic', got '{other}'"),
            )),
        }
    }
}
