//! Candidate grid enumeration.

use super::rng::derive_seed;
use crate::mixture::error::{MixtureError, MixtureResult};
use crate::mixture::traits::gmm::CovarianceType;
use crate::mixture::traits::selection::Candidate;

/// Enumerate `(n_components, covariance_type)` pairs: component counts
/// ascending in the outer loop, covariance types in the given order inside.
///
/// Candidate `i` gets seed `derive_seed(base_seed, i)`, so a candidate's seed
/// depends only on its grid position.
pub fn build_candidate_grid(
    min_components: usize,
    max_components: usize,
    covariance_types: &[CovarianceType],
    base_seed: u64,
) -> MixtureResult<Vec<Candidate>> {
    if min_components < 1 || max_components < min_components {
        return Err(MixtureError::invalid_parameter(
            "max_components",
            format!("empty component range [{min_components}, {max_components}]"),
        ));
    }
    if covariance_types.is_empty() {
        return Err(MixtureError::invalid_parameter(
            "covariance_type",
            "at least one covariance type is required",
        ));
    }

    let candidates = (min_components..=max_components)
        .flat_map(|n_components| {
            covariance_types
                .iter()
                .map(move |&covariance_type| (n_components, covariance_type))
        })
        .enumerate()
        .map(|(index, (n_components, covariance_type))| Candidate {
            index,
            n_components,
            covariance_type,
            seed: derive_seed(base_seed, index as u64),
        })
        .collect();
    Ok(candidates)
}
