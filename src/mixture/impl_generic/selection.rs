//! Generic information-criterion model selection.
//!
//! Every candidate of the grid is fitted independently from its own derived
//! seed, so the sequential and the parallel paths produce the same scores.
//! The winner is chosen by an ordered scan over the grid: the lowest score
//! wins and exact ties go to the earliest candidate.

use super::gmm::{GmmClient, gmm_fit_impl};
use super::grid::build_candidate_grid;
use crate::mixture::error::{MixtureError, MixtureResult};
use crate::mixture::traits::criterion::InformationCriterion;
use crate::mixture::traits::gmm::GmmOptions;
use crate::mixture::traits::selection::{
    Candidate, CandidateScore, GmmSelection, GmmSelectionOptions, ScoredCandidate,
};
use crate::mixture::validation::{
    validate_component_range, validate_data_2d, validate_em_controls, validate_mixture_dtype,
};
use numr::runtime::Runtime;
use numr::tensor::Tensor;
use rayon::prelude::*;
use tracing::{debug, info, warn};

/// Base seed used when no `random_state` is given.
pub const DEFAULT_BASE_SEED: u64 = 0x5EED_6A55_1A4C_0DE5;

/// Validate selection options against a data set of `n_samples` rows.
///
/// Runs before any data is touched; reports the first violation found.
pub fn validate_selection_options(
    options: &GmmSelectionOptions,
    n_samples: usize,
) -> MixtureResult<()> {
    validate_component_range(options.min_components, options.max_components, n_samples)?;
    options.covariance_types.resolve()?;
    validate_em_controls(options.n_init, options.max_iter, options.tol, options.reg_covar)
}

/// Fit every grid candidate and keep the one with the lowest criterion value.
pub fn gmm_select_impl<R, C>(
    client: &C,
    data: &Tensor<R>,
    options: &GmmSelectionOptions,
) -> MixtureResult<GmmSelection<R>>
where
    R: Runtime,
    C: GmmClient<R> + Sync,
    Tensor<R>: Send + Sync,
{
    validate_mixture_dtype(data.dtype(), "gmm_select")?;
    validate_data_2d(data.shape(), "gmm_select")?;
    let n_samples = data.shape()[0];
    validate_selection_options(options, n_samples)?;

    let covariance_types = options.covariance_types.resolve()?;
    let base_seed = options.random_state.unwrap_or(DEFAULT_BASE_SEED);
    let candidates = build_candidate_grid(
        options.min_components,
        options.max_components,
        &covariance_types,
        base_seed,
    )?;

    debug!(
        n_candidates = candidates.len(),
        n_samples,
        n_features = data.shape()[1],
        criterion = %options.criterion,
        n_jobs = options.n_jobs,
        "starting mixture model search"
    );

    let evaluate = |candidate: &Candidate| evaluate_candidate(client, data, candidate, options);
    let outcomes: Vec<MixtureResult<ScoredCandidate<R>>> = match worker_count(options.n_jobs) {
        None => candidates.iter().map(&evaluate).collect(),
        Some(n_threads) => {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(n_threads)
                .build()?;
            pool.install(|| candidates.par_iter().map(&evaluate).collect())
        }
    };

    select_best(&candidates, outcomes, options.criterion)
}

/// `None` runs on the calling thread; otherwise the size of the worker pool.
fn worker_count(n_jobs: isize) -> Option<usize> {
    match n_jobs {
        1 => None,
        n if n <= 0 => Some(rayon::current_num_threads()),
        n => Some(n.unsigned_abs()),
    }
}

fn evaluate_candidate<R, C>(
    client: &C,
    data: &Tensor<R>,
    candidate: &Candidate,
    options: &GmmSelectionOptions,
) -> MixtureResult<ScoredCandidate<R>>
where
    R: Runtime,
    C: GmmClient<R>,
{
    let gmm_options = GmmOptions {
        n_components: candidate.n_components,
        covariance_type: candidate.covariance_type,
        max_iter: options.max_iter,
        tol: options.tol,
        n_init: options.n_init,
        init: options.init,
        reg_covar: options.reg_covar,
        seed: Some(candidate.seed),
    };
    let model = gmm_fit_impl(client, data, &gmm_options)?;
    let n_parameters = model.n_parameters();
    let log_likelihood = model.log_likelihood;
    let score = options
        .criterion
        .score(log_likelihood, n_parameters, data.shape()[0]);

    Ok(ScoredCandidate {
        candidate: *candidate,
        model,
        log_likelihood,
        n_parameters,
        score,
    })
}

/// Ordered reduction over candidate outcomes.
///
/// Numerical failures become unscored entries; any other error aborts with
/// the first one in grid order.
fn select_best<R: Runtime>(
    candidates: &[Candidate],
    outcomes: Vec<MixtureResult<ScoredCandidate<R>>>,
    criterion: InformationCriterion,
) -> MixtureResult<GmmSelection<R>> {
    let mut scores = Vec::with_capacity(candidates.len());
    let mut best: Option<ScoredCandidate<R>> = None;

    for (candidate, outcome) in candidates.iter().zip(outcomes) {
        match outcome {
            Ok(scored) => {
                debug!(
                    n_components = candidate.n_components,
                    covariance_type = %candidate.covariance_type,
                    log_likelihood = scored.log_likelihood,
                    n_parameters = scored.n_parameters,
                    score = scored.score,
                    "candidate scored"
                );
                if !scored.model.converged {
                    warn!(
                        n_components = candidate.n_components,
                        covariance_type = %candidate.covariance_type,
                        n_iter = scored.model.n_iter,
                        "EM did not converge"
                    );
                }
                scores.push(CandidateScore {
                    candidate: *candidate,
                    score: Some(scored.score),
                });
                if best.as_ref().is_none_or(|b| scored.score < b.score) {
                    best = Some(scored);
                }
            }
            Err(MixtureError::NumericalError { message }) => {
                warn!(
                    n_components = candidate.n_components,
                    covariance_type = %candidate.covariance_type,
                    %message,
                    "candidate excluded"
                );
                scores.push(CandidateScore {
                    candidate: *candidate,
                    score: None,
                });
            }
            Err(err) => return Err(err),
        }
    }

    let best = best.ok_or(MixtureError::NoFeasibleModel {
        n_candidates: candidates.len(),
    })?;
    info!(
        n_components = best.candidate.n_components,
        covariance_type = %best.candidate.covariance_type,
        criterion = %criterion,
        score = best.score,
        "selected mixture model"
    );

    Ok(GmmSelection {
        best,
        scores,
        criterion,
    })
}
