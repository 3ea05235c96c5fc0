//! Information-criterion model selection over a grid of mixture configurations.

use crate::mixture::error::{MixtureError, MixtureResult};
use crate::mixture::traits::criterion::InformationCriterion;
use crate::mixture::traits::gmm::{CovarianceType, GmmInit, GmmModel};
use numr::runtime::Runtime;
use numr::tensor::Tensor;
use std::str::FromStr;

/// Which covariance structures to search.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CovarianceTypeSpec {
    /// Spherical, diagonal, tied, and full.
    #[default]
    All,
    /// An explicit set of structures. Order and duplicates do not matter.
    Only(Vec<CovarianceType>),
}

impl CovarianceTypeSpec {
    /// Parse a list of names. `"all"` anywhere in the list selects every structure.
    pub fn parse_list<S: AsRef<str>>(names: &[S]) -> MixtureResult<Self> {
        if names.is_empty() {
            return Err(MixtureError::invalid_parameter(
                "covariance_type",
                "list of covariance types must not be empty",
            ));
        }
        let mut types = Vec::with_capacity(names.len());
        for name in names {
            match name.as_ref() {
                "all" => return Ok(Self::All),
                other => types.push(other.parse::<CovarianceType>()?),
            }
        }
        Ok(Self::Only(types))
    }

    /// Requested structures in canonical order, without duplicates.
    pub fn resolve(&self) -> MixtureResult<Vec<CovarianceType>> {
        match self {
            Self::All => Ok(CovarianceType::ALL.to_vec()),
            Self::Only(types) => {
                let mut types = types.clone();
                types.sort();
                types.dedup();
                if types.is_empty() {
                    return Err(MixtureError::invalid_parameter(
                        "covariance_type",
                        "at least one covariance type is required",
                    ));
                }
                Ok(types)
            }
        }
    }
}

impl From<CovarianceType> for CovarianceTypeSpec {
    fn from(covariance_type: CovarianceType) -> Self {
        Self::Only(vec![covariance_type])
    }
}

impl FromStr for CovarianceTypeSpec {
    type Err = MixtureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_list(&[s])
    }
}

/// Options for information-criterion model selection.
#[derive(Debug, Clone)]
pub struct GmmSelectionOptions {
    /// Smallest component count searched.
    pub min_components: usize,
    /// Largest component count searched (inclusive).
    pub max_components: usize,
    /// Covariance structures searched.
    pub covariance_types: CovarianceTypeSpec,
    /// Criterion used to rank candidates.
    pub criterion: InformationCriterion,
    /// EM restarts per candidate.
    pub n_init: usize,
    /// Worker count: 1 runs sequentially, values <= 0 use every available worker.
    pub n_jobs: isize,
    /// Base seed; every candidate derives its own seed from this and its grid position.
    pub random_state: Option<u64>,
    /// Maximum EM iterations per restart.
    pub max_iter: usize,
    /// Convergence tolerance on the mean log-likelihood.
    pub tol: f64,
    /// Regularization added to covariance diagonals.
    pub reg_covar: f64,
    /// Initialization of component means.
    pub init: GmmInit,
}

impl Default for GmmSelectionOptions {
    fn default() -> Self {
        Self {
            min_components: 2,
            max_components: 10,
            covariance_types: CovarianceTypeSpec::All,
            criterion: InformationCriterion::Bic,
            n_init: 1,
            n_jobs: 1,
            random_state: None,
            max_iter: 100,
            tol: 1e-3,
            reg_covar: 1e-6,
            init: GmmInit::KMeans,
        }
    }
}

/// One point of the search grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    /// Position in enumeration order; earlier wins exact ties.
    pub index: usize,
    /// Number of mixture components.
    pub n_components: usize,
    /// Covariance structure.
    pub covariance_type: CovarianceType,
    /// Seed for this candidate's restarts.
    pub seed: u64,
}

/// Criterion value of one grid point; `None` when its fit failed numerically.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandidateScore {
    pub candidate: Candidate,
    pub score: Option<f64>,
}

/// A fitted and scored candidate.
#[derive(Debug, Clone)]
pub struct ScoredCandidate<R: Runtime> {
    pub candidate: Candidate,
    pub model: GmmModel<R>,
    /// Total training log-likelihood.
    pub log_likelihood: f64,
    /// Free-parameter count used in the penalty.
    pub n_parameters: usize,
    /// Criterion value (lower is better).
    pub score: f64,
}

/// Outcome of a model-selection search.
#[derive(Debug, Clone)]
pub struct GmmSelection<R: Runtime> {
    /// Winning candidate with its fitted model.
    pub best: ScoredCandidate<R>,
    /// Score of every grid point, in enumeration order.
    pub scores: Vec<CandidateScore>,
    /// Criterion the search ranked by.
    pub criterion: InformationCriterion,
}

impl<R: Runtime> GmmSelection<R> {
    /// Component count of the winning model.
    pub fn n_components(&self) -> usize {
        self.best.candidate.n_components
    }

    /// Covariance structure of the winning model.
    pub fn covariance_type(&self) -> CovarianceType {
        self.best.candidate.covariance_type
    }

    /// Number of grid points that produced a usable fit.
    pub fn n_feasible(&self) -> usize {
        self.scores.iter().filter(|s| s.score.is_some()).count()
    }
}

/// Model selection algorithms.
pub trait GmmSelectionAlgorithms<R: Runtime> {
    /// Fit every candidate of the grid described by `options` and keep the
    /// one with the lowest criterion value.
    fn gmm_select(
        &self,
        data: &Tensor<R>,
        options: &GmmSelectionOptions,
    ) -> MixtureResult<GmmSelection<R>>;
}
