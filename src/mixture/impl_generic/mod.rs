//! Generic mixture algorithm implementations.

pub mod gmm;
pub mod grid;
pub mod kmeans;
pub mod metrics;
pub mod rng;
pub mod selection;

pub use gmm::{
    GmmClient, gmm_aic_impl, gmm_bic_impl, gmm_fit_impl, gmm_predict_impl, gmm_predict_proba_impl,
    gmm_score_impl,
};
pub use grid::build_candidate_grid;
pub use kmeans::{KMeansClient, kmeans_impl, kmeans_predict_impl};
pub use metrics::adjusted_rand_score_impl;
pub use rng::derive_seed;
pub use selection::{DEFAULT_BASE_SEED, gmm_select_impl, validate_selection_options};
