//! Mixture algorithm traits.

pub mod criterion;
pub mod gmm;
pub mod kmeans;
pub mod metrics;
pub mod selection;
