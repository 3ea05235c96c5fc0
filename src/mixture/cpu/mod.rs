//! CPU backend for mixture algorithms.

mod gmm;
mod kmeans;
mod metrics;
mod selection;
