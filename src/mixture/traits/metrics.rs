//! Cluster agreement metrics trait.

use crate::mixture::error::MixtureResult;
use numr::runtime::Runtime;
use numr::tensor::Tensor;

/// Cluster evaluation metrics.
pub trait ClusterMetricsAlgorithms<R: Runtime> {
    /// Adjusted Rand Index between two I64 labelings (scalar, 1.0 = identical partitions).
    fn adjusted_rand_score(
        &self,
        labels_true: &Tensor<R>,
        labels_pred: &Tensor<R>,
    ) -> MixtureResult<Tensor<R>>;
}
