//! CPU implementation of partition agreement metrics.

use crate::mixture::error::MixtureResult;
use crate::mixture::impl_generic::adjusted_rand_score_impl;
use crate::mixture::traits::metrics::ClusterMetricsAlgorithms;
use numr::runtime::cpu::{CpuClient, CpuRuntime};
use numr::tensor::Tensor;

impl ClusterMetricsAlgorithms<CpuRuntime> for CpuClient {
    fn adjusted_rand_score(
        &self,
        labels_true: &Tensor<CpuRuntime>,
        labels_pred: &Tensor<CpuRuntime>,
    ) -> MixtureResult<Tensor<CpuRuntime>> {
        adjusted_rand_score_impl(self, labels_true, labels_pred)
    }
}
