//! CPU implementation of K-Means.

use crate::mixture::error::MixtureResult;
use crate::mixture::impl_generic::{kmeans_impl, kmeans_predict_impl};
use crate::mixture::traits::kmeans::{KMeansAlgorithms, KMeansOptions, KMeansResult};
use numr::runtime::cpu::{CpuClient, CpuRuntime};
use numr::tensor::Tensor;

impl KMeansAlgorithms<CpuRuntime> for CpuClient {
    fn kmeans(
        &self,
        data: &Tensor<CpuRuntime>,
        options: &KMeansOptions<CpuRuntime>,
    ) -> MixtureResult<KMeansResult<CpuRuntime>> {
        kmeans_impl(self, data, options)
    }

    fn kmeans_predict(
        &self,
        centroids: &Tensor<CpuRuntime>,
        data: &Tensor<CpuRuntime>,
    ) -> MixtureResult<Tensor<CpuRuntime>> {
        kmeans_predict_impl(self, centroids, data)
    }
}
