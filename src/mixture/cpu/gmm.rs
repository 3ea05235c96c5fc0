//! CPU implementation of Gaussian Mixture Model.

use crate::mixture::error::MixtureResult;
use crate::mixture::impl_generic::{
    gmm_aic_impl, gmm_bic_impl, gmm_fit_impl, gmm_predict_impl, gmm_predict_proba_impl,
    gmm_score_impl,
};
use crate::mixture::traits::gmm::{GmmAlgorithms, GmmModel, GmmOptions};
use numr::runtime::cpu::{CpuClient, CpuRuntime};
use numr::tensor::Tensor;

impl GmmAlgorithms<CpuRuntime> for CpuClient {
    fn gmm_fit(
        &self,
        data: &Tensor<CpuRuntime>,
        options: &GmmOptions,
    ) -> MixtureResult<GmmModel<CpuRuntime>> {
        gmm_fit_impl(self, data, options)
    }

    fn gmm_predict(
        &self,
        model: &GmmModel<CpuRuntime>,
        data: &Tensor<CpuRuntime>,
    ) -> MixtureResult<Tensor<CpuRuntime>> {
        gmm_predict_impl(self, model, data)
    }

    fn gmm_predict_proba(
        &self,
        model: &GmmModel<CpuRuntime>,
        data: &Tensor<CpuRuntime>,
    ) -> MixtureResult<Tensor<CpuRuntime>> {
        gmm_predict_proba_impl(self, model, data)
    }

    fn gmm_score(
        &self,
        model: &GmmModel<CpuRuntime>,
        data: &Tensor<CpuRuntime>,
    ) -> MixtureResult<Tensor<CpuRuntime>> {
        gmm_score_impl(self, model, data)
    }

    fn gmm_bic(
        &self,
        model: &GmmModel<CpuRuntime>,
        data: &Tensor<CpuRuntime>,
    ) -> MixtureResult<f64> {
        gmm_bic_impl(self, model, data)
    }

    fn gmm_aic(
        &self,
        model: &GmmModel<CpuRuntime>,
        data: &Tensor<CpuRuntime>,
    ) -> MixtureResult<f64> {
        gmm_aic_impl(self, model, data)
    }
}
