//! Generic Gaussian Mixture Model fitting via EM.
//!
//! Supports Full, Tied, Diagonal, and Spherical covariance types. One scalar
//! (the mean log-likelihood) leaves the device per EM iteration.
//!
//! A restart that reaches a degenerate state (singular covariance, non-finite
//! likelihood) fails with [`MixtureError::NumericalError`] and is skipped; a
//! fit fails only when every restart does.

use super::kmeans::{KMeansClient, kmeans_impl, kmeans_plusplus_init};
use super::rng::{child_seed, derive_seed, sample_without_replacement};
use crate::mixture::error::{MixtureError, MixtureResult};
use crate::mixture::traits::criterion::InformationCriterion;
use crate::mixture::traits::gmm::{CovarianceType, GmmInit, GmmModel, GmmOptions};
use crate::mixture::traits::kmeans::{KMeansInit, KMeansOptions};
use crate::mixture::validation::{
    validate_data_2d, validate_em_controls, validate_mixture_dtype, validate_n_components,
};
use numr::ops::{DistanceMetric, LinalgOps, MatmulOps, StatisticalOps};
use numr::runtime::Runtime;
use numr::tensor::Tensor;
use tracing::trace;

const LOG_2PI: f64 = 1.837_877_066_409_345_3;

/// Trait bounds needed for GMM.
pub trait GmmClient<R: Runtime>:
    KMeansClient<R> + MatmulOps<R> + LinalgOps<R> + StatisticalOps<R>
{
}

impl<R, C> GmmClient<R> for C
where
    R: Runtime,
    C: KMeansClient<R> + MatmulOps<R> + LinalgOps<R> + StatisticalOps<R>,
{
}

/// Current mixture parameters during EM.
struct Params<R: Runtime> {
    weights: Tensor<R>,
    means: Tensor<R>,
    covariances: Tensor<R>,
}

/// Fit GMM to data. Keeps the restart with the highest final mean
/// log-likelihood; exact ties keep the earliest restart.
pub fn gmm_fit_impl<R, C>(
    client: &C,
    data: &Tensor<R>,
    options: &GmmOptions,
) -> MixtureResult<GmmModel<R>>
where
    R: Runtime,
    C: GmmClient<R>,
{
    validate_mixture_dtype(data.dtype(), "gmm_fit")?;
    validate_data_2d(data.shape(), "gmm_fit")?;
    validate_n_components(options.n_components, data.shape()[0], "gmm_fit")?;
    validate_em_controls(options.n_init, options.max_iter, options.tol, options.reg_covar)?;

    let mut best: Option<GmmModel<R>> = None;
    let mut last_failure: Option<MixtureError> = None;

    for restart in 0..options.n_init {
        let seed = options.seed.map(|s| derive_seed(s, restart as u64));
        match fit_single_restart(client, data, options, seed) {
            Ok(model) => {
                trace!(
                    restart,
                    n_iter = model.n_iter,
                    converged = model.converged,
                    lower_bound = model.lower_bound,
                    "EM restart finished"
                );
                if best
                    .as_ref()
                    .is_none_or(|b| model.lower_bound > b.lower_bound)
                {
                    best = Some(model);
                }
            }
            Err(err @ MixtureError::NumericalError { .. }) => {
                trace!(restart, error = %err, "EM restart failed numerically");
                last_failure = Some(err);
            }
            Err(err) => return Err(err),
        }
    }

    best.ok_or_else(|| {
        last_failure.unwrap_or_else(|| MixtureError::numerical("no EM restart produced a model"))
    })
}

/// One EM run from one initialization.
fn fit_single_restart<R, C>(
    client: &C,
    data: &Tensor<R>,
    options: &GmmOptions,
    seed: Option<u64>,
) -> MixtureResult<GmmModel<R>>
where
    R: Runtime,
    C: GmmClient<R>,
{
    let n = data.shape()[0];
    let k = options.n_components;

    let mut params = Params {
        weights: Tensor::<R>::full_scalar(&[k], data.dtype(), 1.0 / k as f64, data.device()),
        means: initial_means(client, data, options, seed)?,
        covariances: initial_covariances(client, data, options)?,
    };

    let mut prev_ll = f64::NEG_INFINITY;
    let mut converged = false;
    let mut n_iter = 0;
    let mut lower_bound = f64::NEG_INFINITY;

    for iter in 0..options.max_iter {
        n_iter = iter + 1;

        let log_prob = weighted_log_prob(client, data, &params, options.covariance_type)?;
        let (log_norm, ll) = log_normalizer(client, &log_prob)?;
        lower_bound = ll;

        if (ll - prev_ll).abs() < options.tol {
            converged = true;
            break;
        }
        prev_ll = ll;

        let resp = client.exp(&client.sub(&log_prob, &log_norm)?)?; // [n, k]
        params = m_step(client, data, &resp, options.covariance_type, options.reg_covar)?;
    }

    // The loop ends on an M-step unless it converged; score the parameters we keep.
    if !converged {
        let log_prob = weighted_log_prob(client, data, &params, options.covariance_type)?;
        lower_bound = log_normalizer(client, &log_prob)?.1;
    }

    Ok(GmmModel {
        weights: params.weights,
        means: params.means,
        covariances: params.covariances,
        covariance_type: options.covariance_type,
        converged,
        n_iter,
        lower_bound,
        log_likelihood: lower_bound * n as f64,
    })
}

/// Initial component means [k, d].
fn initial_means<R, C>(
    client: &C,
    data: &Tensor<R>,
    options: &GmmOptions,
    seed: Option<u64>,
) -> MixtureResult<Tensor<R>>
where
    R: Runtime,
    C: GmmClient<R>,
{
    let k = options.n_components;
    match options.init {
        GmmInit::KMeans => {
            let centroids = kmeans_plusplus_init(client, data, k, child_seed(seed, 0))?;
            let km_opts = KMeansOptions {
                n_clusters: k,
                max_iter: 10,
                tol: 1e-3,
                n_init: 1,
                init: KMeansInit::Points(centroids),
                seed: child_seed(seed, 1),
            };
            Ok(kmeans_impl(client, data, &km_opts)?.centroids)
        }
        GmmInit::Random => {
            let indices =
                sample_without_replacement(client, data.shape()[0], k, child_seed(seed, 0))?;
            Ok(client.index_select(data, 0, &indices)?)
        }
    }
}

/// Every component starts from the per-feature data variance.
fn initial_covariances<R, C>(
    client: &C,
    data: &Tensor<R>,
    options: &GmmOptions,
) -> MixtureResult<Tensor<R>>
where
    R: Runtime,
    C: GmmClient<R>,
{
    let d = data.shape()[1];
    let k = options.n_components;
    let reg = options.reg_covar;
    let data_var = client.var(data, &[0], false, 1)?; // [d]

    let covariances = match options.covariance_type {
        CovarianceType::Spherical => {
            let mean_var = client.mean(&data_var, &[0], false)?;
            let mean_var = client.add_scalar(&mean_var, reg)?;
            mean_var.broadcast_to(&[k])?.contiguous()
        }
        CovarianceType::Diagonal => {
            let var = client.add_scalar(&data_var, reg)?;
            var.unsqueeze(0)?.broadcast_to(&[k, d])?.contiguous()
        }
        CovarianceType::Tied => client.diagflat(&client.add_scalar(&data_var, reg)?)?,
        CovarianceType::Full => {
            let cov = client.diagflat(&client.add_scalar(&data_var, reg)?)?;
            cov.unsqueeze(0)?.broadcast_to(&[k, d, d])?.contiguous()
        }
    };
    Ok(covariances)
}

/// `log(weight_j) + log N(x_i; mean_j, cov_j)` for every sample and component [n, k].
fn weighted_log_prob<R, C>(
    client: &C,
    data: &Tensor<R>,
    params: &Params<R>,
    covariance_type: CovarianceType,
) -> MixtureResult<Tensor<R>>
where
    R: Runtime,
    C: GmmClient<R>,
{
    let n = data.shape()[0];
    let d = data.shape()[1];
    let k = params.weights.shape()[0];
    let Params {
        weights,
        means,
        covariances,
    } = params;

    let log_gauss = match covariance_type {
        CovarianceType::Spherical => {
            // maha = |x - mu|^2 / var, log|cov| = d * log(var)
            let sq_dists = client.cdist(data, means, DistanceMetric::SquaredEuclidean)?; // [n, k]
            let var = covariances.unsqueeze(0)?.broadcast_to(&[n, k])?;
            let maha = client.div(&sq_dists, &var)?;
            let log_det = client.mul_scalar(&client.log(covariances)?, d as f64)?; // [k]
            gaussian_from_parts(client, &maha, &log_det, d)?
        }
        CovarianceType::Diagonal => {
            // sum_f (x_f - mu_f)^2 / var_f expanded into three matmuls.
            let precision = client.div(
                &Tensor::<R>::ones(&[k, d], data.dtype(), data.device()),
                covariances,
            )?; // [k, d]
            let x_sq = client.mul(data, data)?;
            let term_xx = client.matmul(&x_sq, &precision.transpose(0, 1)?)?; // [n, k]
            let mu_prec = client.mul(means, &precision)?; // [k, d]
            let term_xm = client.matmul(data, &mu_prec.transpose(0, 1)?)?; // [n, k]
            let term_mm = client.sum(&client.mul(means, &mu_prec)?, &[1], false)?; // [k]
            let maha = client.sub(&term_xx, &client.mul_scalar(&term_xm, 2.0)?)?;
            let maha = client.add(&maha, &term_mm.unsqueeze(0)?.broadcast_to(&[n, k])?)?;
            let log_det = client.sum(&client.log(covariances)?, &[1], false)?; // [k]
            gaussian_from_parts(client, &maha, &log_det, d)?
        }
        CovarianceType::Tied => {
            let (precision, log_det) = invert_covariance(client, covariances, None)?;
            let mut columns = Vec::with_capacity(k);
            for j in 0..k {
                let maha = mahalanobis(client, data, &means.narrow(0, j, 1)?, &precision)?;
                columns.push(dense_log_gaussian(client, &maha, log_det, d)?);
            }
            let refs: Vec<&Tensor<R>> = columns.iter().collect();
            client.cat(&refs, 1)?
        }
        CovarianceType::Full => {
            let mut columns = Vec::with_capacity(k);
            for j in 0..k {
                let cov_j = covariances.narrow(0, j, 1)?.contiguous().reshape(&[d, d])?;
                let (precision, log_det) = invert_covariance(client, &cov_j, Some(j))?;
                let maha = mahalanobis(client, data, &means.narrow(0, j, 1)?, &precision)?;
                columns.push(dense_log_gaussian(client, &maha, log_det, d)?);
            }
            let refs: Vec<&Tensor<R>> = columns.iter().collect();
            client.cat(&refs, 1)?
        }
    };

    let log_weights = client.log(weights)?.unsqueeze(0)?.broadcast_to(&[n, k])?;
    Ok(client.add(&log_gauss, &log_weights)?)
}

/// `-0.5 * (d log 2pi + log|cov_j| + maha_ij)` from maha [n, k] and log|cov| [k].
fn gaussian_from_parts<R, C>(
    client: &C,
    maha: &Tensor<R>,
    log_det: &Tensor<R>,
    d: usize,
) -> MixtureResult<Tensor<R>>
where
    R: Runtime,
    C: GmmClient<R>,
{
    let shape = maha.shape().to_vec();
    let terms = client.add(maha, &log_det.unsqueeze(0)?.broadcast_to(&shape)?)?;
    let terms = client.add_scalar(&terms, d as f64 * LOG_2PI)?;
    Ok(client.mul_scalar(&terms, -0.5)?)
}

/// Log-density column [n, 1] of one dense-covariance component.
fn dense_log_gaussian<R, C>(
    client: &C,
    maha: &Tensor<R>,
    log_det: f64,
    d: usize,
) -> MixtureResult<Tensor<R>>
where
    R: Runtime,
    C: GmmClient<R>,
{
    let terms = client.add_scalar(maha, d as f64 * LOG_2PI + log_det)?;
    Ok(client.mul_scalar(&terms, -0.5)?.unsqueeze(1)?)
}

/// Squared Mahalanobis distance [n] of every row to `mean` [1, d].
fn mahalanobis<R, C>(
    client: &C,
    data: &Tensor<R>,
    mean: &Tensor<R>,
    precision: &Tensor<R>,
) -> MixtureResult<Tensor<R>>
where
    R: Runtime,
    C: GmmClient<R>,
{
    let diff = client.sub(data, &mean.broadcast_to(data.shape())?)?; // [n, d]
    let projected = client.matmul(&diff, precision)?;
    Ok(client.sum(&client.mul(&projected, &diff)?, &[1], false)?)
}

/// Inverse and log-determinant of a dense covariance [d, d].
fn invert_covariance<R, C>(
    client: &C,
    covariance: &Tensor<R>,
    component: Option<usize>,
) -> MixtureResult<(Tensor<R>, f64)>
where
    R: Runtime,
    C: GmmClient<R>,
{
    let describe = |err: numr::error::Error| match component {
        Some(j) => {
            MixtureError::numerical(format!("covariance of component {j} is singular: {err}"))
        }
        None => MixtureError::numerical(format!("tied covariance is singular: {err}")),
    };
    let precision = client.inverse(covariance).map_err(describe)?;
    let log_det: f64 = client.slogdet(covariance).map_err(describe)?.logabsdet.item()?;
    if !log_det.is_finite() {
        return Err(MixtureError::numerical(match component {
            Some(j) => format!("covariance of component {j} has non-finite log-determinant"),
            None => "tied covariance has non-finite log-determinant".to_string(),
        }));
    }
    Ok((precision, log_det))
}

/// Per-sample log normalizer `logsumexp_j log_prob[i, j]` as [n, 1], and its
/// mean. A non-finite mean is a numerical failure.
fn log_normalizer<R, C>(client: &C, log_prob: &Tensor<R>) -> MixtureResult<(Tensor<R>, f64)>
where
    R: Runtime,
    C: GmmClient<R>,
{
    let max_log = client.max(log_prob, &[1], true)?; // [n, 1]
    let shifted = client.sub(log_prob, &max_log)?;
    let sum_exp = client.sum(&client.exp(&shifted)?, &[1], true)?;
    let lse = client.add(&client.log(&sum_exp)?, &max_log)?; // [n, 1]
    let ll: f64 = client.mean(&lse, &[0, 1], false)?.item()?;
    if !ll.is_finite() {
        return Err(MixtureError::numerical(format!(
            "log-likelihood is not finite ({ll})"
        )));
    }
    Ok((lse, ll))
}

/// M-step: weights, means, and covariances from responsibilities [n, k].
fn m_step<R, C>(
    client: &C,
    data: &Tensor<R>,
    resp: &Tensor<R>,
    covariance_type: CovarianceType,
    reg_covar: f64,
) -> MixtureResult<Params<R>>
where
    R: Runtime,
    C: GmmClient<R>,
{
    let n = data.shape()[0];
    let d = data.shape()[1];
    let k = resp.shape()[1];
    let dtype = data.dtype();
    let device = data.device();

    // Keeps empty components from dividing by zero.
    let nk = client.add_scalar(&client.sum(resp, &[0], false)?, 10.0 * f64::EPSILON)?; // [k]
    let weights = client.div_scalar(&nk, n as f64)?;
    let nk_kd = nk.unsqueeze(1)?.broadcast_to(&[k, d])?;
    let resp_t = resp.transpose(0, 1)?; // [k, n]
    let means = client.div(&client.matmul(&resp_t, data)?, &nk_kd)?; // [k, d]

    let covariances = match covariance_type {
        CovarianceType::Spherical | CovarianceType::Diagonal => {
            // E[x^2] - mu^2 per component and feature, floored at reg_covar.
            let avg_x_sq = client.div(&client.matmul(&resp_t, &client.mul(data, data)?)?, &nk_kd)?;
            let var = client.sub(&avg_x_sq, &client.mul(&means, &means)?)?;
            let var = client.add_scalar(&var, reg_covar)?;
            let floor = Tensor::<R>::full_scalar(&[k, d], dtype, reg_covar, device);
            let var = client.maximum(&var, &floor)?; // [k, d]
            if covariance_type == CovarianceType::Spherical {
                client.mean(&var, &[1], false)?
            } else {
                var
            }
        }
        CovarianceType::Tied => {
            // (X^T X - sum_j nk_j mu_j mu_j^T) / n
            let x_t_x = client.matmul(&data.transpose(0, 1)?, data)?; // [d, d]
            let weighted_means = client.mul(&means, &nk_kd)?;
            let between = client.matmul(&weighted_means.transpose(0, 1)?, &means)?;
            let cov = client.div_scalar(&client.sub(&x_t_x, &between)?, n as f64)?;
            client.add(&cov, &regularization(client, d, reg_covar, data)?)?
        }
        CovarianceType::Full => {
            let reg = regularization(client, d, reg_covar, data)?;
            let mut slices = Vec::with_capacity(k);
            for j in 0..k {
                let mean_j = means.narrow(0, j, 1)?.broadcast_to(&[n, d])?;
                let diff = client.sub(data, &mean_j)?; // [n, d]
                let resp_j = resp.narrow(1, j, 1)?.broadcast_to(&[n, d])?;
                let weighted_diff = client.mul(&diff, &resp_j)?;
                let scatter = client.matmul(&weighted_diff.transpose(0, 1)?, &diff)?; // [d, d]
                let nk_j: f64 = nk.narrow(0, j, 1)?.item()?;
                let cov_j = client.add(&client.div_scalar(&scatter, nk_j)?, &reg)?;
                slices.push(cov_j.unsqueeze(0)?);
            }
            let refs: Vec<&Tensor<R>> = slices.iter().collect();
            client.cat(&refs, 0)?
        }
    };

    Ok(Params {
        weights,
        means,
        covariances,
    })
}

/// `reg_covar * I` [d, d] in the dtype of `like`.
fn regularization<R, C>(
    client: &C,
    d: usize,
    reg_covar: f64,
    like: &Tensor<R>,
) -> MixtureResult<Tensor<R>>
where
    R: Runtime,
    C: GmmClient<R>,
{
    let diag = Tensor::<R>::full_scalar(&[d], like.dtype(), reg_covar, like.device());
    Ok(client.diagflat(&diag)?)
}

/// Check that `data` can be scored by `model`.
fn validate_model_input<R: Runtime>(
    model: &GmmModel<R>,
    data: &Tensor<R>,
    op: &'static str,
) -> MixtureResult<()> {
    validate_mixture_dtype(data.dtype(), op)?;
    validate_data_2d(data.shape(), op)?;
    let k = model.n_components();
    let d = model.n_features();
    if data.shape()[1] != d {
        return Err(MixtureError::InvalidInput {
            context: format!(
                "{op}: model was fitted on {d} features, data has {}",
                data.shape()[1]
            ),
        });
    }
    let expected = model.covariance_type.covariance_shape(k, d);
    if model.covariances.shape() != expected.as_slice() {
        return Err(MixtureError::InvalidInput {
            context: format!(
                "{op}: {} covariances must have shape {expected:?}, got {:?}",
                model.covariance_type,
                model.covariances.shape()
            ),
        });
    }
    Ok(())
}

fn model_log_prob<R, C>(
    client: &C,
    model: &GmmModel<R>,
    data: &Tensor<R>,
    op: &'static str,
) -> MixtureResult<Tensor<R>>
where
    R: Runtime,
    C: GmmClient<R>,
{
    validate_model_input(model, data, op)?;
    let params = Params {
        weights: model.weights.clone(),
        means: model.means.clone(),
        covariances: model.covariances.clone(),
    };
    weighted_log_prob(client, data, &params, model.covariance_type)
}

/// Predict most likely component for each point [n] I64.
pub fn gmm_predict_impl<R, C>(
    client: &C,
    model: &GmmModel<R>,
    data: &Tensor<R>,
) -> MixtureResult<Tensor<R>>
where
    R: Runtime,
    C: GmmClient<R>,
{
    let log_prob = model_log_prob(client, model, data, "gmm_predict")?;
    Ok(client.argmax(&log_prob, 1, false)?)
}

/// Predict component probabilities [n, k]; rows sum to one.
pub fn gmm_predict_proba_impl<R, C>(
    client: &C,
    model: &GmmModel<R>,
    data: &Tensor<R>,
) -> MixtureResult<Tensor<R>>
where
    R: Runtime,
    C: GmmClient<R>,
{
    let log_prob = model_log_prob(client, model, data, "gmm_predict_proba")?;
    let (log_norm, _) = log_normalizer(client, &log_prob)?;
    Ok(client.exp(&client.sub(&log_prob, &log_norm)?)?)
}

/// Per-sample log-likelihood [n].
pub fn gmm_score_impl<R, C>(
    client: &C,
    model: &GmmModel<R>,
    data: &Tensor<R>,
) -> MixtureResult<Tensor<R>>
where
    R: Runtime,
    C: GmmClient<R>,
{
    let log_prob = model_log_prob(client, model, data, "gmm_score")?;
    let (log_norm, _) = log_normalizer(client, &log_prob)?;
    Ok(log_norm.contiguous().reshape(&[data.shape()[0]])?)
}

fn criterion_impl<R, C>(
    client: &C,
    model: &GmmModel<R>,
    data: &Tensor<R>,
    criterion: InformationCriterion,
) -> MixtureResult<f64>
where
    R: Runtime,
    C: GmmClient<R>,
{
    let scores = gmm_score_impl(client, model, data)?;
    let total: f64 = client.sum(&scores, &[0], false)?.item()?;
    Ok(criterion.score(total, model.n_parameters(), data.shape()[0]))
}

/// Bayesian information criterion of `model` on `data`.
pub fn gmm_bic_impl<R, C>(client: &C, model: &GmmModel<R>, data: &Tensor<R>) -> MixtureResult<f64>
where
    R: Runtime,
    C: GmmClient<R>,
{
    criterion_impl(client, model, data, InformationCriterion::Bic)
}

/// Akaike information criterion of `model` on `data`.
pub fn gmm_aic_impl<R, C>(client: &C, model: &GmmModel<R>, data: &Tensor<R>) -> MixtureResult<f64>
where
    R: Runtime,
    C: GmmClient<R>,
{
    criterion_impl(client, model, data, InformationCriterion::Aic)
}
