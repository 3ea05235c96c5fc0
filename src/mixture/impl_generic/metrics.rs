//! Generic partition agreement metrics.

use super::kmeans::KMeansClient;
use crate::mixture::error::{MixtureError, MixtureResult};
use crate::mixture::validation::validate_labels;
use numr::dtype::DType;
use numr::runtime::Runtime;
use numr::tensor::Tensor;

/// Contingency table [n_true, n_pred] (F64 counts) of two label vectors.
fn contingency_matrix<R, C>(
    client: &C,
    labels_true: &Tensor<R>,
    labels_pred: &Tensor<R>,
) -> MixtureResult<Tensor<R>>
where
    R: Runtime,
    C: KMeansClient<R>,
{
    let dtype = DType::F64;
    let n = labels_true.shape()[0];

    let true_f = client.cast(labels_true, dtype)?;
    let pred_f = client.cast(labels_pred, dtype)?;
    let min_label = client
        .min(&true_f, &[0], false)?
        .item::<f64>()?
        .min(client.min(&pred_f, &[0], false)?.item::<f64>()?);
    if min_label < 0.0 {
        return Err(MixtureError::InvalidInput {
            context: "adjusted_rand_score: labels must be non-negative".to_string(),
        });
    }
    let n_true = client.max(&true_f, &[0], false)?.item::<f64>()? as usize + 1;
    let n_pred = client.max(&pred_f, &[0], false)?.item::<f64>()? as usize + 1;

    // Flat cell index: true * n_pred + pred.
    let flat_idx = client.add(&client.mul_scalar(&true_f, n_pred as f64)?, &pred_f)?;
    let flat_idx = client.cast(&flat_idx, DType::I64)?;
    let ones = Tensor::<R>::ones(&[n], dtype, labels_true.device());
    let counts = client.bincount(&flat_idx, Some(&ones), n_true * n_pred)?;
    Ok(counts.reshape(&[n_true, n_pred])?)
}

/// Sum of `c * (c - 1) / 2` over `counts` along `dims`.
fn sum_pairs<R, C>(client: &C, counts: &Tensor<R>, dims: &[usize]) -> MixtureResult<f64>
where
    R: Runtime,
    C: KMeansClient<R>,
{
    let pairs = client.mul(counts, &client.sub_scalar(counts, 1.0)?)?;
    let pairs = client.div_scalar(&pairs, 2.0)?;
    Ok(client.sum(&pairs, dims, false)?.item()?)
}

/// Adjusted Rand Index of two labelings (scalar F64).
///
/// Two labelings that each put every point in one cluster agree perfectly.
pub fn adjusted_rand_score_impl<R, C>(
    client: &C,
    labels_true: &Tensor<R>,
    labels_pred: &Tensor<R>,
) -> MixtureResult<Tensor<R>>
where
    R: Runtime,
    C: KMeansClient<R>,
{
    let n = labels_true.shape().first().copied().unwrap_or(0);
    validate_labels(labels_true.shape(), labels_true.dtype(), n, "adjusted_rand_score")?;
    validate_labels(labels_pred.shape(), labels_pred.dtype(), n, "adjusted_rand_score")?;
    let device = labels_true.device();

    if n < 2 {
        return Ok(Tensor::<R>::full_scalar(&[], DType::F64, 1.0, device));
    }

    let contingency = contingency_matrix(client, labels_true, labels_pred)?;
    let index = sum_pairs(client, &contingency, &[0, 1])?;
    let rows = client.sum(&contingency, &[1], false)?;
    let cols = client.sum(&contingency, &[0], false)?;
    let sum_a = sum_pairs(client, &rows, &[0])?;
    let sum_b = sum_pairs(client, &cols, &[0])?;

    let n_f = n as f64;
    let total_pairs = n_f * (n_f - 1.0) / 2.0;
    let expected = sum_a * sum_b / total_pairs;
    let max_index = (sum_a + sum_b) / 2.0;

    let ari = if (max_index - expected).abs() < f64::EPSILON {
        1.0
    } else {
        (index - expected) / (max_index - expected)
    };
    Ok(Tensor::<R>::full_scalar(&[], DType::F64, ari, device))
}
