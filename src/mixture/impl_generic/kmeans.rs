//! Generic K-Means used to place initial mixture means.

use super::rng::{child_seed, derive_seed, sample_without_replacement, uniform_scalar};
use crate::mixture::error::{MixtureError, MixtureResult};
use crate::mixture::traits::kmeans::{KMeansInit, KMeansOptions, KMeansResult};
use crate::mixture::validation::{validate_data_2d, validate_mixture_dtype, validate_n_components};
use numr::dtype::DType;
use numr::error::Result;
use numr::ops::{
    AdvancedRandomOps, CompareOps, ConditionalOps, CumulativeOps, DistanceMetric, DistanceOps,
    IndexingOps, RandomOps, ReduceOps, ScalarOps, ShapeOps, SortingOps, TensorOps,
    TypeConversionOps, UnaryOps, UtilityOps,
};
use numr::runtime::{Runtime, RuntimeClient};
use numr::tensor::Tensor;

/// Trait bounds needed for K-Means.
pub trait KMeansClient<R: Runtime>:
    DistanceOps<R>
    + IndexingOps<R>
    + ReduceOps<R>
    + ScalarOps<R>
    + TensorOps<R>
    + TypeConversionOps<R>
    + UnaryOps<R>
    + CumulativeOps<R>
    + ConditionalOps<R>
    + CompareOps<R>
    + RandomOps<R>
    + AdvancedRandomOps<R>
    + SortingOps<R>
    + ShapeOps<R>
    + UtilityOps<R>
    + RuntimeClient<R>
{
}

impl<R, C> KMeansClient<R> for C
where
    R: Runtime,
    C: DistanceOps<R>
        + IndexingOps<R>
        + ReduceOps<R>
        + ScalarOps<R>
        + TensorOps<R>
        + TypeConversionOps<R>
        + UnaryOps<R>
        + CumulativeOps<R>
        + ConditionalOps<R>
        + CompareOps<R>
        + RandomOps<R>
        + AdvancedRandomOps<R>
        + SortingOps<R>
        + ShapeOps<R>
        + UtilityOps<R>
        + RuntimeClient<R>,
{
}

/// K-Means++ seeding: each new centroid is drawn with probability proportional
/// to its squared distance from the closest centroid chosen so far.
///
/// Draw `i` uses `derive_seed(seed, i)` when seeded.
pub(crate) fn kmeans_plusplus_init<R, C>(
    client: &C,
    data: &Tensor<R>,
    k: usize,
    seed: Option<u64>,
) -> Result<Tensor<R>>
where
    R: Runtime,
    C: KMeansClient<R>,
{
    let n = data.shape()[0];
    let device = data.device();
    let dtype = data.dtype();

    let u = uniform_scalar(client, child_seed(seed, 0))?;
    let first_idx = ((u * n as f64) as usize).min(n - 1);
    let idx_tensor = Tensor::<R>::from_slice(&[first_idx as i64], &[1], device);
    let mut centroids = client.index_select(data, 0, &idx_tensor)?;

    for draw in 1..k {
        let dists = client.cdist(data, &centroids, DistanceMetric::SquaredEuclidean)?;
        let min_dists = client.min(&dists, &[1], false)?;
        let cum_weights = client.cumsum(&min_dists, 0)?;
        let total: f64 = cum_weights.narrow(0, n - 1, 1)?.item()?;

        let u = uniform_scalar(client, child_seed(seed, draw as u64))?;
        let threshold = Tensor::<R>::full_scalar(&[n], dtype, u * total, device);
        // First index whose cumulative weight reaches the threshold.
        let reached = client.ge(&cum_weights, &threshold)?;
        let next_idx = client.argmax(&reached, 0, false)?.reshape(&[1])?;

        let next_centroid = client.index_select(data, 0, &next_idx)?;
        centroids = client.cat(&[&centroids, &next_centroid], 0)?;
    }

    Ok(centroids)
}

/// One Lloyd iteration: assign points, then move centroids to the mean of
/// their members. Empty clusters keep their previous centroid.
/// Returns (new_centroids, labels, inertia).
fn lloyd_step<R, C>(
    client: &C,
    data: &Tensor<R>,
    centroids: &Tensor<R>,
) -> Result<(Tensor<R>, Tensor<R>, Tensor<R>)>
where
    R: Runtime,
    C: KMeansClient<R>,
{
    let n = data.shape()[0];
    let k = centroids.shape()[0];
    let d = data.shape()[1];
    let dtype = data.dtype();
    let device = data.device();

    let dists = client.cdist(data, centroids, DistanceMetric::SquaredEuclidean)?; // [n, k]
    let labels = client.argmin(&dists, 1, false)?; // [n] I64
    let min_dists = client.min(&dists, &[1], false)?;
    let inertia = client.sum(&min_dists, &[0], false)?;

    let labels_expanded = labels.unsqueeze(1)?.broadcast_to(&[n, d])?;
    let dst = Tensor::<R>::zeros(&[k, d], dtype, device);
    let sums = client.scatter_reduce(
        &dst,
        0,
        &labels_expanded,
        data,
        numr::ops::ScatterReduceOp::Sum,
        false,
    )?;

    let counts = client.cast(&client.bincount(&labels, None, k)?, dtype)?; // [k]
    let is_empty = client.eq(&counts, &Tensor::<R>::zeros(&[k], dtype, device))?;
    let safe_counts =
        client.where_cond(&is_empty, &Tensor::<R>::ones(&[k], dtype, device), &counts)?;
    let means = client.div(&sums, &safe_counts.unsqueeze(1)?.broadcast_to(&[k, d])?)?;

    let is_empty = is_empty.unsqueeze(1)?.broadcast_to(&[k, d])?;
    let new_centroids = client.where_cond(&is_empty, centroids, &means)?;

    Ok((new_centroids, labels, inertia))
}

/// Run Lloyd iterations from one set of initial centroids.
fn kmeans_single<R, C>(
    client: &C,
    data: &Tensor<R>,
    initial_centroids: &Tensor<R>,
    max_iter: usize,
    tol: f64,
) -> Result<KMeansResult<R>>
where
    R: Runtime,
    C: KMeansClient<R>,
{
    let mut centroids = initial_centroids.clone();
    let mut prev_inertia = f64::INFINITY;
    let mut labels = Tensor::<R>::zeros(&[data.shape()[0]], DType::I64, data.device());
    let mut inertia = Tensor::<R>::zeros(&[], data.dtype(), data.device());
    let mut n_iter = 0;

    for i in 0..max_iter {
        let (new_centroids, new_labels, new_inertia) = lloyd_step(client, data, &centroids)?;
        centroids = new_centroids;
        labels = new_labels;
        inertia = new_inertia;
        n_iter = i + 1;

        let inertia_val: f64 = inertia.item()?;
        if (prev_inertia - inertia_val).abs() < tol {
            break;
        }
        prev_inertia = inertia_val;
    }

    Ok(KMeansResult {
        centroids,
        labels,
        inertia,
        n_iter,
    })
}

/// Generic K-Means implementation. Keeps the restart with the lowest inertia;
/// restart `r` is seeded with `derive_seed(seed, r)`.
pub fn kmeans_impl<R, C>(
    client: &C,
    data: &Tensor<R>,
    options: &KMeansOptions<R>,
) -> MixtureResult<KMeansResult<R>>
where
    R: Runtime,
    C: KMeansClient<R>,
{
    validate_mixture_dtype(data.dtype(), "kmeans")?;
    validate_data_2d(data.shape(), "kmeans")?;
    validate_n_components(options.n_clusters, data.shape()[0], "kmeans")?;
    if options.n_init == 0 {
        return Err(MixtureError::invalid_parameter("n_init", "kmeans requires n_init >= 1"));
    }

    let n = data.shape()[0];
    let d = data.shape()[1];
    let k = options.n_clusters;

    let n_init = match &options.init {
        KMeansInit::Points(_) => 1,
        _ => options.n_init,
    };

    let mut best: Option<(f64, KMeansResult<R>)> = None;

    for restart in 0..n_init {
        let seed = options.seed.map(|s| derive_seed(s, restart as u64));
        let initial_centroids = match &options.init {
            KMeansInit::KMeansPlusPlus => kmeans_plusplus_init(client, data, k, seed)?,
            KMeansInit::Random => {
                let indices = sample_without_replacement(client, n, k, seed)?;
                client.index_select(data, 0, &indices)?
            }
            KMeansInit::Points(pts) => {
                if pts.shape() != [k, d] {
                    return Err(MixtureError::InvalidInput {
                        context: format!(
                            "kmeans: initial points shape {:?} doesn't match [{k}, {d}]",
                            pts.shape()
                        ),
                    });
                }
                pts.clone()
            }
        };

        let result = kmeans_single(
            client,
            data,
            &initial_centroids,
            options.max_iter,
            options.tol,
        )?;
        let inertia: f64 = result.inertia.item()?;
        if best.as_ref().is_none_or(|(best_inertia, _)| inertia < *best_inertia) {
            best = Some((inertia, result));
        }
    }

    best.map(|(_, result)| result)
        .ok_or_else(|| MixtureError::invalid_parameter("n_init", "kmeans produced no result"))
}

/// Assign each row of `data` to its nearest centroid.
pub fn kmeans_predict_impl<R, C>(
    client: &C,
    centroids: &Tensor<R>,
    data: &Tensor<R>,
) -> MixtureResult<Tensor<R>>
where
    R: Runtime,
    C: KMeansClient<R>,
{
    validate_mixture_dtype(data.dtype(), "kmeans_predict")?;
    validate_data_2d(data.shape(), "kmeans_predict")?;
    if centroids.shape().len() != 2 || centroids.shape()[1] != data.shape()[1] {
        return Err(MixtureError::InvalidInput {
            context: format!(
                "kmeans_predict: centroids {:?} incompatible with data {:?}",
                centroids.shape(),
                data.shape()
            ),
        });
    }

    let dists = client.cdist(data, centroids, DistanceMetric::SquaredEuclidean)?;
    Ok(client.argmin(&dists, 1, false)?)
}
