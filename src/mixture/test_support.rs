//! Synthetic labeled data sets for mixture tests.

use crate::mixture::error::{MixtureError, MixtureResult};
use numr::runtime::cpu::{CpuClient, CpuDevice, CpuRuntime};
use numr::tensor::Tensor;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, StandardNormal};

pub(crate) fn setup() -> (CpuClient, CpuDevice) {
    let device = CpuDevice::new();
    let client = CpuClient::new(device.clone());
    (client, device)
}

/// Row-major samples with their generating cluster.
pub(crate) struct LabeledData {
    pub values: Vec<f64>,
    pub labels: Vec<i64>,
    pub n_features: usize,
}

impl LabeledData {
    fn new(n_features: usize) -> Self {
        Self {
            values: Vec::new(),
            labels: Vec::new(),
            n_features,
        }
    }

    pub fn n_samples(&self) -> usize {
        self.labels.len()
    }

    pub fn data(&self, device: &CpuDevice) -> Tensor<CpuRuntime> {
        Tensor::<CpuRuntime>::from_slice(&self.values, &[self.n_samples(), self.n_features], device)
    }

    pub fn labels(&self, device: &CpuDevice) -> Tensor<CpuRuntime> {
        Tensor::<CpuRuntime>::from_slice(&self.labels, &[self.n_samples()], device)
    }

    /// `n` draws from N(mean, std^2 I).
    fn push_isotropic(
        &mut self,
        rng: &mut ChaCha8Rng,
        n: usize,
        mean: &[f64],
        std: f64,
        label: i64,
    ) {
        for _ in 0..n {
            for &m in mean {
                let z: f64 = StandardNormal.sample(rng);
                self.values.push(m + std * z);
            }
            self.labels.push(label);
        }
    }

    /// `n` draws from a 2-D normal with covariance `[[a, b], [b, c]]`.
    fn push_correlated(
        &mut self,
        rng: &mut ChaCha8Rng,
        n: usize,
        mean: [f64; 2],
        cov: [[f64; 2]; 2],
        label: i64,
    ) {
        let l11 = cov[0][0].sqrt();
        let l21 = cov[1][0] / l11;
        let l22 = (cov[1][1] - l21 * l21).sqrt();
        for _ in 0..n {
            let z1: f64 = StandardNormal.sample(rng);
            let z2: f64 = StandardNormal.sample(rng);
            self.values.push(mean[0] + l11 * z1);
            self.values.push(mean[1] + l21 * z1 + l22 * z2);
            self.labels.push(label);
        }
    }
}

/// 100 points around +2 and 100 around -2 in three dimensions, std 0.5.
pub(crate) fn two_blobs(seed: u64) -> LabeledData {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut out = LabeledData::new(3);
    out.push_isotropic(&mut rng, 100, &[2.0, 2.0, 2.0], 0.5, 0);
    out.push_isotropic(&mut rng, 100, &[-2.0, -2.0, -2.0], 0.5, 1);
    out
}

/// Five unit-variance clusters 5 apart along the first axis, 100 points each.
pub(crate) fn five_blobs(seed: u64) -> LabeledData {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut out = LabeledData::new(2);
    for label in 0..5 {
        out.push_isotropic(&mut rng, 100, &[5.0 * label as f64, 0.0], 1.0, label);
    }
    out
}

/// Two 100-point clusters at (-10, 0) and (10, 0) with the given covariances.
pub(crate) fn two_shaped_blobs(
    seed: u64,
    first: [[f64; 2]; 2],
    second: [[f64; 2]; 2],
) -> LabeledData {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut out = LabeledData::new(2);
    out.push_correlated(&mut rng, 100, [-10.0, 0.0], first, 0);
    out.push_correlated(&mut rng, 100, [10.0, 0.0], second, 1);
    out
}

/// The error of a result expected to fail.
pub(crate) fn expect_err<T>(result: MixtureResult<T>) -> MixtureError {
    match result {
        Ok(_) => panic!("expected an error"),
        Err(err) => err,
    }
}
