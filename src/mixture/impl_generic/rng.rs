//! Seed derivation and seeded uniform draws.
//!
//! Every random draw made while fitting is a pure function of its seed, so a
//! fit never depends on which thread runs it or what runs beside it.

use numr::dtype::DType;
use numr::error::Result;
use numr::ops::{AdvancedRandomOps, RandomOps, SortingOps};
use numr::runtime::Runtime;
use numr::tensor::Tensor;

/// Derive an independent child seed for `stream` (SplitMix64 finalizer).
pub fn derive_seed(base: u64, stream: u64) -> u64 {
    let mut z = base.wrapping_add(stream.wrapping_add(1).wrapping_mul(0x9E37_79B9_7F4A_7C15));
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Child seed of an optional parent; unseeded stays unseeded.
pub(crate) fn child_seed(seed: Option<u64>, stream: u64) -> Option<u64> {
    seed.map(|s| derive_seed(s, stream))
}

/// Uniform [0, 1) F64 samples. Seeded draws use Philox; unseeded draws fall
/// back to the backend's default generator.
pub(crate) fn uniform<R, C>(client: &C, shape: &[usize], seed: Option<u64>) -> Result<Tensor<R>>
where
    R: Runtime,
    C: RandomOps<R> + AdvancedRandomOps<R>,
{
    match seed {
        Some(s) => client.philox_uniform(shape, s, 0, DType::F64),
        None => client.rand(shape, DType::F64),
    }
}

/// A single uniform [0, 1) value.
pub(crate) fn uniform_scalar<R, C>(client: &C, seed: Option<u64>) -> Result<f64>
where
    R: Runtime,
    C: RandomOps<R> + AdvancedRandomOps<R>,
{
    uniform(client, &[1], seed)?.item()
}

/// First `k` entries of a random permutation of `0..n` (I64 indices).
pub(crate) fn sample_without_replacement<R, C>(
    client: &C,
    n: usize,
    k: usize,
    seed: Option<u64>,
) -> Result<Tensor<R>>
where
    R: Runtime,
    C: RandomOps<R> + AdvancedRandomOps<R> + SortingOps<R>,
{
    let perm = match seed {
        Some(_) => client.argsort(&uniform(client, &[n], seed)?, 0, false)?,
        None => client.randperm(n)?,
    };
    perm.narrow(0, 0, k)
}
