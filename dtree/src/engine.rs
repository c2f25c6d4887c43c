//! The pseudo-random stream behind every draw, along with the handful of distributions the tree
//! needs: uniform, categorical, normal, gamma and Dirichlet.

use crate::probs::SliceExt;
use tinyrand::{Rand, Seeded, SplitMix, Wyrand};

pub type Engine = Wyrand;

/// Number of draws discarded from a freshly seeded engine.
pub const WARM_UP: usize = 1_000;

const SEED_SEQUENCE_INIT: u64 = 0x853c_49e6_748f_ea9b;

/// Seeds an engine from an arbitrary-length seed, folding each 8-byte word (and finally the seed
/// length) through SplitMix, then warms the engine up.
pub fn seeded(seed: impl AsRef<[u8]>) -> Engine {
    let seed = seed.as_ref();
    let mut state = SEED_SEQUENCE_INIT;
    for chunk in seed.chunks(8) {
        let mut word = [0u8; 8];
        word[..chunk.len()].copy_from_slice(chunk);
        state = SplitMix::seed(state ^ u64::from_le_bytes(word)).next_u64();
    }
    state = SplitMix::seed(state ^ seed.len() as u64).next_u64();
    from_u64(state)
}

/// Seeds an engine directly from a 64-bit value, then warms it up.
pub fn from_u64(seed: u64) -> Engine {
    let mut engine = Wyrand::seed(seed);
    warm_up(&mut engine);
    engine
}

fn warm_up(rand: &mut impl Rand) {
    for _ in 0..WARM_UP {
        rand.next_u64();
    }
}

/// A uniform draw from the open interval (0, 1).
#[inline]
pub fn random_f64(rand: &mut impl Rand) -> f64 {
    const SCALE: f64 = 1.0 / (1u64 << 53) as f64;
    ((rand.next_u64() >> 11) as f64 + 0.5) * SCALE
}

/// A uniform index in `0..n`.
#[inline]
pub fn random_index(n: usize, rand: &mut impl Rand) -> usize {
    debug_assert!(n > 0);
    rand.next_lim_u64(n as u64) as usize
}

/// Draws an index with probability proportional to its (non-negative) weight.
pub fn categorical(weights: &[f64], rand: &mut impl Rand) -> usize {
    debug_assert!(weights.iter().all(|&weight| weight >= 0.0), "invalid weights {weights:?}");
    let target = random_f64(rand) * weights.sum();
    let mut cumulative = 0.0;
    let mut last_nonzero = 0;
    for (index, &weight) in weights.iter().enumerate() {
        if weight > 0.0 {
            cumulative += weight;
            last_nonzero = index;
            if cumulative > target {
                return index;
            }
        }
    }
    // rounding may leave the target just above the accumulated sum
    last_nonzero
}

/// A standard normal variate, using the Marsaglia polar method.
pub fn standard_normal(rand: &mut impl Rand) -> f64 {
    loop {
        let u = 2.0 * random_f64(rand) - 1.0;
        let v = 2.0 * random_f64(rand) - 1.0;
        let s = u * u + v * v;
        if s > 0.0 && s < 1.0 {
            return u * (-2.0 * s.ln() / s).sqrt();
        }
    }
}

/// A Gamma(`shape`, 1) variate (Marsaglia and Tsang).
pub fn gamma(shape: f64, rand: &mut impl Rand) -> f64 {
    debug_assert!(shape > 0.0, "invalid shape {shape}");
    if shape < 1.0 {
        let boost = random_f64(rand).powf(1.0 / shape);
        return gamma(shape + 1.0, rand) * boost;
    }

    let d = shape - 1.0 / 3.0;
    let c = 1.0 / (9.0 * d).sqrt();
    loop {
        let x = standard_normal(rand);
        let v = 1.0 + c * x;
        if v <= 0.0 {
            continue;
        }
        let v = v * v * v;
        let u = random_f64(rand);
        let x_sq = x * x;
        if u < 1.0 - 0.0331 * x_sq * x_sq || u.ln() < 0.5 * x_sq + d * (1.0 - v + v.ln()) {
            return d * v;
        }
    }
}

/// Draws a probability vector from Dirichlet(`alphas`) into `probs`. Zero concentrations yield
/// zero probabilities.
pub fn dirichlet(alphas: &[f64], probs: &mut [f64], rand: &mut impl Rand) {
    debug_assert_eq!(alphas.len(), probs.len());
    for (prob, &alpha) in probs.iter_mut().zip(alphas) {
        *prob = if alpha > 0.0 { gamma(alpha, rand) } else { 0.0 };
    }
    if probs.sum() > 0.0 {
        probs.normalise(1.0);
    } else {
        // every variate underflowed; place the mass on a single branch drawn from the mean
        let chosen = categorical(alphas, rand);
        probs.fill(0.0);
        probs[chosen] = 1.0;
    }
}
