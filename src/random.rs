//! Seeded randomness for the fill search. Every random decision in a fill attempt flows through a
//! `UniformSource`, so replaying an attempt with the same seed replays the same search.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde_derive::{Deserialize, Serialize};

const LCG_MULTIPLIER: u64 = 1_664_525;
const LCG_INCREMENT: u64 = 1_013_904_223;
const LCG_MODULUS: u64 = 1 << 32;

/// Anything that can produce uniform draws from `[0, 1)`. The samplers below only depend on this,
/// not on a particular generator.
pub trait UniformSource {
    fn next_uniform(&mut self) -> f64;
}

/// A 32-bit linear congruential generator. It's a poor generator by modern standards, but its
/// sequence for a given seed is trivially reproducible anywhere, which is what we want for
/// replaying fills.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lcg {
    state: u64,
}

impl Lcg {
    #[must_use]
    pub fn new(seed: u64) -> Lcg {
        Lcg {
            state: seed % LCG_MODULUS,
        }
    }
}

impl UniformSource for Lcg {
    fn next_uniform(&mut self) -> f64 {
        self.state = (self.state * LCG_MULTIPLIER + LCG_INCREMENT) % LCG_MODULUS;
        self.state as f64 / LCG_MODULUS as f64
    }
}

impl UniformSource for SmallRng {
    fn next_uniform(&mut self) -> f64 {
        self.gen::<f64>()
    }
}

/// Which generator a fill attempt should draw from. Both are seeded with the attempt's retry
/// index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum RngStrategy {
    #[default]
    Lcg,
    SmallRng,
}

impl RngStrategy {
    /// Build a seeded `SmallRng`; only meaningful for `RngStrategy::SmallRng`, but harmless to call
    /// otherwise.
    #[must_use]
    pub fn small_rng(seed: u64) -> SmallRng {
        SmallRng::seed_from_u64(seed)
    }
}

impl FromStr for RngStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "lcg" => Ok(RngStrategy::Lcg),
            "small" | "small_rng" | "smallrng" => Ok(RngStrategy::SmallRng),
            other => Err(format!("unknown rng strategy: {other}")),
        }
    }
}

impl fmt::Display for RngStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RngStrategy::Lcg => write!(f, "lcg"),
            RngStrategy::SmallRng => write!(f, "small_rng"),
        }
    }
}

/// Pick an index with probability proportional to its weight, using cumulative-weight sampling:
/// scale one uniform draw by the total weight, then subtract weights in order until the remainder
/// reaches zero. Indices with a weight of zero (or less) are never picked. Returns `None` if no
/// weight is positive.
pub fn weighted_index<R: UniformSource + ?Sized>(weights: &[f64], rng: &mut R) -> Option<usize> {
    let last_positive = weights.iter().rposition(|&weight| weight > 0.0)?;

    let total: f64 = weights.iter().filter(|&&weight| weight > 0.0).sum();
    let mut remainder = rng.next_uniform() * total;

    for (idx, &weight) in weights.iter().enumerate() {
        if weight <= 0.0 {
            continue;
        }
        remainder -= weight;
        if remainder <= 0.0 {
            return Some(idx);
        }
    }

    // Floating-point rounding can leave a sliver of positive remainder.
    Some(last_positive)
}

/// Pick one of `items` at (weighted) random, where `weight` receives each item's rank (its index
/// in `items`) along with the item itself.
pub fn choose_weighted<'a, T, R, W>(items: &'a [T], weight: W, rng: &mut R) -> Option<&'a T>
where
    R: UniformSource + ?Sized,
    W: Fn(usize, &T) -> f64,
{
    let weights: Vec<f64> = items
        .iter()
        .enumerate()
        .map(|(rank, item)| weight(rank, item))
        .collect();

    weighted_index(&weights, rng).map(|idx| &items[idx])
}
