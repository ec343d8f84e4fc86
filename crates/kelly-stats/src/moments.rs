//! Streaming moment accumulation and empirical quantiles
//!
//! The simulator folds 10,000 per-trial growth rates into summary statistics
//! without retaining them all; [`MomentAccumulator`] keeps running central
//! moments up to order four using single-pass updates that stay stable over
//! large trial counts. Accumulators can be merged, so partial results from
//! parallel workers combine into the same totals as a sequential pass.

use serde::{Deserialize, Serialize};

/// Single-pass accumulator for mean, variance, skewness, and kurtosis.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct MomentAccumulator {
    count: u64,
    mean: f64,
    m2: f64,
    m3: f64,
    m4: f64,
}

impl MomentAccumulator {
    /// Empty accumulator.
    pub const fn new() -> Self {
        Self {
            count: 0,
            mean: 0.0,
            m2: 0.0,
            m3: 0.0,
            m4: 0.0,
        }
    }

    /// Fold one observation into the running moments.
    pub fn push(&mut self, x: f64) {
        let n1 = self.count as f64;
        self.count += 1;
        let n = self.count as f64;

        let delta = x - self.mean;
        let delta_n = delta / n;
        let delta_n2 = delta_n * delta_n;
        let term1 = delta * delta_n * n1;

        self.mean += delta_n;
        self.m4 += term1 * delta_n2 * (n * n - 3.0 * n + 3.0) + 6.0 * delta_n2 * self.m2
            - 4.0 * delta_n * self.m3;
        self.m3 += term1 * delta_n * (n - 2.0) - 3.0 * delta_n * self.m2;
        self.m2 += term1;
    }

    /// Combine two accumulators as if their observations had been pushed
    /// into one.
    pub fn merge(&self, other: &Self) -> Self {
        if self.count == 0 {
            return *other;
        }
        if other.count == 0 {
            return *self;
        }

        let na = self.count as f64;
        let nb = other.count as f64;
        let n = na + nb;
        let delta = other.mean - self.mean;
        let delta2 = delta * delta;
        let delta3 = delta2 * delta;
        let delta4 = delta3 * delta;

        let mean = self.mean + delta * nb / n;
        let m2 = self.m2 + other.m2 + delta2 * na * nb / n;
        let m3 = self.m3
            + other.m3
            + delta3 * na * nb * (na - nb) / (n * n)
            + 3.0 * delta * (na * other.m2 - nb * self.m2) / n;
        let m4 = self.m4
            + other.m4
            + delta4 * na * nb * (na * na - na * nb + nb * nb) / (n * n * n)
            + 6.0 * delta2 * (na * na * other.m2 + nb * nb * self.m2) / (n * n)
            + 4.0 * delta * (na * other.m3 - nb * self.m3) / n;

        Self {
            count: self.count + other.count,
            mean,
            m2,
            m3,
            m4,
        }
    }

    /// Number of observations accumulated.
    pub const fn count(&self) -> u64 {
        self.count
    }

    /// Arithmetic mean.
    pub const fn mean(&self) -> f64 {
        self.mean
    }

    /// Unbiased sample variance (n−1 denominator).
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    /// Sample standard deviation.
    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    /// Biased sample skewness, `sqrt(n)·m3 / m2^1.5`.
    pub fn skewness(&self) -> f64 {
        if self.count < 2 || self.m2 <= 0.0 {
            return 0.0;
        }
        let n = self.count as f64;
        n.sqrt() * self.m3 / self.m2.powf(1.5)
    }

    /// Biased excess kurtosis, `n·m4 / m2² − 3`.
    pub fn excess_kurtosis(&self) -> f64 {
        if self.count < 2 || self.m2 <= 0.0 {
            return 0.0;
        }
        let n = self.count as f64;
        n * self.m4 / (self.m2 * self.m2) - 3.0
    }
}

/// Empirical percentile of an ascending-sorted slice with linear
/// interpolation between ranks (same convention as `numpy.percentile`).
///
/// `q` is in percent: `percentile(values, 50.0)` is the median.
///
/// # Panics
/// Panics if `sorted` is empty.
pub fn percentile(sorted: &[f64], q: f64) -> f64 {
    assert!(!sorted.is_empty(), "percentile of empty slice");
    let q = q.clamp(0.0, 100.0);
    let rank = q / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        sorted[lo]
    } else {
        let frac = rank - lo as f64;
        sorted[lo] + (sorted[hi] - sorted[lo]) * frac
    }
}

/// Mean of the values at or below `threshold` (the CVaR of a value
/// distribution given its VaR threshold). Returns the threshold itself when
/// nothing falls at or below it.
pub fn lower_tail_mean(values: &[f64], threshold: f64) -> f64 {
    let mut sum = 0.0;
    let mut count = 0u64;
    for &v in values {
        if v <= threshold {
            sum += v;
            count += 1;
        }
    }
    if count == 0 {
        threshold
    } else {
        sum / count as f64
    }
}
