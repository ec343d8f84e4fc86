//! Allocations and portfolio sets
//!
//! An [`Allocation`] is a vector of portfolio weights summing to one.
//! A [`PortfolioSet`] groups the Kelly-derived allocation with alternative
//! candidates, either supplied by the caller or generated as random
//! perturbations of the Kelly weights, so the simulator can compare their
//! outcome distributions side by side.

use crate::statistics::StatsError;
use ndarray::Array1;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Tolerance on the weight sum at construction.
pub const ALLOCATION_SUM_TOLERANCE: f64 = 1e-6;

/// Tolerance below zero still accepted for long-only weights.
pub const LONG_ONLY_TOLERANCE: f64 = 1e-9;

/// Portfolio weight vector, validated to sum to 1.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Allocation {
    weights: Array1<f64>,
}

impl Allocation {
    /// Build an allocation, checking that weights are finite and sum to 1.
    pub fn new(weights: Array1<f64>) -> Result<Self, StatsError> {
        if weights.is_empty() {
            return Err(StatsError::InsufficientData {
                required: 1,
                actual: 0,
            });
        }
        if weights.iter().any(|w| !w.is_finite()) {
            return Err(StatsError::NonFinite);
        }
        let total: f64 = weights.sum();
        if (total - 1.0).abs() > ALLOCATION_SUM_TOLERANCE {
            return Err(StatsError::WeightSumMismatch { total });
        }
        Ok(Self { weights })
    }

    /// Build a long-only allocation: weights sum to 1 and none is negative
    /// (beyond floating-point tolerance).
    pub fn long_only(weights: Array1<f64>) -> Result<Self, StatsError> {
        for (index, &weight) in weights.iter().enumerate() {
            if weight < -LONG_ONLY_TOLERANCE {
                return Err(StatsError::NegativeWeight { index, weight });
            }
        }
        Self::new(weights)
    }

    /// Equal weights across `n` assets.
    pub fn uniform(n: usize) -> Result<Self, StatsError> {
        if n == 0 {
            return Err(StatsError::InsufficientData {
                required: 1,
                actual: 0,
            });
        }
        Ok(Self {
            weights: Array1::from_elem(n, 1.0 / n as f64),
        })
    }

    /// The weight vector.
    pub const fn weights(&self) -> &Array1<f64> {
        &self.weights
    }

    /// Number of assets.
    pub fn n_assets(&self) -> usize {
        self.weights.len()
    }

    /// Whether every weight is non-negative (within tolerance).
    pub fn is_long_only(&self) -> bool {
        self.weights.iter().all(|w| *w >= -LONG_ONLY_TOLERANCE)
    }
}

/// One named member of a [`PortfolioSet`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PortfolioEntry {
    /// Identifier used to key simulation output.
    pub name: String,
    /// The entry's allocation.
    pub allocation: Allocation,
}

/// The Kelly-derived allocation plus zero or more alternatives.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PortfolioSet {
    entries: Vec<PortfolioEntry>,
}

impl PortfolioSet {
    /// Name given to the Kelly-derived member.
    pub const KELLY_NAME: &'static str = "kelly";

    /// Members shown by the report layer; extra members still simulate.
    pub const DISPLAY_CAP: usize = 6;

    /// Default number of machine-generated variants.
    pub const DEFAULT_VARIANTS: usize = 11;

    /// A set containing only the Kelly allocation.
    pub fn kelly_only(kelly: Allocation) -> Self {
        Self {
            entries: vec![PortfolioEntry {
                name: Self::KELLY_NAME.to_string(),
                allocation: kelly,
            }],
        }
    }

    /// Kelly allocation plus caller-supplied alternatives, named
    /// `variant-1`, `variant-2`, ...
    pub fn with_variants(kelly: Allocation, variants: Vec<Allocation>) -> Self {
        let mut entries = vec![PortfolioEntry {
            name: Self::KELLY_NAME.to_string(),
            allocation: kelly,
        }];
        for (i, allocation) in variants.into_iter().enumerate() {
            entries.push(PortfolioEntry {
                name: format!("variant-{}", i + 1),
                allocation,
            });
        }
        Self { entries }
    }

    /// Kelly allocation plus `count` random perturbations of it.
    ///
    /// Each variant moves a uniform(0,1) amount of weight between two
    /// randomly chosen assets, conserving the total. In long-only mode the
    /// donor is clamped at zero and the shortfall is transferred instead, so
    /// variants stay on the non-negative simplex.
    pub fn with_generated_variants<R: Rng + ?Sized>(
        kelly: Allocation,
        long_only: bool,
        count: usize,
        rng: &mut R,
    ) -> Result<Self, StatsError> {
        let n = kelly.n_assets();
        let mut variants = Vec::with_capacity(count);

        for _ in 0..count {
            let mut weights = kelly.weights().clone();

            if n >= 2 {
                let a = rng.gen_range(0..n);
                let mut b = rng.gen_range(0..n - 1);
                if b >= a {
                    b += 1;
                }
                let shift = rng.gen_range(0.0..1.0);

                if long_only {
                    // Take from the larger of the pair; clamp at zero.
                    let (donor, recipient) = if weights[b] <= weights[a] {
                        (a, b)
                    } else {
                        (b, a)
                    };
                    if weights[donor] - shift < 0.0 {
                        weights[recipient] += weights[donor];
                        weights[donor] = 0.0;
                    } else {
                        weights[donor] -= shift;
                        weights[recipient] += shift;
                    }
                } else {
                    weights[a] += shift;
                    weights[b] -= shift;
                }
            }

            variants.push(if long_only {
                Allocation::long_only(weights)?
            } else {
                Allocation::new(weights)?
            });
        }

        Ok(Self::with_variants(kelly, variants))
    }

    /// Iterate over the members, Kelly first.
    pub fn iter(&self) -> impl Iterator<Item = &PortfolioEntry> {
        self.entries.iter()
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the set has no members.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The Kelly-derived member.
    pub fn kelly(&self) -> &PortfolioEntry {
        &self.entries[0]
    }
}
