//! Asset return statistics
//!
//! [`AssetStatistics`] is the read-only input shared by the allocation
//! optimizer and the portfolio simulator: a mean excess-return vector and the
//! covariance matrix of those returns. [`ReturnSeries`] derives per-period
//! returns from a raw price table so statistics can be computed from price
//! histories instead of being supplied directly.

use crate::linalg::jacobi_eigenvalues;
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Tolerance for the symmetry check on covariance matrices.
const SYMMETRY_TOLERANCE: f64 = 1e-8;

/// Eigenvalues above this (negative) floor are treated as non-negative.
const PSD_TOLERANCE: f64 = -1e-10;

/// Errors produced while constructing or validating statistical inputs.
#[derive(Debug, Error)]
pub enum StatsError {
    /// Insufficient data for estimation
    #[error("Insufficient data: need at least {required} observations, got {actual}")]
    InsufficientData {
        /// Required number of observations
        required: usize,
        /// Actual number of observations
        actual: usize,
    },

    /// Dimension mismatch between related inputs
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimension
        expected: usize,
        /// Actual dimension
        actual: usize,
    },

    /// Matrix is not square or not symmetric
    #[error("Covariance matrix must be square and symmetric")]
    NotSymmetric,

    /// Input contains NaN or infinite values
    #[error("Input contains non-finite values")]
    NonFinite,

    /// Matrix has a negative eigenvalue
    #[error("Matrix is not positive semi-definite (eigenvalue {eigenvalue:.6e})")]
    NotPositiveSemiDefinite {
        /// The offending eigenvalue
        eigenvalue: f64,
    },

    /// A covariance row/column is entirely zero, e.g. a risk-free asset
    /// under excess-return accounting. The allocation solver cannot handle
    /// this, so it is rejected at construction.
    #[error("Asset {index} has zero variance and covariance; remove it or perturb the matrix")]
    ZeroVarianceAsset {
        /// Index of the degenerate asset
        index: usize,
    },

    /// Linear system could not be solved
    #[error("Matrix is singular; cannot solve")]
    SingularMatrix,

    /// Allocation weights do not sum to 1
    #[error("Allocation weights sum to {total:.8}, expected 1")]
    WeightSumMismatch {
        /// Actual sum of the weights
        total: f64,
    },

    /// Negative weight in a long-only allocation
    #[error("Allocation weight {weight:.8} at index {index} is negative")]
    NegativeWeight {
        /// Index of the offending weight
        index: usize,
        /// The offending weight
        weight: f64,
    },

    /// Price table contains a non-positive price
    #[error("Price at period {period}, asset {asset} is not positive")]
    NonPositivePrice {
        /// Row in the price table
        period: usize,
        /// Column in the price table
        asset: usize,
    },
}

/// Mean excess returns and covariance matrix for a set of assets.
///
/// Both the optimizer and the simulator treat this as read-only. The
/// covariance matrix is validated to be square, symmetric, finite, positive
/// semi-definite, and free of fully-zero rows (a zero-variance asset breaks
/// the allocation solve).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AssetStatistics {
    mean_returns: Array1<f64>,
    covariance: Array2<f64>,
}

impl AssetStatistics {
    /// Build asset statistics from a mean vector and covariance matrix.
    pub fn new(mean_returns: Array1<f64>, covariance: Array2<f64>) -> Result<Self, StatsError> {
        let n = mean_returns.len();
        if n == 0 {
            return Err(StatsError::InsufficientData {
                required: 1,
                actual: 0,
            });
        }
        if covariance.nrows() != covariance.ncols() {
            return Err(StatsError::NotSymmetric);
        }
        if covariance.nrows() != n {
            return Err(StatsError::DimensionMismatch {
                expected: n,
                actual: covariance.nrows(),
            });
        }
        if mean_returns.iter().any(|v| !v.is_finite())
            || covariance.iter().any(|v| !v.is_finite())
        {
            return Err(StatsError::NonFinite);
        }
        for i in 0..n {
            for j in (i + 1)..n {
                if (covariance[[i, j]] - covariance[[j, i]]).abs() > SYMMETRY_TOLERANCE {
                    return Err(StatsError::NotSymmetric);
                }
            }
        }

        // A fully-zero row means a zero-variance asset: the bordered Kelly
        // system is singular and the return sampler degenerates.
        for i in 0..n {
            if covariance.row(i).iter().all(|v| *v == 0.0) {
                return Err(StatsError::ZeroVarianceAsset { index: i });
            }
        }

        let eigenvalues = jacobi_eigenvalues(&covariance, 100, 1e-12)?;
        if let Some(&min_eig) = eigenvalues
            .iter()
            .filter(|v| **v < PSD_TOLERANCE)
            .min_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
        {
            return Err(StatsError::NotPositiveSemiDefinite {
                eigenvalue: min_eig,
            });
        }

        Ok(Self {
            mean_returns,
            covariance,
        })
    }

    /// Compute statistics from a return series (rows = periods, cols = assets).
    ///
    /// Means are arithmetic averages; the covariance uses the unbiased
    /// (n−1) normalization.
    pub fn from_returns(returns: &ReturnSeries) -> Result<Self, StatsError> {
        let data = returns.as_array();
        let (t, _n) = data.dim();
        if t < 2 {
            return Err(StatsError::InsufficientData {
                required: 2,
                actual: t,
            });
        }

        let means = data
            .mean_axis(Axis(0))
            .ok_or(StatsError::InsufficientData {
                required: 2,
                actual: 0,
            })?;
        let centered = data - &means.clone().insert_axis(Axis(0));
        let covariance = centered.t().dot(&centered) / (t - 1) as f64;

        Self::new(means, covariance)
    }

    /// Number of assets.
    pub fn n_assets(&self) -> usize {
        self.mean_returns.len()
    }

    /// Mean excess-return vector.
    pub const fn mean_returns(&self) -> &Array1<f64> {
        &self.mean_returns
    }

    /// Covariance matrix of excess returns.
    pub const fn covariance(&self) -> &Array2<f64> {
        &self.covariance
    }
}

/// Per-period arithmetic returns derived from a price table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReturnSeries {
    returns: Array2<f64>,
}

impl ReturnSeries {
    /// Wrap an existing return matrix (rows = periods, cols = assets).
    pub fn new(returns: Array2<f64>) -> Result<Self, StatsError> {
        if returns.iter().any(|v| !v.is_finite()) {
            return Err(StatsError::NonFinite);
        }
        Ok(Self { returns })
    }

    /// Derive returns from a price table: `r[t] = p[t] / p[t-1] - 1`.
    ///
    /// The table has one row per period and one column per asset; at least
    /// two periods are required. Prices must be strictly positive.
    pub fn from_prices(prices: &Array2<f64>) -> Result<Self, StatsError> {
        let (t, n) = prices.dim();
        if t < 2 {
            return Err(StatsError::InsufficientData {
                required: 2,
                actual: t,
            });
        }
        for period in 0..t {
            for asset in 0..n {
                let p = prices[[period, asset]];
                if !p.is_finite() || p <= 0.0 {
                    return Err(StatsError::NonPositivePrice { period, asset });
                }
            }
        }

        let mut returns = Array2::<f64>::zeros((t - 1, n));
        for period in 1..t {
            for asset in 0..n {
                returns[[period - 1, asset]] =
                    prices[[period, asset]] / prices[[period - 1, asset]] - 1.0;
            }
        }

        Ok(Self { returns })
    }

    /// Number of return periods.
    pub fn n_periods(&self) -> usize {
        self.returns.nrows()
    }

    /// Number of assets.
    pub fn n_assets(&self) -> usize {
        self.returns.ncols()
    }

    /// The underlying return matrix.
    pub const fn as_array(&self) -> &Array2<f64> {
        &self.returns
    }
}
