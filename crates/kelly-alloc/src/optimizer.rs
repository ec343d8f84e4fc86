//! Kelly allocation solver
//!
//! Long-short: the stationarity conditions of the equality-constrained
//! problem form the bordered system
//!
//! ```text
//! [ Σ  1 ] [ w ]   [ μ ]
//! [ 1ᵀ 0 ] [ λ ] = [ 1 ]
//! ```
//!
//! solved by Gaussian elimination with partial pivoting. Long-only adds the
//! bound `w ≥ 0` and runs an active set over the same system: clamp the most
//! negative weight, re-solve on the free assets, and release a clamped asset
//! whenever its reduced gradient `μᵢ − (Σw)ᵢ − λ` turns positive.

use kelly_stats::{Allocation, StatsError, cholesky, lu_solve};
use ndarray::{Array1, Array2};
use thiserror::Error;

/// Tolerance below zero still treated as feasible during the active set.
const WEIGHT_TOLERANCE: f64 = 1e-9;

/// Errors from the allocation solver.
#[derive(Error, Debug)]
pub enum AllocError {
    /// The covariance matrix is singular or not positive-definite, so the
    /// growth objective has no unique maximizer. Zero-variance assets land
    /// here as well.
    #[error("covariance matrix is singular or not positive-definite")]
    SingularCovariance,

    /// The constraint set admits no solution. With a full budget constraint
    /// this only occurs when numerical clamping eliminates every asset.
    #[error("constraints admit no feasible allocation")]
    InfeasibleConstraint,

    /// The active-set iteration failed to settle within its bound.
    #[error("active-set iteration did not converge after {iterations} steps")]
    OptimizationDiverged {
        /// Number of active-set steps taken before giving up.
        iterations: usize,
    },

    /// Malformed input (dimension mismatch, non-finite values, or an
    /// allocation that fails validation).
    #[error(transparent)]
    Invalid(#[from] StatsError),
}

/// Compute the growth-optimal allocation for the given per-period mean
/// excess returns and return covariance.
///
/// With `long_only = false` the weights may be negative (levered shorts);
/// with `long_only = true` every weight is non-negative. When the
/// unconstrained solution already satisfies the bound it is returned
/// unchanged, so the two modes agree wherever both are feasible.
pub fn optimize(
    mean: &Array1<f64>,
    covariance: &Array2<f64>,
    long_only: bool,
) -> Result<Allocation, AllocError> {
    let n = mean.len();
    if n == 0 {
        return Err(StatsError::InsufficientData {
            required: 1,
            actual: 0,
        }
        .into());
    }
    if covariance.nrows() != n || covariance.ncols() != n {
        return Err(StatsError::DimensionMismatch {
            expected: n,
            actual: covariance.nrows(),
        }
        .into());
    }
    if mean.iter().any(|v| !v.is_finite()) || covariance.iter().any(|v| !v.is_finite()) {
        return Err(StatsError::NonFinite.into());
    }

    // The objective is strictly concave only for positive-definite Σ; this
    // also rejects zero-variance assets, which the bordered system alone
    // would happily treat as risk-free leverage.
    if cholesky(covariance).is_err() {
        return Err(AllocError::SingularCovariance);
    }

    let free: Vec<usize> = (0..n).collect();
    let (weights, _) = solve_restricted(mean, covariance, &free)?;
    let unconstrained = Array1::from_vec(weights);

    if !long_only {
        return Ok(Allocation::new(unconstrained)?);
    }
    if unconstrained.iter().all(|w| *w >= -WEIGHT_TOLERANCE) {
        return Ok(Allocation::long_only(unconstrained)?);
    }

    active_set(mean, covariance)
}

/// Expected log growth rate `wᵀμ − ½·wᵀΣw` of an allocation.
pub fn log_growth_rate(mean: &Array1<f64>, covariance: &Array2<f64>, allocation: &Allocation) -> f64 {
    let w = allocation.weights();
    w.dot(mean) - 0.5 * w.dot(&covariance.dot(w))
}

/// Solve the bordered system restricted to the free assets. Returns the
/// free weights (in `free` order) and the budget multiplier λ.
fn solve_restricted(
    mean: &Array1<f64>,
    covariance: &Array2<f64>,
    free: &[usize],
) -> Result<(Vec<f64>, f64), AllocError> {
    let m = free.len();
    let mut system = Array2::<f64>::zeros((m + 1, m + 1));
    let mut rhs = Array1::<f64>::zeros(m + 1);

    for (row, &i) in free.iter().enumerate() {
        for (col, &j) in free.iter().enumerate() {
            system[[row, col]] = covariance[[i, j]];
        }
        system[[row, m]] = 1.0;
        system[[m, row]] = 1.0;
        rhs[row] = mean[i];
    }
    rhs[m] = 1.0;

    let solution = lu_solve(&system, &rhs).map_err(|err| match err {
        StatsError::SingularMatrix => AllocError::SingularCovariance,
        other => AllocError::Invalid(other),
    })?;

    Ok((solution.iter().take(m).copied().collect(), solution[m]))
}

/// Long-only solve by active-set iteration on the bordered system.
fn active_set(mean: &Array1<f64>, covariance: &Array2<f64>) -> Result<Allocation, AllocError> {
    let n = mean.len();
    let max_steps = 3 * n + 10;
    let mut free: Vec<usize> = (0..n).collect();
    let mut clamped: Vec<usize> = Vec::new();

    for _ in 0..max_steps {
        if free.is_empty() {
            return Err(AllocError::InfeasibleConstraint);
        }

        let (free_weights, lambda) = solve_restricted(mean, covariance, &free)?;

        // Pin the most negative weight and re-solve.
        let mut worst: Option<(usize, f64)> = None;
        for (pos, &w) in free_weights.iter().enumerate() {
            if w < -WEIGHT_TOLERANCE && worst.is_none_or(|(_, v)| w < v) {
                worst = Some((pos, w));
            }
        }
        if let Some((pos, _)) = worst {
            clamped.push(free.remove(pos));
            continue;
        }

        // KKT check for the clamped assets: a pinned asset may only stay
        // pinned while increasing its weight would not raise the objective.
        let mut release: Option<(usize, f64)> = None;
        for (pos, &i) in clamped.iter().enumerate() {
            let mut gradient = mean[i] - lambda;
            for (col, &j) in free.iter().enumerate() {
                gradient -= covariance[[i, j]] * free_weights[col];
            }
            if gradient > WEIGHT_TOLERANCE && release.is_none_or(|(_, g)| gradient > g) {
                release = Some((pos, gradient));
            }
        }
        if let Some((pos, _)) = release {
            free.push(clamped.remove(pos));
            continue;
        }

        let mut weights = Array1::<f64>::zeros(n);
        for (col, &i) in free.iter().enumerate() {
            weights[i] = free_weights[col].max(0.0);
        }
        return Ok(Allocation::long_only(weights)?);
    }

    Err(AllocError::OptimizationDiverged {
        iterations: max_steps,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;
    use rstest::rstest;

    #[test]
    fn test_long_short_independent_assets() {
        // Diagonal Σ makes the bordered solution checkable by hand:
        // wᵢ = (μᵢ − λ)/σᵢ² with λ chosen so the weights sum to one.
        let mean = array![0.10, 0.05];
        let cov = array![[0.04, 0.0], [0.0, 0.02]];

        let alloc = optimize(&mean, &cov, false).unwrap();
        assert_relative_eq!(alloc.weights()[0], 7.0 / 6.0, epsilon = 1e-9);
        assert_relative_eq!(alloc.weights()[1], -1.0 / 6.0, epsilon = 1e-9);
        assert_relative_eq!(alloc.weights().sum(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_long_only_clamps_short_leg() {
        let mean = array![0.10, 0.05];
        let cov = array![[0.04, 0.0], [0.0, 0.02]];

        let alloc = optimize(&mean, &cov, true).unwrap();
        assert_relative_eq!(alloc.weights()[0], 1.0, epsilon = 1e-9);
        assert_relative_eq!(alloc.weights()[1], 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_long_only_keeps_interior_solution() {
        // Symmetric instance: the unconstrained optimum is already on the
        // simplex, so both modes must return the identical allocation.
        let mean = array![0.05, 0.05];
        let cov = array![[0.02, 0.0], [0.0, 0.02]];

        let long_short = optimize(&mean, &cov, false).unwrap();
        let long_only = optimize(&mean, &cov, true).unwrap();
        assert_eq!(long_short, long_only);
        assert_relative_eq!(long_only.weights()[0], 0.5, epsilon = 1e-9);
    }

    #[test]
    fn test_long_only_ranks_by_risk_adjusted_return() {
        // With equal variances and no correlation, the free-set solution is
        // w_i = (μ_i − λ) / σ². The full-dimension multiplier leaves the
        // weakest asset negative, so it is pinned at zero; re-solving on the
        // two remaining assets gives λ = 0.0425 and weights 0.875 / 0.125.
        let mean = array![0.06, 0.045, 0.03];
        let cov = array![
            [0.02, 0.0, 0.0],
            [0.0, 0.02, 0.0],
            [0.0, 0.0, 0.02]
        ];

        let alloc = optimize(&mean, &cov, true).unwrap();
        let w = alloc.weights();
        assert_relative_eq!(w[0], 0.875, epsilon = 1e-9);
        assert_relative_eq!(w[1], 0.125, epsilon = 1e-9);
        assert_relative_eq!(w[2], 0.0, epsilon = 1e-9);
        assert!(w[0] > w[1] && w[1] > w[2], "weights {w}");
        assert!(alloc.is_long_only());
        assert_relative_eq!(w.sum(), 1.0, epsilon = 1e-9);
    }

    // Rank-deficient and zero-variance (riskless asset) covariances leave
    // the growth objective without a maximizer and must be rejected.
    #[rstest]
    #[case(array![[0.02, 0.02], [0.02, 0.02]])]
    #[case(array![[0.0, 0.0], [0.0, 0.02]])]
    fn test_degenerate_covariance_rejected(#[case] cov: Array2<f64>) {
        let mean = array![0.03, 0.05];
        assert!(matches!(
            optimize(&mean, &cov, false),
            Err(AllocError::SingularCovariance)
        ));
        assert!(matches!(
            optimize(&mean, &cov, true),
            Err(AllocError::SingularCovariance)
        ));
    }

    #[test]
    fn test_dimension_mismatch() {
        let mean = array![0.05, 0.05];
        let cov = array![[0.02]];
        assert!(matches!(
            optimize(&mean, &cov, false),
            Err(AllocError::Invalid(StatsError::DimensionMismatch { .. }))
        ));
    }

    #[test]
    fn test_single_asset_gets_full_budget() {
        let mean = array![0.07];
        let cov = array![[0.05]];
        let alloc = optimize(&mean, &cov, true).unwrap();
        assert_relative_eq!(alloc.weights()[0], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_correlated_long_only_satisfies_kkt() {
        let mean = array![0.09, 0.02, 0.04];
        let cov = array![
            [0.040, 0.012, 0.006],
            [0.012, 0.030, 0.009],
            [0.006, 0.009, 0.020]
        ];

        let alloc = optimize(&mean, &cov, true).unwrap();
        let w = alloc.weights();
        assert!(alloc.is_long_only());
        assert_relative_eq!(w.sum(), 1.0, epsilon = 1e-9);

        // No single-coordinate budget-preserving transfer may improve the
        // objective away from the reported optimum.
        let base = log_growth_rate(&mean, &cov, &alloc);
        for i in 0..3 {
            for j in 0..3 {
                if i == j || w[i] < 1e-6 {
                    continue;
                }
                let step = 1e-4_f64.min(w[i]);
                let mut shifted = w.clone();
                shifted[i] -= step;
                shifted[j] += step;
                let candidate = Allocation::long_only(shifted).unwrap();
                let moved = log_growth_rate(&mean, &cov, &candidate);
                assert!(moved <= base + 1e-10, "transfer {i}->{j} improved growth");
            }
        }
    }

    #[test]
    fn test_optimize_is_deterministic() {
        let mean = array![0.09, 0.02, 0.04];
        let cov = array![
            [0.040, 0.012, 0.006],
            [0.012, 0.030, 0.009],
            [0.006, 0.009, 0.020]
        ];
        let first = optimize(&mean, &cov, true).unwrap();
        let second = optimize(&mean, &cov, true).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_growth_rate_value() {
        let mean = array![0.10, 0.05];
        let cov = array![[0.04, 0.0], [0.0, 0.02]];
        let alloc = Allocation::new(array![0.5, 0.5]).unwrap();
        // 0.5·0.10 + 0.5·0.05 − ½(0.25·0.04 + 0.25·0.02)
        assert_relative_eq!(
            log_growth_rate(&mean, &cov, &alloc),
            0.075 - 0.0075,
            epsilon = 1e-12
        );
    }
}
