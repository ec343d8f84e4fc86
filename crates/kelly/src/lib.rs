#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/kellycrates/kelly/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

use ndarray::Array2;
use std::collections::BTreeMap;
use thiserror::Error;

// Re-export the workspace members under short names
pub use kelly_alloc as alloc;
pub use kelly_dist as dist;
pub use kelly_sim as sim;
pub use kelly_stats as stats;

// Re-export the types the three entry points speak in
pub use kelly_alloc::{AllocError, log_growth_rate};
pub use kelly_dist::{DistributionFamily, DistributionParameters, EstimatorError};
pub use kelly_sim::{SimError, SimulationConfig, SimulationStatistics};
pub use kelly_stats::{
    Allocation, AssetStatistics, PortfolioSet, ReturnSeries, StatsError,
};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Any error the toolkit can produce, for callers driving the whole
/// pipeline through one error type.
#[derive(Error, Debug)]
pub enum KellyError {
    /// Distribution fitting failed.
    #[error(transparent)]
    Estimator(#[from] EstimatorError),

    /// Allocation solving failed.
    #[error(transparent)]
    Allocation(#[from] AllocError),

    /// Simulation failed.
    #[error(transparent)]
    Simulation(#[from] SimError),

    /// Input validation failed.
    #[error(transparent)]
    Stats(#[from] StatsError),
}

/// Fit a return distribution to an observation sample.
///
/// Rows are observations, columns are assets. See [`kelly_dist::fit`].
pub fn estimate(
    sample: &Array2<f64>,
    family: DistributionFamily,
    initial_guess: Option<&DistributionParameters>,
) -> Result<DistributionParameters, KellyError> {
    Ok(kelly_dist::fit(sample, family, initial_guess)?)
}

/// Compute the growth-optimal allocation for the given asset statistics.
///
/// See [`kelly_alloc::optimize`].
pub fn optimize(stats: &AssetStatistics, long_only: bool) -> Result<Allocation, KellyError> {
    Ok(kelly_alloc::optimize(
        stats.mean_returns(),
        stats.covariance(),
        long_only,
    )?)
}

/// Simulate a portfolio set and summarize the outcome distributions,
/// keyed by portfolio name.
///
/// See [`kelly_sim::simulate`].
pub fn simulate(
    portfolios: &PortfolioSet,
    stats: &AssetStatistics,
    config: &SimulationConfig,
) -> Result<BTreeMap<String, SimulationStatistics>, KellyError> {
    Ok(kelly_sim::simulate(portfolios, stats, config)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
