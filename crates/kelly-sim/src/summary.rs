//! Simulation output types

use serde::{Deserialize, Serialize};

/// Percentile used for the checkpoint value-at-risk figures.
pub const VALUE_AT_RISK_PERCENTILE: f64 = 1.0;

/// Moments of the per-trial geometric growth rate.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GrowthMoments {
    /// Mean per-period growth rate.
    pub mean: f64,
    /// Sample standard deviation.
    pub std_dev: f64,
    /// Sample skewness.
    pub skewness: f64,
    /// Sample excess kurtosis.
    pub excess_kurtosis: f64,
}

/// Distribution of portfolio value at one checkpoint period.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct CheckpointSummary {
    /// Period index (1-based) at which values were recorded.
    pub period: usize,
    /// Median portfolio value across trials.
    pub median: f64,
    /// Value at the 1st percentile.
    pub value_at_risk: f64,
    /// Mean of the values at or below the 1st percentile.
    pub conditional_value_at_risk: f64,
}

/// Probability of a trial ending at or below a fraction of the starting
/// value.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ThresholdProbability {
    /// Fraction of the starting value.
    pub fraction: f64,
    /// Share of included trials whose final value was at or below
    /// `fraction × starting_value`.
    pub probability: f64,
}

/// Aggregated outcome distribution of one portfolio across all trials.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimulationStatistics {
    /// Trials configured for the run.
    pub trials: usize,
    /// Trials dropped for producing non-finite values.
    pub excluded_trials: usize,
    /// Geometric growth-rate moments over the included trials.
    pub growth: GrowthMoments,
    /// Value distribution at each checkpoint, in period order.
    pub checkpoints: Vec<CheckpointSummary>,
    /// Probability of ending at or below each configured fraction of the
    /// starting value, in configuration order.
    pub thresholds: Vec<ThresholdProbability>,
}
