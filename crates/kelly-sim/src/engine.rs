//! Simulation driver and aggregation

use crate::config::SimulationConfig;
use crate::summary::{
    CheckpointSummary, GrowthMoments, SimulationStatistics, ThresholdProbability,
    VALUE_AT_RISK_PERCENTILE,
};
use crate::trial::{TrialOutcome, run_trial};
use kelly_stats::{
    AssetStatistics, MomentAccumulator, PortfolioSet, StatsError, cholesky, lower_tail_mean,
    percentile,
};
use ndarray::Array1;
use rayon::prelude::*;
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors from the simulator.
#[derive(Error, Debug)]
pub enum SimError {
    /// The portfolio set has no members to simulate.
    #[error("portfolio set is empty")]
    EmptyPortfolioSet,

    /// A portfolio's weight vector does not match the asset statistics.
    #[error("allocation '{name}' has {actual} assets, statistics describe {expected}")]
    AllocationDimensionMismatch {
        /// Portfolio name.
        name: String,
        /// Assets in the statistics.
        expected: usize,
        /// Assets in the allocation.
        actual: usize,
    },

    /// A configuration field is out of range.
    #[error("invalid simulation config: {reason}")]
    InvalidConfig {
        /// What failed validation.
        reason: &'static str,
    },

    /// The run would exceed the bounded work budget.
    #[error("requested {requested} trial-periods exceeds the budget of {limit}")]
    WorkBudgetExceeded {
        /// `trials × horizon` requested.
        requested: u64,
        /// Maximum permitted.
        limit: u64,
    },

    /// Every trial of some portfolio was excluded for non-finite values, so
    /// no distribution can be reported.
    #[error("portfolio '{name}': every trial was excluded")]
    NoValidTrials {
        /// Portfolio name.
        name: String,
    },

    /// Invalid inputs, including a covariance matrix that cannot be
    /// factorized for sampling.
    #[error(transparent)]
    Stats(#[from] StatsError),
}

/// Simulate every portfolio in the set over a common set of return paths.
///
/// Returns per-portfolio statistics keyed by portfolio name. Trials run in
/// parallel; results are identical for a given `config.seed` regardless of
/// thread count.
pub fn simulate(
    portfolios: &PortfolioSet,
    stats: &AssetStatistics,
    config: &SimulationConfig,
) -> Result<BTreeMap<String, SimulationStatistics>, SimError> {
    config.validate()?;
    if portfolios.is_empty() {
        return Err(SimError::EmptyPortfolioSet);
    }
    let n = stats.n_assets();
    for entry in portfolios.iter() {
        if entry.allocation.n_assets() != n {
            return Err(SimError::AllocationDimensionMismatch {
                name: entry.name.clone(),
                expected: n,
                actual: entry.allocation.n_assets(),
            });
        }
    }

    let factor = cholesky(stats.covariance())?;
    let checkpoint_periods = config.checkpoint_periods();
    let weights: Vec<&Array1<f64>> = portfolios.iter().map(|e| e.allocation.weights()).collect();

    let outcomes: Vec<Vec<Option<TrialOutcome>>> = (0..config.trials as u64)
        .into_par_iter()
        .map(|trial| {
            run_trial(
                trial,
                stats.mean_returns(),
                &factor,
                &weights,
                config,
                &checkpoint_periods,
            )
        })
        .collect();

    let mut result = BTreeMap::new();
    for (index, entry) in portfolios.iter().enumerate() {
        let statistics = aggregate(index, &entry.name, &outcomes, config, &checkpoint_periods)?;
        result.insert(entry.name.clone(), statistics);
    }
    Ok(result)
}

/// Fold the per-trial outcomes of one portfolio into summary statistics.
fn aggregate(
    portfolio: usize,
    name: &str,
    outcomes: &[Vec<Option<TrialOutcome>>],
    config: &SimulationConfig,
    checkpoint_periods: &[usize],
) -> Result<SimulationStatistics, SimError> {
    let mut growth = MomentAccumulator::new();
    let mut per_checkpoint: Vec<Vec<f64>> = vec![Vec::new(); checkpoint_periods.len()];
    let mut threshold_hits = vec![0u64; config.target_fractions.len()];
    let mut excluded = 0usize;

    for trial in outcomes {
        match &trial[portfolio] {
            Some(outcome) => {
                growth.push(outcome.growth_rate);
                for (k, value) in outcome.checkpoint_values.iter().enumerate() {
                    per_checkpoint[k].push(*value);
                }
                for (t, hit) in outcome.thresholds_hit.iter().enumerate() {
                    if *hit {
                        threshold_hits[t] += 1;
                    }
                }
            }
            None => excluded += 1,
        }
    }

    let included = outcomes.len() - excluded;
    if included == 0 {
        return Err(SimError::NoValidTrials {
            name: name.to_string(),
        });
    }

    let checkpoints = checkpoint_periods
        .iter()
        .zip(per_checkpoint.iter_mut())
        .map(|(&period, values)| {
            values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
            let value_at_risk = percentile(values, VALUE_AT_RISK_PERCENTILE);
            CheckpointSummary {
                period,
                median: percentile(values, 50.0),
                value_at_risk,
                conditional_value_at_risk: lower_tail_mean(values, value_at_risk),
            }
        })
        .collect();

    let thresholds = config
        .target_fractions
        .iter()
        .zip(threshold_hits)
        .map(|(&fraction, hits)| ThresholdProbability {
            fraction,
            probability: hits as f64 / included as f64,
        })
        .collect();

    Ok(SimulationStatistics {
        trials: outcomes.len(),
        excluded_trials: excluded,
        growth: GrowthMoments {
            mean: growth.mean(),
            std_dev: growth.std_dev(),
            skewness: growth.skewness(),
            excess_kurtosis: growth.excess_kurtosis(),
        },
        checkpoints,
        thresholds,
    })
}
