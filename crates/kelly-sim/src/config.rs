//! Simulation configuration

use crate::engine::SimError;
use serde::{Deserialize, Serialize};

/// Default number of simulated periods per trial.
pub const DEFAULT_HORIZON: usize = 600;

/// Default number of Monte Carlo trials.
pub const DEFAULT_TRIALS: usize = 10_000;

/// Default number of evenly spaced checkpoint periods.
pub const DEFAULT_CHECKPOINTS: usize = 10;

/// Default starting portfolio value.
pub const DEFAULT_STARTING_VALUE: f64 = 10_000.0;

/// Default drawdown fractions of the starting value against which final
/// trial values are compared.
pub const DEFAULT_TARGET_FRACTIONS: [f64; 4] = [0.5, 0.25, 0.10, 0.01];

/// Upper bound on `trials × horizon`, keeping a single `simulate` call to a
/// bounded amount of work.
pub const MAX_TOTAL_PERIODS: u64 = 1_000_000_000;

/// Knobs for one simulation run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SimulationConfig {
    /// Periods per trial.
    pub horizon: usize,
    /// Number of independent trials.
    pub trials: usize,
    /// Number of evenly spaced periods at which values are recorded.
    pub checkpoints: usize,
    /// Portfolio value at period zero.
    pub starting_value: f64,
    /// Drawdown fractions of the starting value; for each, the probability
    /// that a trial's final value ends at or below it is reported.
    pub target_fractions: Vec<f64>,
    /// Rebalance holdings back to the target weights every period; when
    /// false, initial holdings drift with prices.
    pub rebalance_each_period: bool,
    /// Base seed; trial `t` uses the stream seeded by `seed + t`.
    pub seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            horizon: DEFAULT_HORIZON,
            trials: DEFAULT_TRIALS,
            checkpoints: DEFAULT_CHECKPOINTS,
            starting_value: DEFAULT_STARTING_VALUE,
            target_fractions: DEFAULT_TARGET_FRACTIONS.to_vec(),
            rebalance_each_period: true,
            seed: 0,
        }
    }
}

impl SimulationConfig {
    /// Check the configuration before running.
    pub fn validate(&self) -> Result<(), SimError> {
        if self.horizon == 0 {
            return Err(SimError::InvalidConfig {
                reason: "horizon must be at least 1",
            });
        }
        if self.trials == 0 {
            return Err(SimError::InvalidConfig {
                reason: "trials must be at least 1",
            });
        }
        if self.checkpoints == 0 || self.checkpoints > self.horizon {
            return Err(SimError::InvalidConfig {
                reason: "checkpoints must be between 1 and the horizon",
            });
        }
        if !(self.starting_value.is_finite() && self.starting_value > 0.0) {
            return Err(SimError::InvalidConfig {
                reason: "starting value must be positive and finite",
            });
        }
        if self
            .target_fractions
            .iter()
            .any(|f| !(f.is_finite() && *f > 0.0))
        {
            return Err(SimError::InvalidConfig {
                reason: "target fractions must be positive and finite",
            });
        }

        let requested = self.trials as u64 * self.horizon as u64;
        if requested > MAX_TOTAL_PERIODS {
            return Err(SimError::WorkBudgetExceeded {
                requested,
                limit: MAX_TOTAL_PERIODS,
            });
        }
        Ok(())
    }

    /// The checkpoint periods: `checkpoints` evenly spaced marks ending at
    /// the horizon. Distinct and strictly increasing whenever the
    /// configuration validates.
    pub fn checkpoint_periods(&self) -> Vec<usize> {
        (1..=self.checkpoints)
            .map(|i| i * self.horizon / self.checkpoints)
            .collect()
    }
}
