//! Single-trial path generation and portfolio bookkeeping
//!
//! One trial draws a fresh return path and walks every portfolio in the set
//! along it. Asset returns for a period are `μ + L·z` with `z` standard
//! normal and `L` the Cholesky factor of the covariance, applied to a common
//! price vector so all portfolios see identical market moves.

use crate::config::SimulationConfig;
use ndarray::{Array1, Array2};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::StandardNormal;

/// All assets start the trial at this price.
pub(crate) const INITIAL_PRICE: f64 = 100.0;

/// What one portfolio produced over one completed trial.
#[derive(Debug)]
pub(crate) struct TrialOutcome {
    /// Portfolio value at each checkpoint period, in period order.
    pub checkpoint_values: Vec<f64>,
    /// Per-period geometric growth rate over the whole trial.
    pub growth_rate: f64,
    /// Whether the final value ended at or below each drawdown level.
    pub thresholds_hit: Vec<bool>,
}

struct PortfolioState {
    units: Array1<f64>,
    value: f64,
    checkpoint_values: Vec<f64>,
}

impl PortfolioState {
    fn new(weights: &Array1<f64>, prices: &Array1<f64>, starting_value: f64) -> Self {
        let units = weights.mapv(|w| w * starting_value) / prices;
        Self {
            units,
            value: starting_value,
            checkpoint_values: Vec::new(),
        }
    }

    /// Revalue after a price move. Returns false when the trial has gone
    /// non-finite and must be excluded.
    fn step(
        &mut self,
        weights: &Array1<f64>,
        prices: &Array1<f64>,
        rebalance: bool,
        at_checkpoint: bool,
    ) -> bool {
        self.value = self.units.dot(prices);
        if !self.value.is_finite() {
            return false;
        }
        if at_checkpoint {
            self.checkpoint_values.push(self.value);
        }
        if rebalance {
            for i in 0..self.units.len() {
                self.units[i] = self.value * weights[i] / prices[i];
            }
        }
        true
    }

    fn finish(self, config: &SimulationConfig) -> Option<TrialOutcome> {
        // A short leg can drive the value through zero; the geometric growth
        // rate is undefined there and the trial is excluded.
        let growth_rate =
            (self.value / config.starting_value).powf(1.0 / config.horizon as f64) - 1.0;
        if !growth_rate.is_finite() {
            return None;
        }
        // Drawdown levels compare against where the trial ended, not the
        // lowest point along the way.
        let thresholds_hit = config
            .target_fractions
            .iter()
            .map(|f| self.value <= f * config.starting_value)
            .collect();
        Some(TrialOutcome {
            checkpoint_values: self.checkpoint_values,
            growth_rate,
            thresholds_hit,
        })
    }
}

/// Run one trial for every portfolio. Element `i` of the result corresponds
/// to `weights[i]`; `None` marks an excluded trial.
pub(crate) fn run_trial(
    trial: u64,
    mean: &Array1<f64>,
    factor: &Array2<f64>,
    weights: &[&Array1<f64>],
    config: &SimulationConfig,
    checkpoint_periods: &[usize],
) -> Vec<Option<TrialOutcome>> {
    let n = mean.len();
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed.wrapping_add(trial));

    let mut prices = Array1::from_elem(n, INITIAL_PRICE);
    let mut states: Vec<Option<PortfolioState>> = weights
        .iter()
        .map(|w| Some(PortfolioState::new(w, &prices, config.starting_value)))
        .collect();

    let mut shock = Array1::<f64>::zeros(n);
    let mut next_checkpoint = 0;
    for period in 1..=config.horizon {
        for z in shock.iter_mut() {
            *z = rng.sample(StandardNormal);
        }
        let joint = factor.dot(&shock);
        for i in 0..n {
            prices[i] *= 1.0 + mean[i] + joint[i];
        }

        let at_checkpoint = next_checkpoint < checkpoint_periods.len()
            && checkpoint_periods[next_checkpoint] == period;
        if at_checkpoint {
            next_checkpoint += 1;
        }

        for (slot, w) in states.iter_mut().zip(weights) {
            if let Some(state) = slot
                && !state.step(w, &prices, config.rebalance_each_period, at_checkpoint)
            {
                *slot = None;
            }
        }
    }

    states
        .into_iter()
        .map(|slot| slot.and_then(|state| state.finish(config)))
        .collect()
}
