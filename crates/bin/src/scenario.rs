//! Scenario file format
//!
//! A scenario is a single JSON document carrying the market inputs and run
//! settings. Exactly one of `prices` (a period × asset price table, from
//! which arithmetic returns are derived) or `returns` (the return table
//! directly) must be present.

use kelly::{AssetStatistics, ReturnSeries, SimulationConfig};
use ndarray::Array2;
use serde::Deserialize;
use thiserror::Error;

/// Problems with a scenario document.
#[derive(Error, Debug)]
pub(crate) enum ScenarioError {
    /// Neither or both of `prices` and `returns` were given.
    #[error("scenario must contain exactly one of 'prices' or 'returns'")]
    AmbiguousInput,

    /// A data table had rows of unequal length.
    #[error("row {row} has {actual} columns, expected {expected}")]
    RaggedTable {
        /// Offending row index.
        row: usize,
        /// Columns in the first row.
        expected: usize,
        /// Columns in the offending row.
        actual: usize,
    },

    /// The asset name list does not match the table width.
    #[error("{names} asset names given for {columns} data columns")]
    NameCountMismatch {
        /// Names given.
        names: usize,
        /// Columns in the data table.
        columns: usize,
    },

    /// The derived statistics were invalid.
    #[error(transparent)]
    Stats(#[from] kelly::StatsError),
}

/// Parsed scenario document.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct Scenario {
    /// Display names for the assets, in column order.
    #[serde(default)]
    pub(crate) assets: Option<Vec<String>>,
    /// Price table, rows = periods, columns = assets.
    #[serde(default)]
    pub(crate) prices: Option<Vec<Vec<f64>>>,
    /// Return table, rows = periods, columns = assets.
    #[serde(default)]
    pub(crate) returns: Option<Vec<Vec<f64>>>,
    /// Restrict the allocation to non-negative weights.
    #[serde(default = "default_long_only")]
    pub(crate) long_only: bool,
    /// Number of perturbed comparison portfolios to generate.
    #[serde(default = "default_variants")]
    pub(crate) variants: usize,
    /// Simulation settings; missing fields take their defaults.
    #[serde(default)]
    pub(crate) simulation: SimulationConfig,
}

const fn default_long_only() -> bool {
    true
}

const fn default_variants() -> usize {
    kelly::PortfolioSet::DEFAULT_VARIANTS
}

impl Scenario {
    /// Derive the asset statistics from whichever table the scenario holds.
    pub(crate) fn asset_statistics(&self) -> Result<AssetStatistics, ScenarioError> {
        let returns = match (&self.prices, &self.returns) {
            (Some(prices), None) => {
                let table = to_array(prices)?;
                ReturnSeries::from_prices(&table)?
            }
            (None, Some(returns)) => ReturnSeries::new(to_array(returns)?)?,
            _ => return Err(ScenarioError::AmbiguousInput),
        };
        self.check_names(returns.n_assets())?;
        Ok(AssetStatistics::from_returns(&returns)?)
    }

    /// Asset display names, defaulting to `asset-1`, `asset-2`, ...
    pub(crate) fn asset_names(&self, n: usize) -> Vec<String> {
        match &self.assets {
            Some(names) => names.clone(),
            None => (1..=n).map(|i| format!("asset-{i}")).collect(),
        }
    }

    fn check_names(&self, columns: usize) -> Result<(), ScenarioError> {
        if let Some(names) = &self.assets
            && names.len() != columns
        {
            return Err(ScenarioError::NameCountMismatch {
                names: names.len(),
                columns,
            });
        }
        Ok(())
    }
}

fn to_array(rows: &[Vec<f64>]) -> Result<Array2<f64>, ScenarioError> {
    let n_rows = rows.len();
    let n_cols = rows.first().map_or(0, Vec::len);
    let mut table = Array2::<f64>::zeros((n_rows, n_cols));
    for (i, row) in rows.iter().enumerate() {
        if row.len() != n_cols {
            return Err(ScenarioError::RaggedTable {
                row: i,
                expected: n_cols,
                actual: row.len(),
            });
        }
        for (j, value) in row.iter().enumerate() {
            table[[i, j]] = *value;
        }
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_minimal_returns_scenario() {
        let scenario: Scenario = serde_json::from_str(
            r#"{
                "returns": [[0.01, 0.02], [-0.005, 0.01], [0.02, -0.01], [0.0, 0.005]]
            }"#,
        )
        .unwrap();
        assert!(scenario.long_only);
        assert_eq!(scenario.variants, 11);
        let stats = scenario.asset_statistics().unwrap();
        assert_eq!(stats.n_assets(), 2);
    }

    #[test]
    fn test_prices_scenario_with_names() {
        let scenario: Scenario = serde_json::from_str(
            r#"{
                "assets": ["equities", "bonds"],
                "prices": [[100.0, 50.0], [101.0, 50.2], [99.5, 50.1], [102.0, 50.4]],
                "long_only": false,
                "simulation": {"trials": 100, "horizon": 50, "checkpoints": 5}
            }"#,
        )
        .unwrap();
        assert!(!scenario.long_only);
        assert_eq!(scenario.simulation.trials, 100);
        // Unspecified simulation fields fall back to defaults.
        assert_eq!(scenario.simulation.starting_value, 10_000.0);
        let stats = scenario.asset_statistics().unwrap();
        assert_eq!(scenario.asset_names(stats.n_assets()), vec!["equities", "bonds"]);
    }

    #[test]
    fn test_rejects_both_tables() {
        let scenario: Scenario = serde_json::from_str(
            r#"{"prices": [[1.0], [1.1]], "returns": [[0.1]]}"#,
        )
        .unwrap();
        assert!(matches!(
            scenario.asset_statistics(),
            Err(ScenarioError::AmbiguousInput)
        ));
    }

    #[test]
    fn test_rejects_ragged_rows() {
        let scenario: Scenario = serde_json::from_str(
            r#"{"returns": [[0.01, 0.02], [0.01]]}"#,
        )
        .unwrap();
        assert!(matches!(
            scenario.asset_statistics(),
            Err(ScenarioError::RaggedTable { row: 1, .. })
        ));
    }

    #[test]
    fn test_rejects_name_count_mismatch() {
        let scenario: Scenario = serde_json::from_str(
            r#"{"assets": ["a"], "returns": [[0.01, 0.02], [0.0, 0.01], [0.01, 0.0]]}"#,
        )
        .unwrap();
        assert!(matches!(
            scenario.asset_statistics(),
            Err(ScenarioError::NameCountMismatch { names: 1, columns: 2 })
        ));
    }

    #[test]
    fn test_default_asset_names() {
        let scenario: Scenario =
            serde_json::from_str(r#"{"returns": [[0.01], [0.0], [0.02]]}"#).unwrap();
        assert_eq!(scenario.asset_names(2), vec!["asset-1", "asset-2"]);
    }
}
