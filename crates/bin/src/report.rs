//! Plain-text report rendering

use kelly::{PortfolioSet, SimulationStatistics};
use std::collections::BTreeMap;
use std::fmt::Write;

/// Render the allocation and simulation results as a plain-text report.
///
/// At most [`PortfolioSet::DISPLAY_CAP`] members are shown, Kelly first;
/// anything beyond the cap is summarized in a trailing note.
pub(crate) fn render(
    set: &PortfolioSet,
    asset_names: &[String],
    results: &BTreeMap<String, SimulationStatistics>,
) -> String {
    let mut out = String::new();

    for entry in set.iter().take(PortfolioSet::DISPLAY_CAP) {
        let _ = writeln!(out, "=== {} ===", entry.name);

        let _ = writeln!(out, "allocation:");
        for (name, weight) in asset_names.iter().zip(entry.allocation.weights()) {
            let _ = writeln!(out, "  {name:<16} {weight:>10.4}");
        }

        let Some(stats) = results.get(&entry.name) else {
            continue;
        };

        let _ = writeln!(
            out,
            "growth rate: mean {:.6}  std {:.6}  skew {:.3}  ex-kurt {:.3}",
            stats.growth.mean, stats.growth.std_dev, stats.growth.skewness,
            stats.growth.excess_kurtosis
        );
        let _ = writeln!(
            out,
            "trials: {} ({} excluded)",
            stats.trials, stats.excluded_trials
        );

        let _ = writeln!(out, "{:>8} {:>14} {:>14} {:>14}", "period", "median", "VaR 1%", "CVaR");
        for checkpoint in &stats.checkpoints {
            let _ = writeln!(
                out,
                "{:>8} {:>14.2} {:>14.2} {:>14.2}",
                checkpoint.period,
                checkpoint.median,
                checkpoint.value_at_risk,
                checkpoint.conditional_value_at_risk
            );
        }

        let _ = writeln!(out, "probability of ending at or below:");
        for threshold in &stats.thresholds {
            let _ = writeln!(
                out,
                "  {:>5.1}% of start: {:>7.4}",
                threshold.fraction * 100.0,
                threshold.probability
            );
        }
        let _ = writeln!(out);
    }

    if set.len() > PortfolioSet::DISPLAY_CAP {
        let _ = writeln!(
            out,
            "({} further portfolios simulated but not shown)",
            set.len() - PortfolioSet::DISPLAY_CAP
        );
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use kelly::{Allocation, AssetStatistics, SimulationConfig};
    use ndarray::array;

    fn rendered(set: &PortfolioSet) -> String {
        let stats = AssetStatistics::new(
            array![0.004, 0.002],
            array![[0.0004, 0.0], [0.0, 0.0002]],
        )
        .unwrap();
        let config = SimulationConfig {
            horizon: 40,
            trials: 50,
            checkpoints: 2,
            seed: 1,
            ..SimulationConfig::default()
        };
        let results = kelly::simulate(set, &stats, &config).unwrap();
        render(
            set,
            &["stocks".to_string(), "bills".to_string()],
            &results,
        )
    }

    #[test]
    fn test_report_mentions_every_displayed_portfolio() {
        let kelly = Allocation::new(array![0.7, 0.3]).unwrap();
        let variant = Allocation::new(array![0.4, 0.6]).unwrap();
        let text = rendered(&PortfolioSet::with_variants(kelly, vec![variant]));

        assert!(text.contains("=== kelly ==="));
        assert!(text.contains("=== variant-1 ==="));
        assert!(text.contains("stocks"));
        assert!(text.contains("probability of ending at or below:"));
    }

    #[test]
    fn test_report_caps_displayed_portfolios() {
        let kelly = Allocation::new(array![0.7, 0.3]).unwrap();
        let variants = (0..8)
            .map(|_| Allocation::new(array![0.5, 0.5]).unwrap())
            .collect();
        let text = rendered(&PortfolioSet::with_variants(kelly, variants));

        assert!(text.contains("=== variant-5 ==="));
        assert!(!text.contains("=== variant-6 ==="));
        assert!(text.contains("3 further portfolios"));
    }
}
