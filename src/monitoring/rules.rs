//! Anomaly rules.
//!
//! Three independent rules are evaluated against every reading, always all
//! of them and always in the same order: TVL drop, low APY, high
//! utilization. Every comparison is strict, so a value sitting exactly on a
//! threshold never fires.

use crate::core::{AlertThresholds, AlertTrigger, AlertType, MetricReading, Snapshot};
use crate::utils::math::{format_2dp, format_compact, relative_drop, to_percent};

/// The fixed anomaly rule set, parameterized by thresholds
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleSet {
    thresholds: AlertThresholds,
}

impl RuleSet {
    /// Create a rule set with the given thresholds
    pub fn new(thresholds: AlertThresholds) -> Self {
        Self { thresholds }
    }

    /// Thresholds in use
    pub fn thresholds(&self) -> &AlertThresholds {
        &self.thresholds
    }

    /// Evaluate all rules for `reading` against the protocol's latest snapshot.
    ///
    /// Triggers come back in rule order; an empty vector means the reading
    /// is healthy.
    pub fn evaluate(&self, reading: &MetricReading, previous: Option<&Snapshot>) -> Vec<AlertTrigger> {
        let mut triggers = Vec::new();

        if let Some(trigger) = self.check_tvl_drop(reading, previous) {
            triggers.push(trigger);
        }
        if let Some(trigger) = self.check_apy(reading) {
            triggers.push(trigger);
        }
        if let Some(trigger) = self.check_utilization(reading) {
            triggers.push(trigger);
        }

        triggers
    }

    fn check_tvl_drop(&self, reading: &MetricReading, previous: Option<&Snapshot>) -> Option<AlertTrigger> {
        let previous = previous?;
        let drop = relative_drop(previous.tvl_usd, reading.tvl_usd)?;

        if drop <= self.thresholds.tvl_drop {
            return None;
        }

        Some(AlertTrigger::new(
            AlertType::TvlDrop,
            format!(
                "TVL dropped by {}% (Threshold: {}%)",
                format_2dp(to_percent(drop)),
                format_compact(to_percent(self.thresholds.tvl_drop)),
            ),
        ))
    }

    fn check_apy(&self, reading: &MetricReading) -> Option<AlertTrigger> {
        if reading.apy_7d >= self.thresholds.apy_min {
            return None;
        }

        Some(AlertTrigger::new(
            AlertType::ApyLow,
            format!(
                "APY is {}% (Threshold: <{}%)",
                format_2dp(reading.apy_7d),
                format_compact(self.thresholds.apy_min),
            ),
        ))
    }

    fn check_utilization(&self, reading: &MetricReading) -> Option<AlertTrigger> {
        let utilization = reading.utilization_rate?;

        if utilization <= self.thresholds.utilization_max {
            return None;
        }

        Some(AlertTrigger::new(
            AlertType::UtilizationHigh,
            format!(
                "Utilization is {}% (Threshold: >{}%)",
                format_2dp(to_percent(utilization)),
                format_compact(to_percent(self.thresholds.utilization_max)),
            ),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::AlertSeverity;
    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn prior(tvl: Decimal) -> Snapshot {
        Snapshot {
            protocol_name: "felix".into(),
            timestamp: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
            tvl_usd: tvl,
            apy_7d: Some(d("12.5")),
            utilization_rate: Some(d("0.80")),
        }
    }

    fn types(triggers: &[AlertTrigger]) -> Vec<AlertType> {
        triggers.iter().map(|t| t.alert_type).collect()
    }

    #[test]
    fn test_felix_tvl_drop() {
        let rules = RuleSet::default();
        let reading = MetricReading::new("felix", d("7000000"), d("12.5")).with_utilization(d("0.80"));
        let triggers = rules.evaluate(&reading, Some(&prior(d("10000000"))));

        assert_eq!(triggers.len(), 1);
        assert_eq!(triggers[0].alert_type, AlertType::TvlDrop);
        assert_eq!(triggers[0].severity, AlertSeverity::Critical);
        assert_eq!(triggers[0].message, "TVL dropped by 30.00% (Threshold: 20%)");
    }

    #[test]
    fn test_hlp_low_apy() {
        let rules = RuleSet::default();
        let reading = MetricReading::new("hlp", d("50000000"), d("1.5"));
        let triggers = rules.evaluate(&reading, None);

        assert_eq!(triggers.len(), 1);
        assert_eq!(triggers[0].alert_type, AlertType::ApyLow);
        assert_eq!(triggers[0].severity, AlertSeverity::Warning);
        assert_eq!(triggers[0].message, "APY is 1.50% (Threshold: <2%)");
    }

    #[test]
    fn test_high_utilization_message() {
        let rules = RuleSet::default();
        let reading = MetricReading::new("felix", d("10000000"), d("12.5")).with_utilization(d("0.98"));
        let triggers = rules.evaluate(&reading, None);

        assert_eq!(types(&triggers), vec![AlertType::UtilizationHigh]);
        assert_eq!(triggers[0].message, "Utilization is 98.00% (Threshold: >95%)");
    }

    #[test]
    fn test_all_three_in_order() {
        let rules = RuleSet::default();
        let reading = MetricReading::new("felix", d("5000000"), d("0.5")).with_utilization(d("0.99"));
        let triggers = rules.evaluate(&reading, Some(&prior(d("10000000"))));

        assert_eq!(
            types(&triggers),
            vec![AlertType::TvlDrop, AlertType::ApyLow, AlertType::UtilizationHigh]
        );
    }

    #[test]
    fn test_boundaries_do_not_fire() {
        let rules = RuleSet::default();
        let reading = MetricReading::new("felix", d("8000000"), d("2.0")).with_utilization(d("0.95"));
        assert!(rules.evaluate(&reading, Some(&prior(d("10000000")))).is_empty());
    }

    #[test]
    fn test_zero_prior_tvl_skips_drop() {
        let rules = RuleSet::default();
        let reading = MetricReading::new("felix", d("0"), d("12.5"));
        assert!(rules.evaluate(&reading, Some(&prior(Decimal::ZERO))).is_empty());
    }

    #[test]
    fn test_custom_thresholds_render_in_message() {
        let rules = RuleSet::new(AlertThresholds {
            tvl_drop: d("0.1"),
            apy_min: d("2.5"),
            utilization_max: d("0.9"),
        });
        let reading = MetricReading::new("felix", d("8500000"), d("2.25")).with_utilization(d("0.925"));
        let triggers = rules.evaluate(&reading, Some(&prior(d("10000000"))));

        assert_eq!(triggers[0].message, "TVL dropped by 15.00% (Threshold: 10%)");
        assert_eq!(triggers[1].message, "APY is 2.25% (Threshold: <2.5%)");
        // 92.5 stays exact, no rounding involved
        assert_eq!(triggers[2].message, "Utilization is 92.50% (Threshold: >90%)");
    }

    fn decimal_in(lo: i64, hi: i64, scale: u32) -> impl Strategy<Value = Decimal> {
        (lo..hi).prop_map(move |n| Decimal::new(n, scale))
    }

    proptest! {
        #[test]
        fn prop_no_prior_never_drops(tvl in decimal_in(0, 1_000_000_000, 2), apy in decimal_in(0, 10_000, 2)) {
            let reading = MetricReading::new("p", tvl, apy);
            let triggers = RuleSet::default().evaluate(&reading, None);
            prop_assert!(triggers.iter().all(|t| t.alert_type != AlertType::TvlDrop));
        }

        #[test]
        fn prop_tvl_drop_iff_above_threshold(
            previous in decimal_in(1, 1_000_000_000, 0),
            current in decimal_in(0, 1_000_000_000, 0),
        ) {
            let reading = MetricReading::new("p", current, d("10"));
            let triggers = RuleSet::default().evaluate(&reading, Some(&prior(previous)));
            let fired = triggers.iter().any(|t| t.alert_type == AlertType::TvlDrop);
            let drop = (previous - current) / previous;
            prop_assert_eq!(fired, drop > d("0.20"));
        }

        #[test]
        fn prop_apy_low_iff_below_floor(apy in decimal_in(-500, 10_000, 2), tvl in decimal_in(0, 1_000_000, 0)) {
            let reading = MetricReading::new("p", tvl, apy);
            let triggers = RuleSet::default().evaluate(&reading, None);
            let fired = triggers.iter().any(|t| t.alert_type == AlertType::ApyLow);
            prop_assert_eq!(fired, apy < d("2.0"));
        }

        #[test]
        fn prop_utilization_iff_above_ceiling(util in decimal_in(0, 10_000, 4)) {
            let reading = MetricReading::new("p", d("100"), d("10")).with_utilization(util);
            let triggers = RuleSet::default().evaluate(&reading, None);
            let fired = triggers.iter().any(|t| t.alert_type == AlertType::UtilizationHigh);
            prop_assert_eq!(fired, util > d("0.95"));

            let without = MetricReading::new("p", d("100"), d("10"));
            prop_assert!(RuleSet::default().evaluate(&without, None).is_empty());
        }
    }
}
