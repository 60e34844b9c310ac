//! Ingestion engine.
//!
//! For each reading the engine looks up the protocol's latest snapshot,
//! evaluates the anomaly rules, stamps a new snapshot with the current time
//! and commits snapshot and alerts as one batch.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use super::rules::RuleSet;
use crate::core::{Alert, MetricReading, Snapshot};
use crate::error::Result;
use crate::storage::{MonitorStore, SnapshotBatch};

/// What a successfully processed reading produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutcome {
    /// Persisted snapshot
    pub snapshot: Snapshot,
    /// Alerts opened for it, in rule order
    pub alerts: Vec<Alert>,
}

/// Snapshot ingestion and alert engine
#[derive(Clone)]
pub struct IngestionEngine {
    store: Arc<dyn MonitorStore>,
    rules: RuleSet,
}

impl std::fmt::Debug for IngestionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngestionEngine")
            .field("rules", &self.rules)
            .finish_non_exhaustive()
    }
}

impl IngestionEngine {
    /// Create an engine over `store`
    pub fn new(store: Arc<dyn MonitorStore>, rules: RuleSet) -> Self {
        Self { store, rules }
    }

    /// Rules in use
    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Backing store
    pub fn store(&self) -> &Arc<dyn MonitorStore> {
        &self.store
    }

    /// Process a reading, timestamped now
    pub fn process_reading(&self, reading: &MetricReading) -> Result<ProcessOutcome> {
        self.process_reading_at(reading, Utc::now())
    }

    /// Process a reading with an explicit write time.
    ///
    /// On failure nothing is persisted and the error is logged and returned.
    pub fn process_reading_at(&self, reading: &MetricReading, timestamp: DateTime<Utc>) -> Result<ProcessOutcome> {
        let protocol = reading.protocol_name.as_str();

        let previous = self.store.latest_snapshot(protocol).map_err(|e| {
            error!(protocol, error = %e, "Failed to load previous snapshot");
            e
        })?;

        let triggers = self.rules.evaluate(reading, previous.as_ref());
        for trigger in &triggers {
            warn!(
                protocol,
                alert_type = %trigger.alert_type,
                severity = %trigger.severity,
                "ALERT: {}",
                trigger.message
            );
        }

        let snapshot = Snapshot::from_reading(reading, timestamp);
        let batch = SnapshotBatch {
            snapshot: snapshot.clone(),
            alerts: triggers,
        };

        match self.store.commit(batch) {
            Ok(alerts) => {
                info!(protocol, alerts = alerts.len(), "Saved snapshot");
                Ok(ProcessOutcome { snapshot, alerts })
            }
            Err(e) => {
                error!(protocol, error = %e, "Failed to process reading, rolled back");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{AlertSeverity, AlertType};
    use crate::error::Error;
    use crate::storage::InMemoryStore;
    use chrono::{Duration, TimeZone};
    use rust_decimal::Decimal;

    fn engine() -> IngestionEngine {
        IngestionEngine::new(Arc::new(InMemoryStore::new()), RuleSet::default())
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 1, 9, 0, 0).unwrap()
    }

    #[test]
    fn test_first_reading_never_drops() {
        let engine = engine();
        let reading = MetricReading::new("felix", Decimal::new(1, 0), Decimal::new(10, 0));
        let outcome = engine.process_reading_at(&reading, t0()).unwrap();

        assert!(outcome.alerts.is_empty());
        assert_eq!(outcome.snapshot.timestamp, t0());
    }

    #[test]
    fn test_drop_against_latest_snapshot() {
        let engine = engine();
        let first = MetricReading::new("felix", Decimal::new(10_000_000, 0), Decimal::new(125, 1))
            .with_utilization(Decimal::new(80, 2));
        engine.process_reading_at(&first, t0()).unwrap();

        let second = MetricReading::new("felix", Decimal::new(7_000_000, 0), Decimal::new(125, 1))
            .with_utilization(Decimal::new(80, 2));
        let outcome = engine.process_reading_at(&second, t0() + Duration::hours(1)).unwrap();

        assert_eq!(outcome.alerts.len(), 1);
        let alert = &outcome.alerts[0];
        assert_eq!(alert.alert_type, AlertType::TvlDrop);
        assert_eq!(alert.severity, AlertSeverity::Critical);
        assert_eq!(alert.triggered_at, t0() + Duration::hours(1));
        assert!(alert.is_open());

        let latest = engine.store().latest_snapshot("felix").unwrap().unwrap();
        assert_eq!(latest.tvl_usd, Decimal::new(7_000_000, 0));
    }

    #[test]
    fn test_duplicate_timestamp_is_rolled_back() {
        let engine = engine();
        let ok = MetricReading::new("hlp", Decimal::new(50_000_000, 0), Decimal::new(5, 0));
        engine.process_reading_at(&ok, t0()).unwrap();

        let low = MetricReading::new("hlp", Decimal::new(50_000_000, 0), Decimal::new(15, 1));
        let result = engine.process_reading_at(&low, t0());

        assert!(matches!(result, Err(Error::DuplicateSnapshot { .. })));
        assert!(engine.store().alerts(Default::default()).unwrap().is_empty());
        assert_eq!(
            engine.store().latest_snapshot("hlp").unwrap().unwrap().apy_7d,
            Some(Decimal::new(5, 0))
        );
    }
}
