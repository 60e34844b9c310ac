//! Storage backend implementations.
//!
//! This module provides the store abstraction and its in-memory backend:
//! - MonitorStore: snapshot and alert persistence shared by every backend
//! - StoreState: indexed records plus the atomic commit rule
//! - InMemoryStore: Fast, ephemeral storage for testing

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::RwLock;

use crate::core::{Alert, AlertFilter, AlertTrigger, Snapshot};
use crate::error::{Error, Result};

// ═══════════════════════════════════════════════════════════════════════════════
// STORAGE TRAIT
// ═══════════════════════════════════════════════════════════════════════════════

/// A snapshot together with the alerts its rules triggered.
///
/// Committed as one unit: either the snapshot and every alert become
/// visible, or nothing does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotBatch {
    /// New snapshot
    pub snapshot: Snapshot,
    /// Alerts to open, stamped with the snapshot time
    pub alerts: Vec<AlertTrigger>,
}

/// Trait for snapshot and alert stores
pub trait MonitorStore: Send + Sync {
    /// Most recent snapshot of a protocol
    fn latest_snapshot(&self, protocol: &str) -> Result<Option<Snapshot>>;

    /// Snapshots of a protocol with `timestamp >= cutoff`, oldest first
    fn snapshots_since(&self, protocol: &str, cutoff: DateTime<Utc>) -> Result<Vec<Snapshot>>;

    /// Every protocol name that has at least one snapshot, sorted
    fn protocol_names(&self) -> Result<BTreeSet<String>>;

    /// Open alerts, optionally restricted to one protocol
    fn open_alerts(&self, protocol: Option<&str>) -> Result<Vec<Alert>>;

    /// Alerts matching `filter`, newest first
    fn alerts(&self, filter: AlertFilter) -> Result<Vec<Alert>>;

    /// Atomically persist a snapshot and its alerts, returning the alerts
    /// with their assigned ids
    fn commit(&self, batch: SnapshotBatch) -> Result<Vec<Alert>>;

    /// Flush any pending writes to persistent storage
    fn flush(&self) -> Result<()>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// STORE STATE
// ═══════════════════════════════════════════════════════════════════════════════

/// Serialized form of a store
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreDocument {
    /// Every snapshot, grouped by protocol and ordered by time
    pub snapshots: Vec<Snapshot>,
    /// Every alert in commit order
    pub alerts: Vec<Alert>,
    /// Id the next committed alert receives
    pub next_alert_id: u64,
}

/// Indexed records shared by all backends
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreState {
    snapshots: BTreeMap<String, BTreeMap<DateTime<Utc>, Snapshot>>,
    alerts: Vec<Alert>,
    next_alert_id: u64,
}

impl Default for StoreState {
    fn default() -> Self {
        Self {
            snapshots: BTreeMap::new(),
            alerts: Vec::new(),
            next_alert_id: 1,
        }
    }
}

impl StoreState {
    /// Build a state from raw records, enforcing snapshot and alert uniqueness
    pub fn from_records(snapshots: Vec<Snapshot>, alerts: Vec<Alert>) -> Result<Self> {
        let mut state = Self::default();

        for snapshot in snapshots {
            state.insert_snapshot(snapshot)?;
        }

        let mut ids = BTreeSet::new();
        for alert in &alerts {
            if alert.id == 0 || !ids.insert(alert.id) {
                return Err(Error::Storage(format!("Invalid or duplicate alert id {}", alert.id)));
            }
        }

        state.next_alert_id = ids.last().map_or(1, |max| max + 1);
        state.alerts = alerts;
        Ok(state)
    }

    /// Rebuild from a persisted document
    pub fn from_document(document: StoreDocument) -> Result<Self> {
        let mut state = Self::from_records(document.snapshots, document.alerts)?;
        state.next_alert_id = state.next_alert_id.max(document.next_alert_id);
        Ok(state)
    }

    /// Flatten into a persistable document
    pub fn to_document(&self) -> StoreDocument {
        StoreDocument {
            snapshots: self
                .snapshots
                .values()
                .flat_map(|series| series.values().cloned())
                .collect(),
            alerts: self.alerts.clone(),
            next_alert_id: self.next_alert_id,
        }
    }

    /// Apply a batch. Nothing is mutated unless the whole batch succeeds.
    pub fn apply(&mut self, batch: SnapshotBatch) -> Result<Vec<Alert>> {
        self.check_unique(&batch.snapshot)?;

        let protocol = batch.snapshot.protocol_name.clone();
        let triggered_at = batch.snapshot.timestamp;

        let opened: Vec<Alert> = batch
            .alerts
            .into_iter()
            .enumerate()
            .map(|(offset, trigger)| {
                Alert::open(self.next_alert_id + offset as u64, protocol.clone(), trigger, triggered_at)
            })
            .collect();

        self.insert_snapshot(batch.snapshot)?;
        self.next_alert_id += opened.len() as u64;
        self.alerts.extend(opened.iter().cloned());

        Ok(opened)
    }

    /// Latest snapshot of a protocol
    pub fn latest_snapshot(&self, protocol: &str) -> Option<Snapshot> {
        self.snapshots
            .get(protocol)
            .and_then(|series| series.values().next_back())
            .cloned()
    }

    /// Snapshots of a protocol since `cutoff`, oldest first
    pub fn snapshots_since(&self, protocol: &str, cutoff: DateTime<Utc>) -> Vec<Snapshot> {
        self.snapshots
            .get(protocol)
            .map(|series| series.range(cutoff..).map(|(_, s)| s.clone()).collect())
            .unwrap_or_default()
    }

    /// Distinct protocol names
    pub fn protocol_names(&self) -> BTreeSet<String> {
        self.snapshots.keys().cloned().collect()
    }

    /// Open alerts, optionally for one protocol, in commit order
    pub fn open_alerts(&self, protocol: Option<&str>) -> Vec<Alert> {
        self.alerts
            .iter()
            .filter(|a| a.is_open())
            .filter(|a| protocol.map_or(true, |p| a.protocol_name == p))
            .cloned()
            .collect()
    }

    /// Alerts matching `filter`, newest triggered first, ties by descending id
    pub fn alerts(&self, filter: AlertFilter) -> Vec<Alert> {
        let mut alerts: Vec<Alert> = self.alerts.iter().filter(|a| filter.matches(a)).cloned().collect();
        alerts.sort_by(|a, b| b.triggered_at.cmp(&a.triggered_at).then(b.id.cmp(&a.id)));
        alerts
    }

    /// Total number of snapshots
    pub fn snapshot_count(&self) -> usize {
        self.snapshots.values().map(BTreeMap::len).sum()
    }

    fn check_unique(&self, snapshot: &Snapshot) -> Result<()> {
        let exists = self
            .snapshots
            .get(&snapshot.protocol_name)
            .is_some_and(|series| series.contains_key(&snapshot.timestamp));

        if exists {
            return Err(Error::DuplicateSnapshot {
                protocol: snapshot.protocol_name.clone(),
                timestamp: snapshot.timestamp.to_rfc3339(),
            });
        }
        Ok(())
    }

    fn insert_snapshot(&mut self, snapshot: Snapshot) -> Result<()> {
        self.check_unique(&snapshot)?;
        self.snapshots
            .entry(snapshot.protocol_name.clone())
            .or_default()
            .insert(snapshot.timestamp, snapshot);
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// IN-MEMORY STORE
// ═══════════════════════════════════════════════════════════════════════════════

/// In-memory storage backend (for testing and ephemeral use)
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: RwLock<StoreState>,
}

impl InMemoryStore {
    /// Create a new in-memory store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded with existing records
    pub fn from_records(snapshots: Vec<Snapshot>, alerts: Vec<Alert>) -> Result<Self> {
        Ok(Self {
            state: RwLock::new(StoreState::from_records(snapshots, alerts)?),
        })
    }

    /// Get number of snapshots
    pub fn len(&self) -> Result<usize> {
        Ok(self.state.read().map_err(|_| Error::Lock)?.snapshot_count())
    }

    /// Check if empty
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

impl MonitorStore for InMemoryStore {
    fn latest_snapshot(&self, protocol: &str) -> Result<Option<Snapshot>> {
        let state = self.state.read().map_err(|_| Error::Lock)?;
        Ok(state.latest_snapshot(protocol))
    }

    fn snapshots_since(&self, protocol: &str, cutoff: DateTime<Utc>) -> Result<Vec<Snapshot>> {
        let state = self.state.read().map_err(|_| Error::Lock)?;
        Ok(state.snapshots_since(protocol, cutoff))
    }

    fn protocol_names(&self) -> Result<BTreeSet<String>> {
        let state = self.state.read().map_err(|_| Error::Lock)?;
        Ok(state.protocol_names())
    }

    fn open_alerts(&self, protocol: Option<&str>) -> Result<Vec<Alert>> {
        let state = self.state.read().map_err(|_| Error::Lock)?;
        Ok(state.open_alerts(protocol))
    }

    fn alerts(&self, filter: AlertFilter) -> Result<Vec<Alert>> {
        let state = self.state.read().map_err(|_| Error::Lock)?;
        Ok(state.alerts(filter))
    }

    fn commit(&self, batch: SnapshotBatch) -> Result<Vec<Alert>> {
        let mut state = self.state.write().map_err(|_| Error::Lock)?;
        state.apply(batch)
    }

    fn flush(&self) -> Result<()> {
        // In-memory store doesn't need flushing
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{AlertSeverity, AlertType};
    use chrono::{Duration, TimeZone};
    use rust_decimal::Decimal;

    fn ts(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 1, hour, 0, 0).unwrap()
    }

    fn snapshot(protocol: &str, at: DateTime<Utc>, tvl: i64) -> Snapshot {
        Snapshot {
            protocol_name: protocol.into(),
            timestamp: at,
            tvl_usd: Decimal::new(tvl, 0),
            apy_7d: Some(Decimal::new(5, 0)),
            utilization_rate: None,
        }
    }

    fn batch(protocol: &str, at: DateTime<Utc>, alerts: Vec<AlertTrigger>) -> SnapshotBatch {
        SnapshotBatch {
            snapshot: snapshot(protocol, at, 100),
            alerts,
        }
    }

    fn apy_trigger() -> AlertTrigger {
        AlertTrigger::new(AlertType::ApyLow, "APY is 1.50% (Threshold: <2%)".into())
    }

    #[test]
    fn test_in_memory_commit_and_read() {
        let store = InMemoryStore::new();
        assert!(store.is_empty().unwrap());

        let alerts = store.commit(batch("hlp", ts(1), vec![apy_trigger()])).unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].id, 1);
        assert_eq!(alerts[0].triggered_at, ts(1));
        assert_eq!(alerts[0].severity, AlertSeverity::Warning);

        store.commit(batch("hlp", ts(2), vec![])).unwrap();

        let latest = store.latest_snapshot("hlp").unwrap().unwrap();
        assert_eq!(latest.timestamp, ts(2));
        assert_eq!(store.len().unwrap(), 2);
        assert!(store.latest_snapshot("felix").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_timestamp_leaves_no_partial_rows() {
        let store = InMemoryStore::new();
        store.commit(batch("felix", ts(1), vec![])).unwrap();

        let result = store.commit(batch("felix", ts(1), vec![apy_trigger()]));
        assert!(matches!(result, Err(Error::DuplicateSnapshot { .. })));
        assert_eq!(store.len().unwrap(), 1);
        assert!(store.alerts(AlertFilter::All).unwrap().is_empty());

        // Same timestamp is fine for another protocol
        store.commit(batch("hlp", ts(1), vec![])).unwrap();
        assert_eq!(store.len().unwrap(), 2);
    }

    #[test]
    fn test_alert_ids_increase_across_commits() {
        let store = InMemoryStore::new();
        let first = store.commit(batch("felix", ts(1), vec![apy_trigger(), apy_trigger()])).unwrap();
        let second = store.commit(batch("felix", ts(2), vec![apy_trigger()])).unwrap();

        let ids: Vec<u64> = first.iter().chain(second.iter()).map(|a| a.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_snapshots_since_is_inclusive_and_sorted() {
        let store = InMemoryStore::new();
        for hour in [3, 1, 2] {
            store.commit(batch("felix", ts(hour), vec![])).unwrap();
        }

        let since = store.snapshots_since("felix", ts(2)).unwrap();
        let hours: Vec<_> = since.iter().map(|s| s.timestamp).collect();
        assert_eq!(hours, vec![ts(2), ts(3)]);
        assert!(store.snapshots_since("unknown", ts(0)).unwrap().is_empty());
    }

    #[test]
    fn test_alert_listing_order_and_filter() {
        let resolved = Alert {
            id: 7,
            protocol_name: "hlp".into(),
            alert_type: AlertType::TvlDrop,
            severity: AlertSeverity::Critical,
            message: "old".into(),
            triggered_at: ts(1),
            resolved_at: Some(ts(2)),
        };
        let store = InMemoryStore::from_records(vec![snapshot("hlp", ts(1), 100)], vec![resolved]).unwrap();

        let opened = store.commit(batch("hlp", ts(3), vec![apy_trigger(), apy_trigger()])).unwrap();
        assert_eq!(opened[0].id, 8);

        let all = store.alerts(AlertFilter::All).unwrap();
        let ids: Vec<u64> = all.iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![9, 8, 7]);

        assert_eq!(store.alerts(AlertFilter::Open).unwrap().len(), 2);
        assert_eq!(store.alerts(AlertFilter::Resolved).unwrap()[0].id, 7);
        assert_eq!(store.open_alerts(Some("hlp")).unwrap().len(), 2);
        assert!(store.open_alerts(Some("felix")).unwrap().is_empty());
    }

    #[test]
    fn test_from_records_rejects_duplicates() {
        let at = ts(1);
        let result = InMemoryStore::from_records(
            vec![snapshot("felix", at, 1), snapshot("felix", at, 2)],
            vec![],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_document_round_trip_keeps_next_id() {
        let mut state = StoreState::default();
        state.apply(batch("felix", ts(1), vec![apy_trigger()])).unwrap();
        state.apply(batch("hlp", ts(1) + Duration::minutes(1), vec![])).unwrap();

        let rebuilt = StoreState::from_document(state.to_document()).unwrap();
        assert_eq!(rebuilt, state);
        assert_eq!(rebuilt.protocol_names().len(), 2);
    }
}
