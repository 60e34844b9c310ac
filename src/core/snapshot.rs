//! Persisted protocol snapshots.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::reading::MetricReading;

/// One timestamped metrics reading for one protocol.
///
/// At most one snapshot exists per `(protocol_name, timestamp)`. Snapshots
/// are immutable once committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Protocol name
    pub protocol_name: String,
    /// Write time assigned by the engine
    pub timestamp: DateTime<Utc>,
    /// Total value locked, in USD
    pub tvl_usd: Decimal,
    /// 7-day APY, in percent
    pub apy_7d: Option<Decimal>,
    /// Utilization rate, lending protocols only
    pub utilization_rate: Option<Decimal>,
}

impl Snapshot {
    /// Build the snapshot for `reading`, stamped with `timestamp`.
    pub fn from_reading(reading: &MetricReading, timestamp: DateTime<Utc>) -> Self {
        Self {
            protocol_name: reading.protocol_name.clone(),
            timestamp,
            tvl_usd: reading.tvl_usd,
            apy_7d: Some(reading.apy_7d),
            utilization_rate: reading.utilization_rate,
        }
    }
}

/// Point of a protocol's history as served by the read API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryPoint {
    /// Snapshot time
    pub timestamp: DateTime<Utc>,
    /// Total value locked, in USD
    pub tvl_usd: Decimal,
    /// 7-day APY, in percent
    pub apy_7d: Option<Decimal>,
}

impl From<&Snapshot> for HistoryPoint {
    fn from(snapshot: &Snapshot) -> Self {
        Self {
            timestamp: snapshot.timestamp,
            tvl_usd: snapshot.tvl_usd,
            apy_7d: snapshot.apy_7d,
        }
    }
}
