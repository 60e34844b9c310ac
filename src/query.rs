//! Read-only projections over the store.
//!
//! Status is never stored: it is recomputed from open alerts on every call.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::core::{Alert, AlertFilter, HistoryPoint, ProtocolHealth};
use crate::error::{Error, Result};
use crate::storage::MonitorStore;
use crate::utils::constants::{DEFAULT_HISTORY_DAYS, MAX_HISTORY_DAYS, MIN_HISTORY_DAYS};

// ═══════════════════════════════════════════════════════════════════════════════
// HISTORY WINDOW
// ═══════════════════════════════════════════════════════════════════════════════

/// Validated look-back window of a history query, in days
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HistoryWindow(u32);

impl HistoryWindow {
    /// Accepts 1..=365
    pub fn new(days: i64) -> Result<Self> {
        if days < i64::from(MIN_HISTORY_DAYS) || days > i64::from(MAX_HISTORY_DAYS) {
            return Err(Error::invalid_parameter(
                "days",
                format!(
                    "must be between {} and {}, got {}",
                    MIN_HISTORY_DAYS, MAX_HISTORY_DAYS, days
                ),
            ));
        }
        Ok(Self(days as u32))
    }

    /// Parse the API's `days` parameter; absent means the default window
    pub fn from_query(days: Option<&str>) -> Result<Self> {
        match days {
            None => Ok(Self::default()),
            Some(raw) => {
                let days = raw
                    .trim()
                    .parse::<i64>()
                    .map_err(|_| Error::invalid_parameter("days", format!("not an integer: {}", raw)))?;
                Self::new(days)
            }
        }
    }

    /// Window length in days
    pub fn days(&self) -> u32 {
        self.0
    }

    /// Oldest timestamp inside the window ending at `now`
    pub fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - Duration::days(i64::from(self.0))
    }
}

impl Default for HistoryWindow {
    fn default() -> Self {
        Self(DEFAULT_HISTORY_DAYS)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PROJECTIONS
// ═══════════════════════════════════════════════════════════════════════════════

/// Latest metrics and derived status of a protocol
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolReview {
    /// Protocol name
    pub name: String,
    /// TVL of the latest snapshot
    pub tvl_usd: Decimal,
    /// APY of the latest snapshot
    pub apy_7d: Option<Decimal>,
    /// Worst open alert severity
    pub status: ProtocolHealth,
}

/// Query service backing the read API and the CLI
#[derive(Clone)]
pub struct QueryService {
    store: Arc<dyn MonitorStore>,
}

impl QueryService {
    /// Create a query service over `store`
    pub fn new(store: Arc<dyn MonitorStore>) -> Self {
        Self { store }
    }

    /// Latest snapshot and status of every known protocol, sorted by name
    pub fn protocol_statuses(&self) -> Result<Vec<ProtocolReview>> {
        let open = self.store.open_alerts(None)?;
        let mut reviews = Vec::new();

        for name in self.store.protocol_names()? {
            let Some(latest) = self.store.latest_snapshot(&name)? else {
                continue;
            };

            let status = ProtocolHealth::from_alerts(open.iter().filter(|a| a.protocol_name == name));
            reviews.push(ProtocolReview {
                name,
                tvl_usd: latest.tvl_usd,
                apy_7d: latest.apy_7d,
                status,
            });
        }

        Ok(reviews)
    }

    /// History of a protocol over the window ending now, oldest first
    pub fn protocol_history(&self, name: &str, window: HistoryWindow) -> Result<Vec<HistoryPoint>> {
        self.protocol_history_at(name, window, Utc::now())
    }

    /// History of a protocol over the window ending at `now`
    pub fn protocol_history_at(
        &self,
        name: &str,
        window: HistoryWindow,
        now: DateTime<Utc>,
    ) -> Result<Vec<HistoryPoint>> {
        Ok(self
            .store
            .snapshots_since(name, window.cutoff(now))?
            .iter()
            .map(HistoryPoint::from)
            .collect())
    }

    /// Alerts matching `filter`, newest first
    pub fn alerts(&self, filter: AlertFilter) -> Result<Vec<Alert>> {
        self.store.alerts(filter)
    }
}
