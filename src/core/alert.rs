//! Protocol alerts.
//!
//! Alerts are append-only. An alert is *open* while `resolved_at` is unset;
//! resolution happens outside this crate, the monitor never closes an alert
//! itself.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ═══════════════════════════════════════════════════════════════════════════════
// ALERT SEVERITY
// ═══════════════════════════════════════════════════════════════════════════════

/// Severity levels for alerts, ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    /// Informational alert
    Info,
    /// Warning - potential issue
    Warning,
    /// Critical - immediate attention required
    Critical,
}

impl AlertSeverity {
    /// Wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertSeverity::Info => "info",
            AlertSeverity::Warning => "warning",
            AlertSeverity::Critical => "critical",
        }
    }
}

impl std::fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ALERT TYPE
// ═══════════════════════════════════════════════════════════════════════════════

/// Types of alerts raised by the ingestion engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    /// TVL fell sharply against the previous snapshot
    TvlDrop,
    /// 7-day APY below the floor
    ApyLow,
    /// Lending utilization above the ceiling
    UtilizationHigh,
}

impl AlertType {
    /// Get default severity for this alert type
    pub fn default_severity(&self) -> AlertSeverity {
        match self {
            AlertType::TvlDrop => AlertSeverity::Critical,
            AlertType::ApyLow => AlertSeverity::Warning,
            AlertType::UtilizationHigh => AlertSeverity::Warning,
        }
    }

    /// Wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::TvlDrop => "tvl_drop",
            AlertType::ApyLow => "apy_low",
            AlertType::UtilizationHigh => "utilization_high",
        }
    }
}

impl std::fmt::Display for AlertType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ALERT
// ═══════════════════════════════════════════════════════════════════════════════

/// A rule outcome that has not been persisted yet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertTrigger {
    /// Alert type
    pub alert_type: AlertType,
    /// Severity level
    pub severity: AlertSeverity,
    /// Human-readable message
    pub message: String,
}

impl AlertTrigger {
    /// Create a trigger with the type's default severity
    pub fn new(alert_type: AlertType, message: String) -> Self {
        Self {
            alert_type,
            severity: alert_type.default_severity(),
            message,
        }
    }
}

/// A persisted alert
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    /// Store-assigned identity
    pub id: u64,
    /// Protocol the alert belongs to
    pub protocol_name: String,
    /// Alert type
    pub alert_type: AlertType,
    /// Severity level
    pub severity: AlertSeverity,
    /// Human-readable message
    pub message: String,
    /// When the alert was raised
    pub triggered_at: DateTime<Utc>,
    /// When the alert was resolved, if ever
    pub resolved_at: Option<DateTime<Utc>>,
}

impl Alert {
    /// Materialize a trigger as an open alert
    pub fn open(
        id: u64,
        protocol_name: impl Into<String>,
        trigger: AlertTrigger,
        triggered_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            protocol_name: protocol_name.into(),
            alert_type: trigger.alert_type,
            severity: trigger.severity,
            message: trigger.message,
            triggered_at,
            resolved_at: None,
        }
    }

    /// Whether the alert is still open
    pub fn is_open(&self) -> bool {
        self.resolved_at.is_none()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ALERT FILTER
// ═══════════════════════════════════════════════════════════════════════════════

/// Open/resolved filter for alert listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlertFilter {
    /// Every alert
    #[default]
    All,
    /// `resolved_at` unset
    Open,
    /// `resolved_at` set
    Resolved,
}

impl AlertFilter {
    /// Parse the API's `status` parameter; unknown values mean no filter
    pub fn from_query(status: Option<&str>) -> Self {
        match status {
            Some("open") => AlertFilter::Open,
            Some("resolved") => AlertFilter::Resolved,
            _ => AlertFilter::All,
        }
    }

    /// Check an alert against the filter
    pub fn matches(&self, alert: &Alert) -> bool {
        match self {
            AlertFilter::All => true,
            AlertFilter::Open => alert.is_open(),
            AlertFilter::Resolved => !alert.is_open(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PROTOCOL HEALTH
// ═══════════════════════════════════════════════════════════════════════════════

/// Derived status of a protocol, computed from its open alerts
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProtocolHealth {
    /// No open warning or critical alert
    Healthy,
    /// Worst open alert is a warning
    Warning,
    /// At least one open critical alert
    Critical,
}

impl ProtocolHealth {
    /// Worst severity wins; info alerts and resolved alerts do not count
    pub fn from_alerts<'a>(alerts: impl IntoIterator<Item = &'a Alert>) -> Self {
        let worst = alerts
            .into_iter()
            .filter(|a| a.is_open())
            .map(|a| a.severity)
            .max();

        match worst {
            Some(AlertSeverity::Critical) => ProtocolHealth::Critical,
            Some(AlertSeverity::Warning) => ProtocolHealth::Warning,
            Some(AlertSeverity::Info) | None => ProtocolHealth::Healthy,
        }
    }

    /// Wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            ProtocolHealth::Healthy => "healthy",
            ProtocolHealth::Warning => "warning",
            ProtocolHealth::Critical => "critical",
        }
    }
}

impl std::fmt::Display for ProtocolHealth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
