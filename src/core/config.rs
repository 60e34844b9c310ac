//! Monitor configuration.
//!
//! Configuration is a JSON document with environment overrides on top.
//! Everything has a default, so an empty environment and no file yields a
//! working monitor of the two built-in mock protocols.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::utils::constants::*;

// ═══════════════════════════════════════════════════════════════════════════════
// ALERT THRESHOLDS
// ═══════════════════════════════════════════════════════════════════════════════

/// Thresholds of the three anomaly rules. All comparisons are strict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertThresholds {
    /// Relative TVL drop (0.20 = 20%) above which a critical alert fires
    pub tvl_drop: Decimal,
    /// APY in percent below which a warning fires
    pub apy_min: Decimal,
    /// Utilization ratio above which a warning fires
    pub utilization_max: Decimal,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            tvl_drop: CRITICAL_TVL_DROP,
            apy_min: WARNING_APY_MIN,
            utilization_max: WARNING_UTILIZATION_MAX,
        }
    }
}

impl AlertThresholds {
    /// Validate threshold ranges
    pub fn validate(&self) -> Result<()> {
        if self.tvl_drop <= Decimal::ZERO || self.tvl_drop > Decimal::ONE {
            return Err(Error::Config("tvl_drop must be in (0, 1]".into()));
        }
        if self.apy_min < Decimal::ZERO {
            return Err(Error::Config("apy_min cannot be negative".into()));
        }
        if self.utilization_max <= Decimal::ZERO || self.utilization_max > Decimal::ONE {
            return Err(Error::Config("utilization_max must be in (0, 1]".into()));
        }
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// STORE CONFIGURATION
// ═══════════════════════════════════════════════════════════════════════════════

/// On-disk encoding of a file store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreFormat {
    /// Human-readable JSON document
    #[default]
    Json,
    /// Compact bincode document
    Binary,
}

impl std::str::FromStr for StoreFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "json" => Ok(StoreFormat::Json),
            "binary" | "bin" | "bincode" => Ok(StoreFormat::Binary),
            _ => Err(Error::Config(format!("Unknown store format: {}", s))),
        }
    }
}

/// Where and how snapshots and alerts are persisted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Store file
    pub path: PathBuf,
    /// Encoding
    #[serde(default)]
    pub format: StoreFormat,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_STORE_FILE),
            format: StoreFormat::Json,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PROTOCOL SOURCES
// ═══════════════════════════════════════════════════════════════════════════════

/// Which metric source feeds a protocol
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceKind {
    /// Simulated lending market (TVL, APY and utilization)
    MockLending,
    /// Simulated vault (TVL and APY only)
    MockVault,
    /// Remote JSON endpoint returning a reading
    Http {
        /// Endpoint URL
        url: String,
    },
}

/// A monitored protocol
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolSourceConfig {
    /// Protocol name, used as the key of every snapshot and alert
    pub name: String,
    /// Source of its readings
    pub source: SourceKind,
}

impl ProtocolSourceConfig {
    /// Create a protocol entry
    pub fn new(name: impl Into<String>, source: SourceKind) -> Self {
        Self {
            name: name.into(),
            source,
        }
    }
}

fn default_protocols() -> Vec<ProtocolSourceConfig> {
    vec![
        ProtocolSourceConfig::new("felix", SourceKind::MockLending),
        ProtocolSourceConfig::new("hlp", SourceKind::MockVault),
    ]
}

// ═══════════════════════════════════════════════════════════════════════════════
// MONITOR CONFIGURATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Monitor configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Persistence
    pub store: StoreConfig,
    /// Read API bind address
    pub bind_addr: String,
    /// Anomaly rule thresholds
    pub thresholds: AlertThresholds,
    /// Monitored protocols, processed in this order
    pub protocols: Vec<ProtocolSourceConfig>,
    /// Simulated latency of mock sources in milliseconds
    pub mock_latency_ms: u64,
    /// Request timeout of HTTP sources in seconds
    pub http_timeout_secs: u64,
    /// Period of the server's ingestion loop; `None` disables it
    pub ingest_interval_secs: Option<u64>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            bind_addr: DEFAULT_BIND_ADDR.into(),
            thresholds: AlertThresholds::default(),
            protocols: default_protocols(),
            mock_latency_ms: DEFAULT_MOCK_LATENCY_MS,
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            ingest_interval_secs: None,
        }
    }
}

impl MonitorConfig {
    /// Load from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;

        serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))
    }

    /// Save to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| Error::Serialization(e.to_string()))?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| Error::Config(format!("Failed to create {}: {}", parent.display(), e)))?;
            }
        }

        std::fs::write(path, content)
            .map_err(|e| Error::Config(format!("Failed to write {}: {}", path.display(), e)))
    }

    /// Defaults with environment overrides applied
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Load `path` if it exists, otherwise defaults; environment wins either way
    pub fn load_or_default(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            Self::load(path)?
        } else {
            Self::default()
        };
        config.apply_env()?;
        Ok(config)
    }

    /// Apply `MONITOR_*` environment overrides
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("MONITOR_STORE_PATH") {
            self.store.path = PathBuf::from(path);
        }

        if let Some(format) = lookup("MONITOR_STORE_FORMAT") {
            self.store.format = format.parse()?;
        }

        if let Some(bind) = lookup("MONITOR_BIND") {
            self.bind_addr = bind;
        }

        if let Some(interval) = lookup("MONITOR_INGEST_INTERVAL_SECS") {
            let secs = interval.parse().map_err(|_| {
                Error::Config(format!("MONITOR_INGEST_INTERVAL_SECS is not a number: {}", interval))
            })?;
            self.ingest_interval_secs = Some(secs);
        }

        if let Some(latency) = lookup("MONITOR_MOCK_LATENCY_MS") {
            self.mock_latency_ms = latency.parse().map_err(|_| {
                Error::Config(format!("MONITOR_MOCK_LATENCY_MS is not a number: {}", latency))
            })?;
        }

        Ok(())
    }

    /// Get default config file path
    pub fn default_path() -> PathBuf {
        default_config_dir().join("config.json")
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.bind_addr.trim().is_empty() {
            return Err(Error::Config("Bind address cannot be empty".into()));
        }

        self.thresholds.validate()?;

        if self.protocols.is_empty() {
            return Err(Error::Config("At least one protocol must be configured".into()));
        }

        let mut seen = HashSet::new();
        for protocol in &self.protocols {
            if protocol.name.trim().is_empty() {
                return Err(Error::Config("Protocol name cannot be empty".into()));
            }
            if !seen.insert(protocol.name.as_str()) {
                return Err(Error::Config(format!("Duplicate protocol: {}", protocol.name)));
            }
            if let SourceKind::Http { url } = &protocol.source {
                if url.trim().is_empty() {
                    return Err(Error::Config(format!("Protocol {} has an empty URL", protocol.name)));
                }
            }
        }

        if self.ingest_interval_secs == Some(0) {
            return Err(Error::Config("Ingest interval must be greater than 0".into()));
        }

        if self.http_timeout_secs == 0 {
            return Err(Error::Config("HTTP timeout must be greater than 0".into()));
        }

        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// HELPER FUNCTIONS
// ═══════════════════════════════════════════════════════════════════════════════

/// Get default configuration directory
fn default_config_dir() -> PathBuf {
    #[cfg(target_os = "linux")]
    {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(".protocol-monitor");
        }
    }

    #[cfg(target_os = "macos")]
    {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join("Library/Application Support/protocol-monitor");
        }
    }

    #[cfg(target_os = "windows")]
    {
        if let Ok(appdata) = std::env::var("APPDATA") {
            return PathBuf::from(appdata).join("protocol-monitor");
        }
    }

    PathBuf::from(".protocol-monitor")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_config_default() {
        let config = MonitorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.bind_addr, "127.0.0.1:8000");
        assert_eq!(config.protocols[0].name, "felix");
        assert_eq!(config.protocols[1].source, SourceKind::MockVault);
        assert_eq!(config.ingest_interval_secs, None);
    }

    #[test]
    fn test_config_validation() {
        let mut config = MonitorConfig::default();
        config.bind_addr = String::new();
        assert!(config.validate().is_err());

        let mut config = MonitorConfig::default();
        config.protocols.push(ProtocolSourceConfig::new("felix", SourceKind::MockVault));
        assert!(config.validate().is_err());

        let mut config = MonitorConfig::default();
        config.protocols.clear();
        assert!(config.validate().is_err());

        let mut config = MonitorConfig::default();
        config.ingest_interval_secs = Some(0);
        assert!(config.validate().is_err());

        let mut config = MonitorConfig::default();
        config.thresholds.utilization_max = Decimal::new(15, 1);
        assert!(config.validate().is_err());

        let mut config = MonitorConfig::default();
        config.protocols = vec![ProtocolSourceConfig::new(
            "remote",
            SourceKind::Http { url: " ".into() },
        )];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            ("MONITOR_STORE_PATH", "/tmp/monitor.bin"),
            ("MONITOR_STORE_FORMAT", "binary"),
            ("MONITOR_BIND", "0.0.0.0:9000"),
            ("MONITOR_INGEST_INTERVAL_SECS", "60"),
            ("MONITOR_MOCK_LATENCY_MS", "0"),
        ]
        .into_iter()
        .collect();

        let mut config = MonitorConfig::default();
        config
            .apply_overrides(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.store.path, PathBuf::from("/tmp/monitor.bin"));
        assert_eq!(config.store.format, StoreFormat::Binary);
        assert_eq!(config.bind_addr, "0.0.0.0:9000");
        assert_eq!(config.ingest_interval_secs, Some(60));
        assert_eq!(config.mock_latency_ms, 0);
    }

    #[test]
    fn test_bad_override_rejected() {
        let mut config = MonitorConfig::default();
        let result = config.apply_overrides(|key| {
            (key == "MONITOR_INGEST_INTERVAL_SECS").then(|| "soon".to_string())
        });
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let mut config = MonitorConfig::default();
        config.protocols.push(ProtocolSourceConfig::new(
            "aave",
            SourceKind::Http { url: "http://localhost:9999/aave".into() },
        ));
        config.save(&path).unwrap();

        let loaded = MonitorConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"bind_addr": "0.0.0.0:8080"}"#).unwrap();

        let loaded = MonitorConfig::load(&path).unwrap();
        assert_eq!(loaded.bind_addr, "0.0.0.0:8080");
        assert_eq!(loaded.thresholds, AlertThresholds::default());
        assert_eq!(loaded.protocols.len(), 2);
    }

    #[test]
    fn test_store_format_parsing() {
        assert_eq!("json".parse::<StoreFormat>().unwrap(), StoreFormat::Json);
        assert_eq!("BIN".parse::<StoreFormat>().unwrap(), StoreFormat::Binary);
        assert!("yaml".parse::<StoreFormat>().is_err());
    }
}
