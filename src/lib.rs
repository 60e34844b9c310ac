//! # Protocol Monitor
//!
//! Health monitoring for decentralized-finance protocols. Readings of total
//! value locked, yield and utilization are collected periodically, compared
//! against each protocol's history, and anomalous deviations raise alerts.
//! Snapshots and alerts are served through a read-only API.
//!
//! ## Architecture
//!
//! - **Core**: readings, snapshots, alerts and configuration
//! - **Sources**: metric sources (mock profiles, HTTP endpoints)
//! - **Monitoring**: anomaly rules, the ingestion engine and the cycle driver
//! - **Storage**: snapshot and alert stores with atomic commits
//! - **Query**: status, history and alert projections
//! - **RPC**: HTTP read API (feature `rpc-server`)
//!
//! ## Example
//!
//! ```rust,ignore
//! use protocol_monitor::prelude::*;
//!
//! let store: Arc<dyn MonitorStore> = Arc::new(InMemoryStore::new());
//! let engine = IngestionEngine::new(store.clone(), RuleSet::default());
//!
//! let reading = MetricReading::new("hlp", tvl, apy);
//! let outcome = engine.process_reading(&reading)?;
//! ```

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    trivial_casts,
    unused_lifetimes,
    unused_qualifications
)]

pub mod cli;
pub mod core;
pub mod error;
pub mod monitoring;
pub mod query;
pub mod rpc;
pub mod sources;
pub mod storage;
pub mod utils;

pub use error::{Error, Result};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::core::{
        alert::{Alert, AlertFilter, AlertSeverity, AlertTrigger, AlertType, ProtocolHealth},
        config::{AlertThresholds, MonitorConfig, ProtocolSourceConfig, SourceKind, StoreFormat},
        reading::MetricReading,
        snapshot::{HistoryPoint, Snapshot},
    };
    pub use crate::error::{Error, Result};
    pub use crate::monitoring::{
        cycle::{CycleReport, IngestionCycle},
        engine::{IngestionEngine, ProcessOutcome},
        rules::RuleSet,
    };
    pub use crate::query::{HistoryWindow, ProtocolReview, QueryService};
    pub use crate::sources::{build_sources, MetricSource, MockSource};
    pub use crate::storage::{open_store, FileStore, InMemoryStore, MonitorStore, SnapshotBatch};
    pub use std::sync::Arc;
}

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
