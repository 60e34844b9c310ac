//! Core modules for the protocol monitor.
//!
//! This module contains the fundamental building blocks:
//! - Metric readings and persisted snapshots
//! - Alerts, severities and derived protocol health
//! - Configuration

pub mod alert;
pub mod config;
pub mod reading;
pub mod snapshot;

pub use alert::*;
pub use config::*;
pub use reading::*;
pub use snapshot::*;
