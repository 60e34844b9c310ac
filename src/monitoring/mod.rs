//! Anomaly detection and ingestion.
//!
//! # Components
//!
//! - **Rules**: the fixed TVL drop, low APY and high utilization checks
//! - **Engine**: evaluates a reading and commits snapshot plus alerts
//! - **Cycle**: runs the engine once for every configured protocol

pub mod cycle;
pub mod engine;
pub mod rules;

pub use cycle::*;
pub use engine::*;
pub use rules::*;
