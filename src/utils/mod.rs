//! Utility modules for the protocol monitor.
//!
//! - Constants (thresholds, query bounds, service defaults)
//! - Decimal helpers

pub mod constants;
pub mod math;

pub use constants::*;
pub use math::*;
