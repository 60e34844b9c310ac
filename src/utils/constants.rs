//! Monitor constants and magic numbers.
//!
//! All monitor-wide defaults are defined here for easy auditing and modification.

use rust_decimal::Decimal;

// ═══════════════════════════════════════════════════════════════════════════════
// ALERT THRESHOLDS
// ═══════════════════════════════════════════════════════════════════════════════

/// TVL drop versus the previous snapshot that raises a critical alert - 20%
/// Strictly greater than triggers; exactly 20% does not
pub const CRITICAL_TVL_DROP: Decimal = Decimal::from_parts(20, 0, 0, false, 2);

/// 7-day APY (in percent) below which a warning is raised - 2%
pub const WARNING_APY_MIN: Decimal = Decimal::from_parts(20, 0, 0, false, 1);

/// Utilization rate above which a warning is raised - 95%
pub const WARNING_UTILIZATION_MAX: Decimal = Decimal::from_parts(95, 0, 0, false, 2);

// ═══════════════════════════════════════════════════════════════════════════════
// QUERY CONSTANTS
// ═══════════════════════════════════════════════════════════════════════════════

/// History window used when the caller does not pass `days`
pub const DEFAULT_HISTORY_DAYS: u32 = 30;

/// Smallest accepted history window
pub const MIN_HISTORY_DAYS: u32 = 1;

/// Largest accepted history window
pub const MAX_HISTORY_DAYS: u32 = 365;

// ═══════════════════════════════════════════════════════════════════════════════
// SERVICE DEFAULTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Default bind address of the read API
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8000";

/// Default store file, relative to the working directory
pub const DEFAULT_STORE_FILE: &str = "protocol_monitor.json";

/// Simulated API latency of the mock sources
pub const DEFAULT_MOCK_LATENCY_MS: u64 = 500;

/// Timeout for remote metric sources
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;

/// User agent sent by remote metric sources
pub const USER_AGENT: &str = concat!("protocol-monitor/", env!("CARGO_PKG_VERSION"));
