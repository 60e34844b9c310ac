//! Metric sources.
//!
//! A [`MetricSource`] produces one [`MetricReading`] per call for exactly
//! one protocol. Sources may fail; the ingestion cycle logs the failure and
//! moves on to the next protocol.
//!
//! ## Sources
//!
//! - **MockSource**: simulated lending market or vault with random jitter
//!   and occasional injected anomalies
//! - **HttpMetricSource**: JSON endpoint (requires the `http-source` feature)

pub mod mock;

#[cfg(feature = "http-source")]
pub mod http;

pub use mock::{MockProfile, MockSource};

#[cfg(feature = "http-source")]
pub use http::HttpMetricSource;

use std::time::Duration;

use crate::core::{MetricReading, MonitorConfig, SourceKind};
use crate::error::Result;

/// Supplier of readings for one protocol
pub trait MetricSource: Send + Sync {
    /// Protocol this source reports on
    fn protocol_name(&self) -> &str;

    /// Fetch the current reading
    fn fetch(&self) -> Result<MetricReading>;
}

/// Instantiate the configured sources, in configuration order
pub fn build_sources(config: &MonitorConfig) -> Result<Vec<Box<dyn MetricSource>>> {
    let latency = Duration::from_millis(config.mock_latency_ms);

    config
        .protocols
        .iter()
        .map(|protocol| -> Result<Box<dyn MetricSource>> {
            match &protocol.source {
                SourceKind::MockLending => {
                    Ok(Box::new(MockSource::lending(&protocol.name).with_latency(latency)))
                }
                SourceKind::MockVault => {
                    Ok(Box::new(MockSource::vault(&protocol.name).with_latency(latency)))
                }
                SourceKind::Http { url } => http_source(
                    &protocol.name,
                    url,
                    Duration::from_secs(config.http_timeout_secs),
                ),
            }
        })
        .collect()
}

#[cfg(feature = "http-source")]
fn http_source(name: &str, url: &str, timeout: Duration) -> Result<Box<dyn MetricSource>> {
    Ok(Box::new(HttpMetricSource::new(name, url, timeout)?))
}

#[cfg(not(feature = "http-source"))]
fn http_source(name: &str, _url: &str, _timeout: Duration) -> Result<Box<dyn MetricSource>> {
    Err(crate::error::Error::Config(format!(
        "Protocol {} uses an HTTP source but the http-source feature is disabled",
        name
    )))
}
