//! HTTP metric source.
//!
//! Polls a JSON endpoint answering with
//! `{"tvl_usd": ..., "apy_7d": ..., "utilization_rate": ...}`. Numbers may be
//! sent as JSON numbers or as strings; both are parsed exactly.

use std::str::FromStr;
use std::time::Duration;

use reqwest::blocking::Client;
use rust_decimal::Decimal;
use serde_json::Value;

use super::MetricSource;
use crate::core::MetricReading;
use crate::error::{Error, Result};
use crate::utils::constants::USER_AGENT;

/// Blocking HTTP source for one protocol
#[derive(Debug)]
pub struct HttpMetricSource {
    protocol_name: String,
    url: String,
    client: Client,
}

impl HttpMetricSource {
    /// Create a source polling `url` with the given request timeout
    pub fn new(protocol_name: impl Into<String>, url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            protocol_name: protocol_name.into(),
            url: url.into(),
            client,
        })
    }

    /// Endpoint URL
    pub fn url(&self) -> &str {
        &self.url
    }

    fn unavailable(&self, reason: impl ToString) -> Error {
        Error::SourceUnavailable {
            protocol: self.protocol_name.clone(),
            reason: reason.to_string(),
        }
    }
}

impl MetricSource for HttpMetricSource {
    fn protocol_name(&self) -> &str {
        &self.protocol_name
    }

    fn fetch(&self) -> Result<MetricReading> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| self.unavailable(e))?;

        let payload: Value = response.json().map_err(|e| Error::MalformedReading {
            protocol: self.protocol_name.clone(),
            reason: e.to_string(),
        })?;

        parse_payload(&self.protocol_name, &payload)
    }
}

/// Turn an endpoint payload into a reading for `protocol`.
///
/// The configured protocol name always wins over a name in the payload.
pub fn parse_payload(protocol: &str, payload: &Value) -> Result<MetricReading> {
    let malformed = |reason: String| Error::MalformedReading {
        protocol: protocol.to_string(),
        reason,
    };

    let field = |name: &str| -> Result<Option<Decimal>> {
        match payload.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => parse_decimal(s)
                .map(Some)
                .ok_or_else(|| malformed(format!("{} is not a decimal: {}", name, s))),
            Some(Value::Number(n)) => parse_decimal(&n.to_string())
                .map(Some)
                .ok_or_else(|| malformed(format!("{} is out of range: {}", name, n))),
            Some(other) => Err(malformed(format!("{} has unexpected type: {}", name, other))),
        }
    };

    let tvl_usd = field("tvl_usd")?.ok_or_else(|| malformed("missing tvl_usd".into()))?;
    let apy_7d = field("apy_7d")?.ok_or_else(|| malformed("missing apy_7d".into()))?;
    let utilization_rate = field("utilization_rate")?;

    Ok(MetricReading {
        protocol_name: protocol.to_string(),
        tvl_usd,
        apy_7d,
        utilization_rate,
    })
}

fn parse_decimal(s: &str) -> Option<Decimal> {
    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .ok()
}
