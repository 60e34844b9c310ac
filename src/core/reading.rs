//! Metric readings as produced by a metric source.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One raw observation of a protocol, before the engine timestamps it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricReading {
    /// Protocol the reading belongs to
    pub protocol_name: String,
    /// Total value locked, in USD
    pub tvl_usd: Decimal,
    /// 7-day APY, in percent (12.5 means 12.5%)
    pub apy_7d: Decimal,
    /// Borrowed / supplied, only reported by lending protocols
    #[serde(default)]
    pub utilization_rate: Option<Decimal>,
}

impl MetricReading {
    /// Create a reading without a utilization rate
    pub fn new(protocol_name: impl Into<String>, tvl_usd: Decimal, apy_7d: Decimal) -> Self {
        Self {
            protocol_name: protocol_name.into(),
            tvl_usd,
            apy_7d,
            utilization_rate: None,
        }
    }

    /// Attach a utilization rate (lending protocols)
    pub fn with_utilization(mut self, utilization_rate: Decimal) -> Self {
        self.utilization_rate = Some(utilization_rate);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reading_builder() {
        let reading = MetricReading::new("felix", Decimal::new(10_000_000, 0), Decimal::new(125, 1))
            .with_utilization(Decimal::new(80, 2));
        assert_eq!(reading.protocol_name, "felix");
        assert_eq!(reading.utilization_rate, Some(Decimal::new(8, 1)));
    }

    #[test]
    fn test_reading_json_without_utilization() {
        let json = r#"{"protocol_name":"hlp","tvl_usd":"50000000","apy_7d":"5.0"}"#;
        let reading: MetricReading = serde_json::from_str(json).unwrap();
        assert_eq!(reading.utilization_rate, None);
        assert_eq!(reading.apy_7d, Decimal::new(5, 0));
    }
}
