//! Simulated metric sources.
//!
//! Readings jitter uniformly around a fixed baseline. With a small
//! probability a reading carries an injected anomaly so the alert rules get
//! exercised without a live chain.

use std::sync::Mutex;
use std::time::Duration;

use num_traits::FromPrimitive;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;

use super::MetricSource;
use crate::core::MetricReading;
use crate::error::{Error, Result};

/// Shape of the simulated protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockProfile {
    /// TVL 10M ± 50k, APY 12.5 ± 1, utilization 0.80 ± 0.05
    Lending,
    /// TVL 50M ± 100k, APY 5 ± 0.5, no utilization
    Vault,
}

impl MockProfile {
    /// Default probability that a reading carries an anomaly
    pub fn default_anomaly_rate(&self) -> f64 {
        match self {
            MockProfile::Lending => 0.10,
            MockProfile::Vault => 0.05,
        }
    }
}

/// Mock source with uniform jitter around a baseline
#[derive(Debug)]
pub struct MockSource {
    protocol_name: String,
    profile: MockProfile,
    anomaly_rate: f64,
    latency: Duration,
    rng: Mutex<StdRng>,
}

impl MockSource {
    /// Create a mock source with the given profile
    pub fn new(protocol_name: impl Into<String>, profile: MockProfile) -> Self {
        Self {
            protocol_name: protocol_name.into(),
            profile,
            anomaly_rate: profile.default_anomaly_rate(),
            latency: Duration::ZERO,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Simulated lending market
    pub fn lending(protocol_name: impl Into<String>) -> Self {
        Self::new(protocol_name, MockProfile::Lending)
    }

    /// Simulated vault
    pub fn vault(protocol_name: impl Into<String>) -> Self {
        Self::new(protocol_name, MockProfile::Vault)
    }

    /// Reproducible randomness
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    /// Sleep this long on every fetch
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Override the anomaly probability (clamped to [0, 1], non-finite means 0)
    pub fn with_anomaly_rate(mut self, rate: f64) -> Self {
        self.anomaly_rate = if rate.is_finite() { rate.clamp(0.0, 1.0) } else { 0.0 };
        self
    }

    /// Simulated profile
    pub fn profile(&self) -> MockProfile {
        self.profile
    }

    fn decimal(&self, value: f64, dp: u32) -> Result<Decimal> {
        Decimal::from_f64(value)
            .map(|d| d.round_dp(dp))
            .ok_or_else(|| Error::MalformedReading {
                protocol: self.protocol_name.clone(),
                reason: format!("{} is not representable", value),
            })
    }

    fn lending_reading(&self, rng: &mut StdRng) -> Result<MetricReading> {
        let mut tvl = self.decimal(10_000_000.0 + rng.gen_range(-50_000.0..=50_000.0), 2)?;
        let mut apy = self.decimal(12.5 + rng.gen_range(-1.0..=1.0), 4)?;
        let mut utilization = self.decimal(0.80 + rng.gen_range(-0.05..=0.05), 4)?;

        if rng.gen_bool(self.anomaly_rate) {
            match rng.gen_range(0..3) {
                0 => tvl *= Decimal::new(7, 1),
                1 => apy = Decimal::new(15, 1),
                _ => utilization = Decimal::new(98, 2),
            }
        }

        Ok(MetricReading::new(&self.protocol_name, tvl, apy).with_utilization(utilization))
    }

    fn vault_reading(&self, rng: &mut StdRng) -> Result<MetricReading> {
        let mut tvl = self.decimal(50_000_000.0 + rng.gen_range(-100_000.0..=100_000.0), 2)?;
        let apy = self.decimal(5.0 + rng.gen_range(-0.5..=0.5), 4)?;

        if rng.gen_bool(self.anomaly_rate) {
            tvl *= Decimal::new(6, 1);
        }

        Ok(MetricReading::new(&self.protocol_name, tvl, apy))
    }
}

impl MetricSource for MockSource {
    fn protocol_name(&self) -> &str {
        &self.protocol_name
    }

    fn fetch(&self) -> Result<MetricReading> {
        if !self.latency.is_zero() {
            std::thread::sleep(self.latency);
        }

        let mut rng = self.rng.lock().map_err(|_| Error::Lock)?;
        match self.profile {
            MockProfile::Lending => self.lending_reading(&mut rng),
            MockProfile::Vault => self.vault_reading(&mut rng),
        }
    }
}
