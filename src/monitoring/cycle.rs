//! Ingestion cycle driver.
//!
//! One cycle walks the configured sources in order, fetches a reading from
//! each and hands it to the engine. A failing protocol is logged and
//! skipped; it never stops the rest of the cycle.

use std::time::Instant;

use serde::Serialize;
use tracing::{error, info};

use super::engine::{IngestionEngine, ProcessOutcome};
use crate::error::Error;
use crate::sources::MetricSource;

/// Stage at which a protocol failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureStage {
    /// The source could not produce a reading
    Fetch,
    /// The engine could not persist it
    Process,
}

/// Result of one protocol within a cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProtocolRun {
    /// Protocol name
    pub protocol: String,
    /// Alerts opened, zero on failure
    pub alerts_opened: usize,
    /// Failure, if any
    pub failure: Option<(FailureStage, String)>,
    /// Whether the next cycle may succeed where this one failed
    pub recoverable: bool,
}

impl ProtocolRun {
    /// Whether the protocol's reading was committed
    pub fn succeeded(&self) -> bool {
        self.failure.is_none()
    }
}

/// Observational summary of a cycle
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    /// Per-protocol results in processing order
    pub runs: Vec<ProtocolRun>,
    /// Wall-clock duration in milliseconds
    pub duration_ms: u64,
}

impl CycleReport {
    /// Protocols whose reading was committed
    pub fn succeeded(&self) -> impl Iterator<Item = &ProtocolRun> {
        self.runs.iter().filter(|r| r.succeeded())
    }

    /// Protocols that failed
    pub fn failed(&self) -> impl Iterator<Item = &ProtocolRun> {
        self.runs.iter().filter(|r| !r.succeeded())
    }

    /// Failed protocols that will keep failing until something is fixed
    pub fn persistent_failures(&self) -> impl Iterator<Item = &ProtocolRun> {
        self.runs.iter().filter(|r| !r.succeeded() && !r.recoverable)
    }

    /// Alerts opened across the cycle
    pub fn total_alerts(&self) -> usize {
        self.runs.iter().map(|r| r.alerts_opened).sum()
    }
}

/// Runs the engine once per configured source
pub struct IngestionCycle {
    engine: IngestionEngine,
    sources: Vec<Box<dyn MetricSource>>,
}

impl IngestionCycle {
    /// Create a cycle over `sources`
    pub fn new(engine: IngestionEngine, sources: Vec<Box<dyn MetricSource>>) -> Self {
        Self { engine, sources }
    }

    /// Underlying engine
    pub fn engine(&self) -> &IngestionEngine {
        &self.engine
    }

    /// Configured protocol names, in processing order
    pub fn protocols(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.protocol_name()).collect()
    }

    /// Run one ingestion cycle
    pub fn run_cycle(&self) -> CycleReport {
        info!(protocols = self.sources.len(), "Starting ingestion cycle");
        let started = Instant::now();

        let runs = self.sources.iter().map(|source| self.run_one(source.as_ref())).collect();

        let report = CycleReport {
            runs,
            duration_ms: started.elapsed().as_millis() as u64,
        };

        info!(
            succeeded = report.succeeded().count(),
            failed = report.failed().count(),
            persistent = report.persistent_failures().count(),
            alerts = report.total_alerts(),
            duration_ms = report.duration_ms,
            "Ingestion cycle complete"
        );

        report
    }

    fn run_one(&self, source: &dyn MetricSource) -> ProtocolRun {
        let protocol = source.protocol_name().to_string();

        let outcome = source
            .fetch()
            .map_err(|e| (FailureStage::Fetch, e))
            .and_then(|reading| {
                self.engine
                    .process_reading(&reading)
                    .map_err(|e| (FailureStage::Process, e))
            });

        match outcome {
            Ok(ProcessOutcome { alerts, .. }) => ProtocolRun {
                protocol,
                alerts_opened: alerts.len(),
                failure: None,
                recoverable: true,
            },
            Err((stage, e)) => {
                log_failure(&protocol, stage, &e);
                ProtocolRun {
                    protocol,
                    alerts_opened: 0,
                    recoverable: e.is_recoverable(),
                    failure: Some((stage, e.to_string())),
                }
            }
        }
    }
}

fn log_failure(protocol: &str, stage: FailureStage, e: &Error) {
    let recoverable = e.is_recoverable();
    match stage {
        FailureStage::Fetch => error!(protocol, recoverable, error = %e, "Failed to fetch metrics"),
        FailureStage::Process => error!(protocol, recoverable, error = %e, "Failed to ingest metrics"),
    }
}
