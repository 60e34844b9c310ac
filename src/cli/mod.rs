//! Protocol monitor command line interface.
//!
//! Provides operator tools: one-shot ingestion and the read projections.

pub mod output;

pub use output::*;

use std::sync::Arc;

use crate::core::{AlertFilter, MonitorConfig};
use crate::error::Result;
use crate::monitoring::{CycleReport, IngestionCycle, IngestionEngine, RuleSet};
use crate::query::{HistoryWindow, QueryService};
use crate::sources::build_sources;
use crate::storage::{open_store, MonitorStore};

// ═══════════════════════════════════════════════════════════════════════════════
// CLI APPLICATION
// ═══════════════════════════════════════════════════════════════════════════════

/// CLI Application state
pub struct MonitorApp {
    /// Configuration
    config: MonitorConfig,
    /// Store shared by every command
    store: Arc<dyn MonitorStore>,
    /// Output formatter
    output: OutputFormatter,
    /// Verbose mode
    verbose: bool,
}

impl MonitorApp {
    /// Open the configured store and build the application
    pub fn open(config: MonitorConfig) -> Result<Self> {
        config.validate()?;
        let store = open_store(&config.store)?;
        Ok(Self::with_store(config, store))
    }

    /// Build the application over an existing store
    pub fn with_store(config: MonitorConfig, store: Arc<dyn MonitorStore>) -> Self {
        Self {
            config,
            store,
            output: OutputFormatter::default(),
            verbose: false,
        }
    }

    /// Enable verbose output
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Set output format
    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.output = OutputFormatter::new(format);
        self
    }

    /// Get configuration
    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Get output formatter
    pub fn output(&self) -> &OutputFormatter {
        &self.output
    }

    /// Check if verbose
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    fn query(&self) -> QueryService {
        QueryService::new(self.store.clone())
    }

    /// Run one ingestion cycle over the configured protocols
    pub fn ingest(&self) -> Result<CycleReport> {
        let engine = IngestionEngine::new(self.store.clone(), RuleSet::new(self.config.thresholds.clone()));
        let cycle = IngestionCycle::new(engine, build_sources(&self.config)?);
        Ok(cycle.run_cycle())
    }

    /// Print a cycle report
    pub fn print_report(&self, report: &CycleReport) {
        self.output.section("Ingestion Cycle");
        self.output.records(report, REPORT_HEADERS, &report_rows(report));

        if !self.output.format().is_json() {
            let failed = report.failed().count();
            let summary = format!(
                "{} protocol(s) ingested, {} alert(s) opened in {} ms",
                report.succeeded().count(),
                report.total_alerts(),
                report.duration_ms
            );
            if failed == 0 {
                self.output.success(&summary);
            } else {
                self.output.warning(&format!("{}, {} failed", summary, failed));
            }
        }
    }

    /// Print the status of every protocol
    pub fn show_status(&self) -> Result<()> {
        let reviews = self.query().protocol_statuses()?;
        self.output.section("Protocol Status");
        self.output.records(&reviews, REVIEW_HEADERS, &review_rows(&reviews));
        Ok(())
    }

    /// Print the history of one protocol
    pub fn show_history(&self, name: &str, days: Option<i64>) -> Result<()> {
        let window = match days {
            Some(days) => HistoryWindow::new(days)?,
            None => HistoryWindow::default(),
        };

        if self.verbose {
            self.output.info(&format!("Looking back {} day(s)", window.days()));
        }

        let points = self.query().protocol_history(name, window)?;
        self.output.section(&format!("History: {}", name));
        self.output.records(&points, HISTORY_HEADERS, &history_rows(&points));
        Ok(())
    }

    /// Print the alert log
    pub fn show_alerts(&self, filter: AlertFilter) -> Result<()> {
        let alerts = self.query().alerts(filter)?;
        self.output.section("Alerts");
        self.output.records(&alerts, ALERT_HEADERS, &alert_rows(&alerts));
        Ok(())
    }
}

impl std::fmt::Debug for MonitorApp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MonitorApp")
            .field("config", &self.config)
            .field("output", &self.output)
            .field("verbose", &self.verbose)
            .finish_non_exhaustive()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════
