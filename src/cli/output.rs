//! CLI Output Formatting.
//!
//! Handles output formatting for different formats (text, JSON, table).

use console::{measure_text_width, pad_str, style, Alignment};
use serde::Serialize;

use crate::core::{Alert, AlertSeverity, HistoryPoint, ProtocolHealth};
use crate::monitoring::CycleReport;
use crate::query::ProtocolReview;
use crate::utils::math::format_2dp;

// ═══════════════════════════════════════════════════════════════════════════════
// OUTPUT FORMAT
// ═══════════════════════════════════════════════════════════════════════════════

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// JSON format
    Json,
    /// Pretty JSON format
    JsonPretty,
    /// Table format
    Table,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "json-pretty" | "jsonpretty" => Ok(OutputFormat::JsonPretty),
            "table" | "tbl" => Ok(OutputFormat::Table),
            _ => Err(format!("Unknown format: {}", s)),
        }
    }
}

impl OutputFormat {
    /// Whether output is machine-readable
    pub fn is_json(&self) -> bool {
        matches!(self, OutputFormat::Json | OutputFormat::JsonPretty)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// OUTPUT FORMATTER
// ═══════════════════════════════════════════════════════════════════════════════

/// Output formatter for CLI
#[derive(Debug, Clone, Default)]
pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    /// Create new formatter
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Get format
    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Print success message
    pub fn success(&self, message: &str) {
        self.status_line("success", message, || println!("{} {}", style("✓").green(), message));
    }

    /// Print warning message
    pub fn warning(&self, message: &str) {
        self.status_line("warning", message, || println!("{} {}", style("⚠").yellow(), message));
    }

    /// Print info message
    pub fn info(&self, message: &str) {
        self.status_line("info", message, || println!("{} {}", style("ℹ").blue(), message));
    }

    fn status_line(&self, status: &str, message: &str, text: impl FnOnce()) {
        if self.format.is_json() {
            self.print_json(&serde_json::json!({ "status": status, "message": message }));
        } else {
            text();
        }
    }

    /// Print section header
    pub fn section(&self, title: &str) {
        if !self.format.is_json() {
            println!();
            println!("{}", style(format!("=== {} ===", title)).cyan().bold());
            println!();
        }
    }

    /// Print a serializable value as JSON, or `rows` as text records or a table
    pub fn records<T: Serialize>(&self, data: &T, headers: &[&str], rows: &[Vec<String>]) {
        if self.format.is_json() {
            self.print_json(data);
            return;
        }
        for line in self.render_rows(headers, rows) {
            println!("{}", line);
        }
    }

    fn render_rows(&self, headers: &[&str], rows: &[Vec<String>]) -> Vec<String> {
        if rows.is_empty() {
            return vec![style("(none)").dim().to_string()];
        }
        match self.format {
            OutputFormat::Table => render_table(headers, rows),
            _ => render_blocks(headers, rows),
        }
    }

    /// Print JSON data
    fn print_json<T: Serialize>(&self, data: &T) {
        let output = if matches!(self.format, OutputFormat::JsonPretty) {
            serde_json::to_string_pretty(data)
        } else {
            serde_json::to_string(data)
        };

        if let Ok(json) = output {
            println!("{}", json);
        }
    }
}

/// One `LABEL: value` block per record, blank line between records
fn render_blocks(headers: &[&str], rows: &[Vec<String>]) -> Vec<String> {
    let label_width = headers.iter().map(|h| measure_text_width(h)).max().unwrap_or(0);
    let mut lines = Vec::new();

    for (n, row) in rows.iter().enumerate() {
        if n > 0 {
            lines.push(String::new());
        }
        for (header, cell) in headers.iter().zip(row.iter()) {
            if cell.is_empty() {
                continue;
            }
            let label = pad_str(&format!("{}:", header), label_width + 1, Alignment::Left, None).into_owned();
            lines.push(format!("{} {}", style(label).dim(), cell));
        }
    }
    lines
}

/// Aligned grid with a header row and separator
fn render_table(headers: &[&str], rows: &[Vec<String>]) -> Vec<String> {
    if headers.is_empty() {
        return Vec::new();
    }

    let widths = column_widths(headers, rows);
    let mut lines = Vec::with_capacity(rows.len() + 2);

    let header_line: Vec<String> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| pad_str(h, widths[i], Alignment::Left, None).into_owned())
        .collect();
    lines.push(style(header_line.join(" | ")).bold().to_string());

    let separator: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    lines.push(separator.join("-+-"));

    for row in rows {
        let cells: Vec<String> = row
            .iter()
            .enumerate()
            .map(|(i, cell)| {
                let width = widths.get(i).copied().unwrap_or(0);
                pad_str(cell, width, Alignment::Left, None).into_owned()
            })
            .collect();
        lines.push(cells.join(" | "));
    }
    lines
}

/// Column widths fitting headers and cells, ignoring ANSI styling
fn column_widths(headers: &[&str], rows: &[Vec<String>]) -> Vec<usize> {
    let mut widths: Vec<usize> = headers.iter().map(|h| measure_text_width(h)).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(measure_text_width(cell));
            }
        }
    }
    widths
}

// ═══════════════════════════════════════════════════════════════════════════════
// ROWS
// ═══════════════════════════════════════════════════════════════════════════════

/// Headers of the status listing
pub const REVIEW_HEADERS: &[&str] = &["PROTOCOL", "TVL (USD)", "APY 7D (%)", "STATUS"];

/// Headers of the history listing
pub const HISTORY_HEADERS: &[&str] = &["TIMESTAMP", "TVL (USD)", "APY 7D (%)"];

/// Headers of the alert listing
pub const ALERT_HEADERS: &[&str] = &["ID", "PROTOCOL", "TYPE", "SEVERITY", "TRIGGERED", "STATE", "MESSAGE"];

/// Headers of a cycle report
pub const REPORT_HEADERS: &[&str] = &["PROTOCOL", "RESULT", "ALERTS", "ERROR"];

fn optional(value: Option<rust_decimal::Decimal>) -> String {
    value.map(format_2dp).unwrap_or_else(|| "-".into())
}

fn health_label(health: ProtocolHealth) -> String {
    match health {
        ProtocolHealth::Healthy => style(health.as_str()).green().to_string(),
        ProtocolHealth::Warning => style(health.as_str()).yellow().to_string(),
        ProtocolHealth::Critical => style(health.as_str()).red().bold().to_string(),
    }
}

fn severity_label(severity: AlertSeverity) -> String {
    match severity {
        AlertSeverity::Info => style(severity.as_str()).blue().to_string(),
        AlertSeverity::Warning => style(severity.as_str()).yellow().to_string(),
        AlertSeverity::Critical => style(severity.as_str()).red().bold().to_string(),
    }
}

/// Status listing rows
pub fn review_rows(reviews: &[ProtocolReview]) -> Vec<Vec<String>> {
    reviews
        .iter()
        .map(|r| {
            vec![
                r.name.clone(),
                format_2dp(r.tvl_usd),
                optional(r.apy_7d),
                health_label(r.status),
            ]
        })
        .collect()
}

/// History listing rows
pub fn history_rows(points: &[HistoryPoint]) -> Vec<Vec<String>> {
    points
        .iter()
        .map(|p| {
            vec![
                p.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
                format_2dp(p.tvl_usd),
                optional(p.apy_7d),
            ]
        })
        .collect()
}

/// Alert listing rows
pub fn alert_rows(alerts: &[Alert]) -> Vec<Vec<String>> {
    alerts
        .iter()
        .map(|a| {
            vec![
                a.id.to_string(),
                a.protocol_name.clone(),
                a.alert_type.to_string(),
                severity_label(a.severity),
                a.triggered_at.format("%Y-%m-%d %H:%M:%S").to_string(),
                if a.is_open() { "open".into() } else { "resolved".into() },
                a.message.clone(),
            ]
        })
        .collect()
}

/// Cycle report rows
pub fn report_rows(report: &CycleReport) -> Vec<Vec<String>> {
    report
        .runs
        .iter()
        .map(|run| match &run.failure {
            None => vec![
                run.protocol.clone(),
                style("ok").green().to_string(),
                run.alerts_opened.to_string(),
                String::new(),
            ],
            Some((_, reason)) => vec![
                run.protocol.clone(),
                if run.recoverable {
                    style("failed").red().to_string()
                } else {
                    style("failed (persistent)").red().bold().to_string()
                },
                "0".into(),
                reason.clone(),
            ],
        })
        .collect()
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════
