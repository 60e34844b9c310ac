//! Protocol Monitor CLI
//!
//! Command-line interface for ingesting protocol metrics and inspecting
//! snapshots and alerts.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use console::{style, Term};
use indicatif::{ProgressBar, ProgressStyle};

use protocol_monitor::cli::{MonitorApp, OutputFormat};
use protocol_monitor::core::{AlertFilter, MonitorConfig};
use protocol_monitor::storage::{FileStore, MonitorStore};

/// Protocol Monitor CLI - health monitoring for DeFi protocols
#[derive(Parser)]
#[command(name = "protocol-monitor")]
#[command(author = "Protocol Monitor Team")]
#[command(version = protocol_monitor::VERSION)]
#[command(about = "Track TVL, APY and utilization of DeFi protocols and alert on anomalies", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, env = "MONITOR_CONFIG")]
    config: Option<PathBuf>,

    /// Override the store path from the configuration
    #[arg(short, long)]
    store: Option<PathBuf>,

    /// Output format: text, json, json-pretty, table
    #[arg(short, long, default_value = "text")]
    format: OutputFormat,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration and create an empty store
    Init {
        /// Force overwrite existing configuration
        #[arg(long)]
        force: bool,
    },

    /// Run one ingestion cycle over every configured protocol
    Ingest,

    /// Latest snapshot and health of every protocol
    Status,

    /// Snapshot history of one protocol
    History {
        /// Protocol name
        name: String,

        /// Look-back window in days (1-365)
        #[arg(short, long, allow_negative_numbers = true)]
        days: Option<i64>,
    },

    /// Alert log, newest first
    Alerts {
        /// Only `open` or `resolved` alerts
        #[arg(long)]
        status: Option<String>,
    },
}

// ═══════════════════════════════════════════════════════════════════════════════
// MAIN
// ═══════════════════════════════════════════════════════════════════════════════

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let level = log_level(cli.verbose);
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let term = Term::stdout();

    if let Err(e) = run_command(&cli, &term) {
        eprintln!("{} {}", style("Error:").red().bold(), e);
        std::process::exit(1);
    }
}

fn run_command(cli: &Cli, term: &Term) -> anyhow::Result<()> {
    match &cli.command {
        Commands::Init { force } => cmd_init(cli, *force, term),
        Commands::Ingest => cmd_ingest(cli),
        Commands::Status => Ok(open_app(cli)?.show_status()?),
        Commands::History { name, days } => Ok(open_app(cli)?.show_history(name, *days)?),
        Commands::Alerts { status } => {
            Ok(open_app(cli)?.show_alerts(AlertFilter::from_query(status.as_deref()))?)
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMMAND HANDLERS
// ═══════════════════════════════════════════════════════════════════════════════

fn cmd_init(cli: &Cli, force: bool, term: &Term) -> anyhow::Result<()> {
    let _ = term.write_line(&format!(
        "{} Initializing protocol monitor configuration...",
        style("→").cyan()
    ));

    let config_path = config_path(cli);

    if config_path.exists() && !force {
        anyhow::bail!(
            "Configuration already exists: {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    let mut config = MonitorConfig::default();
    if let Some(store) = &cli.store {
        config.store.path = store.clone();
    }
    config.save(&config_path)?;

    let store = FileStore::open(&config.store.path, config.store.format)?;
    store.flush()?;

    let _ = term.write_line(&format!(
        "{} Configuration created at: {}",
        style("✓").green(),
        config_path.display()
    ));
    let _ = term.write_line(&format!(
        "{} Store: {}",
        style("✓").green(),
        style(config.store.path.display()).yellow()
    ));

    Ok(())
}

fn cmd_ingest(cli: &Cli) -> anyhow::Result<()> {
    let app = open_app(cli)?;

    let spinner = if app.output().format().is_json() {
        ProgressBar::hidden()
    } else {
        create_spinner(&format!(
            "Collecting metrics for {} protocol(s)...",
            app.config().protocols.len()
        ))
    };

    let report = app.ingest();
    spinner.finish_and_clear();

    app.print_report(&report?);
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════════════
// HELPERS
// ═══════════════════════════════════════════════════════════════════════════════

fn log_level(verbose: bool) -> tracing::Level {
    if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    }
}

fn config_path(cli: &Cli) -> PathBuf {
    cli.config.clone().unwrap_or_else(MonitorConfig::default_path)
}

fn load_config(cli: &Cli) -> anyhow::Result<MonitorConfig> {
    let mut config = MonitorConfig::load_or_default(&config_path(cli))?;
    if let Some(store) = &cli.store {
        config.store.path = store.clone();
    }
    Ok(config)
}

fn open_app(cli: &Cli) -> anyhow::Result<MonitorApp> {
    let config = load_config(cli)?;
    Ok(MonitorApp::open(config)?
        .with_format(cli.format)
        .with_verbose(cli.verbose))
}

fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"])
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}
