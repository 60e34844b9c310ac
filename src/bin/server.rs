//! Protocol Monitor Server
//!
//! Serves the read API and, when an ingest interval is configured, runs the
//! ingestion cycle periodically in the background.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::{error, info};

use protocol_monitor::core::MonitorConfig;
use protocol_monitor::monitoring::{IngestionCycle, IngestionEngine, RuleSet};
use protocol_monitor::query::QueryService;
use protocol_monitor::rpc::{router, AppState};
use protocol_monitor::sources::build_sources;
use protocol_monitor::storage::{open_store, MonitorStore};

// ═══════════════════════════════════════════════════════════════════════════════
// SCHEDULER
// ═══════════════════════════════════════════════════════════════════════════════

/// Run the ingestion cycle every `period`, first tick immediately
async fn run_scheduler(config: MonitorConfig, store: Arc<dyn MonitorStore>, period: Duration) {
    // Sources may hold blocking HTTP clients, build them off the runtime
    let built = tokio::task::spawn_blocking(move || -> protocol_monitor::Result<IngestionCycle> {
        let engine = IngestionEngine::new(store, RuleSet::new(config.thresholds.clone()));
        Ok(IngestionCycle::new(engine, build_sources(&config)?))
    })
    .await;

    let cycle = match built {
        Ok(Ok(cycle)) => Arc::new(cycle),
        Ok(Err(e)) => {
            error!(error = %e, "Failed to build metric sources, scheduler disabled");
            return;
        }
        Err(e) => {
            error!(error = %e, "Scheduler setup task failed");
            return;
        }
    };

    info!(period_secs = period.as_secs(), protocols = ?cycle.protocols(), "Scheduler started");

    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        interval.tick().await;
        let cycle = cycle.clone();
        if let Err(e) = tokio::task::spawn_blocking(move || cycle.run_cycle()).await {
            error!(error = %e, "Ingestion cycle task failed");
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// MAIN
// ═══════════════════════════════════════════════════════════════════════════════

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let config_path = std::env::var("MONITOR_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| MonitorConfig::default_path());
    let config = MonitorConfig::load_or_default(&config_path)?;
    config.validate()?;

    let store = open_store(&config.store)
        .with_context(|| format!("Failed to open store {}", config.store.path.display()))?;

    if let Some(secs) = config.ingest_interval_secs {
        tokio::spawn(run_scheduler(config.clone(), store.clone(), Duration::from_secs(secs)));
    } else {
        info!("No ingest interval configured, serving read API only");
    }

    let app = router(AppState::new(QueryService::new(store)));

    let addr: SocketAddr = config
        .bind_addr
        .parse()
        .with_context(|| format!("Invalid bind address: {}", config.bind_addr))?;

    info!("Starting protocol monitor on {}", addr);
    info!("API endpoints:");
    info!("  GET /health                        - Health check");
    info!("  GET /protocols                     - Latest status per protocol");
    info!("  GET /protocols/:name/history?days= - Snapshot history");
    info!("  GET /alerts?status=open|resolved   - Alert log");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
