//! HTTP read API tests.

#![cfg(feature = "rpc-server")]

use std::str::FromStr;
use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use serde_json::Value;
use tower::ServiceExt;

use protocol_monitor::core::MetricReading;
use protocol_monitor::monitoring::{IngestionEngine, RuleSet};
use protocol_monitor::query::QueryService;
use protocol_monitor::rpc::{router, AppState};
use protocol_monitor::storage::{InMemoryStore, MonitorStore};

fn d(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

/// felix: crashed TVL (critical). hlp: low APY (warning).
fn seeded_app() -> axum::Router {
    let store: Arc<dyn MonitorStore> = Arc::new(InMemoryStore::new());
    let engine = IngestionEngine::new(store.clone(), RuleSet::default());
    let now = Utc::now();

    let readings = [
        (MetricReading::new("felix", d("10000000"), d("12.5")), now - Duration::hours(2)),
        (MetricReading::new("felix", d("7000000"), d("12.5")), now - Duration::hours(1)),
        (MetricReading::new("hlp", d("50000000"), d("1.5")), now - Duration::hours(1)),
    ];
    for (reading, at) in &readings {
        engine.process_reading_at(reading, *at).unwrap();
    }

    router(AppState::new(QueryService::new(store)))
}

async fn get(app: axum::Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_health() {
    let (status, body) = get(seeded_app(), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_protocols_status() {
    let (status, body) = get(seeded_app(), "/protocols").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let data = body["data"].as_array().unwrap();
    assert_eq!(data.len(), 2);
    assert_eq!(data[0]["name"], "felix");
    assert_eq!(data[0]["status"], "critical");
    assert_eq!(data[0]["tvl_usd"], "7000000");
    assert_eq!(data[1]["name"], "hlp");
    assert_eq!(data[1]["status"], "warning");
}

#[tokio::test]
async fn test_history_default_and_bounds() {
    let (status, body) = get(seeded_app(), "/protocols/felix/history").await;
    assert_eq!(status, StatusCode::OK);
    let points = body["data"].as_array().unwrap();
    assert_eq!(points.len(), 2);
    assert_eq!(points[0]["tvl_usd"], "10000000");

    let (status, body) = get(seeded_app(), "/protocols/felix/history?days=400").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let (status, _) = get(seeded_app(), "/protocols/felix/history?days=0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = get(seeded_app(), "/protocols/felix/history?days=abc").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = get(seeded_app(), "/protocols/unknown/history?days=7").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_alerts_listing() {
    let (status, body) = get(seeded_app(), "/alerts").await;
    assert_eq!(status, StatusCode::OK);
    let alerts = body["data"].as_array().unwrap();
    assert_eq!(alerts.len(), 2);
    // Same trigger time, newest id first
    assert_eq!(alerts[0]["protocol_name"], "hlp");
    assert_eq!(alerts[0]["alert_type"], "apy_low");
    assert_eq!(alerts[1]["alert_type"], "tvl_drop");
    assert_eq!(alerts[1]["severity"], "critical");

    let (_, body) = get(seeded_app(), "/alerts?status=open").await;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    let (_, body) = get(seeded_app(), "/alerts?status=resolved").await;
    assert!(body["data"].as_array().unwrap().is_empty());

    let (_, body) = get(seeded_app(), "/alerts?status=whatever").await;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_unknown_route() {
    let (status, body) = get(seeded_app(), "/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
}
