//! HTTP read API.
//!
//! # Endpoints
//!
//! - `GET /health`: liveness probe
//! - `GET /protocols`: latest snapshot and status of every protocol
//! - `GET /protocols/:name/history?days=N`: snapshot history (N in 1..=365)
//! - `GET /alerts?status=open|resolved`: alert log
//!
//! # Features
//!
//! - `rpc-server`: Enables the axum router (requires async runtime)

#[cfg(feature = "rpc-server")]
pub mod routes;

#[cfg(feature = "rpc-server")]
pub use routes::*;
