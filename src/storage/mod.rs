//! Storage module for snapshots and alerts.
//!
//! ## Backends
//!
//! - **InMemoryStore**: Fast, ephemeral storage for testing
//! - **FileStore**: single-document persistence, JSON or bincode
//!
//! ## Usage
//!
//! ```rust,ignore
//! use protocol_monitor::storage::{open_store, InMemoryStore, MonitorStore};
//!
//! // For testing
//! let store = InMemoryStore::new();
//!
//! // From configuration
//! let store = open_store(&config.store)?;
//! ```

pub mod backend;
pub mod file;

pub use backend::*;
pub use file::FileStore;

use std::sync::Arc;

use crate::core::StoreConfig;
use crate::error::Result;

/// Open the backend described by `config`
pub fn open_store(config: &StoreConfig) -> Result<Arc<dyn MonitorStore>> {
    Ok(Arc::new(FileStore::open(&config.path, config.format)?))
}
