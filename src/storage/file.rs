//! File-backed store.
//!
//! The whole store is one document, written in JSON or bincode. Several
//! processes may share the document (the server reading, the CLI ingesting),
//! so every commit takes an exclusive lock on a sibling `.lock` file, reloads
//! the document from disk, applies the batch and writes the result to a
//! temporary sibling that is renamed over the document. The in-memory state
//! only moves forward after the rename succeeded, so a failed write leaves
//! both the file and the store exactly as they were. Reads reload the
//! document whenever its modification time or length changed.

use chrono::{DateTime, Utc};
use fs4::fs_std::FileExt;
use std::collections::BTreeSet;
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use std::time::SystemTime;

use tracing::debug;

use super::backend::{MonitorStore, SnapshotBatch, StoreDocument, StoreState};
use crate::core::{Alert, AlertFilter, Snapshot, StoreFormat};
use crate::error::{Error, Result};

// ═══════════════════════════════════════════════════════════════════════════════
// FILE-BASED STORE
// ═══════════════════════════════════════════════════════════════════════════════

/// Identity of the document version last loaded or written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FileStamp {
    modified: SystemTime,
    len: u64,
}

impl FileStamp {
    fn of(path: &Path) -> Result<Option<Self>> {
        match fs::metadata(path) {
            Ok(meta) => Ok(Some(Self {
                modified: meta.modified().map_err(|e| {
                    Error::Storage(format!("Failed to stat {}: {}", path.display(), e))
                })?,
                len: meta.len(),
            })),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::Storage(format!("Failed to stat {}: {}", path.display(), e))),
        }
    }
}

#[derive(Debug, Default)]
struct Loaded {
    state: StoreState,
    stamp: Option<FileStamp>,
}

/// File-based storage backend
#[derive(Debug)]
pub struct FileStore {
    /// Document path
    path: PathBuf,
    /// Encoding of the document
    format: StoreFormat,
    /// Committed state and the document version it came from
    loaded: RwLock<Loaded>,
}

impl FileStore {
    /// Open the store at `path`, loading the document if it exists
    pub fn open<P: AsRef<Path>>(path: P, format: StoreFormat) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| {
                    Error::Storage(format!("Failed to create storage directory: {}", e))
                })?;
            }
        }

        let store = Self {
            path,
            format,
            loaded: RwLock::new(Loaded::default()),
        };

        {
            let _guard = store.lock_file(false)?;
            let mut loaded = store.loaded.write().map_err(|_| Error::Lock)?;
            store.reload(&mut loaded)?;
            debug!(
                path = %store.path.display(),
                snapshots = loaded.state.snapshot_count(),
                "Opened file store"
            );
        }

        Ok(store)
    }

    /// Document path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Document encoding
    pub fn format(&self) -> StoreFormat {
        self.format
    }

    fn sibling(&self, suffix: &str) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(suffix);
        self.path.with_file_name(name)
    }

    fn temp_path(&self) -> PathBuf {
        self.sibling(".tmp")
    }

    fn lock_path(&self) -> PathBuf {
        self.sibling(".lock")
    }

    /// Take the cross-process lock; released when the returned file drops
    fn lock_file(&self, exclusive: bool) -> Result<File> {
        let lock_path = self.lock_path();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(|e| Error::Storage(format!("Failed to open {}: {}", lock_path.display(), e)))?;

        let locked = if exclusive {
            FileExt::lock_exclusive(&file)
        } else {
            FileExt::lock_shared(&file)
        };
        locked.map_err(|e| Error::Storage(format!("Failed to lock {}: {}", lock_path.display(), e)))?;

        Ok(file)
    }

    /// Replace the in-memory state with the document on disk
    fn reload(&self, loaded: &mut Loaded) -> Result<()> {
        let stamp = FileStamp::of(&self.path)?;
        if stamp.is_some() {
            loaded.state = StoreState::from_document(load_document(&self.path, self.format)?)?;
        }
        loaded.stamp = stamp;
        Ok(())
    }

    /// Pick up commits made through other handles
    fn refresh(&self) -> Result<()> {
        let current = FileStamp::of(&self.path)?;
        {
            let loaded = self.loaded.read().map_err(|_| Error::Lock)?;
            if current.is_none() || loaded.stamp == current {
                return Ok(());
            }
        }

        let _guard = self.lock_file(false)?;
        let mut loaded = self.loaded.write().map_err(|_| Error::Lock)?;
        if loaded.stamp != FileStamp::of(&self.path)? {
            debug!(path = %self.path.display(), "Store document changed on disk, reloading");
            self.reload(&mut loaded)?;
        }
        Ok(())
    }

    fn read<T>(&self, f: impl FnOnce(&StoreState) -> T) -> Result<T> {
        self.refresh()?;
        let loaded = self.loaded.read().map_err(|_| Error::Lock)?;
        Ok(f(&loaded.state))
    }

    /// Write `state` to disk via temp file + rename; caller holds the exclusive lock
    fn persist(&self, state: &StoreState) -> Result<Option<FileStamp>> {
        let data = encode_document(&state.to_document(), self.format)?;
        let temp = self.temp_path();

        let write = || -> std::io::Result<()> {
            let mut file = File::create(&temp)?;
            file.write_all(&data)?;
            file.sync_all()?;
            fs::rename(&temp, &self.path)
        };

        write().map_err(|e| {
            let _ = fs::remove_file(&temp);
            Error::Storage(format!("Failed to write {}: {}", self.path.display(), e))
        })?;

        FileStamp::of(&self.path)
    }
}

impl MonitorStore for FileStore {
    fn latest_snapshot(&self, protocol: &str) -> Result<Option<Snapshot>> {
        self.read(|state| state.latest_snapshot(protocol))
    }

    fn snapshots_since(&self, protocol: &str, cutoff: DateTime<Utc>) -> Result<Vec<Snapshot>> {
        self.read(|state| state.snapshots_since(protocol, cutoff))
    }

    fn protocol_names(&self) -> Result<BTreeSet<String>> {
        self.read(|state| state.protocol_names())
    }

    fn open_alerts(&self, protocol: Option<&str>) -> Result<Vec<Alert>> {
        self.read(|state| state.open_alerts(protocol))
    }

    fn alerts(&self, filter: AlertFilter) -> Result<Vec<Alert>> {
        self.read(|state| state.alerts(filter))
    }

    fn commit(&self, batch: SnapshotBatch) -> Result<Vec<Alert>> {
        let _guard = self.lock_file(true)?;
        let mut loaded = self.loaded.write().map_err(|_| Error::Lock)?;

        // Another process may have committed since our last look
        self.reload(&mut loaded)?;

        let mut candidate = loaded.state.clone();
        let opened = candidate.apply(batch)?;
        let stamp = self.persist(&candidate)?;

        loaded.state = candidate;
        loaded.stamp = stamp;
        Ok(opened)
    }

    fn flush(&self) -> Result<()> {
        let _guard = self.lock_file(true)?;
        let mut loaded = self.loaded.write().map_err(|_| Error::Lock)?;
        self.reload(&mut loaded)?;
        loaded.stamp = self.persist(&loaded.state)?;
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ENCODING
// ═══════════════════════════════════════════════════════════════════════════════

fn encode_document(document: &StoreDocument, format: StoreFormat) -> Result<Vec<u8>> {
    match format {
        StoreFormat::Json => serde_json::to_vec_pretty(document)
            .map_err(|e| Error::Serialization(e.to_string())),
        StoreFormat::Binary => bincode::serialize(document)
            .map_err(|e| Error::Serialization(e.to_string())),
    }
}

fn load_document(path: &Path, format: StoreFormat) -> Result<StoreDocument> {
    let file = File::open(path)
        .map_err(|e| Error::Storage(format!("Failed to open {}: {}", path.display(), e)))?;
    let mut reader = BufReader::new(file);

    match format {
        StoreFormat::Json => serde_json::from_reader(reader)
            .map_err(|e| Error::Deserialization(e.to_string())),
        StoreFormat::Binary => {
            let mut data = Vec::new();
            reader
                .read_to_end(&mut data)
                .map_err(|e| Error::Storage(format!("Failed to read {}: {}", path.display(), e)))?;
            bincode::deserialize(&data).map_err(|e| Error::Deserialization(e.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{AlertTrigger, AlertType};
    use chrono::TimeZone;
    use rust_decimal::Decimal;

    fn batch(protocol: &str, hour: u32, alerts: usize) -> SnapshotBatch {
        SnapshotBatch {
            snapshot: Snapshot {
                protocol_name: protocol.into(),
                timestamp: Utc.with_ymd_and_hms(2026, 2, 1, hour, 0, 0).unwrap(),
                tvl_usd: Decimal::new(10_000_000, 0),
                apy_7d: Some(Decimal::new(125, 1)),
                utilization_rate: Some(Decimal::new(80, 2)),
            },
            alerts: (0..alerts)
                .map(|_| AlertTrigger::new(AlertType::UtilizationHigh, "Utilization is 98.00% (Threshold: >95%)".into()))
                .collect(),
        }
    }

    fn reopen_keeps_records(format: StoreFormat, file: &str) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(file);

        {
            let store = FileStore::open(&path, format).unwrap();
            store.commit(batch("felix", 1, 1)).unwrap();
            store.commit(batch("felix", 2, 0)).unwrap();
        }

        let store = FileStore::open(&path, format).unwrap();
        assert_eq!(store.snapshots_since("felix", Utc.timestamp_opt(0, 0).unwrap()).unwrap().len(), 2);
        assert_eq!(store.alerts(AlertFilter::Open).unwrap().len(), 1);

        let next = store.commit(batch("felix", 3, 1)).unwrap();
        assert_eq!(next[0].id, 2);
    }

    #[test]
    fn test_json_store_persists() {
        reopen_keeps_records(StoreFormat::Json, "monitor.json");
    }

    #[test]
    fn test_binary_store_persists() {
        reopen_keeps_records(StoreFormat::Binary, "monitor.bin");
    }

    #[test]
    fn test_failed_write_rolls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("monitor.json");
        let store = FileStore::open(&path, StoreFormat::Json).unwrap();
        store.commit(batch("felix", 1, 0)).unwrap();

        // A directory squatting on the temp path makes the write fail
        fs::create_dir(store.temp_path()).unwrap();

        let result = store.commit(batch("felix", 2, 1));
        assert!(matches!(result, Err(Error::Storage(_))));
        assert_eq!(
            store.latest_snapshot("felix").unwrap().unwrap().timestamp,
            Utc.with_ymd_and_hms(2026, 2, 1, 1, 0, 0).unwrap()
        );
        assert!(store.alerts(AlertFilter::All).unwrap().is_empty());
    }

    #[test]
    fn test_duplicate_does_not_touch_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("monitor.json");
        let store = FileStore::open(&path, StoreFormat::Json).unwrap();
        store.commit(batch("felix", 1, 0)).unwrap();
        let before = fs::read(&path).unwrap();

        assert!(store.commit(batch("felix", 1, 2)).is_err());
        assert_eq!(fs::read(&path).unwrap(), before);
    }

    #[test]
    fn test_two_handles_share_one_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("monitor.json");
        let server = FileStore::open(&path, StoreFormat::Json).unwrap();
        let cli = FileStore::open(&path, StoreFormat::Json).unwrap();

        let opened = cli.commit(batch("hlp", 1, 1)).unwrap();
        assert_eq!(opened[0].id, 1);

        // Readers see the other handle's commit without reopening
        assert!(server.protocol_names().unwrap().contains("hlp"));
        assert_eq!(server.alerts(AlertFilter::Open).unwrap().len(), 1);

        // Writers build on the document, not on their own stale copy
        let opened = server.commit(batch("felix", 2, 1)).unwrap();
        assert_eq!(opened[0].id, 2);

        let reopened = FileStore::open(&path, StoreFormat::Json).unwrap();
        let names: Vec<String> = reopened.protocol_names().unwrap().into_iter().collect();
        assert_eq!(names, vec!["felix".to_string(), "hlp".to_string()]);
        assert_eq!(reopened.alerts(AlertFilter::All).unwrap().len(), 2);

        // Flushing a handle must not drop rows committed elsewhere
        cli.commit(batch("hlp", 3, 0)).unwrap();
        server.flush().unwrap();
        assert_eq!(
            reopened.snapshots_since("hlp", Utc.timestamp_opt(0, 0).unwrap()).unwrap().len(),
            2
        );
    }

    #[test]
    fn test_duplicate_detected_across_handles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("monitor.bin");
        let first = FileStore::open(&path, StoreFormat::Binary).unwrap();
        let second = FileStore::open(&path, StoreFormat::Binary).unwrap();

        first.commit(batch("felix", 1, 0)).unwrap();
        let result = second.commit(batch("felix", 1, 1));
        assert!(matches!(result, Err(Error::DuplicateSnapshot { .. })));
        assert!(first.alerts(AlertFilter::All).unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_document_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("monitor.json");
        fs::write(&path, b"not json").unwrap();

        let result = FileStore::open(&path, StoreFormat::Json);
        assert!(matches!(result, Err(Error::Deserialization(_))));
    }
}
