//! Snapshot persistence.
//!
//! The whole session is stored as one versioned JSON document and rewritten
//! in full after every change. Two stores are provided:
//!
//! - [`JsonFileSnapshotStore`]: a file on disk, replaced atomically through a
//!   temporary file and a rename
//! - [`InMemorySnapshotStore`]: for tests and embedders without a disk

use crate::ledger::Sequences;
use crate::types::{Booking, Event, Notification, Reminder};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::Mutex;

/// Version written by this build; documents with any other version are rejected
pub const SCHEMA_VERSION: u32 = 1;

/// Errors reading or writing snapshots
#[derive(Error, Debug)]
pub enum SnapshotError {
    /// Filesystem failure
    #[error("Snapshot I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Document is not valid snapshot JSON
    #[error("Snapshot JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Document was written by an incompatible version
    #[error("Unsupported snapshot schema version {0} (expected {SCHEMA_VERSION})")]
    UnsupportedVersion(u32),

    /// Document parses but breaks a ledger invariant
    #[error("Corrupt snapshot: {0}")]
    Corrupt(String),
}

/// The persisted form of a session
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Document format version
    pub schema_version: u32,
    /// Ledger revision at the time of writing
    #[serde(default)]
    pub revision: u64,
    /// Last issued ids
    #[serde(default)]
    pub sequences: Sequences,
    /// Catalogue, newest first
    #[serde(default)]
    pub events: Vec<Event>,
    /// Bookings
    #[serde(default)]
    pub bookings: Vec<Booking>,
    /// Reminders
    #[serde(default)]
    pub reminders: Vec<Reminder>,
    /// Notifications, newest first
    #[serde(default)]
    pub notifications: Vec<Notification>,
}

#[derive(Deserialize)]
struct Header {
    schema_version: u32,
}

impl Snapshot {
    /// Parses a document, checking its version before anything else
    ///
    /// # Errors
    ///
    /// [`SnapshotError::Json`] for malformed input,
    /// [`SnapshotError::UnsupportedVersion`] for another version.
    pub fn from_json(bytes: &[u8]) -> Result<Self, SnapshotError> {
        let header: Header = serde_json::from_slice(bytes)?;
        if header.schema_version != SCHEMA_VERSION {
            return Err(SnapshotError::UnsupportedVersion(header.schema_version));
        }
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Pretty-printed document
    ///
    /// # Errors
    ///
    /// [`SnapshotError::Json`] if serialization fails.
    pub fn to_json(&self) -> Result<Vec<u8>, SnapshotError> {
        Ok(serde_json::to_vec_pretty(self)?)
    }
}

/// Storage for the session snapshot
///
/// Uses boxed futures so the store can live behind `Arc<dyn SnapshotStore>`
/// and be captured by effects.
pub trait SnapshotStore: Send + Sync {
    /// Reads the stored snapshot; `Ok(None)` when nothing was ever saved
    fn load(&self) -> BoxFuture<'_, Result<Option<Snapshot>, SnapshotError>>;

    /// Replaces the stored snapshot
    ///
    /// A snapshot older (lower revision) than the last one this store
    /// wrote is skipped, so out-of-order saves cannot roll the document back.
    fn save<'a>(&'a self, snapshot: &'a Snapshot) -> BoxFuture<'a, Result<(), SnapshotError>>;
}

/// Snapshot kept in a JSON file
#[derive(Debug)]
pub struct JsonFileSnapshotStore {
    path: PathBuf,
    last_written: Mutex<Option<u64>>,
}

impl JsonFileSnapshotStore {
    /// Store backed by `path`; the file is created on first save
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            last_written: Mutex::new(None),
        }
    }

    /// Location of the document
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(std::ffi::OsStr::to_os_string)
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl SnapshotStore for JsonFileSnapshotStore {
    fn load(&self) -> BoxFuture<'_, Result<Option<Snapshot>, SnapshotError>> {
        Box::pin(async move {
            let bytes = match tokio::fs::read(&self.path).await {
                Ok(bytes) => bytes,
                Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                    tracing::debug!(path = %self.path.display(), "No snapshot on disk");
                    return Ok(None);
                },
                Err(error) => return Err(error.into()),
            };
            let snapshot = Snapshot::from_json(&bytes)?;
            tracing::debug!(
                path = %self.path.display(),
                revision = snapshot.revision,
                events = snapshot.events.len(),
                "Loaded snapshot"
            );
            Ok(Some(snapshot))
        })
    }

    fn save<'a>(&'a self, snapshot: &'a Snapshot) -> BoxFuture<'a, Result<(), SnapshotError>> {
        Box::pin(async move {
            let mut last_written = self.last_written.lock().await;
            if last_written.is_some_and(|revision| snapshot.revision < revision) {
                tracing::debug!(revision = snapshot.revision, "Skipping stale snapshot");
                return Ok(());
            }

            let bytes = snapshot.to_json()?;
            let temp = self.temp_path();
            tokio::fs::write(&temp, bytes).await?;
            tokio::fs::rename(&temp, &self.path).await?;

            *last_written = Some(snapshot.revision);
            tracing::trace!(path = %self.path.display(), revision = snapshot.revision, "Saved snapshot");
            Ok(())
        })
    }
}

/// Snapshot kept in memory
#[derive(Debug, Default)]
pub struct InMemorySnapshotStore {
    inner: Mutex<InMemoryInner>,
}

#[derive(Debug, Default)]
struct InMemoryInner {
    snapshot: Option<Snapshot>,
    last_written: Option<u64>,
}

impl InMemorySnapshotStore {
    /// Empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store that already holds `snapshot`
    #[must_use]
    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        Self {
            inner: Mutex::new(InMemoryInner {
                snapshot: Some(snapshot),
                last_written: None,
            }),
        }
    }

    /// Copy of the stored snapshot
    pub async fn current(&self) -> Option<Snapshot> {
        self.inner.lock().await.snapshot.clone()
    }
}

impl SnapshotStore for InMemorySnapshotStore {
    fn load(&self) -> BoxFuture<'_, Result<Option<Snapshot>, SnapshotError>> {
        Box::pin(async move {
            match self.inner.lock().await.snapshot.clone() {
                Some(snapshot) if snapshot.schema_version != SCHEMA_VERSION => {
                    Err(SnapshotError::UnsupportedVersion(snapshot.schema_version))
                },
                other => Ok(other),
            }
        })
    }

    fn save<'a>(&'a self, snapshot: &'a Snapshot) -> BoxFuture<'a, Result<(), SnapshotError>> {
        Box::pin(async move {
            let mut inner = self.inner.lock().await;
            if inner
                .last_written
                .is_some_and(|revision| snapshot.revision < revision)
            {
                return Ok(());
            }
            inner.snapshot = Some(snapshot.clone());
            inner.last_written = Some(snapshot.revision);
            Ok(())
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn snapshot(revision: u64) -> Snapshot {
        Snapshot {
            schema_version: SCHEMA_VERSION,
            revision,
            sequences: Sequences {
                event: 3,
                booking: 1,
                reminder: 0,
                notification: 2,
            },
            events: vec![],
            bookings: vec![],
            reminders: vec![],
            notifications: vec![],
        }
    }

    #[tokio::test]
    async fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileSnapshotStore::new(dir.path().join("session.json"));

        assert!(store.load().await.unwrap().is_none());

        store.save(&snapshot(4)).await.unwrap();
        let loaded = store.load().await.unwrap().unwrap();
        assert_eq!(loaded, snapshot(4));
        assert!(!dir.path().join("session.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_file_store_skips_stale_revision() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileSnapshotStore::new(dir.path().join("session.json"));

        store.save(&snapshot(5)).await.unwrap();
        store.save(&snapshot(3)).await.unwrap();

        assert_eq!(store.load().await.unwrap().unwrap().revision, 5);
    }

    #[tokio::test]
    async fn test_file_store_rejects_other_versions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        tokio::fs::write(&path, br#"{"schema_version": 2, "events": "not a list"}"#)
            .await
            .unwrap();

        let store = JsonFileSnapshotStore::new(&path);
        assert!(matches!(
            store.load().await,
            Err(SnapshotError::UnsupportedVersion(2))
        ));
    }

    #[tokio::test]
    async fn test_file_store_reports_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        tokio::fs::write(&path, b"{ not json").await.unwrap();

        let store = JsonFileSnapshotStore::new(&path);
        assert!(matches!(store.load().await, Err(SnapshotError::Json(_))));
    }

    #[test]
    fn test_missing_sections_default() {
        let parsed = Snapshot::from_json(br#"{"schema_version": 1}"#).unwrap();
        assert!(parsed.events.is_empty());
        assert_eq!(parsed.sequences, Sequences::default());
        assert_eq!(parsed.revision, 0);
    }

    #[tokio::test]
    async fn test_in_memory_store() {
        let store = InMemorySnapshotStore::new();
        assert!(store.load().await.unwrap().is_none());

        store.save(&snapshot(2)).await.unwrap();
        store.save(&snapshot(1)).await.unwrap();
        assert_eq!(store.current().await.unwrap().revision, 2);

        let mut old = snapshot(0);
        old.schema_version = 0;
        let store = InMemorySnapshotStore::with_snapshot(old);
        assert!(matches!(
            store.load().await,
            Err(SnapshotError::UnsupportedVersion(0))
        ));
    }
}
