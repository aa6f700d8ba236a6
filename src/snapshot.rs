//! Snapshot sinks: durable targets for backup spill writes.
//!
//! The table hands a sink a flattened copy of every live entry and owns no
//! knowledge of the on-disk encoding. [`FileSink`] is the stock
//! implementation (bincode-encoded, written atomically via a temp file);
//! [`MemorySink`] collects snapshots in memory for tests and tooling.

use std::fs;
use std::path::PathBuf;
use parking_lot::Mutex;
use std::sync::Arc;
use thiserror::Error;

/// Why a snapshot write failed. Always recoverable: the in-memory table is
/// authoritative and the triggering insert proceeds regardless.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot encoding failed: {0}")]
    Encode(#[from] bincode::error::EncodeError),
    #[error("snapshot write failed: {0}")]
    Io(#[from] std::io::Error),
}

/// An external durable-storage target for table snapshots.
///
/// `entries` is an owned, ordered copy (bucket order, then chain order) of
/// every live entry at the moment of the spill; a `None` key is the table's
/// reserved null key.
pub trait SnapshotSink<K, V> {
    fn write_snapshot(&mut self, entries: Vec<(Option<K>, V)>) -> Result<(), SnapshotError>;
}

/// Writes each snapshot as one bincode-encoded file, replacing the previous
/// one. The write goes to a temp sibling first and is renamed into place so
/// a failed write never truncates an existing backup.
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl<K, V> SnapshotSink<K, V> for FileSink
where
    K: bincode::Encode,
    V: bincode::Encode,
{
    fn write_snapshot(&mut self, entries: Vec<(Option<K>, V)>) -> Result<(), SnapshotError> {
        let bytes = bincode::encode_to_vec(&entries, bincode::config::standard())?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, &bytes)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// Collects snapshots in memory. Clones share the same backing store, so a
/// handle kept by the caller observes spills performed by the table.
pub struct MemorySink<K, V> {
    snapshots: Arc<Mutex<Vec<Vec<(Option<K>, V)>>>>,
}

impl<K, V> MemorySink<K, V> {
    pub fn new() -> Self {
        Self {
            snapshots: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Number of snapshots taken so far.
    pub fn snapshot_count(&self) -> usize {
        self.snapshots.lock().len()
    }

    /// Copies of all snapshots taken so far, oldest first.
    pub fn snapshots(&self) -> Vec<Vec<(Option<K>, V)>>
    where
        K: Clone,
        V: Clone,
    {
        self.snapshots.lock().clone()
    }
}

impl<K, V> Default for MemorySink<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Clone for MemorySink<K, V> {
    fn clone(&self) -> Self {
        Self {
            snapshots: Arc::clone(&self.snapshots),
        }
    }
}

impl<K, V> SnapshotSink<K, V> for MemorySink<K, V> {
    fn write_snapshot(&mut self, entries: Vec<(Option<K>, V)>) -> Result<(), SnapshotError> {
        self.snapshots.lock().push(entries);
        Ok(())
    }
}
