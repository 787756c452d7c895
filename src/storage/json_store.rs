//! Atomic JSON persistence
//!
//! Every durable file is written to a sibling temporary file first and then
//! renamed over the target, so readers only ever see the previous complete
//! version or the new complete version.

use crate::state::{LinkRecord, ProgressState};
use crate::storage::{StorageError, StorageResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Temporary file suffix used before atomic rename.
pub const TEMP_SUFFIX: &str = ".tmp";

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(TEMP_SUFFIX);
    path.with_file_name(name)
}

/// Atomically replaces `path` with `bytes`, creating parent directories
pub fn write_bytes_atomic(path: &Path, bytes: &[u8]) -> StorageResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let temp_path = temp_path_for(path);
    {
        let mut file = fs::File::create(&temp_path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }
    fs::rename(&temp_path, path)?;

    Ok(())
}

/// Serializes `value` as pretty JSON and atomically replaces `path`
pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> StorageResult<()> {
    let bytes = serde_json::to_vec_pretty(value)
        .map_err(|e| StorageError::Serialization(e.to_string()))?;
    write_bytes_atomic(path, &bytes)
}

/// Reads and deserializes a JSON file
///
/// # Returns
///
/// * `Ok(None)` - The file does not exist
/// * `Ok(Some(T))` - The file was parsed
/// * `Err(StorageError::CorruptFile)` - The file exists but is not valid for `T`
pub fn read_json<T: DeserializeOwned>(path: &Path) -> StorageResult<Option<T>> {
    let content = match fs::read(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    serde_json::from_slice(&content)
        .map(Some)
        .map_err(|e| StorageError::CorruptFile {
            path: path.display().to_string(),
            message: e.to_string(),
        })
}

/// Durable store for the detail fetch checkpoint
#[derive(Debug, Clone)]
pub struct ProgressStore {
    path: PathBuf,
}

impl ProgressStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the checkpoint
    ///
    /// A missing file is a fresh start. An unreadable or malformed file is
    /// reported and replaced by the empty state; it is never partially trusted.
    pub fn load(&self) -> ProgressState {
        match read_json::<ProgressState>(&self.path) {
            Ok(Some(mut state)) => {
                state.normalize();
                state
            }
            Ok(None) => {
                tracing::debug!("No progress file at {}, starting fresh", self.path.display());
                ProgressState::default()
            }
            Err(e) => {
                tracing::warn!(
                    "Progress file {} is unusable, starting from empty state: {}",
                    self.path.display(),
                    e
                );
                ProgressState::default()
            }
        }
    }

    /// Atomically persists the checkpoint, dropping duplicate completed ids
    pub fn save(&self, state: &ProgressState) -> StorageResult<()> {
        let mut normalized = state.clone();
        normalized.normalize();
        write_json_atomic(&self.path, &normalized)
    }

    /// Removes the checkpoint so the next run starts fresh
    pub fn clear(&self) -> StorageResult<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Writes the harvested link list
pub fn save_links(path: &Path, links: &[LinkRecord]) -> StorageResult<()> {
    write_json_atomic(path, links)
}

/// Reads the harvested link list, `None` if it was never written
pub fn load_links(path: &Path) -> StorageResult<Option<Vec<LinkRecord>>> {
    read_json(path)
}
