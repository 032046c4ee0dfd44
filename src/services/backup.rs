//! Point-in-time snapshots of all collections, with retention.
//!
//! Each backup is written twice under `{data_dir}/backups/`:
//! `backup_YYYY-MM-DD_HHMMSS.json` and the gzip-compressed
//! `backup_YYYY-MM-DD_HHMMSS.json.gz`. A second backup inside the same
//! second gets a `_NNN` suffix instead of overwriting the first.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use chrono::Local;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::models::{Collection, JsonMap};
use crate::storage;
use crate::store::JsonStore;

/// Format tag written into every snapshot.
pub const SNAPSHOT_VERSION: &str = "2.0";

/// Number of snapshots kept by default.
pub const DEFAULT_KEEP: usize = 10;

const BACKUP_PREFIX: &str = "backup_";

#[derive(Debug, Error)]
pub enum BackupError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl BackupError {
    fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BackupError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Full copy of every collection at one point in time.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub users: JsonMap,
    pub guesses: JsonMap,
    pub actual_results: JsonMap,
    pub backup_time: String,
    pub version: String,
}

impl Snapshot {
    /// Read the current value of every collection.
    pub async fn capture(store: &JsonStore) -> Self {
        Self {
            users: store.load(Collection::Users).await,
            guesses: store.load(Collection::Guesses).await,
            actual_results: store.load(Collection::Results).await,
            backup_time: chrono::Utc::now().to_rfc3339(),
            version: SNAPSHOT_VERSION.to_string(),
        }
    }
}

/// Collections read back from a snapshot or a restore request.
///
/// Absent collections are left alone on restore.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RestoreSet {
    #[serde(default)]
    pub users: Option<JsonMap>,
    #[serde(default)]
    pub guesses: Option<JsonMap>,
    #[serde(default, alias = "results")]
    pub actual_results: Option<JsonMap>,
}

impl RestoreSet {
    /// Collections present in this set, paired with their data.
    pub fn entries(&self) -> Vec<(Collection, &JsonMap)> {
        [
            (Collection::Users, self.users.as_ref()),
            (Collection::Guesses, self.guesses.as_ref()),
            (Collection::Results, self.actual_results.as_ref()),
        ]
        .into_iter()
        .filter_map(|(c, data)| data.map(|d| (c, d)))
        .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}

/// A plain-JSON backup file found on disk.
#[derive(Debug, Clone)]
pub struct BackupEntry {
    pub path: PathBuf,
    pub modified: SystemTime,
}

impl BackupEntry {
    /// The gzip sibling of this backup.
    pub fn gz_path(&self) -> PathBuf {
        gz_path(&self.path)
    }
}

fn gz_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".gz");
    path.with_file_name(name)
}

/// Creates and prunes snapshots.
pub struct BackupManager {
    store: Arc<JsonStore>,
    dir: PathBuf,
    keep: usize,
    creating: Mutex<()>,
}

impl BackupManager {
    pub fn new(store: Arc<JsonStore>, keep: usize) -> Self {
        let dir = store.data_dir().join("backups");
        Self {
            store,
            dir,
            keep,
            creating: Mutex::new(()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn keep(&self) -> usize {
        self.keep
    }

    /// Write a new snapshot (plain and gzip), then prune old ones.
    ///
    /// Returns the path of the plain JSON copy.
    pub async fn create_backup(&self) -> Result<PathBuf, BackupError> {
        let _guard = self.creating.lock().await;

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| BackupError::io(&self.dir, e))?;

        let snapshot = Snapshot::capture(&self.store).await;
        let body = serde_json::to_vec_pretty(&snapshot)?;

        let path = self.next_backup_path();
        write_copies(&path, &body).await?;

        info!("Backup created: {}", path.display());

        if let Err(e) = self.cleanup_old_backups(self.keep).await {
            error!("Error cleaning up backups: {}", e);
        }
        Ok(path)
    }

    /// Like `create_backup`, but only logs failures.
    pub async fn create_backup_logged(&self) -> Option<PathBuf> {
        match self.create_backup().await {
            Ok(path) => Some(path),
            Err(e) => {
                error!("Error creating backup: {}", e);
                None
            }
        }
    }

    fn next_backup_path(&self) -> PathBuf {
        let base = format!(
            "{}{}",
            BACKUP_PREFIX,
            Local::now().format("%Y-%m-%d_%H%M%S")
        );
        let candidate = self.dir.join(format!("{}.json", base));
        if !candidate.exists() {
            return candidate;
        }
        (1u32..)
            .map(|n| self.dir.join(format!("{}_{:03}.json", base, n)))
            .find(|p| !p.exists())
            .unwrap_or(candidate)
    }

    /// Plain JSON backups, newest first.
    pub async fn list_backups(&self) -> Result<Vec<BackupEntry>, BackupError> {
        let mut entries = Vec::new();
        let mut dir = match tokio::fs::read_dir(&self.dir).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(entries),
            Err(e) => return Err(BackupError::io(&self.dir, e)),
        };

        while let Some(entry) = dir
            .next_entry()
            .await
            .map_err(|e| BackupError::io(&self.dir, e))?
        {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if !(name.starts_with(BACKUP_PREFIX) && name.ends_with(".json")) {
                continue;
            }
            let path = entry.path();
            let modified = storage::modified_time(&path)
                .await
                .map_err(|e| BackupError::io(&path, e))?
                .unwrap_or(SystemTime::UNIX_EPOCH);
            entries.push(BackupEntry { path, modified });
        }

        entries.sort_by(|a, b| {
            b.modified
                .cmp(&a.modified)
                .then_with(|| b.path.cmp(&a.path))
        });
        Ok(entries)
    }

    /// Delete all but the newest `keep` backups, plain and gzip.
    ///
    /// A file that cannot be removed is logged and skipped. Returns the
    /// number of backups pruned.
    pub async fn cleanup_old_backups(&self, keep: usize) -> Result<usize, BackupError> {
        let entries = self.list_backups().await?;
        let mut removed = 0;

        for entry in entries.iter().skip(keep) {
            if let Err(e) = tokio::fs::remove_file(&entry.path).await {
                warn!("Error removing backup {}: {}", entry.path.display(), e);
                continue;
            }
            let gz = entry.gz_path();
            if gz.exists() {
                if let Err(e) = tokio::fs::remove_file(&gz).await {
                    warn!("Error removing backup {}: {}", gz.display(), e);
                }
            }
            info!("Removed old backup: {}", entry.path.display());
            removed += 1;
        }
        Ok(removed)
    }
}

/// Write the plain copy, then its gzip sibling.
///
/// Retention is driven by the plain files, so the plain copy goes first: a
/// failure part way leaves at most a plain backup, which pruning still sees.
async fn write_copies(path: &Path, body: &[u8]) -> Result<(), BackupError> {
    storage::write_atomic(path, body)
        .await
        .map_err(|e| BackupError::io(path, e))?;

    let gz = gz_path(path);
    let compressed = gzip(body).map_err(|e| BackupError::io(&gz, e))?;
    storage::write_atomic(&gz, &compressed)
        .await
        .map_err(|e| BackupError::io(&gz, e))
}

/// Read a snapshot from a `.json` or `.json.gz` file.
pub async fn read_snapshot(path: &Path) -> Result<RestoreSet, BackupError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| BackupError::io(path, e))?;

    let text = if path.extension().is_some_and(|ext| ext == "gz") {
        gunzip(&bytes).map_err(|e| BackupError::io(path, e))?
    } else {
        String::from_utf8_lossy(&bytes).into_owned()
    };
    Ok(serde_json::from_str(&text)?)
}

fn gzip(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}

fn gunzip(data: &[u8]) -> std::io::Result<String> {
    let mut decoder = GzDecoder::new(data);
    let mut text = String::new();
    decoder.read_to_string(&mut text)?;
    Ok(text)
}
