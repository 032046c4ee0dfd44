//! JSON-file store for the users, guesses and results collections.
//!
//! Each collection lives in its own pretty-printed JSON file inside the data
//! directory. Reads go through an mtime-checked in-memory cache; writes
//! replace the whole file atomically (temp file + rename).
//!
//! Failure policy:
//! - `load` fails open. A missing, unreadable or malformed file yields an
//!   empty collection and an error log, never an error to the caller.
//! - `save` and `merge` report failure through `StoreResult`.
//!
//! Writes are serialised per collection: `merge` holds the collection's
//! write lock across load, merge and save, so concurrent merges cannot
//! drop each other's keys. Reads never take the write lock.

mod cache;
mod error;

pub use cache::CollectionCache;
pub use error::{StoreError, StoreResult};

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tokio::sync::Mutex;
use tracing::{debug, error, info};

use crate::models::{Collection, JsonMap};
use crate::storage;

/// Durable, cached persistence of the three collections.
pub struct JsonStore {
    data_dir: PathBuf,
    cache: CollectionCache,
    users_lock: Mutex<()>,
    guesses_lock: Mutex<()>,
    results_lock: Mutex<()>,
}

impl JsonStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            cache: CollectionCache::new(),
            users_lock: Mutex::new(()),
            guesses_lock: Mutex::new(()),
            results_lock: Mutex::new(()),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Path of the file backing a collection.
    pub fn path(&self, collection: Collection) -> PathBuf {
        self.data_dir.join(collection.file_name())
    }

    pub fn exists(&self, collection: Collection) -> bool {
        self.path(collection).exists()
    }

    /// Number of top-level keys currently held in memory for a collection.
    pub fn cached_len(&self, collection: Collection) -> usize {
        self.cache.len_of(collection)
    }

    fn write_lock(&self, collection: Collection) -> &Mutex<()> {
        match collection {
            Collection::Users => &self.users_lock,
            Collection::Guesses => &self.guesses_lock,
            Collection::Results => &self.results_lock,
        }
    }

    /// Create the data directory and any missing collection files, then warm
    /// the cache.
    pub async fn init(&self) -> StoreResult<()> {
        tokio::fs::create_dir_all(&self.data_dir)
            .await
            .map_err(|e| StoreError::io(&self.data_dir, e))?;

        for collection in Collection::ALL {
            if !self.exists(collection) {
                self.save(collection, &JsonMap::new()).await?;
                info!("Initialized {}", collection.file_name());
            }
        }

        for collection in Collection::ALL {
            self.load(collection).await;
        }
        debug!("Data files initialized and cached");
        Ok(())
    }

    /// Load a collection.
    ///
    /// Returns the cached copy while the file has not been modified since it
    /// was cached, otherwise re-reads the file.
    pub async fn load(&self, collection: Collection) -> JsonMap {
        let path = self.path(collection);
        let seen = self.cache.generation(collection);

        let mtime = match storage::modified_time(&path).await {
            Ok(mtime) => mtime,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("File {} doesn't exist, returning empty", path.display());
                self.cache.invalidate(collection);
                return JsonMap::new();
            }
            Err(e) => {
                error!("Error loading {}: {}", path.display(), e);
                return JsonMap::new();
            }
        };

        if let Some(mtime) = mtime {
            if let Some(cached) = self.cache.get_if_fresh(collection, mtime) {
                debug!("Using cached data for {}", path.display());
                return cached;
            }
        }

        match read_collection(&path).await {
            Ok(map) => {
                let stamp = mtime.unwrap_or_else(SystemTime::now);
                if !self.cache.put_if_unchanged(collection, map.clone(), stamp, seen) {
                    debug!("Cache for {} changed during read, keeping it", path.display());
                }
                info!("Loaded {} successfully", path.display());
                map
            }
            Err(e) => {
                error!("Error loading {}: {}", path.display(), e);
                JsonMap::new()
            }
        }
    }

    /// Replace a collection with `data`.
    pub async fn save(&self, collection: Collection, data: &JsonMap) -> StoreResult<()> {
        let _guard = self.write_lock(collection).lock().await;
        self.save_locked(collection, data).await
    }

    /// Shallow-merge `partial` into a collection: top-level keys in `partial`
    /// replace the stored ones, every other key is left untouched.
    pub async fn merge(&self, collection: Collection, partial: JsonMap) -> StoreResult<()> {
        let _guard = self.write_lock(collection).lock().await;
        let mut current = self.load(collection).await;
        current.extend(partial);
        self.save_locked(collection, &current).await
    }

    /// Reset the given collections to empty mappings.
    pub async fn clear(&self, collections: &[Collection]) -> StoreResult<()> {
        for collection in collections {
            self.save(*collection, &JsonMap::new()).await?;
        }
        Ok(())
    }

    /// Caller must hold the collection's write lock.
    async fn save_locked(&self, collection: Collection, data: &JsonMap) -> StoreResult<()> {
        let path = self.path(collection);
        let body = serde_json::to_vec_pretty(data)?;

        if let Err(e) = storage::write_atomic(&path, &body).await {
            error!("Error saving {}: {}", path.display(), e);
            return Err(StoreError::io(path, e));
        }

        self.cache.put(collection, data.clone(), SystemTime::now());
        info!("Saved {} successfully", path.display());
        Ok(())
    }
}

async fn read_collection(path: &Path) -> StoreResult<JsonMap> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| StoreError::io(path, e))?;
    match serde_json::from_str::<serde_json::Value>(&text)? {
        serde_json::Value::Object(map) => Ok(map),
        _ => Err(StoreError::NotAnObject(path.to_path_buf())),
    }
}
