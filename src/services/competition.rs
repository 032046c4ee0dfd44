//! Destructive admin operations. Each one takes a backup first and aborts
//! if the backup cannot be written.

use thiserror::Error;
use tracing::info;

use crate::models::Collection;
use crate::store::{JsonStore, StoreError};

use super::backup::{BackupError, BackupManager, RestoreSet};

#[derive(Debug, Error)]
pub enum CompetitionError {
    #[error("Pre-operation backup failed: {0}")]
    Backup(#[from] BackupError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Empty users, guesses and results.
pub async fn clear_all(store: &JsonStore, backups: &BackupManager) -> Result<(), CompetitionError> {
    backups.create_backup().await?;
    store.clear(&Collection::ALL).await?;
    info!("All data cleared successfully");
    Ok(())
}

/// Empty guesses and results, keeping registered users.
pub async fn restart_competition(
    store: &JsonStore,
    backups: &BackupManager,
) -> Result<(), CompetitionError> {
    backups.create_backup().await?;
    store
        .clear(&[Collection::Guesses, Collection::Results])
        .await?;
    info!("Competition restarted successfully");
    Ok(())
}

/// Replace every collection present in `set` wholesale.
///
/// Returns the collections that were restored.
pub async fn restore(
    store: &JsonStore,
    backups: &BackupManager,
    set: &RestoreSet,
) -> Result<Vec<Collection>, CompetitionError> {
    backups.create_backup().await?;
    let mut restored = Vec::new();
    for (collection, data) in set.entries() {
        store.save(collection, data).await?;
        restored.push(collection);
    }
    info!("Restored {} collection(s) from backup data", restored.len());
    Ok(restored)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::JsonMap;
    use serde_json::json;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn map(value: serde_json::Value) -> JsonMap {
        value.as_object().cloned().unwrap()
    }

    async fn seeded() -> (tempfile::TempDir, Arc<JsonStore>, BackupManager) {
        let dir = tempdir().unwrap();
        let store = Arc::new(JsonStore::new(dir.path()));
        store.init().await.unwrap();
        store
            .save(Collection::Users, &map(json!({"alice": "a", "bob": "b"})))
            .await
            .unwrap();
        store
            .save(
                Collection::Guesses,
                &map(json!({"alice": {"cs-f111": {"midsem": 70}}})),
            )
            .await
            .unwrap();
        store
            .save(Collection::Results, &map(json!({"cs-f111": {"midsem": 71}})))
            .await
            .unwrap();
        let backups = BackupManager::new(store.clone(), 10);
        (dir, store, backups)
    }

    #[tokio::test]
    async fn test_restart_keeps_users() {
        let (_dir, store, backups) = seeded().await;
        restart_competition(&store, &backups).await.unwrap();

        assert_eq!(
            store.load(Collection::Users).await,
            map(json!({"alice": "a", "bob": "b"}))
        );
        assert!(store.load(Collection::Guesses).await.is_empty());
        assert!(store.load(Collection::Results).await.is_empty());
        assert_eq!(backups.list_backups().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_clear_all_empties_everything() {
        let (_dir, store, backups) = seeded().await;
        clear_all(&store, &backups).await.unwrap();

        for collection in Collection::ALL {
            assert!(store.load(collection).await.is_empty());
        }

        // The pre-clear snapshot still holds the data.
        let latest = &backups.list_backups().await.unwrap()[0];
        let snapshot = super::super::backup::read_snapshot(&latest.path).await.unwrap();
        assert_eq!(snapshot.users.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_restore_replaces_only_given_collections() {
        let (_dir, store, backups) = seeded().await;
        let set = RestoreSet {
            users: Some(map(json!({"carol": "c"}))),
            ..Default::default()
        };

        let restored = restore(&store, &backups, &set).await.unwrap();
        assert_eq!(restored, vec![Collection::Users]);
        assert_eq!(store.load(Collection::Users).await, map(json!({"carol": "c"})));
        assert_eq!(store.cached_len(Collection::Guesses), 1);
    }
}
