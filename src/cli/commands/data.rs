//! Local backup, export and restore commands.
//!
//! These operate on the data directory directly; stop the server first if
//! you need its cache to see the change immediately.

use std::path::Path;
use std::sync::Arc;

use crate::cli::icons;
use crate::config::Settings;
use crate::services::{competition, read_snapshot, BackupManager, CsvExporter};
use crate::store::JsonStore;
use crate::utils::format_size;

async fn open_store(settings: &Settings) -> anyhow::Result<Arc<JsonStore>> {
    let store = Arc::new(JsonStore::new(&settings.data_dir));
    store.init().await?;
    Ok(store)
}

pub async fn cmd_backup(settings: &Settings) -> anyhow::Result<()> {
    let store = open_store(settings).await?;
    let backups = BackupManager::new(store, settings.backup_keep);

    println!("{} Creating backup...", icons::info());
    let path = backups.create_backup().await?;
    println!("  {} Backup created: {}", icons::success(), path.display());

    let entries = backups.list_backups().await?;
    println!(
        "  {} backups in {} (keeping the newest {})",
        entries.len(),
        backups.dir().display(),
        backups.keep()
    );
    for entry in entries.iter().take(3) {
        let size = tokio::fs::metadata(&entry.path)
            .await
            .map(|m| m.len())
            .unwrap_or(0);
        println!(
            "    {} {} ({})",
            icons::bullet(),
            entry.path.file_name().unwrap_or_default().to_string_lossy(),
            format_size(size)
        );
    }
    Ok(())
}

pub async fn cmd_export(settings: &Settings) -> anyhow::Result<()> {
    let store = open_store(settings).await?;
    let exporter = CsvExporter::new(store, settings.winner_threshold);

    println!("{} Exporting CSV reports...", icons::info());
    let report = exporter.export().await?;
    for path in [&report.guesses, &report.results, &report.analysis] {
        println!("  {} {}", icons::success(), path.display());
    }
    Ok(())
}

pub async fn cmd_restore(settings: &Settings, file: &Path) -> anyhow::Result<()> {
    println!("{} Reading snapshot {}...", icons::info(), file.display());
    let set = read_snapshot(file).await?;
    if set.is_empty() {
        eprintln!("  {} Snapshot contains no collections", icons::error());
        anyhow::bail!("Nothing to restore in {}", file.display());
    }

    let store = open_store(settings).await?;
    let backups = BackupManager::new(store.clone(), settings.backup_keep);
    let restored = competition::restore(&store, &backups, &set).await?;

    for collection in restored {
        println!(
            "  {} Restored {} ({} entries)",
            icons::success(),
            collection,
            store.load(collection).await.len()
        );
    }
    Ok(())
}
