//! HTTP API server for the guessing game.
//!
//! Serves the three collections plus:
//! - Leaderboard and aggregate stats
//! - Backup, CSV export and restore
//! - Health and process diagnostics
//!
//! Every `/api` route is rate limited per client.

mod handlers;
mod middleware;
mod routes;
mod validation;

pub use handlers::{ApiError, ApiMessage, Stats, ADMIN_TOKEN_HEADER};
pub use middleware::ClientKey;
pub use routes::create_router;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::time::MissedTickBehavior;
use tracing::info;

use crate::config::Settings;
use crate::rate_limit::RateLimiter;
use crate::services::{BackupManager, CsvExporter};
use crate::store::JsonStore;

/// Shared state for the web server.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<JsonStore>,
    pub backups: Arc<BackupManager>,
    pub exporter: Arc<CsvExporter>,
    pub rate_limiter: Arc<RateLimiter>,
    pub settings: Arc<Settings>,
    pub started_at: Instant,
}

impl AppState {
    /// Wire up the store and its services. Does no I/O.
    pub fn new(settings: &Settings) -> Self {
        let store = Arc::new(JsonStore::new(&settings.data_dir));
        Self {
            backups: Arc::new(BackupManager::new(store.clone(), settings.backup_keep)),
            exporter: Arc::new(CsvExporter::new(store.clone(), settings.winner_threshold)),
            rate_limiter: Arc::new(RateLimiter::new(&settings.rate_limits)),
            store,
            settings: Arc::new(settings.clone()),
            started_at: Instant::now(),
        }
    }

    /// Take a snapshot without making the caller wait for it.
    pub fn spawn_backup(&self) {
        let backups = self.backups.clone();
        tokio::spawn(async move {
            backups.create_backup_logged().await;
        });
    }

    /// Regenerate the CSV reports without making the caller wait for them.
    pub fn spawn_export(&self) {
        let exporter = self.exporter.clone();
        tokio::spawn(async move {
            exporter.export_logged().await;
        });
    }
}

fn spawn_periodic_backups(backups: Arc<BackupManager>, every: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + every, every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if backups.create_backup_logged().await.is_some() {
                info!("Periodic backup completed");
            }
        }
    });
}

fn spawn_rate_limit_sweeps(limiter: Arc<RateLimiter>, every: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + every, every);
        loop {
            ticker.tick().await;
            limiter.sweep();
        }
    });
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received");
    }
}

/// Start the web server.
///
/// Initializes the data directory, takes a startup snapshot and schedules
/// periodic backups before accepting connections.
pub async fn serve(settings: &Settings, addr: SocketAddr) -> anyhow::Result<()> {
    let state = AppState::new(settings);
    state.store.init().await?;
    info!("Data directory: {}", settings.data_dir.display());

    state.backups.create_backup_logged().await;
    spawn_periodic_backups(state.backups.clone(), settings.backup_interval);
    spawn_rate_limit_sweeps(state.rate_limiter.clone(), settings.rate_limit_sweep);
    info!(
        "Periodic backup scheduled every {}s",
        settings.backup_interval.as_secs()
    );

    let app = create_router(state);
    tracing::info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    Ok(())
}
