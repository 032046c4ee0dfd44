//! Configuration management for BitBets.
//!
//! Settings start from built-in defaults, are overlaid by an optional TOML
//! file, then by environment and command-line values.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::rate_limit::{RouteKey, RouteLimit};
use crate::services::backup::DEFAULT_KEEP;
use crate::services::scoring::DEFAULT_WINNER_THRESHOLD;

/// Default data directory, relative to the working directory.
pub const DEFAULT_DATA_DIR: &str = "bitbets_data";

/// Config file name looked up next to the data and in the working directory.
pub const CONFIG_FILENAME: &str = "bitbets.toml";

/// Default bind address.
pub const DEFAULT_BIND: &str = "0.0.0.0:5000";

/// Default request body limit (16 MiB).
pub const DEFAULT_MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// File-based configuration. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub data_dir: Option<PathBuf>,
    pub bind: Option<String>,
    pub backup_interval_secs: Option<u64>,
    pub backup_keep: Option<usize>,
    pub winner_threshold: Option<f64>,
    pub max_body_bytes: Option<usize>,
    pub cors_origin: Option<String>,
    pub admin_token: Option<String>,
    pub rate_limit_sweep_secs: Option<u64>,
    /// Per-route overrides, keyed by route name (`users_read`, `backup`, ...).
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub rate_limits: HashMap<String, RouteLimit>,
}

impl Config {
    pub fn load_from_path(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn from_toml(text: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(text)?;
        for name in config.rate_limits.keys() {
            name.parse::<RouteKey>()
                .map_err(|e| anyhow::anyhow!("[rate_limits]: {}", e))?;
        }
        Ok(config)
    }
}

/// Resolved runtime settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Directory holding the collection files and `backups/`.
    pub data_dir: PathBuf,
    /// Address the server listens on.
    pub bind: String,
    /// Time between periodic backups.
    pub backup_interval: Duration,
    /// Number of snapshots kept after pruning.
    pub backup_keep: usize,
    /// Maximum absolute difference that still counts as a win.
    pub winner_threshold: f64,
    /// Largest accepted request body.
    pub max_body_bytes: usize,
    /// Allowed CORS origin (None = permissive).
    pub cors_origin: Option<String>,
    /// Token required by destructive endpoints (None = unguarded).
    pub admin_token: Option<String>,
    /// Time between idle rate-limit key sweeps.
    pub rate_limit_sweep: Duration,
    pub rate_limits: HashMap<RouteKey, RouteLimit>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            bind: DEFAULT_BIND.to_string(),
            backup_interval: Duration::from_secs(3600),
            backup_keep: DEFAULT_KEEP,
            winner_threshold: DEFAULT_WINNER_THRESHOLD,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            cors_origin: None,
            admin_token: None,
            rate_limit_sweep: Duration::from_secs(300),
            rate_limits: HashMap::new(),
        }
    }
}

impl Settings {
    /// Settings rooted at `data_dir`, everything else default.
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    /// Overlay values present in a config file.
    pub fn apply_config(&mut self, config: Config) {
        if let Some(dir) = config.data_dir {
            self.data_dir = dir;
        }
        if let Some(bind) = config.bind {
            self.bind = bind;
        }
        if let Some(secs) = config.backup_interval_secs {
            self.backup_interval = Duration::from_secs(secs);
        }
        if let Some(keep) = config.backup_keep {
            self.backup_keep = keep;
        }
        if let Some(threshold) = config.winner_threshold {
            self.winner_threshold = threshold;
        }
        if let Some(bytes) = config.max_body_bytes {
            self.max_body_bytes = bytes;
        }
        if config.cors_origin.is_some() {
            self.cors_origin = config.cors_origin;
        }
        if config.admin_token.is_some() {
            self.admin_token = config.admin_token;
        }
        if let Some(secs) = config.rate_limit_sweep_secs {
            self.rate_limit_sweep = Duration::from_secs(secs);
        }
        self.rate_limits.extend(
            config
                .rate_limits
                .into_iter()
                .filter_map(|(name, limit)| name.parse::<RouteKey>().ok().map(|r| (r, limit))),
        );
    }

    fn validate(&self) -> anyhow::Result<()> {
        if !self.winner_threshold.is_finite() || self.winner_threshold < 0.0 {
            anyhow::bail!(
                "winner_threshold must be a non-negative number, got {}",
                self.winner_threshold
            );
        }
        if self.backup_keep == 0 {
            anyhow::bail!("backup_keep must be at least 1");
        }
        if self.backup_interval.is_zero() || self.rate_limit_sweep.is_zero() {
            anyhow::bail!("backup and sweep intervals must be greater than zero");
        }
        if let Some((route, _)) = self.rate_limits.iter().find(|(_, l)| l.window_secs == 0) {
            anyhow::bail!("rate limit window for {} must be greater than zero", route);
        }
        Ok(())
    }
}

/// Options for loading settings.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Explicit config file path (overrides auto-discovery).
    pub config_path: Option<PathBuf>,
    /// Data directory (overrides the config file).
    pub data_dir: Option<PathBuf>,
    /// Bind address (overrides the config file and `PORT`).
    pub bind: Option<String>,
    /// Admin token (overrides the config file).
    pub admin_token: Option<String>,
}

/// Find the config file: explicit path, then next to the data, then the CWD.
fn find_config(options: &LoadOptions, data_dir: &Path) -> Option<PathBuf> {
    if let Some(ref path) = options.config_path {
        return Some(path.clone());
    }
    [data_dir.join(CONFIG_FILENAME), PathBuf::from(CONFIG_FILENAME)]
        .into_iter()
        .find(|p| p.exists())
}

/// Resolve settings from defaults, config file, `PORT` and explicit options.
pub fn load_settings(options: &LoadOptions) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();
    if let Some(ref dir) = options.data_dir {
        settings.data_dir = dir.clone();
    }

    if let Some(path) = find_config(options, &settings.data_dir) {
        tracing::debug!("Loading config from {}", path.display());
        settings.apply_config(Config::load_from_path(&path)?);
    }

    if let Some(port) = std::env::var("PORT").ok().and_then(|p| p.parse::<u16>().ok()) {
        settings.bind = with_port(&settings.bind, port);
    }

    if let Some(ref dir) = options.data_dir {
        settings.data_dir = dir.clone();
    }
    if let Some(ref bind) = options.bind {
        settings.bind = bind.clone();
    }
    if let Some(ref token) = options.admin_token {
        settings.admin_token = Some(token.clone());
    }

    settings.validate()?;
    Ok(settings)
}

fn with_port(bind: &str, port: u16) -> String {
    let host = bind.rsplit_once(':').map(|(h, _)| h).unwrap_or(bind);
    format!("{}:{}", host, port)
}
