//! Commands that talk to a running server over HTTP.

use crate::cli::icons;
use crate::client::{ApiClient, ClientError};
use crate::config::Settings;

use super::RemoteAction;

pub async fn cmd_remote(settings: &Settings, url: &str, action: RemoteAction) -> anyhow::Result<()> {
    let client = ApiClient::new(url)?.with_admin_token(settings.admin_token.clone());

    let result = match action {
        RemoteAction::Health => client.health().await.map(|v| pretty(&v)),
        RemoteAction::Stats => client.stats().await.map(|v| pretty(&v)),
        RemoteAction::Leaderboard => client.leaderboard().await.map(|v| pretty(&v)),
        RemoteAction::Backup => client.trigger_backup().await.map(|m| m.message),
        RemoteAction::Export => client.trigger_export().await.map(|m| m.message),
    };

    match result {
        Ok(output) => {
            println!("{} {}", icons::success(), client.base_url());
            println!("{}", output);
            Ok(())
        }
        Err(e) => {
            eprintln!("{} {}", icons::error(), hint(&e));
            Err(e.into())
        }
    }
}

fn pretty(value: &serde_json::Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// One-line advice for each failure class.
fn hint(err: &ClientError) -> &'static str {
    match err {
        ClientError::Timeout { .. } => "The server took too long to respond",
        ClientError::Dns { .. } => "The server hostname could not be resolved",
        ClientError::Connection { .. } => "Could not reach the server; is it running?",
        ClientError::Http { status: 429, .. } => "Rate limited; try again later",
        ClientError::Http { .. } => "The server rejected the request",
        ClientError::Other { .. } => "The request failed",
    }
}
