//! HTTP client for a running BitBets server.
//!
//! Every call has a fixed timeout and is retried a bounded number of times
//! with exponential backoff. Failures are classified so callers can tell a
//! slow server from an unreachable one.

use std::error::Error as _;
use std::time::Duration;

use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::models::{Collection, JsonMap};
use crate::rate_limit::{backoff_delay, parse_retry_after};
use crate::server::ADMIN_TOKEN_HEADER;

/// Per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
/// Total attempts per call, including the first.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
/// Base delay for exponential backoff between attempts.
pub const DEFAULT_BACKOFF_MS: u64 = 500;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Request to {url} timed out")]
    Timeout { url: String },
    #[error("Could not resolve host for {url}")]
    Dns { url: String },
    #[error("Could not connect to {url}: {message}")]
    Connection { url: String, message: String },
    #[error("{url} returned HTTP {status}: {message}")]
    Http {
        url: String,
        status: u16,
        message: String,
    },
    #[error("Request to {url} failed: {message}")]
    Other { url: String, message: String },
}

impl ClientError {
    fn from_reqwest(url: &str, err: reqwest::Error) -> Self {
        let url = url.to_string();
        if err.is_timeout() {
            return ClientError::Timeout { url };
        }
        let message = error_chain(&err);
        if err.is_connect() {
            let lower = message.to_lowercase();
            if lower.contains("dns error") || lower.contains("failed to lookup address") {
                return ClientError::Dns { url };
            }
            return ClientError::Connection { url, message };
        }
        ClientError::Other { url, message }
    }

    /// Whether another attempt could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Timeout { .. } | ClientError::Connection { .. } => true,
            ClientError::Http { status, .. } => {
                *status == StatusCode::TOO_MANY_REQUESTS.as_u16() || *status >= 500
            }
            ClientError::Dns { .. } | ClientError::Other { .. } => false,
        }
    }
}

fn error_chain(err: &reqwest::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(inner) = source {
        message.push_str(": ");
        message.push_str(&inner.to_string());
        source = inner.source();
    }
    message
}

/// `{status, message}` reply from the mutating endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StatusMessage {
    pub status: String,
    pub message: String,
}

/// Client for the BitBets HTTP API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    max_attempts: u32,
    backoff_ms: u64,
    admin_token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ClientError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("bitbets/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ClientError::from_reqwest(&base_url, e))?;
        Ok(Self {
            http,
            base_url,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_ms: DEFAULT_BACKOFF_MS,
            admin_token: None,
        })
    }

    /// Override attempt count (at least one) and backoff base.
    pub fn with_retries(mut self, max_attempts: u32, backoff_ms: u64) -> Self {
        self.max_attempts = max_attempts.max(1);
        self.backoff_ms = backoff_ms;
        self
    }

    pub fn with_admin_token(mut self, token: Option<String>) -> Self {
        self.admin_token = token;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn health(&self) -> Result<Value, ClientError> {
        self.send(Method::GET, "/health", None).await
    }

    pub async fn stats(&self) -> Result<Value, ClientError> {
        self.send(Method::GET, "/api/stats", None).await
    }

    pub async fn leaderboard(&self) -> Result<Value, ClientError> {
        self.send(Method::GET, "/api/leaderboard", None).await
    }

    pub async fn trigger_backup(&self) -> Result<StatusMessage, ClientError> {
        self.send_status(Method::POST, "/api/backup", None).await
    }

    pub async fn trigger_export(&self) -> Result<StatusMessage, ClientError> {
        self.send_status(Method::POST, "/api/export-csv", None).await
    }

    pub async fn get_collection(&self, collection: Collection) -> Result<JsonMap, ClientError> {
        let path = format!("/api/{}", collection.as_str());
        let url = self.url(&path);
        match self.send(Method::GET, &path, None).await? {
            Value::Object(map) => Ok(map),
            other => Err(ClientError::Other {
                url,
                message: format!("expected a JSON object, got {}", other),
            }),
        }
    }

    /// Merge `data` into a collection on the server.
    pub async fn merge_collection(
        &self,
        collection: Collection,
        data: &JsonMap,
    ) -> Result<StatusMessage, ClientError> {
        let path = format!("/api/{}", collection.as_str());
        let body = Value::Object(data.clone());
        self.send_status(Method::POST, &path, Some(&body)).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send_status(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<StatusMessage, ClientError> {
        let url = self.url(path);
        let value = self.send(method, path, body).await?;
        serde_json::from_value(value).map_err(|e| ClientError::Other {
            url,
            message: format!("unexpected response body: {}", e),
        })
    }

    /// Send a request, retrying transient failures with backoff.
    async fn send(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Value, ClientError> {
        let url = self.url(path);
        let mut attempt = 0;
        loop {
            let (result, retry_after) = self.send_once(method.clone(), &url, body).await;
            let err = match result {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            attempt += 1;
            if attempt >= self.max_attempts || !err.is_retryable() {
                return Err(err);
            }

            let wait = retry_after.unwrap_or_else(|| backoff_delay(attempt - 1, self.backoff_ms));
            warn!(
                "{} {} failed (attempt {}/{}): {}; retrying in {:?}",
                method, url, attempt, self.max_attempts, err, wait
            );
            tokio::time::sleep(wait).await;
        }
    }

    async fn send_once(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
    ) -> (Result<Value, ClientError>, Option<Duration>) {
        let mut request = self.http.request(method, url);
        if let Some(body) = body {
            request = request.json(body);
        }
        if let Some(token) = &self.admin_token {
            request = request.header(ADMIN_TOKEN_HEADER, token);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => return (Err(ClientError::from_reqwest(url, e)), None),
        };

        let status = response.status();
        let retry_after = parse_retry_after(
            response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok()),
        );
        debug!("{} -> {}", url, status);

        let text = match response.text().await {
            Ok(text) => text,
            Err(e) => return (Err(ClientError::from_reqwest(url, e)), None),
        };

        if !status.is_success() {
            let message = serde_json::from_str::<Value>(&text)
                .ok()
                .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("error").to_string());
            return (
                Err(ClientError::Http {
                    url: url.to_string(),
                    status: status.as_u16(),
                    message,
                }),
                retry_after,
            );
        }

        let parsed = serde_json::from_str(&text).map_err(|e| ClientError::Other {
            url: url.to_string(),
            message: format!("invalid JSON: {}", e),
        });
        (parsed, None)
    }
}
