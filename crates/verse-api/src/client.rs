//! Core HTTP client for the Tradeverse backend.
//!
//! One `ApiClient` is shared by every poller and controller in the process.
//! It attaches `Authorization: Bearer <token>` whenever the shared session
//! token is set, and tags each mutation with an `X-Request-Id` so the
//! backend can deduplicate a retried write.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

/// Default backend base URL (local development server).
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";

/// Request timeout for all API calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Session token shared between the session store and the API client.
///
/// Pollers only ever read this; the session store and the mode/environment
/// controllers are the only writers.
pub type SharedToken = Arc<RwLock<Option<String>>>;

/// Create an empty shared token slot.
pub fn new_shared_token() -> SharedToken {
    Arc::new(RwLock::new(None))
}

/// Errors that can occur when talking to the backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Transport-level failure (timeout, connection refused, DNS).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend rejected the credentials (401/403).
    #[error("authorization rejected: status {status}, body: {body}")]
    Auth { status: u16, body: String },

    /// Backend returned a non-2xx status other than 401/403.
    #[error("API error: status {status}, body: {body}")]
    Status { status: u16, body: String },

    /// Response body did not match the expected shape.
    #[error("malformed payload: {0}")]
    Json(String),

    /// Backend-reported business failure, surfaced verbatim. Never retried.
    #[error("{0}")]
    Business(String),
}

impl ApiError {
    /// Whether this error is an authorization failure (401/403).
    pub fn is_auth(&self) -> bool {
        matches!(self, ApiError::Auth { .. })
    }

    /// Whether this error may clear on a later attempt.
    ///
    /// Business failures are final; everything else (transport, server
    /// errors, malformed payloads, stale credentials) is worth retrying on
    /// the next poll tick.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, ApiError::Business(_))
    }
}

/// Thin HTTP client for the Tradeverse backend.
#[derive(Debug, Clone)]
pub struct ApiClient {
    /// HTTP client for API requests.
    http: Client,
    /// Resolved base URL (persisted override, config, or build-time default).
    base_url: String,
    /// Session token, shared with the session store.
    token: SharedToken,
}

impl ApiClient {
    /// Create a new API client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Optional override. Defaults to [`DEFAULT_BASE_URL`].
    ///   A trailing slash is stripped so path joining stays predictable.
    /// * `token` - Shared token slot, usually owned by the session store.
    pub fn new(base_url: Option<String>, token: SharedToken) -> Self {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("Failed to create HTTP client");

        let base_url = base_url
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        Self {
            http,
            base_url,
            token,
        }
    }

    /// The resolved base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Current bearer token, if any.
    pub fn token(&self) -> Option<String> {
        self.token.read().clone()
    }

    /// Build a full URL for an API path.
    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Issue a GET and decode the JSON response.
    pub(crate) async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let mut request = self.http.get(self.url(path));
        if let Some(token) = self.token() {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        Self::decode(response).await
    }

    /// Issue a POST with a JSON body and decode the JSON response.
    ///
    /// Every POST carries a fresh `X-Request-Id` so the backend can treat a
    /// retried write as at-most-once.
    pub(crate) async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let request_id = Uuid::new_v4();
        let mut request = self
            .http
            .post(self.url(path))
            .header("X-Request-Id", request_id.to_string())
            .json(body);
        if let Some(token) = self.token() {
            request = request.bearer_auth(token);
        }

        debug!(%request_id, path, "POST");
        let response = request.send().await?;
        Self::decode(response).await
    }

    /// Check the status and decode the body, classifying failures per the
    /// error taxonomy.
    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
        let status = response.status();
        let body = response.text().await?;

        if status == reqwest::StatusCode::UNAUTHORIZED
            || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(ApiError::Auth {
                status: status.as_u16(),
                body,
            });
        }
        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|e| ApiError::Json(format!("{e}: {body}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client_with(base: Option<&str>) -> ApiClient {
        ApiClient::new(base.map(str::to_string), new_shared_token())
    }

    #[test]
    fn test_default_base_url() {
        let client = client_with(None);
        assert_eq!(client.base_url(), DEFAULT_BASE_URL);
    }

    #[test]
    fn test_trailing_slash_stripped() {
        let client = client_with(Some("https://api.tradeverse.example/"));
        assert_eq!(client.base_url(), "https://api.tradeverse.example");
        assert_eq!(
            client.url("/api/settings"),
            "https://api.tradeverse.example/api/settings"
        );
    }

    #[test]
    fn test_url_join_without_leading_slash() {
        let client = client_with(Some("http://localhost:9000"));
        assert_eq!(client.url("api/orders"), "http://localhost:9000/api/orders");
    }

    #[test]
    fn test_token_follows_shared_slot() {
        let token = new_shared_token();
        let client = ApiClient::new(None, Arc::clone(&token));
        assert!(client.token().is_none());

        *token.write() = Some("tok-1".to_string());
        assert_eq!(client.token().as_deref(), Some("tok-1"));

        *token.write() = None;
        assert!(client.token().is_none());
    }

    #[test]
    fn test_error_classification() {
        let auth = ApiError::Auth {
            status: 401,
            body: String::new(),
        };
        assert!(auth.is_auth());
        assert!(auth.is_retryable());

        let business = ApiError::Business("insufficient margin".to_string());
        assert!(!business.is_auth());
        assert!(!business.is_retryable());
        assert_eq!(business.to_string(), "insufficient margin");

        let server = ApiError::Status {
            status: 500,
            body: "boom".to_string(),
        };
        assert!(!server.is_auth());
        assert!(server.is_retryable());
    }
}
