//! Outgoing-request layer — the seam the store issues `/auth/*` calls through.
//!
//! DESIGN
//! ======
//! `RequestLayer` is the trait the store depends on; `HttpClient` is the
//! reqwest-backed implementation. The store pushes every token change into the
//! layer with `set_token`, and the layer attaches it to later requests as a
//! bearer `Authorization` header.
//!
//! ERROR HANDLING
//! ==============
//! Non-2xx statuses, transport failures, and undecodable bodies each map to
//! their own `RequestError` variant. The store decides which of them surface.

#[cfg(test)]
#[path = "request_test.rs"]
mod tests;

use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use serde_json::Value;

use crate::config::ClientConfig;

/// Errors produced by request-layer calls.
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    ClientBuild(String),

    /// The request never produced a response.
    #[error("request failed: {0}")]
    Transport(String),

    /// The server answered with a non-success status.
    #[error("request rejected: status {status}")]
    Status { status: u16, body: String },

    /// The response body was not valid JSON.
    #[error("response decode failed: {0}")]
    Decode(String),
}

/// Transport used by the store for its `/auth/*` calls.
#[async_trait::async_trait]
pub trait RequestLayer: Send + Sync {
    /// Replace the token attached to subsequent requests.
    fn set_token(&self, token: Option<&str>);

    /// `GET path`, returning the decoded JSON body.
    async fn get(&self, path: &str) -> Result<Value, RequestError>;

    /// `POST path` with a JSON body, returning the decoded JSON body.
    async fn post(&self, path: &str, body: &Value) -> Result<Value, RequestError>;
}

// =============================================================================
// HTTP CLIENT
// =============================================================================

/// reqwest-backed request layer bound to one API base URL.
#[derive(Debug)]
pub struct HttpClient {
    base_url: String,
    http: reqwest::Client,
    token: RwLock<Option<String>>,
}

impl HttpClient {
    /// Build a client from typed config.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::ClientBuild`] if the reqwest client fails to build.
    pub fn new(config: &ClientConfig) -> Result<Self, RequestError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .map_err(|e| RequestError::ClientBuild(e.to_string()))?;
        Ok(Self { base_url: config.base_url.trim_end_matches('/').to_owned(), http, token: RwLock::new(None) })
    }

    /// Base URL every path is joined onto.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Token currently attached to requests.
    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn url(&self, path: &str) -> String {
        endpoint_url(&self.base_url, path)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Value, RequestError> {
        let request = match self.token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        };
        let resp = request
            .send()
            .await
            .map_err(|e| RequestError::Transport(e.to_string()))?;
        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| RequestError::Transport(e.to_string()))?;
        if !status.is_success() {
            return Err(RequestError::Status { status: status.as_u16(), body });
        }
        decode_body(&body)
    }
}

#[async_trait::async_trait]
impl RequestLayer for HttpClient {
    fn set_token(&self, token: Option<&str>) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = token.map(str::to_owned);
    }

    async fn get(&self, path: &str) -> Result<Value, RequestError> {
        tracing::debug!(%path, "GET");
        self.send(self.http.get(self.url(path))).await
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Value, RequestError> {
        tracing::debug!(%path, "POST");
        self.send(self.http.post(self.url(path)).json(body)).await
    }
}

fn endpoint_url(base_url: &str, path: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// Decode a response body; an empty body is `null`.
fn decode_body(body: &str) -> Result<Value, RequestError> {
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(body).map_err(|e| RequestError::Decode(e.to_string()))
}
