//! HTTP implementation of [`Backend`] over `reqwest`.
//!
//! Thin wrapper: build URL, send, map status. Body parsing lives in pure
//! functions so it can be tested without a server.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use super::{ApiError, Backend};
use crate::model::{RosterEntry, Session, SessionId, Token};

const CONNECT_TIMEOUT_SECS: u64 = 10;

// =============================================================================
// CLIENT
// =============================================================================

pub struct HttpBackend {
    http: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    /// Build a backend client rooted at `base_url`.
    ///
    /// Requests carry no overall timeout: a hung roster fetch only delays one
    /// reconciliation round, and the next poll tick issues a fresh one.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::ClientBuild`] if the TLS backend cannot initialise.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| ApiError::ClientBuild(e.to_string()))?;
        Ok(Self { http, base_url: base_url.into().trim_end_matches('/').to_owned() })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        join_url(&self.base_url, path)
    }

    /// Send a request and return the raw body of a success response.
    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Vec<u8>, ApiError> {
        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?.to_vec();
        if !(200..300).contains(&status) {
            return Err(status_error(status, &body));
        }
        Ok(body)
    }
}

#[derive(Serialize)]
struct CreateSessionRequest<'a> {
    name: &'a str,
}

#[derive(Serialize)]
struct PresenceRequest<'a> {
    name: &'a str,
    token: &'a Token,
}

#[async_trait]
impl Backend for HttpBackend {
    async fn create_session(&self, name: &str) -> Result<Session, ApiError> {
        let request = self.http.post(self.url("/sessions")).json(&CreateSessionRequest { name });
        let body = self.send(request).await?;
        parse_json(&body)
    }

    async fn request_token(&self, session_id: SessionId) -> Result<(), ApiError> {
        let request = self.http.post(self.url(&format!("/sessions/{session_id}/token")));
        self.send(request).await?;
        Ok(())
    }

    async fn fetch_roster(&self, session_id: SessionId) -> Result<Vec<RosterEntry>, ApiError> {
        let request = self.http.get(self.url(&format!("/sessions/{session_id}/roster")));
        let body = self.send(request).await?;
        parse_json(&body)
    }

    async fn submit_presence(&self, name: &str, token: &Token) -> Result<(), ApiError> {
        let request = self.http.post(self.url("/presences")).json(&PresenceRequest { name, token });
        self.send(request).await?;
        Ok(())
    }

    async fn export_roster(&self, session_id: SessionId) -> Result<Vec<u8>, ApiError> {
        let request = self.http.get(self.url(&format!("/sessions/{session_id}/export")));
        self.send(request).await
    }
}

// =============================================================================
// PARSING
// =============================================================================

fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

fn parse_json<T: serde::de::DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|e| ApiError::Parse(e.to_string()))
}

/// Map a non-success response to [`ApiError::Status`], lifting the server's
/// `{"error": "..."}` message when the body carries one.
fn status_error(status: u16, body: &[u8]) -> ApiError {
    #[derive(serde::Deserialize)]
    struct ErrorBody {
        error: Option<String>,
    }

    let message = match serde_json::from_slice::<ErrorBody>(body) {
        Ok(parsed) => parsed.error,
        Err(e) => {
            tracing::debug!(status, error = %e, "api: error body carries no message");
            None
        }
    };
    ApiError::Status { status, message }
}

#[cfg(test)]
#[path = "http_test.rs"]
mod tests;
