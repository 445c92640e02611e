//! Backend boundary: the attendance server as the client consumes it.
//!
//! DESIGN
//! ======
//! The view never talks HTTP directly; it holds an `Arc<dyn Backend>`. The
//! production implementation is [`http::HttpBackend`]; tests plug in scripted
//! fakes. Rotation results are not returned here: `request_token` only asks
//! the server to rotate, and the new token arrives on the push channel.

pub mod http;

use async_trait::async_trait;

use crate::model::{RosterEntry, Session, SessionId, Token};

pub use http::HttpBackend;

// =============================================================================
// ERROR
// =============================================================================

/// Errors produced by backend calls.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request never produced a response (connect, DNS, TLS, body read).
    #[error("request failed: {0}")]
    Transport(String),

    /// The server answered with a non-success status.
    #[error("server returned {status}{}", message_suffix(.message.as_deref()))]
    Status { status: u16, message: Option<String> },

    /// A success response body did not match the expected shape.
    #[error("response parse failed: {0}")]
    Parse(String),

    /// The HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    ClientBuild(String),
}

fn message_suffix(message: Option<&str>) -> String {
    message.map(|m| format!(": {m}")).unwrap_or_default()
}

impl ApiError {
    /// The server-provided message when there is one, else `fallback`.
    #[must_use]
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            Self::Status { message: Some(message), .. } if !message.trim().is_empty() => message.clone(),
            _ => fallback.to_owned(),
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Parse(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

// =============================================================================
// TRAIT
// =============================================================================

/// One method per backend endpoint.
#[async_trait]
pub trait Backend: Send + Sync + 'static {
    /// `POST /sessions {name}`.
    async fn create_session(&self, name: &str) -> Result<Session, ApiError>;

    /// `POST /sessions/{id}/token`. The token itself arrives via push.
    async fn request_token(&self, session_id: SessionId) -> Result<(), ApiError>;

    /// `GET /sessions/{id}/roster`, the full authoritative snapshot.
    async fn fetch_roster(&self, session_id: SessionId) -> Result<Vec<RosterEntry>, ApiError>;

    /// `POST /presences {name, token}`.
    async fn submit_presence(&self, name: &str, token: &Token) -> Result<(), ApiError>;

    /// `GET /sessions/{id}/export`, an opaque file payload.
    async fn export_roster(&self, session_id: SessionId) -> Result<Vec<u8>, ApiError>;
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
