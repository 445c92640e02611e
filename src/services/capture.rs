//! Student-side capture: submit a name against a scanned token.
//!
//! A rejection shows the server's own message verbatim when it sent one,
//! otherwise a generic fallback. Nothing is retried automatically; the
//! student resubmits.

use tracing::{info, warn};

use crate::api::Backend;
use crate::model::Token;

pub const CAPTURE_SUCCESS_MESSAGE: &str = "attendance recorded";
pub const CAPTURE_FAILED_FALLBACK: &str = "could not record attendance";

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("enter your name")]
    BlankName,
    #[error("missing capture token")]
    MissingToken,
    /// The server refused or the request never arrived. Display is the
    /// message to show the student.
    #[error("{0}")]
    Rejected(String),
}

/// Submit `name` against `token`. The name is trimmed before sending.
///
/// # Errors
///
/// Returns [`CaptureError::BlankName`] / [`CaptureError::MissingToken`] before
/// any request is made, and [`CaptureError::Rejected`] when the backend call
/// fails.
pub async fn submit_presence(backend: &dyn Backend, name: &str, token: &Token) -> Result<(), CaptureError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CaptureError::BlankName);
    }
    if token.as_str().trim().is_empty() {
        return Err(CaptureError::MissingToken);
    }

    match backend.submit_presence(name, token).await {
        Ok(()) => {
            info!(student = name, "capture: presence recorded");
            Ok(())
        }
        Err(e) => {
            warn!(student = name, error = %e, "capture: presence rejected");
            Err(CaptureError::Rejected(e.user_message(CAPTURE_FAILED_FALLBACK)))
        }
    }
}

#[cfg(test)]
#[path = "capture_test.rs"]
mod tests;
