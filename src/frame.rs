//! Frame: the message type on the push channel.
//!
//! ARCHITECTURE
//! ============
//! The push channel is room-scoped pub/sub over a websocket carrying JSON
//! text frames. The client sends one request frame, `joinRoom`, naming the
//! session it watches. The server fans out two events to room members:
//! `tokenRotated` (payload `{token, sessionId}`) and `rosterChanged`
//! (payload `{sessionId}`; a signal to refetch).
//!
//! DESIGN
//! ======
//! - Flat data: payload is always `Map<String, Value>`, never nested.
//! - The event name rides in `syscall`; the room key is the payload's
//!   `sessionId`, exactly as the server emits it.
//! - Inbound frames are lenient: unknown events and payloads without a
//!   numeric `sessionId` decode fine and are simply not turned into a
//!   [`PushEvent`].

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{SessionId, Token};

// =============================================================================
// EVENTS / FIELDS
// =============================================================================

pub const SYSCALL_JOIN_ROOM: &str = "joinRoom";
pub const SYSCALL_TOKEN_ROTATED: &str = "tokenRotated";
pub const SYSCALL_ROSTER_CHANGED: &str = "rosterChanged";

/// Payload key for the room / session id.
pub const FRAME_SESSION_ID: &str = "sessionId";
/// Payload key for the rotated token.
pub const FRAME_TOKEN: &str = "token";

// =============================================================================
// TYPES
// =============================================================================

/// Flat key-value payload.
pub type Data = HashMap<String, serde_json::Value>;

/// Lifecycle position of a frame. The client only sends requests; server
/// events arrive as items unless the server reports an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Request,
    #[default]
    Item,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Frame {
    #[serde(default)]
    pub id: Uuid,
    /// Milliseconds since Unix epoch.
    #[serde(default)]
    pub ts: i64,
    pub syscall: String,
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub data: Data,
}

fn now_ms() -> i64 {
    let Ok(dur) = SystemTime::now().duration_since(UNIX_EPOCH) else {
        return 0;
    };
    i64::try_from(dur.as_millis()).unwrap_or(0)
}

impl Frame {
    /// Create a request frame.
    pub fn request(syscall: impl Into<String>, data: Data) -> Self {
        Self { id: Uuid::new_v4(), ts: now_ms(), syscall: syscall.into(), status: Status::Request, data }
    }

    /// The `joinRoom` request that subscribes this socket to a session room.
    #[must_use]
    pub fn join_room(session_id: SessionId) -> Self {
        let mut data = Data::new();
        data.insert(FRAME_SESSION_ID.to_owned(), session_id.0.into());
        Self::request(SYSCALL_JOIN_ROOM, data)
    }
}

// =============================================================================
// PUSH EVENTS
// =============================================================================

/// A typed event decoded from a server frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushEvent {
    TokenRotated { session_id: SessionId, token: Token },
    RosterChanged { session_id: SessionId },
}

impl PushEvent {
    /// Decode the event a frame carries, if any.
    ///
    /// Returns `None` for error frames, payloads with no numeric
    /// `sessionId`, unknown events, and `tokenRotated` frames without a
    /// string token.
    #[must_use]
    pub fn from_frame(frame: &Frame) -> Option<Self> {
        if frame.status == Status::Error {
            return None;
        }
        let session_id = SessionId(frame.data.get(FRAME_SESSION_ID)?.as_i64()?);
        match frame.syscall.as_str() {
            SYSCALL_TOKEN_ROTATED => {
                let token = frame.data.get(FRAME_TOKEN)?.as_str()?;
                if token.is_empty() {
                    return None;
                }
                Some(Self::TokenRotated { session_id, token: Token::from(token) })
            }
            SYSCALL_ROSTER_CHANGED => Some(Self::RosterChanged { session_id }),
            _ => None,
        }
    }

    /// Parse a websocket text payload straight into an event.
    #[must_use]
    pub fn from_text(text: &str) -> Option<Self> {
        match serde_json::from_str::<Frame>(text) {
            Ok(frame) => Self::from_frame(&frame),
            Err(e) => {
                tracing::debug!(error = %e, "push: undecodable frame");
                None
            }
        }
    }

    #[must_use]
    pub fn session_id(&self) -> SessionId {
        match self {
            Self::TokenRotated { session_id, .. } | Self::RosterChanged { session_id } => *session_id,
        }
    }
}

#[cfg(test)]
#[path = "frame_test.rs"]
mod tests;
