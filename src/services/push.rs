//! Push channel listener: room-scoped websocket subscription.
//!
//! DESIGN
//! ======
//! A [`PushChannel`] is a connection handle passed explicitly to the view
//! that owns it; there is no process-wide socket. `join` returns a
//! [`Subscription`] that owns the listener task. Dropping it aborts the task,
//! which closes the socket and with it the room membership.
//!
//! LIFECYCLE
//! =========
//! 1. Connect → send `joinRoom` for the session → report `Connected`
//! 2. Decode text frames into [`PushEvent`]s → forward to the inbox
//! 3. Socket lost → report `Disconnected` → back off → reconnect and rejoin
//!
//! ERROR HANDLING
//! ==============
//! Socket failures are logged and never reach the instructor as errors: the
//! roster poller keeps the view correct while the channel is down.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use crate::frame::{Frame, PushEvent};
use crate::machine::{Connectivity, Inbox, Input};
use crate::model::SessionId;

use super::task::TaskGuard;

const INITIAL_BACKOFF_MS: u64 = 1000;
const MAX_BACKOFF_MS: u64 = 10_000;

// =============================================================================
// ERROR
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum PushError {
    #[error("websocket failed: {0}")]
    Ws(Box<tokio_tungstenite::tungstenite::Error>),
    #[error("frame encode failed: {0}")]
    Encode(#[from] serde_json::Error),
}

impl From<tokio_tungstenite::tungstenite::Error> for PushError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::Ws(Box::new(err))
    }
}

// =============================================================================
// SUBSCRIPTION
// =============================================================================

/// Membership in one session room. Leaves the room when dropped.
pub struct Subscription {
    session_id: SessionId,
    task: TaskGuard,
}

impl Subscription {
    #[must_use]
    pub fn new(session_id: SessionId, task: TaskGuard) -> Self {
        Self { session_id, task }
    }

}

impl Drop for Subscription {
    fn drop(&mut self) {
        info!(session_id = %self.session_id, task = self.task.name(), "push: leaving room");
    }
}

/// A push connection a view can join a session room on.
pub trait PushChannel: Send + Sync + 'static {
    /// Join the room for `session_id`. Events and connectivity changes are
    /// sent to `inbox` until the returned subscription is dropped.
    fn join(&self, session_id: SessionId, inbox: Inbox) -> Subscription;
}

// =============================================================================
// WEBSOCKET CHANNEL
// =============================================================================

pub struct WsPushChannel {
    url: String,
}

impl WsPushChannel {
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl PushChannel for WsPushChannel {
    fn join(&self, session_id: SessionId, inbox: Inbox) -> Subscription {
        let task = TaskGuard::spawn("push", listen(self.url.clone(), session_id, inbox));
        Subscription::new(session_id, task)
    }
}

/// Why a single connection attempt ended.
enum Exit {
    SocketClosed,
    InboxClosed,
}

fn report(inbox: &Inbox, connectivity: Connectivity) -> bool {
    inbox.send(Input::PushStatus(connectivity)).is_ok()
}

/// Connection loop with reconnect. Ends only when the inbox closes or the
/// owning subscription aborts it.
async fn listen(url: String, session_id: SessionId, inbox: Inbox) {
    let mut backoff_ms = INITIAL_BACKOFF_MS;

    loop {
        if !report(&inbox, Connectivity::Connecting) {
            return;
        }

        match connect_and_run(&url, session_id, &inbox, &mut backoff_ms).await {
            Ok(Exit::InboxClosed) => return,
            Ok(Exit::SocketClosed) => info!(%session_id, "push: socket closed"),
            Err(e) => warn!(%session_id, error = %e, "push: socket error"),
        }

        if !report(&inbox, Connectivity::Disconnected) {
            return;
        }

        debug!(%session_id, backoff_ms, "push: reconnecting after backoff");
        tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
        backoff_ms = next_backoff(backoff_ms);
    }
}

fn next_backoff(current_ms: u64) -> u64 {
    current_ms.saturating_mul(2).min(MAX_BACKOFF_MS)
}

/// Connect, join the room, and forward events until the socket ends.
async fn connect_and_run(
    url: &str,
    session_id: SessionId,
    inbox: &Inbox,
    backoff_ms: &mut u64,
) -> Result<Exit, PushError> {
    let (mut stream, _) = connect_async(url).await?;

    let join = serde_json::to_string(&Frame::join_room(session_id))?;
    stream.send(Message::text(join)).await?;

    *backoff_ms = INITIAL_BACKOFF_MS;
    info!(%session_id, "push: joined room");
    if !report(inbox, Connectivity::Connected) {
        return Ok(Exit::InboxClosed);
    }

    while let Some(message) = stream.next().await {
        match message? {
            Message::Text(text) => {
                let Some(event) = PushEvent::from_text(text.as_str()) else {
                    continue;
                };
                debug!(session_id = %event.session_id(), ?event, "push: event received");
                if inbox.send(Input::Push(event)).is_err() {
                    return Ok(Exit::InboxClosed);
                }
            }
            Message::Close(_) => return Ok(Exit::SocketClosed),
            _ => {}
        }
    }

    Ok(Exit::SocketClosed)
}

#[cfg(test)]
#[path = "push_test.rs"]
mod tests;
