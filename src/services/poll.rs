//! Poll reconciler: periodic full-roster refetch as the consistency backstop.
//!
//! DESIGN
//! ======
//! The poller only emits [`Input::PollTick`]; the machine turns every tick
//! into a fetch, so a hung request never holds the next one back.
//! [`fetch_roster`] is the one fetch both paths use. Its result goes back
//! through the inbox and is unioned into the roster, never assigned.
//!
//! ERROR HANDLING
//! ==============
//! A failed fetch is logged and reported as `RosterFetchFailed`, which only
//! settles its outstanding count. The interval keeps running, so the next
//! tick is the retry. No backoff: sessions are short and the interval is fixed.

use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::api::Backend;
use crate::machine::{Inbox, Input};
use crate::model::SessionId;

use super::task::{TaskGuard, spawn_interval};

/// Spawn the poll ticker. The first tick fires one `period` from now.
#[must_use]
pub fn spawn_poller(period: Duration, inbox: Inbox) -> TaskGuard {
    spawn_interval("poller", period, inbox, Input::PollTick)
}

/// Fetch the authoritative roster snapshot and report the outcome.
pub async fn fetch_roster(backend: Arc<dyn Backend>, session_id: SessionId, inbox: Inbox) {
    let input = match backend.fetch_roster(session_id).await {
        Ok(entries) => Input::RosterFetched { session_id, entries },
        Err(e) => {
            warn!(%session_id, error = %e, "poll: roster fetch failed");
            Input::RosterFetchFailed { session_id }
        }
    };
    if inbox.send(input).is_err() {
        tracing::debug!(%session_id, "poll: view closed before fetch completed");
    }
}

#[cfg(test)]
#[path = "poll_test.rs"]
mod tests;
