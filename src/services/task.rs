//! Scoped background tasks.
//!
//! Every timer and subscription a view owns is a [`TaskGuard`]. Dropping the
//! guard aborts the task, so whichever way the owning scope exits, the task
//! is released exactly once and never outlives the session it served.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, error};

use crate::machine::{Inbox, Input};

pub struct TaskGuard {
    name: &'static str,
    handle: Option<JoinHandle<()>>,
}

impl TaskGuard {
    /// Spawn `fut` on the current runtime and tie its lifetime to the guard.
    pub fn spawn<F>(name: &'static str, fut: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        Self { name, handle: Some(tokio::spawn(fut)) }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Abort the task and wait until it has actually stopped.
    pub async fn shutdown(mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        handle.abort();
        if let Err(e) = handle.await {
            if e.is_panic() {
                error!(task = self.name, "task panicked before shutdown");
            }
        }
        debug!(task = self.name, "task released");
    }
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            debug!(task = self.name, "task released");
        }
    }
}

/// Send a clone of `input` into `inbox` once per `period`, starting one
/// period from now. Ends on its own when the inbox closes.
pub(crate) fn spawn_interval(name: &'static str, period: Duration, inbox: Inbox, input: Input) -> TaskGuard {
    TaskGuard::spawn(name, async move {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            if inbox.send(input.clone()).is_err() {
                debug!(task = name, "inbox closed, ticker stopping");
                break;
            }
        }
    })
}

#[cfg(test)]
#[path = "task_test.rs"]
mod tests;
