//! Instructor view: the driver that runs the session machine.
//!
//! ARCHITECTURE
//! ============
//! [`InstructorView::spawn`] starts one driver task that owns the machine,
//! the push subscription, the countdown clock, the poller and every
//! outstanding backend call. All of them report back through one inbox,
//! which the driver drains in arrival order:
//!
//! ```text
//! push listener ─┐
//! poller ────────┤
//! clock ─────────┼──▶ inbox ──▶ SessionMachine::apply ──▶ watch<ClientViewState>
//! backend calls ─┤                      │
//! ViewHandle ────┘                      └──▶ effects (spawn calls, join, timers)
//! ```
//!
//! LIFECYCLE
//! =========
//! The driver lives until [`ViewHandle::close`] (or the handle is dropped).
//! Ending the driver drops the view, which aborts the clock, the poller,
//! the push subscription and any in-flight calls. Nothing it started can
//! deliver into a later session.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::api::Backend;
use crate::config::ClientConfig;
use crate::machine::{ClientViewState, Effect, Inbox, Input, SessionMachine};
use crate::services::clock::spawn_clock;
use crate::services::poll::{fetch_roster, spawn_poller};
use crate::services::push::{PushChannel, Subscription};
use crate::services::task::TaskGuard;

pub const CREATE_FAILED_MESSAGE: &str = "could not create session; check your connection";
pub const ROTATION_FAILED_MESSAGE: &str = "could not start the call; try again";
pub const EXPORT_FAILED_MESSAGE: &str = "failed to export roster";

// =============================================================================
// DRIVER
// =============================================================================

pub struct InstructorView {
    machine: SessionMachine,
    backend: Arc<dyn Backend>,
    push: Arc<dyn PushChannel>,
    tick: Duration,
    poll_interval: Duration,
    inbox: Inbox,
    state_tx: watch::Sender<ClientViewState>,
    subscription: Option<Subscription>,
    clock: Option<TaskGuard>,
    poller: Option<TaskGuard>,
    calls: JoinSet<()>,
}

impl InstructorView {
    /// Start a view driver on the current runtime and return its handle.
    #[must_use]
    pub fn spawn(config: &ClientConfig, backend: Arc<dyn Backend>, push: Arc<dyn PushChannel>) -> ViewHandle {
        let (inbox, rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ClientViewState::default());

        let view = Self {
            machine: SessionMachine::new(),
            backend: Arc::clone(&backend),
            push,
            tick: config.tick,
            poll_interval: config.poll_interval,
            inbox: inbox.clone(),
            state_tx,
            subscription: None,
            clock: None,
            poller: None,
            calls: JoinSet::new(),
        };
        let driver = TaskGuard::spawn("view", view.run(rx));

        ViewHandle { inbox, state: state_rx, backend, driver }
    }

    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Input>) {
        loop {
            tokio::select! {
                input = rx.recv() => {
                    let Some(input) = input else {
                        break;
                    };
                    self.handle(input);
                }
                Some(joined) = self.calls.join_next(), if !self.calls.is_empty() => {
                    if let Err(e) = joined {
                        if e.is_panic() {
                            error!(error = %e, "view: backend call panicked");
                        }
                    }
                }
            }
        }
        debug!(
            subscribed = self.subscription.is_some(),
            clock = self.clock.is_some(),
            polling = self.poller.is_some(),
            "view: inbox closed, driver stopping"
        );
    }

    fn handle(&mut self, input: Input) {
        let effects = self.machine.apply(input);

        let view = self.machine.view();
        self.state_tx.send_if_modified(|current| {
            if current == view {
                return false;
            }
            current.clone_from(view);
            true
        });

        for effect in effects {
            self.perform(effect);
        }
    }

    fn perform(&mut self, effect: Effect) {
        match effect {
            Effect::CreateSession { name } => {
                let backend = Arc::clone(&self.backend);
                let inbox = self.inbox.clone();
                self.calls.spawn(async move {
                    let input = match backend.create_session(&name).await {
                        Ok(session) => {
                            info!(session_id = %session.id, name = %session.name, "view: session created");
                            Input::SessionCreated(session)
                        }
                        Err(e) => {
                            warn!(error = %e, "view: session creation failed");
                            Input::SessionCreateFailed { message: e.user_message(CREATE_FAILED_MESSAGE) }
                        }
                    };
                    deliver(&inbox, input);
                });
            }
            Effect::JoinRoom(session_id) => {
                info!(%session_id, "view: joining session room");
                self.subscription = Some(self.push.join(session_id, self.inbox.clone()));
            }
            Effect::FetchRoster(session_id) => {
                self.calls
                    .spawn(fetch_roster(Arc::clone(&self.backend), session_id, self.inbox.clone()));
            }
            Effect::RequestToken(session_id) => {
                let backend = Arc::clone(&self.backend);
                let inbox = self.inbox.clone();
                self.calls.spawn(async move {
                    // Success is silent; the token arrives on the push channel.
                    if let Err(e) = backend.request_token(session_id).await {
                        warn!(%session_id, error = %e, "view: token rotation request failed");
                        deliver(&inbox, Input::RotationFailed { message: e.user_message(ROTATION_FAILED_MESSAGE) });
                    }
                });
            }
            Effect::RestartClock => {
                self.clock = Some(spawn_clock(self.tick, self.inbox.clone()));
            }
            Effect::StartPolling(session_id) => {
                debug!(%session_id, interval_ms = self.poll_interval.as_millis(), "view: polling started");
                self.poller = Some(spawn_poller(self.poll_interval, self.inbox.clone()));
            }
        }
    }
}

fn deliver(inbox: &Inbox, input: Input) {
    if inbox.send(input).is_err() {
        debug!("view: driver stopped, input dropped");
    }
}

// =============================================================================
// HANDLE
// =============================================================================

/// Caller side of a running view: submit intents, observe state, export.
pub struct ViewHandle {
    inbox: Inbox,
    state: watch::Receiver<ClientViewState>,
    backend: Arc<dyn Backend>,
    driver: TaskGuard,
}

impl ViewHandle {
    /// Submit a session name. Blank names are rejected with a message.
    pub fn create(&self, name: impl Into<String>) {
        deliver(&self.inbox, Input::Create { name: name.into() });
    }

    /// Ask the server for a new token. The view activates only when the
    /// token comes back on the push channel.
    pub fn start_call(&self) {
        deliver(&self.inbox, Input::StartCall);
    }

    /// A receiver that sees every published view state.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ClientViewState> {
        self.state.clone()
    }

    #[must_use]
    pub fn snapshot(&self) -> ClientViewState {
        self.state.borrow().clone()
    }

    /// Download the export document for the current session.
    ///
    /// Returns `None` when there is no session yet or the download failed;
    /// a failure is also surfaced as the view's error message.
    pub async fn export(&self) -> Option<Vec<u8>> {
        let session_id = self.state.borrow().phase.session().map(|s| s.id)?;
        match self.backend.export_roster(session_id).await {
            Ok(bytes) => {
                info!(%session_id, bytes = bytes.len(), "view: roster exported");
                Some(bytes)
            }
            Err(e) => {
                warn!(%session_id, error = %e, "view: roster export failed");
                deliver(&self.inbox, Input::ExportFailed { message: format!("{EXPORT_FAILED_MESSAGE}: {e}") });
                None
            }
        }
    }

    /// Tear the view down and wait for the driver to stop.
    pub async fn close(self) {
        self.driver.shutdown().await;
    }
}

#[cfg(test)]
#[path = "view_test.rs"]
mod tests;
