//! Session state machine: the single writer of the instructor's view.
//!
//! DESIGN
//! ======
//! Three unsynchronized feeders (push listener, roster poller, countdown
//! clock) and every network completion arrive as [`Input`] values on one
//! inbox. [`SessionMachine::apply`] folds an input into [`ClientViewState`]
//! and returns the [`Effect`]s the driver must perform. It does no I/O, so
//! every transition is testable without a runtime.
//!
//! PHASES
//! ======
//! `NoSession → SessionCreated → SessionActive`. The move to `SessionActive`
//! happens only when the server confirms a token on the push channel;
//! `StartCall` merely asks for one. Teardown is dropping the view.
//!
//! RECONCILIATION
//! ==============
//! - Roster snapshots are unioned by entry id, never assigned.
//! - Every poll tick issues a fetch, even with earlier fetches outstanding.
//!   Fetches carry no timeout, so a hung fetch must only cost its own round.
//!   Overlapping snapshots are harmless under the union merge.
//! - A roster signal fetches when nothing is outstanding; otherwise it queues
//!   one follow-up, issued on the next completion, because an outstanding
//!   snapshot may predate the entry that triggered the signal.
//! - Completions and push events for another session are discarded.

use tokio::sync::mpsc;
use tracing::debug;

use crate::frame::PushEvent;
use crate::model::{Roster, RosterEntry, Session, SessionId, Token};
use crate::services::clock::TokenClock;

/// Shown when the instructor submits a blank session name.
pub const BLANK_NAME_MESSAGE: &str = "enter a session name";

/// Sending half of the view inbox. Feeders hold clones of this.
pub type Inbox = mpsc::UnboundedSender<Input>;

// =============================================================================
// INPUTS / EFFECTS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// Instructor submitted a session name.
    Create { name: String },
    /// Instructor asked for a token rotation.
    StartCall,
    SessionCreated(Session),
    SessionCreateFailed { message: String },
    RotationFailed { message: String },
    RosterFetched { session_id: SessionId, entries: Vec<RosterEntry> },
    RosterFetchFailed { session_id: SessionId },
    ExportFailed { message: String },
    Push(PushEvent),
    PushStatus(Connectivity),
    PollTick,
    Tick,
}

/// Work the driver performs on the machine's behalf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    CreateSession { name: String },
    JoinRoom(SessionId),
    FetchRoster(SessionId),
    RequestToken(SessionId),
    /// Restart the countdown ticker so the fresh token gets a full first period.
    RestartClock,
    StartPolling(SessionId),
}

// =============================================================================
// VIEW STATE
// =============================================================================

/// Push channel status. Informational only; never rendered as an error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Connectivity {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

/// Where the view is in its lifecycle. A countdown without a token cannot
/// be represented.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Phase {
    #[default]
    NoSession,
    SessionCreated {
        session: Session,
    },
    SessionActive {
        session: Session,
        token: Token,
        clock: TokenClock,
    },
}

impl Phase {
    #[must_use]
    pub fn session(&self) -> Option<&Session> {
        match self {
            Self::NoSession => None,
            Self::SessionCreated { session } | Self::SessionActive { session, .. } => Some(session),
        }
    }

    #[must_use]
    pub fn token(&self) -> Option<&Token> {
        match self {
            Self::SessionActive { token, .. } => Some(token),
            _ => None,
        }
    }

    /// Seconds left on the displayed token; `None` before the first rotation.
    #[must_use]
    pub fn seconds_remaining(&self) -> Option<u32> {
        match self {
            Self::SessionActive { clock, .. } => Some(clock.remaining()),
            _ => None,
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::NoSession => "no_session",
            Self::SessionCreated { .. } => "session_created",
            Self::SessionActive { .. } => "session_active",
        }
    }
}

/// Everything the presentation layer renders.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientViewState {
    pub phase: Phase,
    pub roster: Roster,
    pub connectivity: Connectivity,
    /// Message for the instructor. Roster fetch failures never land here.
    pub error: Option<String>,
    /// A session-creation call is outstanding.
    pub creating: bool,
}

// =============================================================================
// MACHINE
// =============================================================================

/// Roster fetches issued and not yet completed.
#[derive(Debug, Default)]
struct FetchTracker {
    outstanding: usize,
    queued: bool,
}

#[derive(Debug, Default)]
pub struct SessionMachine {
    view: ClientViewState,
    fetch: FetchTracker,
    polling: bool,
}

impl SessionMachine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn view(&self) -> &ClientViewState {
        &self.view
    }

    /// Fold one input into the view and return the effects it requires.
    pub fn apply(&mut self, input: Input) -> Vec<Effect> {
        match input {
            Input::Create { name } => self.on_create(&name),
            Input::StartCall => self.on_start_call(),
            Input::SessionCreated(session) => self.on_session_created(session),
            Input::SessionCreateFailed { message } => {
                self.view.creating = false;
                if self.session_id().is_none() {
                    self.view.error = Some(message);
                }
                Vec::new()
            }
            Input::RotationFailed { message } | Input::ExportFailed { message } => {
                if self.session_id().is_some() {
                    self.view.error = Some(message);
                }
                Vec::new()
            }
            Input::RosterFetched { session_id, entries } => self.on_roster_fetched(session_id, entries),
            Input::RosterFetchFailed { session_id } => {
                if self.session_id() != Some(session_id) {
                    return Vec::new();
                }
                self.finish_fetch(session_id)
            }
            Input::Push(PushEvent::TokenRotated { session_id, token }) => self.on_token_rotated(session_id, token),
            Input::Push(PushEvent::RosterChanged { session_id }) => {
                if self.session_id() != Some(session_id) {
                    debug!(%session_id, "machine: roster signal for another session");
                    return Vec::new();
                }
                self.signal_fetch(session_id)
            }
            Input::PushStatus(connectivity) => {
                self.view.connectivity = connectivity;
                Vec::new()
            }
            Input::PollTick => match self.session_id() {
                Some(session_id) if self.polling => self.issue_fetch(session_id),
                _ => Vec::new(),
            },
            Input::Tick => {
                if let Phase::SessionActive { clock, .. } = &mut self.view.phase {
                    clock.tick();
                }
                Vec::new()
            }
        }
    }

    fn session_id(&self) -> Option<SessionId> {
        self.view.phase.session().map(|s| s.id)
    }

    fn on_create(&mut self, name: &str) -> Vec<Effect> {
        if self.session_id().is_some() {
            debug!("machine: create ignored, session already exists");
            return Vec::new();
        }
        if self.view.creating {
            debug!("machine: create ignored, creation already pending");
            return Vec::new();
        }
        let name = name.trim();
        if name.is_empty() {
            self.view.error = Some(BLANK_NAME_MESSAGE.to_owned());
            return Vec::new();
        }
        self.view.creating = true;
        self.view.error = None;
        vec![Effect::CreateSession { name: name.to_owned() }]
    }

    fn on_start_call(&mut self) -> Vec<Effect> {
        let Some(session_id) = self.session_id() else {
            debug!("machine: start call ignored, no session");
            return Vec::new();
        };
        self.view.error = None;
        vec![Effect::RequestToken(session_id)]
    }

    fn on_session_created(&mut self, session: Session) -> Vec<Effect> {
        if !self.view.creating || self.session_id().is_some() {
            debug!(session_id = %session.id, "machine: unexpected session completion dropped");
            return Vec::new();
        }
        let session_id = session.id;
        self.view.creating = false;
        self.view.error = None;
        self.view.phase = Phase::SessionCreated { session };

        let mut effects = vec![Effect::JoinRoom(session_id)];
        effects.extend(self.signal_fetch(session_id));
        effects
    }

    fn on_token_rotated(&mut self, session_id: SessionId, token: Token) -> Vec<Effect> {
        let Some(session) = self.view.phase.session().filter(|s| s.id == session_id).cloned() else {
            debug!(%session_id, "machine: token for another session");
            return Vec::new();
        };
        self.view.phase = Phase::SessionActive { session, token, clock: TokenClock::fresh() };

        let mut effects = vec![Effect::RestartClock];
        if !self.polling {
            self.polling = true;
            effects.push(Effect::StartPolling(session_id));
        }
        effects
    }

    fn on_roster_fetched(&mut self, session_id: SessionId, entries: Vec<RosterEntry>) -> Vec<Effect> {
        if self.session_id() != Some(session_id) {
            debug!(%session_id, "machine: stale roster snapshot dropped");
            return Vec::new();
        }
        let added = self.view.roster.merge(entries);
        if added > 0 {
            debug!(%session_id, added, total = self.view.roster.len(), "machine: roster merged");
        }
        self.finish_fetch(session_id)
    }

    /// Fetch on a roster signal, or queue one follow-up behind an
    /// outstanding fetch.
    fn signal_fetch(&mut self, session_id: SessionId) -> Vec<Effect> {
        if self.fetch.outstanding > 0 {
            self.fetch.queued = true;
            return Vec::new();
        }
        self.issue_fetch(session_id)
    }

    fn issue_fetch(&mut self, session_id: SessionId) -> Vec<Effect> {
        self.fetch.outstanding += 1;
        vec![Effect::FetchRoster(session_id)]
    }

    fn finish_fetch(&mut self, session_id: SessionId) -> Vec<Effect> {
        self.fetch.outstanding = self.fetch.outstanding.saturating_sub(1);
        if self.fetch.queued {
            self.fetch.queued = false;
            return self.issue_fetch(session_id);
        }
        Vec::new()
    }
}

#[cfg(test)]
#[path = "machine_test.rs"]
mod tests;
