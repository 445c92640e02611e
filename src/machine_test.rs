use super::*;
use crate::services::clock::TOKEN_VALIDITY_SECS;
use crate::test_helpers::{entry, session};

fn rotated(session_id: i64, token: &str) -> Input {
    Input::Push(PushEvent::TokenRotated { session_id: SessionId(session_id), token: Token::from(token) })
}

fn roster_changed(session_id: i64) -> Input {
    Input::Push(PushEvent::RosterChanged { session_id: SessionId(session_id) })
}

fn fetched(session_id: i64, entries: Vec<RosterEntry>) -> Input {
    Input::RosterFetched { session_id: SessionId(session_id), entries }
}

/// Machine with session 1 created and its initial fetch still in flight.
fn created() -> SessionMachine {
    let mut machine = SessionMachine::new();
    machine.apply(Input::Create { name: "Math101".into() });
    machine.apply(Input::SessionCreated(session(1, "Math101")));
    machine
}

/// Machine with session 1 active on token `abc` and no fetch in flight.
fn active() -> SessionMachine {
    let mut machine = created();
    machine.apply(fetched(1, Vec::new()));
    machine.apply(rotated(1, "abc"));
    machine
}

fn ids(machine: &SessionMachine) -> Vec<i64> {
    let mut ids: Vec<i64> = machine.view().roster.ids().into_iter().map(|id| id.0).collect();
    ids.sort_unstable();
    ids
}

// =============================================================================
// create
// =============================================================================

#[test]
fn create_requests_session_and_marks_pending() {
    let mut machine = SessionMachine::new();
    let effects = machine.apply(Input::Create { name: "  Math101 ".into() });
    assert_eq!(effects, vec![Effect::CreateSession { name: "Math101".into() }]);
    assert!(machine.view().creating);
    assert_eq!(machine.view().phase, Phase::NoSession);
}

#[test]
fn scenario_a_created_session_has_empty_roster() {
    let mut machine = SessionMachine::new();
    machine.apply(Input::Create { name: "Math101".into() });
    let effects = machine.apply(Input::SessionCreated(session(1, "Math101")));

    assert_eq!(effects, vec![Effect::JoinRoom(SessionId(1)), Effect::FetchRoster(SessionId(1))]);
    assert_eq!(machine.view().phase, Phase::SessionCreated { session: session(1, "Math101") });
    assert!(machine.view().roster.is_empty());
    assert!(!machine.view().creating);
    assert_eq!(machine.view().error, None);
}

#[test]
fn blank_name_is_rejected_without_a_request() {
    let mut machine = SessionMachine::new();
    let effects = machine.apply(Input::Create { name: "   ".into() });
    assert!(effects.is_empty());
    assert_eq!(machine.view().error.as_deref(), Some(BLANK_NAME_MESSAGE));
    assert!(!machine.view().creating);
}

#[test]
fn second_create_while_pending_is_ignored() {
    let mut machine = SessionMachine::new();
    machine.apply(Input::Create { name: "Math101".into() });
    assert!(machine.apply(Input::Create { name: "Bio202".into() }).is_empty());
}

#[test]
fn create_after_session_exists_is_ignored() {
    let mut machine = created();
    assert!(machine.apply(Input::Create { name: "Bio202".into() }).is_empty());
    assert_eq!(machine.view().phase.session(), Some(&session(1, "Math101")));
}

#[test]
fn create_failure_stays_in_no_session_with_message() {
    let mut machine = SessionMachine::new();
    machine.apply(Input::Create { name: "Math101".into() });
    machine.apply(Input::SessionCreateFailed { message: "name taken".into() });

    assert_eq!(machine.view().phase, Phase::NoSession);
    assert_eq!(machine.view().error.as_deref(), Some("name taken"));
    assert!(!machine.view().creating);

    // The instructor can retry, which clears the message.
    let effects = machine.apply(Input::Create { name: "Math101".into() });
    assert_eq!(effects.len(), 1);
    assert_eq!(machine.view().error, None);
}

#[test]
fn unsolicited_session_completion_is_dropped() {
    let mut machine = SessionMachine::new();
    assert!(machine.apply(Input::SessionCreated(session(9, "x"))).is_empty());
    assert_eq!(machine.view().phase, Phase::NoSession);
}

// =============================================================================
// start call / rotation
// =============================================================================

#[test]
fn start_call_without_session_is_ignored() {
    let mut machine = SessionMachine::new();
    assert!(machine.apply(Input::StartCall).is_empty());
    assert_eq!(machine.view().phase, Phase::NoSession);
}

#[test]
fn start_call_never_activates_on_its_own() {
    let mut machine = created();
    for _ in 0..3 {
        let effects = machine.apply(Input::StartCall);
        assert_eq!(effects, vec![Effect::RequestToken(SessionId(1))]);
        assert_eq!(machine.view().phase.name(), "session_created");
        assert_eq!(machine.view().phase.token(), None);
    }
}

#[test]
fn scenario_b_rotation_activates_session() {
    let mut machine = created();
    machine.apply(Input::StartCall);
    let effects = machine.apply(rotated(1, "abc"));

    assert_eq!(effects, vec![Effect::RestartClock, Effect::StartPolling(SessionId(1))]);
    assert_eq!(machine.view().phase.token(), Some(&Token::from("abc")));
    assert_eq!(machine.view().phase.seconds_remaining(), Some(TOKEN_VALIDITY_SECS));
}

#[test]
fn rotation_resets_countdown_and_starts_polling_once() {
    let mut machine = active();
    for _ in 0..7 {
        machine.apply(Input::Tick);
    }
    assert_eq!(machine.view().phase.seconds_remaining(), Some(13));

    let effects = machine.apply(rotated(1, "def"));
    assert_eq!(effects, vec![Effect::RestartClock]);
    assert_eq!(machine.view().phase.token(), Some(&Token::from("def")));
    assert_eq!(machine.view().phase.seconds_remaining(), Some(20));
}

#[test]
fn repeated_token_still_resets_countdown() {
    let mut machine = active();
    machine.apply(Input::Tick);
    machine.apply(rotated(1, "abc"));
    assert_eq!(machine.view().phase.seconds_remaining(), Some(20));
}

#[test]
fn token_for_another_session_is_discarded() {
    let mut machine = created();
    assert!(machine.apply(rotated(2, "zzz")).is_empty());
    assert_eq!(machine.view().phase.token(), None);

    let mut machine = SessionMachine::new();
    assert!(machine.apply(rotated(1, "abc")).is_empty());
    assert_eq!(machine.view().phase, Phase::NoSession);
}

#[test]
fn rotation_failure_keeps_current_token() {
    let mut machine = active();
    machine.apply(Input::StartCall);
    machine.apply(Input::RotationFailed { message: "rotation refused".into() });

    assert_eq!(machine.view().phase.token(), Some(&Token::from("abc")));
    assert_eq!(machine.view().error.as_deref(), Some("rotation refused"));

    machine.apply(Input::StartCall);
    assert_eq!(machine.view().error, None);
}

#[test]
fn export_failure_is_surfaced() {
    let mut machine = active();
    machine.apply(Input::ExportFailed { message: "export failed".into() });
    assert_eq!(machine.view().error.as_deref(), Some("export failed"));
}

// =============================================================================
// countdown
// =============================================================================

#[test]
fn scenario_e_countdown_holds_at_zero() {
    let mut machine = active();
    for _ in 0..(TOKEN_VALIDITY_SECS + 5) {
        machine.apply(Input::Tick);
        let remaining = machine.view().phase.seconds_remaining().unwrap();
        assert!(remaining <= TOKEN_VALIDITY_SECS);
    }
    assert_eq!(machine.view().phase.seconds_remaining(), Some(0));
    assert_eq!(machine.view().phase.token(), Some(&Token::from("abc")));
}

#[test]
fn tick_before_first_token_is_a_no_op() {
    let mut machine = created();
    assert!(machine.apply(Input::Tick).is_empty());
    assert_eq!(machine.view().phase.seconds_remaining(), None);
}

// =============================================================================
// roster reconciliation
// =============================================================================

#[test]
fn same_snapshot_twice_is_idempotent() {
    let mut machine = created();
    let snapshot = vec![entry(1, "Ana"), entry(2, "Bia")];
    machine.apply(fetched(1, snapshot.clone()));
    let once = machine.view().roster.clone();

    machine.apply(roster_changed(1));
    machine.apply(fetched(1, snapshot));
    assert_eq!(machine.view().roster, once);
}

#[test]
fn scenario_c_out_of_order_snapshots_union() {
    let mut machine = active();
    machine.apply(roster_changed(1));
    machine.apply(fetched(1, vec![entry(1, "Ana")]));
    machine.apply(fetched(1, vec![entry(1, "Ana"), entry(2, "Bia")]));
    assert_eq!(ids(&machine), vec![1, 2]);
    assert_eq!(machine.view().roster.len(), 2);
}

#[test]
fn older_snapshot_never_removes_entries() {
    let mut machine = active();
    machine.apply(fetched(1, vec![entry(1, "Ana"), entry(2, "Bia")]));
    machine.apply(fetched(1, vec![entry(1, "Ana")]));
    machine.apply(fetched(1, Vec::new()));
    assert_eq!(ids(&machine), vec![1, 2]);
}

#[test]
fn snapshot_for_another_session_is_discarded() {
    let mut machine = active();
    machine.apply(fetched(2, vec![entry(5, "Eve")]));
    assert!(machine.view().roster.is_empty());
}

#[test]
fn scenario_d_fetch_failure_sets_no_error_and_next_tick_fetches() {
    let mut machine = active();
    assert_eq!(machine.apply(Input::PollTick), vec![Effect::FetchRoster(SessionId(1))]);
    machine.apply(Input::RosterFetchFailed { session_id: SessionId(1) });
    assert_eq!(machine.view().error, None);

    assert_eq!(machine.apply(Input::PollTick), vec![Effect::FetchRoster(SessionId(1))]);
    machine.apply(fetched(1, vec![entry(1, "Ana")]));
    assert_eq!(ids(&machine), vec![1]);
    assert_eq!(machine.view().error, None);
}

#[test]
fn poll_tick_before_polling_starts_is_ignored() {
    let mut machine = created();
    machine.apply(fetched(1, Vec::new()));
    assert!(machine.apply(Input::PollTick).is_empty());
}

#[test]
fn poll_tick_fetches_even_while_a_fetch_is_outstanding() {
    let mut machine = active();
    assert_eq!(machine.apply(Input::PollTick), vec![Effect::FetchRoster(SessionId(1))]);
    assert_eq!(machine.apply(Input::PollTick), vec![Effect::FetchRoster(SessionId(1))]);
    // Nothing was queued, so completions issue no follow-up.
    assert!(machine.apply(fetched(1, Vec::new())).is_empty());
    assert!(machine.apply(fetched(1, Vec::new())).is_empty());
}

#[test]
fn hung_fetch_does_not_stall_polling() {
    // The initial fetch from `created()` never completes.
    let mut machine = created();
    machine.apply(rotated(1, "abc"));

    for _ in 0..10 {
        assert_eq!(machine.apply(Input::PollTick), vec![Effect::FetchRoster(SessionId(1))]);
    }

    // A signal waits behind the outstanding fetches, then runs on the next
    // completion.
    assert!(machine.apply(roster_changed(1)).is_empty());
    assert_eq!(machine.apply(fetched(1, vec![entry(7, "Gil")])), vec![Effect::FetchRoster(SessionId(1))]);
    assert_eq!(ids(&machine), vec![7]);
}

#[test]
fn signal_during_fetch_queues_one_follow_up() {
    let mut machine = active();
    assert_eq!(machine.apply(roster_changed(1)), vec![Effect::FetchRoster(SessionId(1))]);
    assert!(machine.apply(roster_changed(1)).is_empty());
    assert!(machine.apply(roster_changed(1)).is_empty());

    assert_eq!(machine.apply(fetched(1, vec![entry(1, "Ana")])), vec![Effect::FetchRoster(SessionId(1))]);
    assert!(machine.apply(fetched(1, vec![entry(1, "Ana"), entry(2, "Bia")])).is_empty());
    assert_eq!(ids(&machine), vec![1, 2]);
}

#[test]
fn signal_during_initial_fetch_is_queued() {
    let mut machine = created();
    assert!(machine.apply(roster_changed(1)).is_empty());
    assert_eq!(machine.apply(fetched(1, Vec::new())), vec![Effect::FetchRoster(SessionId(1))]);
}

#[test]
fn failed_fetch_still_runs_queued_follow_up() {
    let mut machine = active();
    machine.apply(roster_changed(1));
    machine.apply(roster_changed(1));
    let effects = machine.apply(Input::RosterFetchFailed { session_id: SessionId(1) });
    assert_eq!(effects, vec![Effect::FetchRoster(SessionId(1))]);
}

#[test]
fn roster_signal_for_another_session_is_discarded() {
    let mut machine = active();
    assert!(machine.apply(roster_changed(2)).is_empty());
}

// =============================================================================
// connectivity
// =============================================================================

#[test]
fn connectivity_is_tracked_without_error() {
    let mut machine = active();
    machine.apply(Input::PushStatus(Connectivity::Connected));
    assert_eq!(machine.view().connectivity, Connectivity::Connected);
    machine.apply(Input::PushStatus(Connectivity::Disconnected));
    assert_eq!(machine.view().connectivity, Connectivity::Disconnected);
    assert_eq!(machine.view().error, None);
    assert_eq!(machine.view().phase.name(), "session_active");
}
