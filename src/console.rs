//! Text rendering of the instructor view and parsing of console commands.
//!
//! The console is the presentation surface: it prints whatever the latest
//! [`ClientViewState`] says and turns typed lines into view intents. It
//! holds no state of its own.

use std::fmt::Write as _;

use time::macros::format_description;

use crate::config::ClientConfig;
use crate::machine::{ClientViewState, Connectivity, Phase};
use crate::model::RosterEntry;

pub const DEFAULT_EXPORT_PATH: &str = "attendance.txt";

// =============================================================================
// RENDER
// =============================================================================

/// Render the full view as console text, one fact per line.
#[must_use]
pub fn render(state: &ClientViewState, config: &ClientConfig) -> String {
    let mut out = String::new();

    match &state.phase {
        Phase::NoSession if state.creating => out.push_str("session: creating...\n"),
        Phase::NoSession => out.push_str("session: none (type `create <name>`)\n"),
        Phase::SessionCreated { session } => {
            push_line(&mut out, format_args!("session: {} (#{})", session.name, session.id));
            out.push_str("token:   waiting (type `start`)\n");
        }
        Phase::SessionActive { session, token, clock } => {
            push_line(&mut out, format_args!("session: {} (#{})", session.name, session.id));
            if clock.is_exhausted() {
                push_line(&mut out, format_args!("token:   {token} (expired, type `start` to rotate)"));
            } else {
                push_line(&mut out, format_args!("token:   {token} (expires in {}s)", clock.remaining()));
            }
            push_line(&mut out, format_args!("capture: {}", config.capture_link(token.as_str())));
        }
    }

    if state.phase.session().is_some() {
        push_line(&mut out, format_args!("push:    {}", connectivity_label(state.connectivity)));
        push_line(&mut out, format_args!("roster ({}):", state.roster.len()));
        for (idx, entry) in state.roster.iter().enumerate() {
            push_line(&mut out, format_args!("  {:>3}. {}", idx + 1, roster_line(entry)));
        }
    }

    if let Some(error) = &state.error {
        push_line(&mut out, format_args!("error:   {error}"));
    }

    out
}

fn push_line(out: &mut String, args: std::fmt::Arguments<'_>) {
    // Writing into a String cannot fail.
    if out.write_fmt(args).is_ok() {
        out.push('\n');
    }
}

fn connectivity_label(connectivity: Connectivity) -> &'static str {
    match connectivity {
        Connectivity::Connected => "connected",
        Connectivity::Connecting => "connecting",
        Connectivity::Disconnected => "disconnected (polling)",
    }
}

fn roster_line(entry: &RosterEntry) -> String {
    let format = format_description!("[hour]:[minute]:[second]");
    match entry.captured_at.format(&format) {
        Ok(at) => format!("{} {at}", entry.name),
        Err(e) => {
            tracing::debug!(entry_id = %entry.id, error = %e, "console: capture time not formattable");
            entry.name.clone()
        }
    }
}

// =============================================================================
// COMMANDS
// =============================================================================

/// One line typed at the instructor console.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Create(String),
    Start,
    Export(String),
    Quit,
    Empty,
    Unknown(String),
}

impl ConsoleCommand {
    #[must_use]
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        let (verb, rest) = match line.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (line, ""),
        };

        match verb.to_ascii_lowercase().as_str() {
            "" => Self::Empty,
            "create" => Self::Create(rest.to_owned()),
            "start" => Self::Start,
            "export" if rest.is_empty() => Self::Export(DEFAULT_EXPORT_PATH.to_owned()),
            "export" => Self::Export(rest.to_owned()),
            "quit" | "exit" => Self::Quit,
            _ => Self::Unknown(line.to_owned()),
        }
    }
}

pub const HELP: &str = "commands: create <name> | start | export [path] | quit";

#[cfg(test)]
#[path = "console_test.rs"]
mod tests;
