//! Session token clock: advisory countdown for the displayed token.
//!
//! The countdown never triggers a rotation. Reaching zero only means the
//! token is probably stale; the next token still has to come from the
//! server. A fresh token always starts a fresh ticker, so its first
//! decrement lands one full period after installation.

use std::time::Duration;

use crate::machine::{Inbox, Input};

use super::task::{TaskGuard, spawn_interval};

/// Nominal validity window of a server-issued token.
pub const TOKEN_VALIDITY_SECS: u32 = 20;

/// Seconds left on the current token, always within `0..=TOKEN_VALIDITY_SECS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenClock {
    remaining: u32,
}

impl TokenClock {
    /// A clock for a token that was just installed.
    #[must_use]
    pub fn fresh() -> Self {
        Self { remaining: TOKEN_VALIDITY_SECS }
    }

    /// Advance one period. Holds at zero.
    pub fn tick(&mut self) {
        self.remaining = self.remaining.saturating_sub(1);
    }

    #[must_use]
    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }
}

/// Spawn the ticker that feeds [`Input::Tick`] into the view inbox every `period`.
#[must_use]
pub fn spawn_clock(period: Duration, inbox: Inbox) -> TaskGuard {
    spawn_interval("clock", period, inbox, Input::Tick)
}

#[cfg(test)]
#[path = "clock_test.rs"]
mod tests;
