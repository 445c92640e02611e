//! Rollcall: client core for live classroom attendance.
//!
//! An instructor opens a session, the server rotates short-lived capture
//! tokens, and students submit their name against the token they scanned.
//! The instructor's view is kept consistent from three unsynchronized
//! sources: push events, a periodic roster poll, and a local countdown.
//!
//! Layout:
//! - [`model`]: sessions, tokens, roster entries and the union-merged roster
//! - [`frame`]: push channel wire frames
//! - [`api`]: the backend boundary and its HTTP implementation
//! - [`machine`]: the pure session state machine
//! - [`services`]: clock, poller, push listener, student capture
//! - [`view`]: the driver that wires feeders to the machine
//! - [`console`]: text rendering and console commands
//! - [`config`]: environment configuration

pub mod api;
pub mod config;
pub mod console;
pub mod frame;
pub mod machine;
pub mod model;
pub mod services;
pub mod view;

#[cfg(test)]
#[path = "helpers_test.rs"]
pub(crate) mod test_helpers;
