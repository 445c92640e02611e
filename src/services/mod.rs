//! Background feeders and one-shot calls used by the instructor view and
//! the student capture flow.
//!
//! ARCHITECTURE
//! ============
//! Each feeder (`clock`, `poll`, `push`) runs as a [`task::TaskGuard`] owned
//! by the view and only ever sends `Input`s into the view inbox. None of
//! them touch view state directly; the session machine is the single writer.

pub mod capture;
pub mod clock;
pub mod poll;
pub mod push;
pub mod task;
