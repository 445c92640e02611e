//! Session, token and roster types shared by every layer.
//!
//! DESIGN
//! ======
//! Identifiers are server-assigned and opaque to the client; they are wrapped
//! in newtypes so a roster entry id can never be passed where a session id is
//! expected. The roster is an arrival-ordered list with a hash index, and the
//! only way to add to it is [`Roster::merge`], which unions by identifier.
//! Nothing removes entries: a snapshot that omits a known entry is treated as
//! a race, not a deletion.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Server-assigned session identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub i64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Server-assigned roster entry identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(pub i64);

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// SESSION / TOKEN
// =============================================================================

/// One instructor-initiated attendance period, as returned by `POST /sessions`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub name: String,
}

/// Opaque capture credential. Only the backend knows whether it is still valid.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Token(pub String);

impl Token {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Token {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

// =============================================================================
// ROSTER
// =============================================================================

/// A captured attendance. Two entries may share a name; identity is `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterEntry {
    pub id: EntryId,
    pub name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub captured_at: OffsetDateTime,
}

/// Arrival-ordered set of roster entries, unique by [`EntryId`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Roster {
    entries: Vec<RosterEntry>,
    seen: HashSet<EntryId>,
}

impl Roster {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Union `snapshot` into the roster and return how many entries were new.
    ///
    /// Unseen ids are appended in snapshot order. An id that is already
    /// present keeps the fields it was first accepted with, so merging is
    /// idempotent and the id set is independent of merge order.
    pub fn merge<I>(&mut self, snapshot: I) -> usize
    where
        I: IntoIterator<Item = RosterEntry>,
    {
        let mut added = 0;
        for entry in snapshot {
            if self.seen.insert(entry.id) {
                self.entries.push(entry);
                added += 1;
            }
        }
        added
    }

    #[must_use]
    pub fn contains(&self, id: EntryId) -> bool {
        self.seen.contains(&id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RosterEntry> {
        self.entries.iter()
    }

    /// Identifier set, for comparisons that ignore arrival order.
    #[must_use]
    pub fn ids(&self) -> HashSet<EntryId> {
        self.seen.clone()
    }
}

#[cfg(test)]
#[path = "model_test.rs"]
mod tests;
