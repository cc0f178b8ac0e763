//! Action history carried inside every session document.
//!
//! The log is append-only under normal operation. It is used for history
//! display and to tell whether an incoming snapshot extends our history or
//! replaces it with a divergent one.

use chrono::{DateTime, Utc};
use im::Vector;
use serde::{Deserialize, Serialize};

use super::player::ParticipantId;

/// One recorded action.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActionLogEntry {
    /// Game-defined action kind ("roll", "capture", "vote", ...).
    pub kind: String,

    /// Participant who performed the action.
    pub actor_id: ParticipantId,

    pub timestamp: DateTime<Utc>,

    /// Free-form structured detail for display.
    #[serde(default)]
    pub detail: serde_json::Value,
}

/// An entry produced by a rule engine before it is timestamped.
///
/// Rule engines are pure, so they describe what happened and the replica
/// stamps actor and time when it appends to the session log.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LogDraft {
    pub kind: String,
    pub detail: serde_json::Value,
}

impl LogDraft {
    pub fn new(kind: impl Into<String>, detail: serde_json::Value) -> Self {
        Self {
            kind: kind.into(),
            detail,
        }
    }

    /// Finish the draft into a log entry.
    #[must_use]
    pub fn stamp(self, actor_id: ParticipantId, timestamp: DateTime<Utc>) -> ActionLogEntry {
        ActionLogEntry {
            kind: self.kind,
            actor_id,
            timestamp,
            detail: self.detail,
        }
    }
}

/// Append-only ordered action log.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionLog {
    entries: Vector<ActionLogEntry>,
}

impl ActionLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: ActionLogEntry) {
        self.entries.push_back(entry);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn last(&self) -> Option<&ActionLogEntry> {
        self.entries.last()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ActionLogEntry> {
        self.entries.iter()
    }

    /// True if `self` starts with every entry of `earlier`.
    ///
    /// A `false` result on reconciliation means the incoming writer's history
    /// forked from ours (or shrank); it still replaces ours wholesale.
    #[must_use]
    pub fn extends(&self, earlier: &ActionLog) -> bool {
        earlier.len() <= self.len()
            && earlier
                .entries
                .iter()
                .zip(self.entries.iter())
                .all(|(a, b)| a == b)
    }
}
