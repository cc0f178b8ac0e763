//! Rules engine trait for game implementations.
//!
//! Games implement `RulesEngine` to define their rules:
//! - Which phase the game is in and who may act
//! - What actions are legal
//! - How actions transform the payload
//! - Win/loss conditions

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Display};

use crate::core::{GameType, LogDraft, ParticipantId};
use crate::error::ActionError;
use crate::sync::CommitPriority;

/// Result of a completed game.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "roster", rename_all = "snake_case")]
pub enum GameResult {
    /// Single winner.
    Winner(ParticipantId),
    /// Draw (no winner).
    Draw,
    /// Multiple winners (team or faction victory).
    Winners(Vec<ParticipantId>),
}

impl GameResult {
    /// Check if a participant won.
    #[must_use]
    pub fn is_winner(&self, participant: &ParticipantId) -> bool {
        match self {
            GameResult::Winner(p) => p == participant,
            GameResult::Winners(ps) => ps.contains(participant),
            GameResult::Draw => false,
        }
    }
}

/// A successfully applied action: the new payload plus what to log.
#[derive(Clone, Debug, PartialEq)]
pub struct Applied<P> {
    pub payload: P,
    pub log: Vec<LogDraft>,
}

impl<P> Applied<P> {
    pub fn new(payload: P) -> Self {
        Self {
            payload,
            log: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_log(mut self, draft: LogDraft) -> Self {
        self.log.push(draft);
        self
    }
}

/// Rules engine trait.
///
/// ## Implementation Notes
///
/// - `apply_action` must be pure: either a whole new payload or a rejection,
///   never a partial change. Randomness arrives inside the action.
/// - `is_terminal`: return `None` while the game continues.
/// - Engines must reject everything once terminal; `try_apply` enforces it
///   for callers that go through the trait.
pub trait RulesEngine {
    type Payload: Clone + Debug + Serialize + DeserializeOwned;
    type Action: Clone + Debug + Serialize;
    type Phase: Copy + Eq + Debug + Display;

    fn game_type(&self) -> GameType;

    fn phase(&self, payload: &Self::Payload) -> Self::Phase;

    /// Participant permitted to act, or `None` when the phase is not turn-based.
    fn turn_owner(&self, payload: &Self::Payload) -> Option<ParticipantId>;

    /// Check whether `actor` may perform `action` right now.
    fn check_action(
        &self,
        payload: &Self::Payload,
        actor: &ParticipantId,
        action: &Self::Action,
    ) -> Result<(), ActionError>;

    /// Apply an action, producing the next payload.
    fn apply_action(
        &self,
        payload: &Self::Payload,
        actor: &ParticipantId,
        action: &Self::Action,
    ) -> Result<Applied<Self::Payload>, ActionError>;

    /// Check if the game is over.
    fn is_terminal(&self, payload: &Self::Payload) -> Option<GameResult>;

    /// Which commit lane an action's write uses.
    ///
    /// Turn-owner changes, phase changes and game end are promoted to
    /// `Immediate` by the replica regardless of this answer.
    fn commit_priority(&self, _action: &Self::Action) -> CommitPriority {
        CommitPriority::Coalesced
    }

    // === Convenience Methods ===

    fn is_legal(&self, payload: &Self::Payload, actor: &ParticipantId, action: &Self::Action) -> bool {
        self.check_action(payload, actor, action).is_ok()
    }

    /// Apply an action, refusing anything once the game has ended.
    fn try_apply(
        &self,
        payload: &Self::Payload,
        actor: &ParticipantId,
        action: &Self::Action,
    ) -> Result<Applied<Self::Payload>, ActionError> {
        if self.is_terminal(payload).is_some() {
            return Err(ActionError::GameOver);
        }
        self.apply_action(payload, actor, action)
    }
}
