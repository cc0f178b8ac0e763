//! Error types.
//!
//! Two families with very different propagation rules:
//! - `ActionError`: an illegal action, rejected synchronously and never sent
//!   to the network.
//! - `SyncError`: a failed call against the remote store. Callers log it and
//!   let the next commit or poll tick retry.

use thiserror::Error;

use crate::core::ParticipantId;

pub type SyncResult<T> = std::result::Result<T, SyncError>;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Encode error: {0}")]
    Encode(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Subscribe error: {0}")]
    Subscribe(String),
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_data() || err.is_syntax() || err.is_eof() {
            SyncError::Decode(err.to_string())
        } else {
            SyncError::Encode(err.to_string())
        }
    }
}

/// Why a board move was refused. A rejected move never changes the board.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum MoveRejection {
    #[error("no such token")]
    NotOnBoard,

    #[error("leaving home requires the maximum die face")]
    NeedsMaxRoll,

    #[error("move overshoots the finish lane")]
    Overshoot,

    #[error("token has already finished")]
    AlreadyFinished,

    #[error("token belongs to another participant")]
    NotOwner,

    #[error("roll {0} is outside the die range")]
    InvalidRoll(u8),
}

/// An illegal action. This is the `Rejected` half of `apply_action`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ActionError {
    #[error("it is not {actor}'s turn")]
    NotYourTurn { actor: ParticipantId },

    #[error("action not allowed during phase {phase}")]
    WrongPhase { phase: String },

    #[error("unknown participant {0}")]
    UnknownParticipant(ParticipantId),

    #[error("{0} has already acted this round")]
    AlreadyActed(ParticipantId),

    #[error("invalid target {0}")]
    InvalidTarget(ParticipantId),

    #[error("roll {0} is outside the die range")]
    InvalidRoll(u8),

    #[error("the game is over")]
    GameOver,

    #[error("need at least {needed} participants, have {have}")]
    NotEnoughParticipants { needed: usize, have: usize },

    #[error("invalid board: {0}")]
    InvalidBoard(String),

    #[error("illegal move: {0}")]
    Move(#[from] MoveRejection),

    #[error("payload error: {0}")]
    Payload(String),
}

impl From<serde_json::Error> for ActionError {
    fn from(err: serde_json::Error) -> Self {
        ActionError::Payload(err.to_string())
    }
}
