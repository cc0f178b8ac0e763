//! Token positions.
//!
//! Path indices are relative to the owner's entry cell; the absolute cell is
//! `(entry + index) mod L`. Finish-lane indices run `0..K`, and index `K` is
//! always represented as `Finished`.

use serde::{Deserialize, Serialize};

use crate::core::ParticipantId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "at", content = "index", rename_all = "snake_case")]
pub enum PositionCode {
    Home,
    OnPath(u16),
    InFinishLane(u16),
    Finished,
}

impl PositionCode {
    /// Finish-lane slot, collapsing the last slot into `Finished`.
    #[must_use]
    pub fn finish_lane(index: u16, capacity: u16) -> Self {
        if index >= capacity {
            PositionCode::Finished
        } else {
            PositionCode::InFinishLane(index)
        }
    }

    #[must_use]
    pub fn is_home(self) -> bool {
        self == PositionCode::Home
    }

    #[must_use]
    pub fn is_finished(self) -> bool {
        self == PositionCode::Finished
    }
}

impl std::fmt::Display for PositionCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PositionCode::Home => write!(f, "home"),
            PositionCode::OnPath(i) => write!(f, "path {i}"),
            PositionCode::InFinishLane(j) => write!(f, "lane {j}"),
            PositionCode::Finished => write!(f, "finished"),
        }
    }
}

/// A token on the board.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardEntity {
    pub owner: ParticipantId,
    pub position: PositionCode,
}

impl BoardEntity {
    pub fn at_home(owner: ParticipantId) -> Self {
        Self {
            owner,
            position: PositionCode::Home,
        }
    }
}
