//! Board movement & capture engine and the board-race game built on it.
//!
//! Tokens travel a shared circular path from per-seat entry cells, then a
//! private finish lane entered by exact-count overflow. Landing on an
//! opponent outside a safe cell sends it home.

pub mod config;
pub mod position;
pub mod movement;
pub mod game;

pub use config::BoardConfig;
pub use position::{BoardEntity, PositionCode};
pub use movement::{Board, CaptureEvent, MoveResult, SeatInfo, TokenId};
pub use game::{RaceAction, RaceGame, RacePayload, RacePhase};
