//! Core types: identities, participants, the session document, the action
//! log, RNG and sync configuration.
//!
//! Everything here is game-agnostic. Rule engines own the payload inside a
//! `GameSession`; the sync layer owns how it moves between devices.

pub mod identity;
pub mod player;
pub mod rng;
pub mod config;
pub mod action;
pub mod session;

pub use identity::{DeviceId, GameType, SessionId, SessionScope};
pub use player::{LocalIdentity, Participant, ParticipantId, Seat, SeatMap};
pub use rng::GameRng;
pub use config::{LatencyClass, StaleGuard, SyncConfig};
pub use action::{ActionLog, ActionLogEntry, LogDraft};
pub use session::{GameSession, SessionView};
