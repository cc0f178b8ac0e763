//! Turn/phase state machine contract.
//!
//! Every game's logic implements `RulesEngine`:
//! - Phase and turn ownership for the read model
//! - Legal-action checking
//! - Pure action application
//! - Terminal check
//!
//! The sync layer calls into `RulesEngine` but never interprets
//! game-specific payloads directly.

pub mod engine;

pub use engine::{Applied, GameResult, RulesEngine};
