//! The shared session document.
//!
//! ## GameSession
//!
//! One document per session id. The sync layer treats it as a single unit:
//! it is serialized whole, written whole, and replaced whole. The `payload`
//! is opaque game state owned by whichever rule engine `game_type` names.
//!
//! ## Canonical form
//!
//! `canonical()` is the exact string written to the store. Payloads are held
//! as `serde_json::Value`, whose maps are key-sorted, so two equal sessions
//! always produce identical strings. Fingerprints are plain string equality
//! on this form.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::action::ActionLog;
use super::identity::{DeviceId, GameType, SessionId};
use super::player::{LocalIdentity, ParticipantId};
use crate::error::{ActionError, SyncError};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSession {
    pub session_id: SessionId,
    pub game_type: GameType,

    /// Game-specific phase label (`waiting`, `playing`, `game_over`, ...).
    pub phase: String,

    pub payload: serde_json::Value,

    /// Participant allowed to act next; `None` when not turn-based.
    pub turn_owner: Option<ParticipantId>,

    pub action_log: ActionLog,

    /// Bumped on every local write. Guards against stale writes landing late.
    #[serde(default)]
    pub revision: u64,

    pub last_updated: DateTime<Utc>,
    pub updated_by: ParticipantId,
    pub origin_device: DeviceId,
}

/// Read model handed to the rendering layer.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionView<'a> {
    pub phase: &'a str,
    pub turn_owner: Option<&'a ParticipantId>,
    pub payload: &'a serde_json::Value,
    pub action_log: &'a ActionLog,
}

impl GameSession {
    /// Create a fresh session on first entry into a room/team/game-type.
    pub fn create<P: Serialize>(
        session_id: SessionId,
        game_type: GameType,
        phase: impl Into<String>,
        payload: &P,
        creator: &LocalIdentity,
    ) -> Result<Self, SyncError> {
        Ok(Self {
            session_id,
            game_type,
            phase: phase.into(),
            payload: serde_json::to_value(payload)?,
            turn_owner: None,
            action_log: ActionLog::new(),
            revision: 0,
            last_updated: Utc::now(),
            updated_by: creator.participant.clone(),
            origin_device: creator.device.clone(),
        })
    }

    /// The exact string written to the store.
    pub fn canonical(&self) -> Result<String, SyncError> {
        serde_json::to_string(self).map_err(|e| SyncError::Encode(e.to_string()))
    }

    /// Parse a stored document.
    pub fn from_document(document: &str) -> Result<Self, SyncError> {
        serde_json::from_str(document).map_err(|e| SyncError::Decode(e.to_string()))
    }

    /// Mark this session as written by `writer`, now.
    pub fn stamp(&mut self, writer: &LocalIdentity) {
        self.revision += 1;
        self.last_updated = Utc::now();
        self.updated_by = writer.participant.clone();
        self.origin_device = writer.device.clone();
    }

    /// Decode the payload into the owning engine's type.
    pub fn decode_payload<P: DeserializeOwned>(&self) -> Result<P, ActionError> {
        Ok(serde_json::from_value(self.payload.clone())?)
    }

    #[must_use]
    pub fn view(&self) -> SessionView<'_> {
        SessionView {
            phase: &self.phase,
            turn_owner: self.turn_owner.as_ref(),
            payload: &self.payload,
            action_log: &self.action_log,
        }
    }
}
