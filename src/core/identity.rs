//! Session and device identification.
//!
//! A session id is stable for the lifetime of a match and is derived from
//! the room/team/solo scope plus the game type. A device id is minted once
//! per running client and stamped on every write it makes.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Physical device (browser tab, phone) that wrote a snapshot.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(pub String);

impl DeviceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Mint a random device id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DeviceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which rule engine owns a session's payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameType {
    WordGuess,
    BoardRace,
    SocialDeduction,
    Trivia,
}

impl GameType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            GameType::WordGuess => "word_guess",
            GameType::BoardRace => "board_race",
            GameType::SocialDeduction => "social_deduction",
            GameType::Trivia => "trivia",
        }
    }
}

impl std::fmt::Display for GameType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a session lives: a shared room, one team inside a room, or a
/// single user playing alone.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SessionScope {
    Room(String),
    Team { room: String, team: String },
    Solo(String),
}

/// Session identifier, one per room/team/game-type tuple.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Derive the session id for a scope and game type.
    ///
    /// ```
    /// use party_sync::core::{GameType, SessionId, SessionScope};
    ///
    /// let id = SessionId::derive(&SessionScope::Room("ABCD".into()), GameType::BoardRace);
    /// assert_eq!(id.as_str(), "room:ABCD:board_race");
    /// ```
    pub fn derive(scope: &SessionScope, game_type: GameType) -> Self {
        let id = match scope {
            SessionScope::Room(room) => format!("room:{room}:{game_type}"),
            SessionScope::Team { room, team } => format!("team:{room}:{team}:{game_type}"),
            SessionScope::Solo(user) => format!("solo:{user}:{game_type}"),
        };
        Self(id)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
