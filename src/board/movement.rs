//! Circular-path movement and capture.
//!
//! `Board::attempt_move` is pure: it returns a whole new board (plus an
//! optional capture) or a rejection, and never touches `self`.
//!
//! ## Movement grammar
//!
//! - `Home` → `OnPath(0)` only on the maximum die face.
//! - `OnPath(i)` → `OnPath(i + r)` while below L, otherwise the overflow
//!   addresses the finish lane and must not exceed K.
//! - `InFinishLane(j)` → `InFinishLane(j + r)` up to K exactly.
//! - `Finished` never moves.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::BTreeSet;

use super::config::BoardConfig;
use super::position::{BoardEntity, PositionCode};
use crate::core::{Participant, ParticipantId, Seat, SeatMap};
use crate::error::{ActionError, MoveRejection};

/// Index of a token in `Board::entities`.
pub type TokenId = usize;

/// A participant's place at the board.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatInfo {
    pub participant: ParticipantId,
    #[serde(default)]
    pub team: Option<String>,
    /// Absolute cell where this seat's tokens enter the path.
    pub entry: u16,
}

/// A token sent home by another landing on its cell.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureEvent {
    pub token: TokenId,
    pub owner: ParticipantId,
    /// Absolute path cell.
    pub cell: u16,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MoveResult {
    pub board: Board,
    pub token: TokenId,
    pub from: PositionCode,
    pub to: PositionCode,
    pub capture: Option<CaptureEvent>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    pub config: BoardConfig,
    pub seats: SeatMap<SeatInfo>,
    pub entities: Vec<BoardEntity>,
    pub safe_cells: BTreeSet<u16>,
}

impl Board {
    /// Seat `participants` in order and put every token at home.
    pub fn new(config: BoardConfig, participants: &[Participant]) -> Result<Self, ActionError> {
        if participants.len() < 2 {
            return Err(ActionError::NotEnoughParticipants {
                needed: 2,
                have: participants.len(),
            });
        }
        config.validate(participants.len())?;

        let offsets = config.entry_offsets(participants.len());
        let seats = SeatMap::new(participants.len(), |seat| SeatInfo {
            participant: participants[seat.index()].id.clone(),
            team: participants[seat.index()].team.clone(),
            entry: offsets[seat.index()],
        });
        let entities = participants
            .iter()
            .flat_map(|p| {
                (0..config.tokens_per_participant).map(move |_| BoardEntity::at_home(p.id.clone()))
            })
            .collect();
        let safe_cells = config.resolve_safe_cells(participants.len());

        Ok(Self {
            config,
            seats,
            entities,
            safe_cells,
        })
    }

    #[must_use]
    pub fn seat_of(&self, participant: &ParticipantId) -> Option<Seat> {
        self.seats.position(|s| &s.participant == participant)
    }

    /// Absolute cell for a seat-relative path index.
    #[must_use]
    pub fn absolute_cell(&self, seat: Seat, relative: u16) -> u16 {
        let length = u32::from(self.config.path_length.max(1));
        ((u32::from(self.seats[seat].entry) + u32::from(relative)) % length) as u16
    }

    pub fn tokens_of<'a>(
        &'a self,
        participant: &'a ParticipantId,
    ) -> impl Iterator<Item = (TokenId, &'a BoardEntity)> + 'a {
        self.entities
            .iter()
            .enumerate()
            .filter(move |(_, e)| &e.owner == participant)
    }

    #[must_use]
    pub fn all_finished(&self, participant: &ParticipantId) -> bool {
        let mut tokens = self.tokens_of(participant).peekable();
        tokens.peek().is_some() && tokens.all(|(_, e)| e.position.is_finished())
    }

    /// Tokens of `participant` that can legally move `roll` cells.
    #[must_use]
    pub fn movable_tokens(&self, participant: &ParticipantId, roll: u8) -> SmallVec<[TokenId; 4]> {
        self.tokens_of(participant)
            .filter(|(token, _)| self.target_position(*token, roll).is_ok())
            .map(|(token, _)| token)
            .collect()
    }

    /// Where `token` would land with `roll`, without moving it.
    pub fn target_position(&self, token: TokenId, roll: u8) -> Result<PositionCode, MoveRejection> {
        if roll == 0 || roll > self.config.max_die_face {
            return Err(MoveRejection::InvalidRoll(roll));
        }
        let entity = self.entities.get(token).ok_or(MoveRejection::NotOnBoard)?;
        let length = self.config.path_length;
        let capacity = self.config.finish_capacity;
        let roll = u16::from(roll);

        match entity.position {
            PositionCode::Finished => Err(MoveRejection::AlreadyFinished),
            PositionCode::Home => {
                if roll == u16::from(self.config.max_die_face) {
                    Ok(PositionCode::OnPath(0))
                } else {
                    Err(MoveRejection::NeedsMaxRoll)
                }
            }
            PositionCode::OnPath(i) if i >= length => Err(MoveRejection::NotOnBoard),
            PositionCode::OnPath(i) => {
                let next = i.checked_add(roll).ok_or(MoveRejection::Overshoot)?;
                if next < length {
                    Ok(PositionCode::OnPath(next))
                } else if next - length <= capacity {
                    Ok(PositionCode::finish_lane(next - length, capacity))
                } else {
                    Err(MoveRejection::Overshoot)
                }
            }
            PositionCode::InFinishLane(j) if j > capacity => Err(MoveRejection::NotOnBoard),
            PositionCode::InFinishLane(j) => {
                let next = j.checked_add(roll).ok_or(MoveRejection::Overshoot)?;
                if next <= capacity {
                    Ok(PositionCode::finish_lane(next, capacity))
                } else {
                    Err(MoveRejection::Overshoot)
                }
            }
        }
    }

    /// Resolve a roll-driven move for one token.
    pub fn attempt_move(&self, token: TokenId, roll: u8) -> Result<MoveResult, MoveRejection> {
        let to = self.target_position(token, roll)?;
        let mover = &self.entities[token];
        let seat = self.seat_of(&mover.owner).ok_or(MoveRejection::NotOwner)?;
        let from = mover.position;

        let mut board = self.clone();
        board.entities[token].position = to;

        let capture = match to {
            PositionCode::OnPath(relative) => board.capture_at(token, seat, relative),
            _ => None,
        };

        Ok(MoveResult {
            board,
            token,
            from,
            to,
            capture,
        })
    }

    /// Send at most one opposing token on the landing cell home.
    fn capture_at(&mut self, mover: TokenId, seat: Seat, relative: u16) -> Option<CaptureEvent> {
        let cell = self.absolute_cell(seat, relative);
        if self.safe_cells.contains(&cell) {
            return None;
        }

        let victim = self.entities.iter().enumerate().find_map(|(token, entity)| {
            if token == mover || !self.are_opponents(seat, &entity.owner) {
                return None;
            }
            match entity.position {
                PositionCode::OnPath(q) => {
                    let other = self.seat_of(&entity.owner)?;
                    (self.absolute_cell(other, q) == cell).then_some(token)
                }
                _ => None,
            }
        })?;

        self.entities[victim].position = PositionCode::Home;
        Some(CaptureEvent {
            token: victim,
            owner: self.entities[victim].owner.clone(),
            cell,
        })
    }

    fn are_opponents(&self, seat: Seat, other: &ParticipantId) -> bool {
        let mine = &self.seats[seat];
        if &mine.participant == other {
            return false;
        }
        match (&mine.team, self.seat_of(other).map(|s| &self.seats[s].team)) {
            (Some(a), Some(Some(b))) => a != b,
            _ => true,
        }
    }
}
