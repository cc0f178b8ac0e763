//! Board-race rule engine.
//!
//! Flow: `Waiting` → (`Rolling` ⇄ `Moving`) → `GameOver`.
//!
//! - The turn owner rolls; the die value travels inside the action.
//! - With no movable token the turn passes, except on a max roll under the
//!   cap, which earns another roll.
//! - A max roll earns another roll after moving. One max roll too many
//!   forfeits the turn.
//! - The first participant to bring every token home wins, together with
//!   their team if they have one.

use serde::{Deserialize, Serialize};
use serde_json::json;

use super::config::BoardConfig;
use super::movement::{Board, TokenId};
use crate::core::{GameRng, GameType, LogDraft, Participant, ParticipantId, Seat};
use crate::error::{ActionError, MoveRejection};
use crate::rules::{Applied, GameResult, RulesEngine};
use crate::sync::CommitPriority;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RacePhase {
    Waiting,
    Rolling,
    Moving,
    GameOver,
}

impl std::fmt::Display for RacePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            RacePhase::Waiting => "waiting",
            RacePhase::Rolling => "rolling",
            RacePhase::Moving => "moving",
            RacePhase::GameOver => "game_over",
        };
        f.write_str(label)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RaceAction {
    Start,
    Roll { face: u8 },
    Move { token: TokenId },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RacePayload {
    pub board: Board,
    pub phase: RacePhase,
    pub turn: Seat,
    pub pending_roll: Option<u8>,
    pub consecutive_max_rolls: u8,
    pub result: Option<GameResult>,
}

/// Stateless engine; all rules configuration lives in the payload's board.
#[derive(Clone, Copy, Debug, Default)]
pub struct RaceGame;

impl RaceGame {
    pub fn new() -> Self {
        Self
    }

    /// Initial payload for a table of participants.
    pub fn setup(config: BoardConfig, participants: &[Participant]) -> Result<RacePayload, ActionError> {
        Ok(RacePayload {
            board: Board::new(config, participants)?,
            phase: RacePhase::Waiting,
            turn: Seat::new(0),
            pending_roll: None,
            consecutive_max_rolls: 0,
            result: None,
        })
    }

    /// Roll the die on this device and wrap it as an action.
    pub fn roll(payload: &RacePayload, rng: &mut GameRng) -> RaceAction {
        RaceAction::Roll {
            face: rng.roll_die(payload.board.config.max_die_face),
        }
    }

    fn current(payload: &RacePayload) -> &ParticipantId {
        &payload.board.seats[payload.turn].participant
    }

    fn require_turn(payload: &RacePayload, actor: &ParticipantId) -> Result<(), ActionError> {
        if Self::current(payload) == actor {
            Ok(())
        } else {
            Err(ActionError::NotYourTurn {
                actor: actor.clone(),
            })
        }
    }

    fn require_phase(payload: &RacePayload, phase: RacePhase) -> Result<(), ActionError> {
        if payload.phase == phase {
            Ok(())
        } else {
            Err(ActionError::WrongPhase {
                phase: payload.phase.to_string(),
            })
        }
    }

    fn pass_turn(payload: &mut RacePayload) {
        payload.turn = payload.turn.next(payload.board.seats.seat_count());
        payload.phase = RacePhase::Rolling;
        payload.pending_roll = None;
        payload.consecutive_max_rolls = 0;
    }

    fn winners(board: &Board, finisher: &ParticipantId) -> GameResult {
        let team = board
            .seat_of(finisher)
            .and_then(|seat| board.seats[seat].team.clone());
        match team {
            Some(team) => GameResult::Winners(
                board
                    .seats
                    .iter()
                    .filter(|(_, s)| s.team.as_deref() == Some(team.as_str()))
                    .map(|(_, s)| s.participant.clone())
                    .collect(),
            ),
            None => GameResult::Winner(finisher.clone()),
        }
    }

    fn apply_roll(payload: &RacePayload, actor: &ParticipantId, face: u8) -> Applied<RacePayload> {
        let mut next = payload.clone();
        let max_face = next.board.config.max_die_face;
        let mut log = vec![LogDraft::new("roll", json!({ "face": face }))];

        if face == max_face {
            next.consecutive_max_rolls += 1;
            if next.consecutive_max_rolls > next.board.config.max_consecutive_max_rolls {
                log.push(LogDraft::new(
                    "forfeit",
                    json!({ "consecutive_max_rolls": next.consecutive_max_rolls }),
                ));
                Self::pass_turn(&mut next);
                return Applied { payload: next, log };
            }
        }

        if next.board.movable_tokens(actor, face).is_empty() {
            log.push(LogDraft::new("no_move", json!({ "face": face })));
            if face == max_face {
                next.phase = RacePhase::Rolling;
            } else {
                Self::pass_turn(&mut next);
            }
        } else {
            next.phase = RacePhase::Moving;
            next.pending_roll = Some(face);
        }
        Applied { payload: next, log }
    }

    fn apply_move(
        payload: &RacePayload,
        actor: &ParticipantId,
        token: TokenId,
        roll: u8,
    ) -> Result<Applied<RacePayload>, ActionError> {
        let moved = payload.board.attempt_move(token, roll)?;
        let mut next = payload.clone();
        next.board = moved.board;
        next.pending_roll = None;

        let mut log = vec![LogDraft::new(
            "move",
            json!({ "token": token, "from": moved.from, "to": moved.to }),
        )];
        if let Some(capture) = &moved.capture {
            log.push(LogDraft::new("capture", serde_json::to_value(capture)?));
        }

        if next.board.all_finished(actor) {
            let result = Self::winners(&next.board, actor);
            log.push(LogDraft::new("game_over", serde_json::to_value(&result)?));
            next.result = Some(result);
            next.phase = RacePhase::GameOver;
        } else if roll == next.board.config.max_die_face {
            next.phase = RacePhase::Rolling;
            log.push(LogDraft::new("extra_roll", json!({})));
        } else {
            Self::pass_turn(&mut next);
        }
        Ok(Applied { payload: next, log })
    }
}

impl RulesEngine for RaceGame {
    type Payload = RacePayload;
    type Action = RaceAction;
    type Phase = RacePhase;

    fn game_type(&self) -> GameType {
        GameType::BoardRace
    }

    fn phase(&self, payload: &RacePayload) -> RacePhase {
        payload.phase
    }

    fn turn_owner(&self, payload: &RacePayload) -> Option<ParticipantId> {
        match payload.phase {
            RacePhase::Rolling | RacePhase::Moving => Some(Self::current(payload).clone()),
            RacePhase::Waiting | RacePhase::GameOver => None,
        }
    }

    fn check_action(
        &self,
        payload: &RacePayload,
        actor: &ParticipantId,
        action: &RaceAction,
    ) -> Result<(), ActionError> {
        if payload.phase == RacePhase::GameOver {
            return Err(ActionError::GameOver);
        }
        payload.board.config.validate(payload.board.seats.seat_count())?;
        if payload.board.seat_of(actor).is_none() {
            return Err(ActionError::UnknownParticipant(actor.clone()));
        }

        match action {
            RaceAction::Start => Self::require_phase(payload, RacePhase::Waiting),
            RaceAction::Roll { face } => {
                Self::require_phase(payload, RacePhase::Rolling)?;
                Self::require_turn(payload, actor)?;
                if *face == 0 || *face > payload.board.config.max_die_face {
                    return Err(ActionError::InvalidRoll(*face));
                }
                Ok(())
            }
            RaceAction::Move { token } => {
                Self::require_phase(payload, RacePhase::Moving)?;
                Self::require_turn(payload, actor)?;
                let entity = payload
                    .board
                    .entities
                    .get(*token)
                    .ok_or(MoveRejection::NotOnBoard)?;
                if &entity.owner != actor {
                    return Err(MoveRejection::NotOwner.into());
                }
                let roll = payload.pending_roll.ok_or_else(|| ActionError::WrongPhase {
                    phase: payload.phase.to_string(),
                })?;
                payload.board.target_position(*token, roll)?;
                Ok(())
            }
        }
    }

    fn apply_action(
        &self,
        payload: &RacePayload,
        actor: &ParticipantId,
        action: &RaceAction,
    ) -> Result<Applied<RacePayload>, ActionError> {
        self.check_action(payload, actor, action)?;

        match action {
            RaceAction::Start => {
                let mut next = payload.clone();
                next.phase = RacePhase::Rolling;
                let seats = next.board.seats.seat_count();
                Ok(Applied::new(next).with_log(LogDraft::new("start", json!({ "seats": seats }))))
            }
            RaceAction::Roll { face } => Ok(Self::apply_roll(payload, actor, *face)),
            RaceAction::Move { token } => {
                let roll = payload.pending_roll.ok_or_else(|| ActionError::WrongPhase {
                    phase: payload.phase.to_string(),
                })?;
                Self::apply_move(payload, actor, *token, roll)
            }
        }
    }

    fn is_terminal(&self, payload: &RacePayload) -> Option<GameResult> {
        payload.result.clone()
    }

    fn commit_priority(&self, action: &RaceAction) -> CommitPriority {
        match action {
            RaceAction::Move { .. } => CommitPriority::Immediate,
            RaceAction::Start | RaceAction::Roll { .. } => CommitPriority::Coalesced,
        }
    }
}
