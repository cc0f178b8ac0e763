//! Social-deduction rule engine (werewolf style).
//!
//! `Waiting` → `Night` ⇄ `Day` → `GameOver`.
//!
//! At night werewolves pick a victim, the guardian shields someone and the
//! seer inspects someone. The night resolves once every living night actor
//! has acted. By day every living participant votes, and the day resolves
//! once the last ballot is in. Both resolutions use the same tally, so a
//! split pack kills nobody and a tied village lynches nobody.

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;

use super::ballot::TallyOutcome;
use super::roster::{resolve_round, Faction, HiddenRole, Roster, RoundOutcome, WinRule};
use crate::core::{GameRng, GameType, LogDraft, Participant, ParticipantId};
use crate::error::ActionError;
use crate::rules::{Applied, GameResult, RulesEngine};

const MIN_PARTICIPANTS: usize = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Werewolf,
    Villager,
    Seer,
    Guardian,
}

impl HiddenRole for Role {
    fn faction(&self) -> Faction {
        match self {
            Role::Werewolf => Faction::Eliminators,
            Role::Villager | Role::Seer | Role::Guardian => Faction::Defenders,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeductionPhase {
    Waiting,
    Night,
    Day,
    GameOver,
}

impl std::fmt::Display for DeductionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            DeductionPhase::Waiting => "waiting",
            DeductionPhase::Night => "night",
            DeductionPhase::Day => "day",
            DeductionPhase::GameOver => "game_over",
        };
        f.write_str(label)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DeductionAction {
    /// Deal roles. The seed comes from the starting device.
    Start { seed: u64 },
    NightKill { target: ParticipantId },
    Protect { target: ParticipantId },
    Inspect { target: ParticipantId },
    Vote { target: ParticipantId },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NightChoice {
    pub actor: ParticipantId,
    pub target: ParticipantId,
}

/// Choices collected during the current night.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NightActions {
    pub kills: BTreeMap<ParticipantId, ParticipantId>,
    pub protect: Option<NightChoice>,
    pub inspect: Option<NightChoice>,
}

/// What the seer learned, and when.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inspection {
    pub round: u32,
    pub seer: ParticipantId,
    pub target: ParticipantId,
    pub faction: Faction,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeductionPayload {
    pub seating: Vec<ParticipantId>,
    pub roster: Roster<Role>,
    pub phase: DeductionPhase,
    pub round: u32,
    pub rule: WinRule,
    pub night: NightActions,
    pub votes: BTreeMap<ParticipantId, ParticipantId>,
    pub inspections: Vec<Inspection>,
    pub winner: Option<Faction>,
    pub result: Option<GameResult>,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct DeductionGame;

impl DeductionGame {
    pub fn new() -> Self {
        Self
    }

    pub fn setup(participants: &[Participant], rule: WinRule) -> DeductionPayload {
        DeductionPayload {
            seating: participants.iter().map(|p| p.id.clone()).collect(),
            roster: Roster::default(),
            phase: DeductionPhase::Waiting,
            round: 0,
            rule,
            night: NightActions::default(),
            votes: BTreeMap::new(),
            inspections: Vec::new(),
            winner: None,
            result: None,
        }
    }

    /// Deal roles for `seating` from `seed`.
    ///
    /// One werewolf per four participants (at least one), a seer from four
    /// participants and a guardian from five; villagers fill the rest.
    pub fn deal(seating: &[ParticipantId], seed: u64) -> Roster<Role> {
        let n = seating.len();
        let mut roles = vec![Role::Werewolf; (n / 4).max(1)];
        if n >= 4 {
            roles.push(Role::Seer);
        }
        if n >= 5 {
            roles.push(Role::Guardian);
        }
        roles.resize(n.max(roles.len()), Role::Villager);

        let mut rng = GameRng::new(seed).for_context("roles");
        rng.shuffle(&mut roles);
        Roster::deal(seating.iter().cloned().zip(roles))
    }

    /// Living night actors who have not acted yet.
    pub fn awaiting_night(payload: &DeductionPayload) -> Vec<ParticipantId> {
        let night = &payload.night;
        payload
            .roster
            .entries()
            .filter(|e| e.alive)
            .filter(|e| match e.role {
                Role::Werewolf => !night.kills.contains_key(&e.participant),
                Role::Guardian => night.protect.is_none(),
                Role::Seer => night.inspect.is_none(),
                Role::Villager => false,
            })
            .map(|e| e.participant.clone())
            .collect()
    }

    /// Living participants who have not voted yet.
    pub fn awaiting_votes(payload: &DeductionPayload) -> Vec<ParticipantId> {
        payload
            .roster
            .living()
            .into_iter()
            .filter(|p| !payload.votes.contains_key(p))
            .collect()
    }

    fn require_phase(payload: &DeductionPayload, phase: DeductionPhase) -> Result<(), ActionError> {
        if payload.phase == phase {
            Ok(())
        } else {
            Err(ActionError::WrongPhase {
                phase: payload.phase.to_string(),
            })
        }
    }

    /// The actor must be alive and hold `role` (any role when `None`).
    fn require_actor(
        payload: &DeductionPayload,
        actor: &ParticipantId,
        role: Option<Role>,
    ) -> Result<(), ActionError> {
        let entry = payload
            .roster
            .get(actor)
            .filter(|e| e.alive && role.map_or(true, |r| e.role == r));
        match entry {
            Some(_) => Ok(()),
            None => Err(ActionError::NotYourTurn {
                actor: actor.clone(),
            }),
        }
    }

    fn require_living_target(
        payload: &DeductionPayload,
        target: &ParticipantId,
    ) -> Result<(), ActionError> {
        if payload.roster.is_alive(target) {
            Ok(())
        } else {
            Err(ActionError::InvalidTarget(target.clone()))
        }
    }

    fn finish(next: &mut DeductionPayload, faction: Faction, log: &mut Vec<LogDraft>) {
        let result = WinRule::result(&next.roster, faction);
        log.push(LogDraft::new(
            "game_over",
            json!({ "faction": faction, "winners": &result }),
        ));
        next.winner = Some(faction);
        next.result = Some(result);
        next.phase = DeductionPhase::GameOver;
    }

    fn round_log(outcome: &RoundOutcome<Role>, quiet: &str) -> LogDraft {
        match &outcome.elimination {
            Some(e) => e.log.clone(),
            None => {
                let detail = match &outcome.tally {
                    TallyOutcome::Tied { targets, votes } => json!({ "tied": targets, "votes": votes }),
                    TallyOutcome::Eliminated { target, .. } => json!({ "spared": target }),
                    TallyOutcome::NoVotes => json!({}),
                };
                LogDraft::new(quiet, detail)
            }
        }
    }

    fn resolve_night(next: &mut DeductionPayload, log: &mut Vec<LogDraft>) -> Result<(), ActionError> {
        let night = std::mem::take(&mut next.night);

        if let Some(choice) = &night.inspect {
            let faction = next
                .roster
                .get(&choice.target)
                .map(|e| e.role.faction())
                .ok_or_else(|| ActionError::InvalidTarget(choice.target.clone()))?;
            next.inspections.push(Inspection {
                round: next.round,
                seer: choice.actor.clone(),
                target: choice.target.clone(),
                faction,
            });
        }

        let spared = night.protect.as_ref().map(|c| &c.target);
        let outcome = resolve_round(&mut next.roster, &night.kills, spared, next.rule, "killed")?;
        log.push(Self::round_log(&outcome, "quiet_night"));

        match outcome.winner {
            Some(faction) => Self::finish(next, faction, log),
            None => next.phase = DeductionPhase::Day,
        }
        Ok(())
    }

    fn resolve_day(next: &mut DeductionPayload, log: &mut Vec<LogDraft>) -> Result<(), ActionError> {
        let votes = std::mem::take(&mut next.votes);
        let outcome = resolve_round(&mut next.roster, &votes, None, next.rule, "voted_out")?;
        log.push(Self::round_log(&outcome, "no_elimination"));

        match outcome.winner {
            Some(faction) => Self::finish(next, faction, log),
            None => {
                next.phase = DeductionPhase::Night;
                next.round += 1;
            }
        }
        Ok(())
    }
}

impl RulesEngine for DeductionGame {
    type Payload = DeductionPayload;
    type Action = DeductionAction;
    type Phase = DeductionPhase;

    fn game_type(&self) -> GameType {
        GameType::SocialDeduction
    }

    fn phase(&self, payload: &DeductionPayload) -> DeductionPhase {
        payload.phase
    }

    fn turn_owner(&self, _payload: &DeductionPayload) -> Option<ParticipantId> {
        None
    }

    fn check_action(
        &self,
        payload: &DeductionPayload,
        actor: &ParticipantId,
        action: &DeductionAction,
    ) -> Result<(), ActionError> {
        if payload.phase == DeductionPhase::GameOver {
            return Err(ActionError::GameOver);
        }
        if !payload.seating.contains(actor) {
            return Err(ActionError::UnknownParticipant(actor.clone()));
        }

        match action {
            DeductionAction::Start { .. } => {
                Self::require_phase(payload, DeductionPhase::Waiting)?;
                if payload.seating.len() < MIN_PARTICIPANTS {
                    return Err(ActionError::NotEnoughParticipants {
                        needed: MIN_PARTICIPANTS,
                        have: payload.seating.len(),
                    });
                }
                Ok(())
            }
            DeductionAction::NightKill { target } => {
                Self::require_phase(payload, DeductionPhase::Night)?;
                Self::require_actor(payload, actor, Some(Role::Werewolf))?;
                if payload.night.kills.contains_key(actor) {
                    return Err(ActionError::AlreadyActed(actor.clone()));
                }
                Self::require_living_target(payload, target)?;
                match payload.roster.get(target) {
                    Some(e) if e.role == Role::Werewolf => Err(ActionError::InvalidTarget(target.clone())),
                    _ => Ok(()),
                }
            }
            DeductionAction::Protect { target } => {
                Self::require_phase(payload, DeductionPhase::Night)?;
                Self::require_actor(payload, actor, Some(Role::Guardian))?;
                if payload.night.protect.is_some() {
                    return Err(ActionError::AlreadyActed(actor.clone()));
                }
                Self::require_living_target(payload, target)
            }
            DeductionAction::Inspect { target } => {
                Self::require_phase(payload, DeductionPhase::Night)?;
                Self::require_actor(payload, actor, Some(Role::Seer))?;
                if payload.night.inspect.is_some() {
                    return Err(ActionError::AlreadyActed(actor.clone()));
                }
                if target == actor {
                    return Err(ActionError::InvalidTarget(target.clone()));
                }
                Self::require_living_target(payload, target)
            }
            DeductionAction::Vote { target } => {
                Self::require_phase(payload, DeductionPhase::Day)?;
                Self::require_actor(payload, actor, None)?;
                if payload.votes.contains_key(actor) {
                    return Err(ActionError::AlreadyActed(actor.clone()));
                }
                if target == actor {
                    return Err(ActionError::InvalidTarget(target.clone()));
                }
                Self::require_living_target(payload, target)
            }
        }
    }

    fn apply_action(
        &self,
        payload: &DeductionPayload,
        actor: &ParticipantId,
        action: &DeductionAction,
    ) -> Result<Applied<DeductionPayload>, ActionError> {
        self.check_action(payload, actor, action)?;

        let mut next = payload.clone();
        let mut log = Vec::new();

        match action {
            DeductionAction::Start { seed } => {
                next.roster = Self::deal(&next.seating, *seed);
                next.phase = DeductionPhase::Night;
                next.round = 1;
                log.push(LogDraft::new(
                    "start",
                    json!({ "participants": next.seating.len() }),
                ));
            }
            DeductionAction::NightKill { target } => {
                next.night.kills.insert(actor.clone(), target.clone());
            }
            DeductionAction::Protect { target } => {
                next.night.protect = Some(NightChoice {
                    actor: actor.clone(),
                    target: target.clone(),
                });
            }
            DeductionAction::Inspect { target } => {
                next.night.inspect = Some(NightChoice {
                    actor: actor.clone(),
                    target: target.clone(),
                });
            }
            DeductionAction::Vote { target } => {
                next.votes.insert(actor.clone(), target.clone());
                log.push(LogDraft::new("vote", json!({ "target": target })));
            }
        }

        match next.phase {
            DeductionPhase::Night if Self::awaiting_night(&next).is_empty() => {
                Self::resolve_night(&mut next, &mut log)?;
            }
            DeductionPhase::Day if Self::awaiting_votes(&next).is_empty() => {
                Self::resolve_day(&mut next, &mut log)?;
            }
            _ => {}
        }

        Ok(Applied { payload: next, log })
    }

    fn is_terminal(&self, payload: &DeductionPayload) -> Option<GameResult> {
        payload.result.clone()
    }
}
