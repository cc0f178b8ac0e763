//! Hidden roles, factions and the elimination/win resolver.
//!
//! ## Reveal
//!
//! Roles stay hidden until their holder is eliminated. Revealing is one-way:
//! nothing in this module ever hides a role again.
//!
//! ## Win check
//!
//! `WinRule` compares living counts of the two factions. It runs after every
//! elimination and after every night/day resolution, including ones where
//! nobody died.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Debug;

use super::ballot::{tally, TallyOutcome};
use crate::core::{LogDraft, ParticipantId};
use crate::error::ActionError;
use crate::rules::GameResult;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Faction {
    /// Hidden killers (werewolves, impostors, ...).
    Eliminators,
    /// Everyone else.
    Defenders,
}

/// A game-specific hidden role.
pub trait HiddenRole: Clone + Debug + PartialEq + Serialize + DeserializeOwned {
    fn faction(&self) -> Faction;
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry<R> {
    pub participant: ParticipantId,
    pub role: R,
    pub alive: bool,
    pub revealed: bool,
}

/// Who holds which role, and who is still alive.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Roster<R> {
    entries: Vec<RosterEntry<R>>,
}

impl<R> Default for Roster<R> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<R: HiddenRole> Roster<R> {
    /// Everyone starts alive with their role hidden.
    pub fn deal(assignments: impl IntoIterator<Item = (ParticipantId, R)>) -> Self {
        let entries = assignments
            .into_iter()
            .map(|(participant, role)| RosterEntry {
                participant,
                role,
                alive: true,
                revealed: false,
            })
            .collect();
        Self { entries }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, participant: &ParticipantId) -> Option<&RosterEntry<R>> {
        self.entries.iter().find(|e| &e.participant == participant)
    }

    #[must_use]
    pub fn is_alive(&self, participant: &ParticipantId) -> bool {
        self.get(participant).is_some_and(|e| e.alive)
    }

    pub fn entries(&self) -> impl Iterator<Item = &RosterEntry<R>> {
        self.entries.iter()
    }

    pub fn living(&self) -> BTreeSet<ParticipantId> {
        self.entries
            .iter()
            .filter(|e| e.alive)
            .map(|e| e.participant.clone())
            .collect()
    }

    /// Living holders of roles matching `pred`.
    pub fn living_with(&self, pred: impl Fn(&R) -> bool) -> Vec<ParticipantId> {
        self.entries
            .iter()
            .filter(|e| e.alive && pred(&e.role))
            .map(|e| e.participant.clone())
            .collect()
    }

    #[must_use]
    pub fn alive_in(&self, faction: Faction) -> usize {
        self.entries
            .iter()
            .filter(|e| e.alive && e.role.faction() == faction)
            .count()
    }

    /// Every member of a faction, alive or not.
    pub fn members_of(&self, faction: Faction) -> Vec<ParticipantId> {
        self.entries
            .iter()
            .filter(|e| e.role.faction() == faction)
            .map(|e| e.participant.clone())
            .collect()
    }

    /// Roles revealed so far, for rendering.
    pub fn revealed(&self) -> impl Iterator<Item = (&ParticipantId, &R)> {
        self.entries
            .iter()
            .filter(|e| e.revealed)
            .map(|e| (&e.participant, &e.role))
    }
}

/// When a faction has won.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WinRule {
    /// Eliminators win once they are at least as many as the defenders.
    #[default]
    Parity,
    /// Eliminators win only once they strictly outnumber the defenders.
    Majority,
}

impl WinRule {
    /// Winning faction, if either has won. No living eliminators means the
    /// defenders win under every rule.
    #[must_use]
    pub fn check<R: HiddenRole>(self, roster: &Roster<R>) -> Option<Faction> {
        let eliminators = roster.alive_in(Faction::Eliminators);
        let defenders = roster.alive_in(Faction::Defenders);

        if eliminators == 0 {
            return Some(Faction::Defenders);
        }
        let won = match self {
            WinRule::Parity => eliminators >= defenders,
            WinRule::Majority => eliminators > defenders,
        };
        won.then_some(Faction::Eliminators)
    }

    /// The frozen result for a winning faction.
    pub fn result<R: HiddenRole>(roster: &Roster<R>, faction: Faction) -> GameResult {
        GameResult::Winners(roster.members_of(faction))
    }
}

/// A participant removed from play.
#[derive(Clone, Debug, PartialEq)]
pub struct Elimination<R> {
    pub participant: ParticipantId,
    pub role: R,
    pub log: LogDraft,
    pub winner: Option<Faction>,
}

/// Eliminate `target`, reveal their role and recheck the win condition.
///
/// `cause` becomes the log entry's kind ("voted_out", "killed", ...).
pub fn resolve_elimination<R: HiddenRole>(
    roster: &mut Roster<R>,
    target: &ParticipantId,
    rule: WinRule,
    cause: &str,
) -> Result<Elimination<R>, ActionError> {
    let entry = roster
        .entries
        .iter_mut()
        .find(|e| &e.participant == target && e.alive)
        .ok_or_else(|| ActionError::InvalidTarget(target.clone()))?;
    entry.alive = false;
    entry.revealed = true;
    let role = entry.role.clone();

    let log = LogDraft::new(
        cause,
        json!({ "participant": target, "role": serde_json::to_value(&role)? }),
    );
    Ok(Elimination {
        participant: target.clone(),
        role,
        log,
        winner: rule.check(roster),
    })
}

/// A counted round and whoever it removed.
#[derive(Clone, Debug, PartialEq)]
pub struct RoundOutcome<R> {
    pub tally: TallyOutcome<ParticipantId>,
    pub elimination: Option<Elimination<R>>,
    pub winner: Option<Faction>,
}

/// Tally `ballots` against the living roster and eliminate the leader, if
/// there is a single one. `spared` survives even when elected.
pub fn resolve_round<R: HiddenRole>(
    roster: &mut Roster<R>,
    ballots: &BTreeMap<ParticipantId, ParticipantId>,
    spared: Option<&ParticipantId>,
    rule: WinRule,
    cause: &str,
) -> Result<RoundOutcome<R>, ActionError> {
    let counted = tally(ballots, &roster.living());
    let elimination = match counted.eliminated() {
        Some(target) if Some(target) != spared => {
            Some(resolve_elimination(roster, target, rule, cause)?)
        }
        _ => None,
    };
    let winner = match &elimination {
        Some(e) => e.winner,
        None => rule.check(roster),
    };
    Ok(RoundOutcome {
        tally: counted,
        elimination,
        winner,
    })
}
