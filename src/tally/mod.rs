//! Elimination and win-condition resolution.
//!
//! A round collects `actor → target` ballots (votes, accusations, night
//! kills), tallies them against the living roster, eliminates at most one
//! participant, reveals their role and rechecks the win condition.

pub mod ballot;
pub mod roster;
pub mod deduction;

pub use ballot::{tally, TallyOutcome};
pub use roster::{
    resolve_elimination, resolve_round, Elimination, Faction, HiddenRole, Roster, RosterEntry,
    RoundOutcome, WinRule,
};
pub use deduction::{
    DeductionAction, DeductionGame, DeductionPayload, DeductionPhase, Inspection, NightActions,
    NightChoice, Role,
};
