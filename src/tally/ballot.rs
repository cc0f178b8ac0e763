//! Counting a round of ballots.
//!
//! Ties at the maximum and rounds where nobody counted both resolve to no
//! elimination.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::hash::Hash;

/// Result of counting one round.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TallyOutcome<P> {
    Eliminated { target: P, votes: usize },
    Tied { targets: Vec<P>, votes: usize },
    NoVotes,
}

impl<P> TallyOutcome<P> {
    /// The eliminated target, if any.
    pub fn eliminated(&self) -> Option<&P> {
        match self {
            TallyOutcome::Eliminated { target, .. } => Some(target),
            TallyOutcome::Tied { .. } | TallyOutcome::NoVotes => None,
        }
    }
}

/// Count `voter → target` ballots.
///
/// Only ballots cast by a living voter for a living target count. Tied
/// targets come back sorted.
pub fn tally<P>(ballots: &BTreeMap<P, P>, living: &BTreeSet<P>) -> TallyOutcome<P>
where
    P: Clone + Ord + Hash,
{
    let mut counts: FxHashMap<&P, usize> = FxHashMap::default();
    for (voter, target) in ballots {
        if living.contains(voter) && living.contains(target) {
            *counts.entry(target).or_insert(0) += 1;
        }
    }

    let Some(&top) = counts.values().max() else {
        return TallyOutcome::NoVotes;
    };

    let mut leaders: Vec<P> = counts
        .iter()
        .filter(|(_, n)| **n == top)
        .map(|(p, _)| P::clone(p))
        .collect();
    leaders.sort();

    if leaders.len() == 1 {
        TallyOutcome::Eliminated {
            target: leaders.remove(0),
            votes: top,
        }
    } else {
        TallyOutcome::Tied {
            targets: leaders,
            votes: top,
        }
    }
}
