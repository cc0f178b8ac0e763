//! Social-deduction games from deal to game over.

use party_sync::core::{Participant, ParticipantId};
use party_sync::error::ActionError;
use party_sync::rules::RulesEngine;
use party_sync::tally::{
    DeductionAction, DeductionGame, DeductionPayload, DeductionPhase, Faction, HiddenRole, Role, Roster,
    WinRule,
};

fn pid(s: &str) -> ParticipantId {
    ParticipantId::new(s)
}

fn table(n: usize) -> Vec<Participant> {
    (0..n)
        .map(|i| Participant::new(format!("p{i}"), format!("Player {i}")))
        .collect()
}

fn apply(payload: &DeductionPayload, actor: &ParticipantId, action: DeductionAction) -> DeductionPayload {
    DeductionGame.apply_action(payload, actor, &action).unwrap().payload
}

/// Night: wolves pick the first living defender, the guardian shields
/// itself, the seer inspects the first living participant other than itself.
fn play_night(mut p: DeductionPayload) -> DeductionPayload {
    let living: Vec<ParticipantId> = p.roster.living().into_iter().collect();
    let prey = p.roster.living_with(|r| r.faction() == Faction::Defenders)[0].clone();

    for actor in DeductionGame::awaiting_night(&p) {
        if p.phase != DeductionPhase::Night {
            break;
        }
        let role = p.roster.get(&actor).unwrap().role;
        let action = match role {
            Role::Werewolf => DeductionAction::NightKill { target: prey.clone() },
            Role::Guardian => DeductionAction::Protect { target: actor.clone() },
            Role::Seer => {
                let target = living.iter().find(|id| **id != actor).unwrap().clone();
                DeductionAction::Inspect { target }
            }
            Role::Villager => unreachable!("villagers have no night action"),
        };
        p = apply(&p, &actor, action);
    }
    p
}

/// Day: everyone votes for the first living werewolf; werewolves vote for
/// the first living defender.
fn play_day(mut p: DeductionPayload) -> DeductionPayload {
    let wolf = p.roster.living_with(|r| *r == Role::Werewolf)[0].clone();
    let sheep = p.roster.living_with(|r| r.faction() == Faction::Defenders)[0].clone();

    for voter in DeductionGame::awaiting_votes(&p) {
        let target = if voter == wolf { sheep.clone() } else { wolf.clone() };
        p = apply(&p, &voter, DeductionAction::Vote { target });
    }
    p
}

#[test]
fn test_village_wins_full_game() {
    let payload = DeductionGame::setup(&table(8), WinRule::Parity);
    let mut p = apply(&payload, &pid("p0"), DeductionAction::Start { seed: 2024 });
    assert_eq!(p.roster.alive_in(Faction::Eliminators), 2);

    let mut rounds = 0;
    while p.phase != DeductionPhase::GameOver {
        p = match p.phase {
            DeductionPhase::Night => play_night(p),
            DeductionPhase::Day => play_day(p),
            other => panic!("unexpected phase {other}"),
        };
        rounds += 1;
        assert!(rounds < 20, "game did not terminate");
    }

    assert_eq!(p.winner, Some(Faction::Defenders));
    let result = DeductionGame.is_terminal(&p).unwrap();
    for wolf in p.roster.members_of(Faction::Eliminators) {
        assert!(!result.is_winner(&wolf));
        assert!(p.roster.get(&wolf).unwrap().revealed);
    }
}

#[test]
fn test_werewolves_win_at_parity_during_night() {
    let mut p = DeductionGame::setup(&table(3), WinRule::Parity);
    p.roster = Roster::deal([
        (pid("p0"), Role::Werewolf),
        (pid("p1"), Role::Villager),
        (pid("p2"), Role::Villager),
    ]);
    p.phase = DeductionPhase::Night;
    p.round = 1;

    let p = apply(&p, &pid("p0"), DeductionAction::NightKill { target: pid("p1") });
    assert_eq!(p.phase, DeductionPhase::GameOver);
    assert_eq!(p.winner, Some(Faction::Eliminators));
    assert!(DeductionGame.is_terminal(&p).unwrap().is_winner(&pid("p0")));
}

#[test]
fn test_game_over_is_final() {
    let mut p = DeductionGame::setup(&table(3), WinRule::Parity);
    p.roster = Roster::deal([
        (pid("p0"), Role::Werewolf),
        (pid("p1"), Role::Villager),
        (pid("p2"), Role::Villager),
    ]);
    p.phase = DeductionPhase::Night;
    let over = apply(&p, &pid("p0"), DeductionAction::NightKill { target: pid("p1") });

    let attempts = [
        (pid("p2"), DeductionAction::Vote { target: pid("p0") }),
        (pid("p0"), DeductionAction::NightKill { target: pid("p2") }),
        (pid("p2"), DeductionAction::Start { seed: 1 }),
    ];
    for (actor, action) in attempts {
        assert_eq!(DeductionGame.try_apply(&over, &actor, &action).unwrap_err(), ActionError::GameOver);
        assert_eq!(DeductionGame.apply_action(&over, &actor, &action).unwrap_err(), ActionError::GameOver);
    }
    assert_eq!(over.phase, DeductionPhase::GameOver);
}

#[test]
fn test_majority_rule_keeps_playing_at_parity() {
    let mut p = DeductionGame::setup(&table(3), WinRule::Majority);
    p.roster = Roster::deal([
        (pid("p0"), Role::Werewolf),
        (pid("p1"), Role::Villager),
        (pid("p2"), Role::Villager),
    ]);
    p.phase = DeductionPhase::Night;

    let p = apply(&p, &pid("p0"), DeductionAction::NightKill { target: pid("p1") });
    assert_eq!(p.phase, DeductionPhase::Day);
    assert_eq!(p.winner, None);
}

#[test]
fn test_split_pack_kills_nobody() {
    let mut p = DeductionGame::setup(&table(8), WinRule::Parity);
    p.roster = Roster::deal([
        (pid("p0"), Role::Werewolf),
        (pid("p1"), Role::Werewolf),
        (pid("p2"), Role::Villager),
        (pid("p3"), Role::Villager),
        (pid("p4"), Role::Villager),
        (pid("p5"), Role::Villager),
        (pid("p6"), Role::Villager),
        (pid("p7"), Role::Villager),
    ]);
    p.phase = DeductionPhase::Night;

    let p = apply(&p, &pid("p0"), DeductionAction::NightKill { target: pid("p2") });
    let p = apply(&p, &pid("p1"), DeductionAction::NightKill { target: pid("p3") });
    assert_eq!(p.phase, DeductionPhase::Day);
    assert_eq!(p.roster.living().len(), 8);
}
