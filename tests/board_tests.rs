//! Movement grammar and capture properties over arbitrary boards.

use party_sync::board::{Board, BoardConfig, PositionCode};
use party_sync::core::{Participant, ParticipantId};
use party_sync::error::MoveRejection;
use proptest::prelude::*;

fn table(n: usize, teams: bool) -> Vec<Participant> {
    (0..n)
        .map(|i| {
            let p = Participant::new(format!("p{i}"), format!("Player {i}"));
            if teams {
                p.with_team(if i % 2 == 0 { "red" } else { "blue" })
            } else {
                p
            }
        })
        .collect()
}

fn team_of(board: &Board, owner: &ParticipantId) -> Option<String> {
    board
        .seat_of(owner)
        .and_then(|seat| board.seats[seat].team.clone())
}

#[test]
fn test_worked_example_enters_lane() {
    let config = BoardConfig::default().with_tokens_per_participant(1);
    let mut board = Board::new(config, &table(2, false)).unwrap();
    board.entities[0].position = PositionCode::OnPath(26);

    let result = board.attempt_move(0, 4).unwrap();
    assert_eq!(result.to, PositionCode::InFinishLane(2));
    assert!(result.capture.is_none());
}

#[test]
fn test_entering_path_captures_on_unsafe_entry() {
    // Custom safe cells: entry cells are no longer protected.
    let config = BoardConfig::default()
        .with_tokens_per_participant(1)
        .with_safe_cells([5]);
    let mut board = Board::new(config, &table(2, false)).unwrap();
    // p1 (entry 14) parked on absolute cell 0, p0's entry.
    board.entities[1].position = PositionCode::OnPath(14);

    let result = board.attempt_move(0, 6).unwrap();
    assert_eq!(result.to, PositionCode::OnPath(0));
    assert_eq!(result.capture.map(|c| c.token), Some(1));
}

proptest! {
    #[test]
    fn prop_home_leaves_only_on_max_face(roll in 1u8..=6, seats in 2usize..=6) {
        let board = Board::new(BoardConfig::default(), &table(seats, false)).unwrap();
        let result = board.attempt_move(0, roll);

        prop_assert_eq!(result.is_ok(), roll == 6);
        if roll != 6 {
            prop_assert_eq!(result.unwrap_err(), MoveRejection::NeedsMaxRoll);
        }
    }

    #[test]
    fn prop_overshoot_rejected_board_unchanged(
        length in 8u16..40,
        capacity in 1u16..=6,
        offset in 0u16..40,
        roll in 1u8..=6,
    ) {
        let config = BoardConfig::default()
            .with_path_length(length)
            .with_finish_capacity(capacity)
            .with_tokens_per_participant(1);
        let mut board = Board::new(config, &table(2, false)).unwrap();
        let i = offset % length;
        board.entities[0].position = PositionCode::OnPath(i);
        let before = board.clone();

        let result = board.attempt_move(0, roll);
        let target = i + u16::from(roll);

        if target > length + capacity {
            prop_assert_eq!(result.unwrap_err(), MoveRejection::Overshoot);
        } else {
            let moved = result.unwrap();
            let expected = if target < length {
                PositionCode::OnPath(target)
            } else {
                PositionCode::finish_lane(target - length, capacity)
            };
            prop_assert_eq!(moved.to, expected);
            prop_assert_eq!(moved.board.entities[0].position, expected);
        }
        prop_assert_eq!(board, before);
    }

    #[test]
    fn prop_capture_is_exclusive_and_never_friendly(
        positions in prop::collection::vec(prop::option::of(0u16..28), 8),
        mover in 0usize..8,
        roll in 1u8..=6,
        teams in any::<bool>(),
    ) {
        let config = BoardConfig::default().with_tokens_per_participant(2);
        let mut board = Board::new(config, &table(4, teams)).unwrap();
        for (token, slot) in positions.iter().enumerate() {
            board.entities[token].position = match slot {
                Some(i) => PositionCode::OnPath(*i),
                None => PositionCode::Home,
            };
        }

        if let Ok(moved) = board.attempt_move(mover, roll) {
            let sent_home: Vec<usize> = (0..board.entities.len())
                .filter(|&t| t != mover)
                .filter(|&t| !board.entities[t].position.is_home())
                .filter(|&t| moved.board.entities[t].position.is_home())
                .collect();

            prop_assert!(sent_home.len() <= 1);
            prop_assert_eq!(moved.capture.as_ref().map(|c| c.token), sent_home.first().copied());

            let mover_owner = &board.entities[mover].owner;
            for victim in &sent_home {
                let victim_owner = &board.entities[*victim].owner;
                prop_assert_ne!(victim_owner, mover_owner);
                if teams {
                    prop_assert_ne!(team_of(&board, victim_owner), team_of(&board, mover_owner));
                }
            }
            if let Some(capture) = &moved.capture {
                prop_assert!(!board.safe_cells.contains(&capture.cell));
            }
        }
    }
}
