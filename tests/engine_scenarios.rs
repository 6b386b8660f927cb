//! Engine Scenario Tests
//!
//! Whole-engine behaviour on hand-built positions: opening choices, wall
//! legality edge cases and the power bomb as seen through `Engine`.

use std::convert::TryFrom;

use quoridor_ai::board::{BoardSnapshot, BoardState, Rules};
use quoridor_ai::config::Config;
use quoridor_ai::engine::Engine;
use quoridor_ai::error::{IllegalMoveError, SearchError};
use quoridor_ai::movegen;
use quoridor_ai::path::{self, PathCache};
use quoridor_ai::types::{Coord, Move, Orientation, Player, Wall};

fn engine() -> Engine {
    let mut config = Config::default_hardcoded();
    config.cache.enabled = false;
    Engine::new(config)
}

fn wall(orientation: Orientation, row: i32, col: i32, owner: Player) -> Wall {
    Wall {
        orientation,
        anchor: Coord::new(row, col),
        owner,
    }
}

fn board_from(snap: BoardSnapshot) -> BoardState {
    BoardState::try_from(snap).expect("snapshot should be valid")
}

/// Empty 9x9, depth 2: the engine steps towards its goal and never walls
#[test]
fn test_opening_depth_two_steps_forward() {
    let engine = engine();
    let board = BoardState::new(9, 9, 10).unwrap();
    let before = path::shortest_path_length(&board, Player::A);

    let result = engine.analyze(&board, 2).unwrap();
    match result.best_move {
        Move::PawnMove { target } => {
            let after = board.apply_move(result.best_move).unwrap();
            assert!(path::shortest_path_length(&after, Player::A) < before);
            assert_eq!(target, Coord::new(1, 4));
        }
        other => panic!("expected a pawn step, got {}", other),
    }
}

#[test]
fn test_immediate_win_is_taken() {
    let engine = engine();
    let mut snap = BoardState::new(7, 7, 7).unwrap().snapshot();
    snap.pawn_positions.b = Coord::new(1, 5);
    snap.turn = Player::B;
    let board = board_from(snap);

    let result = engine.analyze(&board, 4).unwrap();
    assert_eq!(
        result.best_move,
        Move::PawnMove {
            target: Coord::new(0, 5)
        }
    );
    assert_eq!(result.stats.nodes, 0);
}

#[test]
fn test_finished_game_has_no_move() {
    let engine = engine();
    let mut snap = BoardState::new(5, 5, 5).unwrap().snapshot();
    snap.pawn_positions.a = Coord::new(4, 4);
    let board = board_from(snap);
    assert_eq!(engine.choose_move(&board, 1), Err(SearchError::GameOver));
    assert!(engine.legal_moves(&board, Player::B).is_empty());
}

/// The last wall in a player's inventory is still a legal, enumerated move
#[test]
fn test_last_wall_is_enumerable() {
    let engine = engine();
    let mut snap = BoardState::new(9, 9, 10).unwrap().snapshot();
    snap.walls_remaining.b = 1;
    snap.turn = Player::B;
    let board = board_from(snap);

    let target = Move::PlaceWall {
        orientation: Orientation::Horizontal,
        anchor: Coord::new(0, 3),
    };
    let moves = engine.legal_moves(&board, Player::B);
    assert!(moves.contains(&target));

    let after = engine.apply_move(&board, target).unwrap();
    assert_eq!(after.walls_remaining(Player::B), 0);
    assert!(path::is_connected(&after, Player::A));
    assert!(path::is_connected(&after, Player::B));
    assert!(engine
        .legal_moves(&after, Player::B)
        .iter()
        .all(|m| !matches!(m, Move::PlaceWall { .. })));
}

/// A wall that would seal the opponent into a pocket is never generated
#[test]
fn test_boxing_in_wall_is_rejected() {
    let paths = PathCache::new(4096);
    let mut snap = BoardState::new(9, 9, 10).unwrap().snapshot();
    snap.pawn_positions.b = Coord::new(8, 0);
    snap.walls.push(wall(Orientation::Horizontal, 7, 0, Player::A));
    snap.walls_remaining.a = 9;
    let board = board_from(snap);

    let sealing = Move::PlaceWall {
        orientation: Orientation::Vertical,
        anchor: Coord::new(7, 1),
    };
    assert!(board.walls_remaining(Player::A) > 0);
    assert!(!movegen::generate_moves(&board, Player::A, &paths).contains(&sealing));
    assert_eq!(
        board.apply_move(sealing),
        Err(IllegalMoveError::WouldDisconnect(Player::B))
    );

    // A harmless wall at a neighbouring slot is still fine
    let harmless = Move::PlaceWall {
        orientation: Orientation::Vertical,
        anchor: Coord::new(5, 1),
    };
    assert!(movegen::generate_moves(&board, Player::A, &paths).contains(&harmless));
}

#[test]
fn test_overlapping_walls_rejected() {
    let engine = engine();
    let board = BoardState::new(9, 9, 10).unwrap();
    let placed = engine
        .apply_move(
            &board,
            Move::PlaceWall {
                orientation: Orientation::Horizontal,
                anchor: Coord::new(4, 4),
            },
        )
        .unwrap();

    for (orientation, anchor) in [
        (Orientation::Horizontal, Coord::new(4, 4)),
        (Orientation::Horizontal, Coord::new(4, 5)),
        (Orientation::Horizontal, Coord::new(4, 3)),
        (Orientation::Vertical, Coord::new(4, 4)),
    ] {
        let mv = Move::PlaceWall {
            orientation,
            anchor,
        };
        assert_eq!(
            placed.apply_move(mv),
            Err(IllegalMoveError::WallOverlap(anchor)),
            "{} should overlap",
            mv
        );
        assert!(!engine.legal_moves(&placed, Player::B).contains(&mv));
    }
}

/// Bomb through the engine: walls go home, the bomber may cross the zone
/// in free-action mode and the override is gone once the turn passes.
#[test]
fn test_free_action_bomb_flow() {
    let mut config = Config::default_hardcoded();
    config.cache.enabled = false;
    config.rules = Rules {
        power_bomb_ends_turn: false,
        power_bomb_radius: 1,
    };
    let engine = Engine::new(config);

    let mut snap = engine.new_game(1).unwrap().snapshot();
    snap.pawn_positions.a = Coord::new(3, 4);
    // Blocks A's step south from (3,4)
    snap.walls.push(wall(Orientation::Horizontal, 3, 4, Player::B));
    snap.walls_remaining.b = 9;
    let board = board_from(snap);

    let south = Move::PawnMove {
        target: Coord::new(4, 4),
    };
    assert!(!engine.legal_moves(&board, Player::A).contains(&south));
    assert!(engine.legal_moves(&board, Player::A).contains(&Move::PowerBomb));

    let bombed = engine.apply_move(&board, Move::PowerBomb).unwrap();
    assert_eq!(bombed.turn(), Player::A);
    assert_eq!(bombed.wall_count(), 0);
    assert_eq!(bombed.walls_remaining(Player::B), 10);
    assert!(bombed.traversal_override().is_some());

    let follow_up = engine.legal_moves(&bombed, Player::A);
    assert!(follow_up.contains(&south));
    assert!(!follow_up.contains(&Move::PowerBomb));

    assert_eq!(
        bombed.apply_move(Move::PowerBomb),
        Err(IllegalMoveError::PowerBombUsed(Player::A))
    );

    let after = engine.apply_move(&bombed, south).unwrap();
    assert_eq!(after.turn(), Player::B);
    assert!(after.traversal_override().is_none());
}

/// Engine against itself at depth 1 reaches a result
#[test]
fn test_engine_plays_full_game_on_small_board() {
    let engine = engine();
    let (game, mut board) = engine.start_game(5).unwrap();
    let mut plies = 0;
    while board.is_terminal().is_none() && plies < 80 {
        let mv = engine.choose_move_in(&game, &board, 1).unwrap();
        board = engine.apply_move_in(&game, &board, mv).unwrap();
        plies += 1;
    }
    assert!(board.is_terminal().is_some(), "game should finish within 80 plies");
}
