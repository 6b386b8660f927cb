// Move generation and ordering
//
// Generation is exact: every pawn step or jump, every wall that fits and keeps
// both players connected, and the bomb when it would hit something. Ordering
// only decides the sequence the search tries them in.

use crate::board::BoardState;
use crate::bomb;
use crate::loop_detector::LoopDetector;
use crate::path::PathCache;
use crate::types::{Coord, Move, Orientation, Player, Wall};

/// All legal moves for `player` in `state`, in generation order.
///
/// Generation is done as if `player` were to move; callers that need the
/// turn check go through `BoardState::apply_move_for`. A finished game has
/// no moves.
pub fn generate_moves(state: &BoardState, player: Player, paths: &PathCache) -> Vec<Move> {
    if state.is_terminal().is_some() {
        return Vec::new();
    }

    let mut moves: Vec<Move> = state
        .pawn_targets(player)
        .into_iter()
        .map(|target| Move::PawnMove { target })
        .collect();

    if state.walls_remaining(player) > 0 {
        let mut scratch = state.clone();
        for row in 0..state.rows() - 1 {
            for col in 0..state.cols() - 1 {
                let anchor = Coord::new(row, col);
                for orientation in [Orientation::Horizontal, Orientation::Vertical] {
                    if wall_is_legal(&mut scratch, player, orientation, anchor, paths) {
                        moves.push(Move::PlaceWall {
                            orientation,
                            anchor,
                        });
                    }
                }
            }
        }
    }

    if bomb::is_worthwhile(state, player) {
        moves.push(Move::PowerBomb);
    }

    moves
}

/// The UI-facing legality query
pub fn legal_moves(state: &BoardState, player: Player, paths: &PathCache) -> Vec<Move> {
    generate_moves(state, player, paths)
}

fn wall_is_legal(
    scratch: &mut BoardState,
    player: Player,
    orientation: Orientation,
    anchor: Coord,
    paths: &PathCache,
) -> bool {
    if scratch.check_wall_slot(player, orientation, anchor).is_err() {
        return false;
    }
    let wall = Wall {
        orientation,
        anchor,
        owner: player,
    };
    scratch.insert_wall(wall);
    let connected = Player::BOTH.iter().all(|&p| paths.is_connected(scratch, p));
    scratch.remove_wall(wall);
    connected
}

/// Ordering buckets, lowest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Bucket {
    Hint,
    Advancing,
    Other,
    Wall,
    Repeat,
}

/// Sorts `moves` (all for the side to move) into search order:
/// the cached best move, pawn moves that shorten the mover's path (largest
/// gain first), the remaining pawn moves and the bomb, walls by how much
/// more they hurt the opponent than the mover, and finally anything that
/// recreates a position already in the mover's loop history.
pub fn order_moves(
    state: &BoardState,
    moves: &mut Vec<Move>,
    hint: Option<Move>,
    paths: &PathCache,
    loops: &LoopDetector,
) {
    let me = state.turn();
    let them = me.opponent();
    let my_path = paths.shortest_path_length(state, me) as i32;
    let their_path = paths.shortest_path_length(state, them) as i32;
    let my_field = paths.field(state, me);
    let their_pawn = state.pawn(them);

    let mut scratch = state.clone();
    let mut keyed: Vec<((Bucket, i32, i32), Move)> = moves
        .drain(..)
        .map(|mv| {
            if Some(mv) == hint {
                return ((Bucket::Hint, 0, 0), mv);
            }

            let key = match mv {
                Move::PlaceWall {
                    orientation,
                    anchor,
                } => {
                    // Walls only touch the grid, so skip the full make/unmake
                    let wall = Wall {
                        orientation,
                        anchor,
                        owner: me,
                    };
                    scratch.insert_wall(wall);
                    let repeat = loops.penalty(me, scratch.position_fingerprint());
                    let their_gain = paths.shortest_path_length(&scratch, them) as i32 - their_path;
                    let my_loss = paths.shortest_path_length(&scratch, me) as i32 - my_path;
                    scratch.remove_wall(wall);
                    if repeat > 0 {
                        (Bucket::Repeat, repeat, 0)
                    } else {
                        (Bucket::Wall, my_loss - their_gain, anchor.manhattan(&their_pawn))
                    }
                }
                Move::PawnMove { target } => {
                    let undo = scratch.make_move_unchecked(mv);
                    let repeat = loops.penalty(me, scratch.position_fingerprint());
                    scratch.unmake_move(undo);
                    let gain = my_path - my_field.at(target).map_or(my_path, |d| d as i32);
                    if repeat > 0 {
                        (Bucket::Repeat, repeat, 0)
                    } else if gain > 0 {
                        (Bucket::Advancing, -gain, 0)
                    } else {
                        (Bucket::Other, -gain, 0)
                    }
                }
                Move::PowerBomb => {
                    let undo = scratch.make_move_unchecked(mv);
                    let repeat = loops.penalty(me, scratch.position_fingerprint());
                    scratch.unmake_move(undo);
                    if repeat > 0 {
                        (Bucket::Repeat, repeat, 0)
                    } else {
                        (Bucket::Other, 0, 0)
                    }
                }
            };
            (key, mv)
        })
        .collect();

    // Stable, so generation order breaks ties
    keyed.sort_by_key(|(key, _)| *key);
    moves.extend(keyed.into_iter().map(|(_, mv)| mv));
}

/// Generates and orders the side to move's moves in one call
pub fn ordered_moves(
    state: &BoardState,
    hint: Option<Move>,
    paths: &PathCache,
    loops: &LoopDetector,
) -> Vec<Move> {
    let mut moves = generate_moves(state, state.turn(), paths);
    order_moves(state, &mut moves, hint, paths, loops);
    moves
}

/// Pawn move that lands on the mover's goal row, if any
pub fn winning_move(state: &BoardState) -> Option<Move> {
    let me = state.turn();
    let goal = state.goal_row(me);
    state
        .pawn_targets(me)
        .into_iter()
        .find(|t| t.row == goal)
        .map(|target| Move::PawnMove { target })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::BoardSnapshot;
    use std::convert::TryFrom;

    fn pawn(row: i32, col: i32) -> Move {
        Move::PawnMove {
            target: Coord::new(row, col),
        }
    }

    #[test]
    fn test_start_position_move_count() {
        let b = BoardState::new(9, 9, 10).unwrap();
        let paths = PathCache::new(4096);
        let moves = generate_moves(&b, Player::A, &paths);
        // 3 steps, every wall slot in both orientations, no bomb
        assert_eq!(moves.len(), 3 + 2 * 8 * 8);
        assert!(!moves.contains(&Move::PowerBomb));
    }

    #[test]
    fn test_no_walls_left_means_pawn_moves_only() {
        let b = BoardState::new(5, 5, 0).unwrap();
        let paths = PathCache::new(64);
        let moves = generate_moves(&b, Player::A, &paths);
        assert!(moves.iter().all(|m| m.is_pawn_move()));
    }

    #[test]
    fn test_every_generated_move_applies() {
        let b = BoardState::new(5, 5, 5).unwrap();
        let paths = PathCache::new(4096);
        for mv in generate_moves(&b, Player::A, &paths) {
            assert!(b.apply_move(mv).is_ok(), "{} should apply", mv);
        }
    }

    #[test]
    fn test_bomb_offered_only_near_walls() {
        let mut snap: BoardSnapshot = BoardState::new(5, 5, 5).unwrap().snapshot();
        let paths = PathCache::new(64);
        let b = BoardState::try_from(snap.clone()).unwrap();
        assert!(!generate_moves(&b, Player::A, &paths).contains(&Move::PowerBomb));

        snap.walls.push(Wall {
            orientation: Orientation::Horizontal,
            anchor: Coord::new(0, 2),
            owner: Player::B,
        });
        let b = BoardState::try_from(snap).unwrap();
        assert!(generate_moves(&b, Player::A, &paths).contains(&Move::PowerBomb));
    }

    #[test]
    fn test_ordering_puts_forward_step_first() {
        let b = BoardState::new(9, 9, 10).unwrap();
        let paths = PathCache::new(4096);
        let loops = LoopDetector::new(8, 4, 1);
        let moves = ordered_moves(&b, None, &paths, &loops);
        assert_eq!(moves[0], pawn(1, 4));
    }

    #[test]
    fn test_ordering_honours_hint_and_repeats() {
        let b = BoardState::new(9, 9, 10).unwrap();
        let paths = PathCache::new(4096);
        let mut loops = LoopDetector::new(8, 4, 1);

        let forward = b.apply_move(pawn(1, 4)).unwrap();
        loops.register(Player::A, forward.position_fingerprint());

        let hint = Move::PlaceWall {
            orientation: Orientation::Vertical,
            anchor: Coord::new(3, 3),
        };
        let moves = ordered_moves(&b, Some(hint), &paths, &loops);
        assert_eq!(moves[0], hint);
        assert_eq!(*moves.last().unwrap(), pawn(1, 4));
    }

    #[test]
    fn test_winning_move_found() {
        let mut snap = BoardState::new(5, 5, 5).unwrap().snapshot();
        snap.pawn_positions.a = Coord::new(3, 2);
        let b = BoardState::try_from(snap).unwrap();
        assert_eq!(winning_move(&b), Some(pawn(4, 2)));
        assert_eq!(winning_move(&BoardState::new(5, 5, 5).unwrap()), None);
    }
}
