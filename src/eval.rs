// Static evaluation
//
// score = path_weight      * (opponent path - own path)
//       + progress_weight  * (own advance - opponent advance)
//       + proximity_weight * closeness to the opponent pawn, only when ahead
//       - loop_weight      * repetition penalty for the evaluated side
//
// Positive favours `perspective`. The search negates it for the other side.

use crate::board::BoardState;
use crate::config::ScoresConfig;
use crate::loop_detector::LoopDetector;
use crate::path::PathCache;
use crate::types::Player;

/// Individual terms, handy for logging and tests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EvalBreakdown {
    pub path: i32,
    pub progress: i32,
    pub proximity: i32,
    pub loop_penalty: i32,
    pub total: i32,
}

#[derive(Debug, Clone)]
pub struct Evaluator {
    scores: ScoresConfig,
}

impl Evaluator {
    pub fn new(scores: ScoresConfig) -> Self {
        Evaluator { scores }
    }

    pub fn win_score(&self) -> i32 {
        self.scores.win_score
    }

    pub fn evaluate(
        &self,
        state: &BoardState,
        perspective: Player,
        paths: &PathCache,
        loops: &LoopDetector,
    ) -> i32 {
        self.breakdown(state, perspective, paths, loops).total
    }

    pub fn breakdown(
        &self,
        state: &BoardState,
        perspective: Player,
        paths: &PathCache,
        loops: &LoopDetector,
    ) -> EvalBreakdown {
        let me = perspective;
        let them = me.opponent();

        if let Some(winner) = state.is_terminal() {
            let total = if winner == me {
                self.scores.win_score
            } else {
                -self.scores.win_score
            };
            return EvalBreakdown {
                total,
                ..EvalBreakdown::default()
            };
        }

        let my_path = paths.shortest_path_length(state, me) as i32;
        let their_path = paths.shortest_path_length(state, them) as i32;

        let path = self.scores.path_weight * (their_path - my_path);
        let progress =
            self.scores.progress_weight * (state.advance(me) - state.advance(them));

        let proximity = if my_path < their_path {
            let span = state.rows() + state.cols();
            let gap = state.pawn(me).manhattan(&state.pawn(them));
            self.scores.proximity_weight * (span - gap).max(0)
        } else {
            0
        };

        let loop_penalty =
            self.scores.loop_weight * loops.penalty(me, state.position_fingerprint());

        EvalBreakdown {
            path,
            progress,
            proximity,
            loop_penalty,
            total: path + progress + proximity - loop_penalty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::types::{Coord, Move, Orientation};

    fn setup() -> (Evaluator, PathCache, LoopDetector) {
        let config = Config::default_hardcoded();
        (
            Evaluator::new(config.scores.clone()),
            PathCache::new(1024),
            LoopDetector::from_config(&config.loop_detection),
        )
    }

    #[test]
    fn test_symmetric_start_scores_zero() {
        let (eval, paths, loops) = setup();
        let b = BoardState::new(9, 9, 10).unwrap();
        assert_eq!(eval.evaluate(&b, Player::A, &paths, &loops), 0);
        assert_eq!(eval.evaluate(&b, Player::B, &paths, &loops), 0);
    }

    #[test]
    fn test_forward_step_improves_score() {
        let (eval, paths, loops) = setup();
        let b = BoardState::new(9, 9, 10).unwrap();
        let after = b
            .apply_move(Move::PawnMove {
                target: Coord::new(1, 4),
            })
            .unwrap();
        let bd = eval.breakdown(&after, Player::A, &paths, &loops);
        assert!(bd.path > 0);
        assert!(bd.progress > 0);
        assert!(bd.total > 0);
    }

    #[test]
    fn test_wall_in_front_of_opponent_scores_for_placer() {
        let (eval, paths, loops) = setup();
        let b = BoardState::new(9, 9, 10).unwrap();
        let after = b
            .apply_move(Move::PlaceWall {
                orientation: Orientation::Horizontal,
                anchor: Coord::new(7, 3),
            })
            .unwrap();
        assert!(eval.evaluate(&after, Player::A, &paths, &loops) > 0);
        assert!(eval.evaluate(&after, Player::B, &paths, &loops) < 0);
    }

    #[test]
    fn test_repetition_lowers_score() {
        let (eval, paths, mut loops) = setup();
        let b = BoardState::new(9, 9, 10).unwrap();
        let before = eval.evaluate(&b, Player::A, &paths, &loops);
        loops.register(Player::A, b.position_fingerprint());
        let after = eval.evaluate(&b, Player::A, &paths, &loops);
        assert!(after < before);
    }

    #[test]
    fn test_terminal_state_scores_win() {
        let (eval, paths, loops) = setup();
        let mut snap = BoardState::new(5, 5, 5).unwrap().snapshot();
        snap.pawn_positions.a = Coord::new(4, 1);
        let b: BoardState = std::convert::TryFrom::try_from(snap).unwrap();
        assert_eq!(eval.evaluate(&b, Player::A, &paths, &loops), eval.win_score());
        assert_eq!(eval.evaluate(&b, Player::B, &paths, &loops), -eval.win_score());
    }
}
