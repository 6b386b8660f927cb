// HTTP-facing wrapper around the engine
//
// The Bot owns a shared Engine and the decision logger. Searches are CPU
// bound, so they run on tokio's blocking pool and the async handlers only
// await the result.

use log::{info, warn};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;

use crate::board::BoardState;
use crate::config::Config;
use crate::debug_logger::DebugLogger;
use crate::engine::Engine;
use crate::error::{BoardError, IllegalMoveError, SearchError};
use crate::search::SearchResult;
use crate::types::{Move, Player};

/// Reasons a `/move` request produces no move
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveFailure {
    Search(SearchError),
    /// The blocking task panicked or was cancelled
    Worker(String),
}

impl std::fmt::Display for MoveFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MoveFailure::Search(e) => write!(f, "{}", e),
            MoveFailure::Worker(e) => write!(f, "search worker failed: {}", e),
        }
    }
}

pub struct Bot {
    engine: Arc<Engine>,
    logger: DebugLogger,
}

impl Bot {
    /// Creates a new Bot instance with the given configuration
    ///
    /// # Arguments
    /// * `config` - Static configuration that does not change during the bot's lifetime
    /// * `logger` - Decision logger, possibly disabled
    pub fn new(config: Config, logger: DebugLogger) -> Self {
        Bot {
            engine: Arc::new(Engine::new(config)),
            logger,
        }
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Engine metadata for GET /
    pub fn info(&self) -> Value {
        let config = self.engine.config();
        let levels: Vec<Value> = config
            .difficulty
            .iter()
            .map(|p| {
                json!({
                    "max_level": p.max_level,
                    "rows": p.rows,
                    "cols": p.cols,
                    "walls_per_player": p.walls_per_player,
                    "depth": p.depth,
                })
            })
            .collect();

        json!({
            "apiversion": "1",
            "author": env!("CARGO_PKG_AUTHORS"),
            "version": env!("CARGO_PKG_VERSION"),
            "difficulty": levels,
            "rules": config.rules,
        })
    }

    /// Server-side rules always win over whatever the client sent
    fn normalize(&self, state: BoardState) -> BoardState {
        state.with_rules(self.engine.config().rules)
    }

    /// Starts a game at `level`: its id and opening board
    pub fn new_game(&self, level: u8) -> Result<(String, BoardState), BoardError> {
        self.engine.start_game(level).map(|(id, board)| {
            (id, self.normalize(board))
        })
    }

    /// Clears the repetition history of `game`
    pub fn reset_game(&self, game: &str) {
        self.engine.reset_game(game);
    }

    pub fn end_game(&self, game: &str) -> bool {
        self.engine.end_game(game)
    }

    /// Computes the AI move for `state` at `difficulty`.
    ///
    /// With a game id the search avoids that game's repeated positions;
    /// without one it starts from an empty history.
    pub async fn get_move(
        &self,
        state: BoardState,
        difficulty: u8,
        turn: u32,
        game: Option<String>,
    ) -> Result<SearchResult, MoveFailure> {
        let start_time = Instant::now();
        let state = self.normalize(state);
        info!("Turn {}: Computing move for {}", turn, state.turn());

        let engine = self.engine.clone();
        let board = state.clone();
        let result = tokio::task::spawn_blocking(move || match game {
            Some(game) => engine.analyze_in(&game, &board, difficulty),
            None => engine.analyze(&board, difficulty),
        })
        .await
        .map_err(|e| MoveFailure::Worker(e.to_string()))?
        .map_err(MoveFailure::Search)?;

        info!(
            "Turn {}: Chose {} (score: {}, depth: {}, time: {}ms)",
            turn,
            result.best_move,
            result.score,
            result.depth,
            start_time.elapsed().as_millis()
        );

        self.logger.log_decision(
            turn,
            difficulty,
            state.snapshot(),
            result.best_move,
            result.score,
            result.depth,
        );
        Ok(result)
    }

    pub fn legal_moves(&self, state: BoardState, player: Player) -> Vec<Move> {
        let state = self.normalize(state);
        self.engine.legal_moves(&state, player)
    }

    /// Applies a move (human or AI), feeding `game`'s loop history if given
    pub fn apply(
        &self,
        state: BoardState,
        mv: Move,
        game: Option<&str>,
    ) -> Result<BoardState, IllegalMoveError> {
        let state = self.normalize(state);
        match game {
            Some(game) => self.engine.apply_move_in(game, &state, mv),
            None => self.engine.apply_move(&state, mv),
        }
    }

    /// Persists caches; called once at shutdown
    pub fn shutdown(&self) {
        info!("Persisting caches before shutdown");
        if let Err(e) = self.engine.persist() {
            warn!("Failed to persist caches: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Coord;

    fn bot() -> Bot {
        let mut config = Config::default_hardcoded();
        config.cache.enabled = false;
        Bot::new(config, DebugLogger::disabled())
    }

    #[tokio::test]
    async fn test_get_move_returns_legal_move() {
        let bot = bot();
        let board = bot.engine().new_game(1).unwrap();
        let result = bot.get_move(board.clone(), 1, 0, None).await.unwrap();
        assert!(board.apply_move(result.best_move).is_ok());
        assert_eq!(result.depth, 1);
    }

    #[tokio::test]
    async fn test_get_move_on_finished_game_fails() {
        let bot = bot();
        let mut snap = BoardState::new(5, 5, 5).unwrap().snapshot();
        snap.pawn_positions.b = Coord::new(0, 0);
        let board: BoardState = std::convert::TryFrom::try_from(snap).unwrap();
        assert_eq!(
            bot.get_move(board, 5, 3, None).await,
            Err(MoveFailure::Search(SearchError::GameOver))
        );
    }

    #[test]
    fn test_info_lists_difficulty_table() {
        let info = bot().info();
        assert_eq!(info["difficulty"].as_array().map(|a| a.len()), Some(3));
        assert_eq!(info["rules"]["power_bomb_ends_turn"], json!(true));
        assert_eq!(info["author"], json!("The quoridor-ai developers"));
        assert_eq!(info["version"], json!(env!("CARGO_PKG_VERSION")));
    }

    #[test]
    fn test_apply_uses_server_rules() {
        let mut config = Config::default_hardcoded();
        config.cache.enabled = false;
        config.rules.power_bomb_ends_turn = false;
        let bot = Bot::new(config, DebugLogger::disabled());

        let board = BoardState::new(9, 9, 10).unwrap();
        let next = bot
            .apply(
                board,
                Move::PawnMove {
                    target: Coord::new(1, 4),
                },
                None,
            )
            .unwrap();
        assert!(!next.rules().power_bomb_ends_turn);
    }

    /// One game's moves never steer another game's search
    #[tokio::test]
    async fn test_interleaved_games_do_not_share_history() {
        let bot = bot();
        let (first, opening) = bot.new_game(2).unwrap();
        let (second, _) = bot.new_game(2).unwrap();

        let fresh = bot
            .get_move(opening.clone(), 2, 0, Some(second.clone()))
            .await
            .unwrap();
        assert_eq!(
            fresh.best_move,
            Move::PawnMove {
                target: Coord::new(1, 4)
            }
        );

        // Game one walks forward and back, making the forward position a repeat there
        let stepped = bot.apply(opening.clone(), fresh.best_move, Some(first.as_str())).unwrap();
        let replied = bot
            .apply(
                stepped,
                Move::PawnMove {
                    target: Coord::new(7, 4),
                },
                Some(first.as_str()),
            )
            .unwrap();
        bot.apply(
            replied,
            Move::PawnMove {
                target: Coord::new(0, 4),
            },
            Some(first.as_str()),
        )
        .unwrap();

        let again = bot
            .get_move(opening.clone(), 2, 0, Some(second.clone()))
            .await
            .unwrap();
        assert_eq!(again.best_move, fresh.best_move);
        assert_eq!(again.score, fresh.score);
        let anonymous = bot.get_move(opening, 2, 0, None).await.unwrap();
        assert_eq!(anonymous.best_move, fresh.best_move);
        assert!(bot
            .engine()
            .loop_history(&second)
            .unwrap()
            .history(Player::A)
            .is_empty());
    }
}
