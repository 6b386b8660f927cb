//! The engine facade: configuration, both caches and the per-game loop
//! histories, shared by every caller (HTTP handlers, tools).
//!
//! Caches are keyed purely by board content and are shared across games.
//! Loop histories belong to one game each and are looked up by game id;
//! calls without a game id search with an empty history and record nothing.

use log::{debug, info, warn};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::board::BoardState;
use crate::cache::{self, TranspositionCache};
use crate::config::Config;
use crate::error::{BoardError, IllegalMoveError, SearchError};
use crate::eval::Evaluator;
use crate::loop_detector::LoopDetector;
use crate::movegen;
use crate::path::PathCache;
use crate::search::{SearchResult, SearchStats, Searcher};
use crate::types::{Move, Player};

/// Games whose history is kept at once; the least recently used is dropped
pub const MAX_TRACKED_GAMES: usize = 1024;

struct GameHistory {
    loops: LoopDetector,
    /// Engine clock value at the last update
    last_used: u64,
}

pub struct Engine {
    config: Config,
    evaluator: Evaluator,
    search_cache: TranspositionCache,
    paths: PathCache,
    games: RwLock<HashMap<String, GameHistory>>,
    clock: AtomicU64,
}

impl Engine {
    /// Builds an engine, loading persisted caches when enabled
    pub fn new(config: Config) -> Self {
        let (search_cache, paths) = if config.cache.enabled {
            (
                TranspositionCache::load_or_empty(
                    &config.cache.search_cache_path,
                    config.cache.max_search_entries,
                    config.rules_tag(),
                ),
                cache::load_path_cache(&config.cache.path_cache_path, config.cache.max_path_entries),
            )
        } else {
            (
                TranspositionCache::new(config.cache.max_search_entries),
                PathCache::new(config.cache.max_path_entries),
            )
        };

        Engine {
            evaluator: Evaluator::new(config.scores.clone()),
            games: RwLock::new(HashMap::new()),
            clock: AtomicU64::new(0),
            search_cache,
            paths,
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn evaluator(&self) -> &Evaluator {
        &self.evaluator
    }

    pub fn path_cache(&self) -> &PathCache {
        &self.paths
    }

    pub fn search_cache(&self) -> &TranspositionCache {
        &self.search_cache
    }

    /// Opening position for `level`, using the configured rules
    pub fn new_game(&self, level: u8) -> Result<BoardState, BoardError> {
        BoardState::for_difficulty(&self.config, level)
    }

    /// Opening position plus a fresh game id with an empty loop history
    pub fn start_game(&self, level: u8) -> Result<(String, BoardState), BoardError> {
        let board = self.new_game(level)?;
        let mut games = self.games.write();
        let mut id = format!("{:016x}", rand::random::<u64>());
        while games.contains_key(&id) {
            id = format!("{:016x}", rand::random::<u64>());
        }
        self.insert_game(&mut games, id.clone());
        info!("Started game {} at difficulty {}", id, level);
        Ok((id, board))
    }

    /// Empties a game's loop history, creating the game if it is unknown
    pub fn reset_game(&self, game: &str) {
        let mut games = self.games.write();
        self.insert_game(&mut games, game.to_string());
    }

    /// Forgets a game; returns whether it was known
    pub fn end_game(&self, game: &str) -> bool {
        self.games.write().remove(game).is_some()
    }

    pub fn active_games(&self) -> usize {
        self.games.read().len()
    }

    fn insert_game(&self, games: &mut HashMap<String, GameHistory>, id: String) {
        if !games.contains_key(&id) && games.len() >= MAX_TRACKED_GAMES {
            let oldest = games
                .iter()
                .min_by_key(|(_, g)| g.last_used)
                .map(|(k, _)| k.clone());
            if let Some(oldest) = oldest {
                debug!("Game table full, dropping history of {}", oldest);
                games.remove(&oldest);
            }
        }
        games.insert(
            id,
            GameHistory {
                loops: LoopDetector::from_config(&self.config.loop_detection),
                last_used: self.tick(),
            },
        );
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed)
    }

    /// Picks the move for the side to move, without any game history
    pub fn choose_move(&self, state: &BoardState, difficulty: u8) -> Result<Move, SearchError> {
        self.analyze(state, difficulty).map(|result| result.best_move)
    }

    /// `choose_move` steering away from repetitions seen in `game`
    pub fn choose_move_in(
        &self,
        game: &str,
        state: &BoardState,
        difficulty: u8,
    ) -> Result<Move, SearchError> {
        self.analyze_in(game, state, difficulty)
            .map(|result| result.best_move)
    }

    /// `choose_move` with score, depth and statistics
    pub fn analyze(&self, state: &BoardState, difficulty: u8) -> Result<SearchResult, SearchError> {
        let loops = LoopDetector::from_config(&self.config.loop_detection);
        self.analyze_with(state, difficulty, &loops)
    }

    /// `analyze` against `game`'s loop history (empty for an unknown game)
    pub fn analyze_in(
        &self,
        game: &str,
        state: &BoardState,
        difficulty: u8,
    ) -> Result<SearchResult, SearchError> {
        // Searches read a frozen copy so recording moves never waits on a search
        let loops = self
            .loop_history(game)
            .unwrap_or_else(|| LoopDetector::from_config(&self.config.loop_detection));
        self.analyze_with(state, difficulty, &loops)
    }

    fn analyze_with(
        &self,
        state: &BoardState,
        difficulty: u8,
        loops: &LoopDetector,
    ) -> Result<SearchResult, SearchError> {
        if state.is_terminal().is_some() {
            return Err(SearchError::GameOver);
        }

        if let Some(mv) = movegen::winning_move(state) {
            info!("Immediate win available: {}", mv);
            return Ok(SearchResult {
                best_move: mv,
                score: self.evaluator.win_score() - 1,
                depth: 1,
                stats: SearchStats::default(),
            });
        }

        let limits = self.config.search_limits(difficulty);
        info!(
            "Searching for {} at difficulty {}: depth {}, {}ms, {} nodes",
            state.turn(),
            difficulty,
            limits.max_depth,
            limits.time_budget.as_millis(),
            limits.node_budget
        );

        let cache = if self.config.cache.enabled {
            Some(&self.search_cache)
        } else {
            None
        };
        let mut searcher = Searcher::new(&self.evaluator, &self.paths, cache, loops, limits);
        let result = searcher.search(state)?;

        info!(
            "Chose {} (score {}, depth {}, {} nodes, {}ms)",
            result.best_move,
            result.score,
            result.depth,
            result.stats.nodes,
            result.stats.elapsed_ms
        );
        Ok(result)
    }

    /// Legal moves for `player`, for validating and highlighting human input
    pub fn legal_moves(&self, state: &BoardState, player: Player) -> Vec<Move> {
        movegen::legal_moves(state, player, &self.paths)
    }

    /// Applies a move for the side to move without recording it anywhere
    pub fn apply_move(&self, state: &BoardState, mv: Move) -> Result<BoardState, IllegalMoveError> {
        state.apply_move(mv)
    }

    /// Applies a move for the side to move and records the result in
    /// `game`'s loop history.
    pub fn apply_move_in(
        &self,
        game: &str,
        state: &BoardState,
        mv: Move,
    ) -> Result<BoardState, IllegalMoveError> {
        let mover = state.turn();
        let next = state.apply_move(mv)?;
        self.observe(game, mover, &next);
        Ok(next)
    }

    /// Records that `mover` produced `state` in `game`
    pub fn observe(&self, game: &str, mover: Player, state: &BoardState) {
        let mut games = self.games.write();
        if !games.contains_key(game) {
            self.insert_game(&mut games, game.to_string());
        }
        if let Some(history) = games.get_mut(game) {
            history.loops.register(mover, state.position_fingerprint());
            history.last_used = self.tick();
        }
    }

    /// Snapshot of `game`'s loop history
    pub fn loop_history(&self, game: &str) -> Option<LoopDetector> {
        self.games.read().get(game).map(|g| g.loops.clone())
    }

    /// Writes both caches to disk. A no-op when caching is disabled.
    pub fn persist(&self) -> io::Result<()> {
        if !self.config.cache.enabled {
            return Ok(());
        }
        self.search_cache
            .save(&self.config.cache.search_cache_path, self.config.rules_tag())?;
        cache::save_path_cache(&self.paths, &self.config.cache.path_cache_path)
    }

    /// `persist`, logging instead of failing
    pub fn persist_or_warn(&self) {
        if let Err(e) = self.persist() {
            warn!("Failed to persist caches: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Coord;

    fn engine() -> Engine {
        let mut config = Config::default_hardcoded();
        config.cache.enabled = false;
        Engine::new(config)
    }

    fn forward() -> Move {
        Move::PawnMove {
            target: Coord::new(1, 4),
        }
    }

    #[test]
    fn test_new_game_uses_profile() {
        let engine = engine();
        let board = engine.new_game(4).unwrap();
        assert_eq!((board.rows(), board.cols()), (7, 7));
        assert_eq!(board.walls_remaining(Player::B), 7);
    }

    #[test]
    fn test_apply_move_in_registers_history() {
        let engine = engine();
        let (game, board) = engine.start_game(1).unwrap();
        let next = engine.apply_move_in(&game, &board, forward()).unwrap();
        let history = engine.loop_history(&game).unwrap();
        assert_eq!(
            history.history(Player::A).back(),
            Some(&next.position_fingerprint())
        );
        engine.reset_game(&game);
        assert!(engine.loop_history(&game).unwrap().history(Player::A).is_empty());
    }

    #[test]
    fn test_games_keep_separate_histories() {
        let engine = engine();
        let (first, board) = engine.start_game(1).unwrap();
        let (second, _) = engine.start_game(1).unwrap();
        assert_ne!(first, second);

        engine.apply_move_in(&first, &board, forward()).unwrap();
        assert_eq!(engine.loop_history(&first).unwrap().history(Player::A).len(), 1);
        assert!(engine.loop_history(&second).unwrap().history(Player::A).is_empty());

        // Unscoped application records nothing
        engine.apply_move(&board, forward()).unwrap();
        assert_eq!(engine.loop_history(&first).unwrap().history(Player::A).len(), 1);

        assert!(engine.end_game(&first));
        assert!(!engine.end_game(&first));
        assert_eq!(engine.active_games(), 1);
    }

    #[test]
    fn test_unknown_game_is_created_on_first_move() {
        let engine = engine();
        let board = engine.new_game(1).unwrap();
        assert!(engine.loop_history("client-7").is_none());
        engine.apply_move_in("client-7", &board, forward()).unwrap();
        assert_eq!(
            engine.loop_history("client-7").unwrap().history(Player::A).len(),
            1
        );
    }

    #[test]
    fn test_game_table_drops_least_recent() {
        let engine = engine();
        let board = engine.new_game(1).unwrap();
        engine.apply_move_in("oldest", &board, forward()).unwrap();
        for i in 0..MAX_TRACKED_GAMES {
            engine.reset_game(&format!("g{}", i));
        }
        assert_eq!(engine.active_games(), MAX_TRACKED_GAMES);
        assert!(engine.loop_history("oldest").is_none());
    }

    #[test]
    fn test_illegal_move_leaves_history_alone() {
        let engine = engine();
        let (game, board) = engine.start_game(1).unwrap();
        let err = engine
            .apply_move_in(
                &game,
                &board,
                Move::PawnMove {
                    target: Coord::new(2, 4),
                },
            )
            .unwrap_err();
        assert_eq!(err, IllegalMoveError::Unreachable(Coord::new(2, 4)));
        assert!(engine.loop_history(&game).unwrap().history(Player::A).is_empty());
    }

    #[test]
    fn test_persist_disabled_is_noop() {
        assert!(engine().persist().is_ok());
    }
}
