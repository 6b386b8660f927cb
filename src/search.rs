// Iterative-deepening negamax with alpha-beta pruning
//
// Each node: probe the transposition cache, then expand ordered moves with a
// (-beta, -alpha) window, then store the result with its bound. Budgets are
// checked every `node_check_interval` nodes; once exceeded the current
// iteration is abandoned and the last completed depth's answer stands.

use log::{debug, info};
use rayon::prelude::*;
use serde::Serialize;
use std::time::{Duration, Instant};

use crate::board::BoardState;
use crate::cache::{Bound, CacheEntry, TranspositionCache};
use crate::error::SearchError;
use crate::eval::Evaluator;
use crate::loop_detector::LoopDetector;
use crate::movegen;
use crate::path::PathCache;
use crate::types::{Move, Player};

/// Strictly larger than any score the evaluator can produce
pub const INFINITY: i32 = i32::MAX - 1;

/// Depth, time and node limits for one `choose_move` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchLimits {
    pub max_depth: u8,
    pub time_budget: Duration,
    pub node_budget: u64,
    pub node_check_interval: u64,
    pub parallel_root: bool,
}

impl SearchLimits {
    /// Fixed-depth limits with no practical time or node cap
    pub fn depth(depth: u8) -> Self {
        SearchLimits {
            max_depth: depth,
            time_budget: Duration::from_secs(3600),
            node_budget: u64::MAX,
            node_check_interval: 1024,
            parallel_root: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SearchStats {
    pub nodes: u64,
    pub leaves: u64,
    pub cache_probes: u64,
    pub cache_hits: u64,
    pub cache_cutoffs: u64,
    pub beta_cutoffs: u64,
    pub completed_depth: u8,
    pub elapsed_ms: u64,
}

impl SearchStats {
    fn absorb(&mut self, other: &SearchStats) {
        self.nodes += other.nodes;
        self.leaves += other.leaves;
        self.cache_probes += other.cache_probes;
        self.cache_hits += other.cache_hits;
        self.cache_cutoffs += other.cache_cutoffs;
        self.beta_cutoffs += other.beta_cutoffs;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchResult {
    pub best_move: Move,
    /// Score from the side to move's point of view
    pub score: i32,
    /// Deepest fully searched depth, 0 when only a partial depth-1 pass finished
    pub depth: u8,
    pub stats: SearchStats,
}

/// Outcome of searching the root moves at one depth
#[derive(Debug, Clone, Copy)]
struct RootPass {
    best: Option<(Move, i32)>,
    completed: bool,
}

/// Static value of `state` for the side to move.
///
/// Terminal positions score the configured win value, reduced by `ply` so
/// faster wins and slower losses are preferred. Other positions are
/// evaluated for `mover` (the player who made the last move) and negated
/// when the turn has passed to the opponent.
pub fn static_value(
    evaluator: &Evaluator,
    state: &BoardState,
    mover: Player,
    ply: u32,
    paths: &PathCache,
    loops: &LoopDetector,
) -> i32 {
    let side = state.turn();
    if let Some(winner) = state.is_terminal() {
        let score = evaluator.win_score() - ply as i32;
        return if winner == side { score } else { -score };
    }
    let value = evaluator.evaluate(state, mover, paths, loops);
    if mover == side {
        value
    } else {
        -value
    }
}

/// Scores this close to the win score are forced results, not evaluations
const FORCED_MARGIN: i32 = 1024;

/// Forced scores count plies from the root; the cache keeps them as plies
/// from the stored node so a hit at another ply or in a later search stays
/// exact.
fn score_to_cache(score: i32, ply: u32, win: i32) -> i32 {
    if score >= win - FORCED_MARGIN {
        score + ply as i32
    } else if score <= -(win - FORCED_MARGIN) {
        score - ply as i32
    } else {
        score
    }
}

fn score_from_cache(score: i32, ply: u32, win: i32) -> i32 {
    if score >= win - FORCED_MARGIN {
        score - ply as i32
    } else if score <= -(win - FORCED_MARGIN) {
        score + ply as i32
    } else {
        score
    }
}

pub struct Searcher<'a> {
    evaluator: &'a Evaluator,
    paths: &'a PathCache,
    cache: Option<&'a TranspositionCache>,
    loops: &'a LoopDetector,
    limits: SearchLimits,
    start: Instant,
    stopped: bool,
    stats: SearchStats,
}

impl<'a> Searcher<'a> {
    pub fn new(
        evaluator: &'a Evaluator,
        paths: &'a PathCache,
        cache: Option<&'a TranspositionCache>,
        loops: &'a LoopDetector,
        limits: SearchLimits,
    ) -> Self {
        Searcher {
            evaluator,
            paths,
            cache,
            loops,
            limits,
            start: Instant::now(),
            stopped: false,
            stats: SearchStats::default(),
        }
    }

    pub fn stats(&self) -> SearchStats {
        self.stats
    }

    /// Iterative deepening up to `limits.max_depth`.
    ///
    /// Always returns a move for a live position with at least one legal
    /// move: the last completed depth's best, else the best of a partially
    /// searched first depth, else the first move in search order.
    pub fn search(&mut self, root: &BoardState) -> Result<SearchResult, SearchError> {
        if root.is_terminal().is_some() {
            return Err(SearchError::GameOver);
        }
        self.start = Instant::now();
        self.stopped = false;

        let side = root.turn();
        let hint = self.probe_hint(root);
        let fallback = movegen::ordered_moves(root, hint, self.paths, self.loops)
            .first()
            .copied()
            .ok_or(SearchError::NoLegalMoves(side))?;

        let mut completed: Option<(Move, i32, u8)> = None;
        let mut partial: Option<(Move, i32)> = None;
        let mut previous_best = hint;

        for depth in 1..=self.limits.max_depth.max(1) {
            let pass = if self.limits.parallel_root {
                self.root_pass_parallel(root, depth, previous_best)
            } else {
                self.root_pass(root, depth, previous_best)
            };

            if !pass.completed {
                info!(
                    "Budget exhausted during depth {} after {} nodes ({}ms)",
                    depth,
                    self.stats.nodes,
                    self.start.elapsed().as_millis()
                );
                if completed.is_none() {
                    partial = pass.best;
                }
                break;
            }

            if let Some((mv, score)) = pass.best {
                info!(
                    "Depth {} complete: best {} score {} nodes {} ({}ms)",
                    depth,
                    mv,
                    score,
                    self.stats.nodes,
                    self.start.elapsed().as_millis()
                );
                self.stats.completed_depth = depth;
                completed = Some((mv, score, depth));
                previous_best = Some(mv);

                // A forced result will not change with more depth
                if score.abs() >= self.evaluator.win_score() - depth as i32 - 1 {
                    debug!("Forced result found at depth {}, stopping", depth);
                    break;
                }
            }

            if self.out_of_budget() {
                break;
            }
        }

        self.stats.elapsed_ms = self.start.elapsed().as_millis() as u64;

        let (best_move, score, depth) = match (completed, partial) {
            (Some((mv, score, depth)), _) => {
                if let Some(cache) = self.cache {
                    cache.store(CacheEntry {
                        fingerprint: root.fingerprint(),
                        score,
                        best_move: Some(mv),
                        depth,
                        bound: Bound::Exact,
                    });
                }
                (mv, score, depth)
            }
            (None, Some((mv, score))) => (mv, score, 0),
            (None, None) => (fallback, 0, 0),
        };

        Ok(SearchResult {
            best_move,
            score,
            depth,
            stats: self.stats,
        })
    }

    /// Searches every root move to exactly `depth` plies, ignoring budgets'
    /// iteration logic. Returns `None` if the budget ran out first.
    pub fn search_depth(
        &mut self,
        root: &BoardState,
        depth: u8,
        hint: Option<Move>,
    ) -> Option<(Move, i32)> {
        self.start = Instant::now();
        self.stopped = false;
        let pass = self.root_pass(root, depth.max(1), hint);
        if pass.completed {
            pass.best
        } else {
            None
        }
    }

    fn probe_hint(&mut self, state: &BoardState) -> Option<Move> {
        let cache = self.cache?;
        self.stats.cache_probes += 1;
        let entry = cache.probe(state.fingerprint())?;
        self.stats.cache_hits += 1;
        entry.best_move
    }

    fn root_pass(&mut self, root: &BoardState, depth: u8, hint: Option<Move>) -> RootPass {
        let side = root.turn();
        let moves = movegen::ordered_moves(root, hint, self.paths, self.loops);
        let mut state = root.clone();
        let mut alpha = -INFINITY;
        let mut best: Option<(Move, i32)> = None;

        for mv in moves {
            if self.out_of_budget() {
                return RootPass {
                    best,
                    completed: false,
                };
            }
            let undo = state.make_move_unchecked(mv);
            let score = self.child_value(&mut state, side, depth - 1, alpha, INFINITY, 1);
            state.unmake_move(undo);
            if self.stopped {
                return RootPass {
                    best,
                    completed: false,
                };
            }
            // Strict improvement keeps the earliest move among equals
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((mv, score));
            }
            alpha = alpha.max(score);
        }

        RootPass {
            best,
            completed: true,
        }
    }

    /// Root moves fanned out over the rayon pool, each worker on its own
    /// board copy with a full window. The shared cache is the only coupling.
    fn root_pass_parallel(&mut self, root: &BoardState, depth: u8, hint: Option<Move>) -> RootPass {
        let side = root.turn();
        let moves = movegen::ordered_moves(root, hint, self.paths, self.loops);
        let evaluator = self.evaluator;
        let paths = self.paths;
        let cache = self.cache;
        let loops = self.loops;
        let start = self.start;
        let mut limits = self.limits;
        limits.node_budget = limits
            .node_budget
            .saturating_sub(self.stats.nodes)
            / moves.len().max(1) as u64;

        let results: Vec<(Move, Option<i32>, SearchStats)> = moves
            .par_iter()
            .map(|&mv| {
                let mut worker = Searcher::new(evaluator, paths, cache, loops, limits);
                worker.start = start;
                let mut state = root.clone();
                state.make_move_unchecked(mv);
                let score = worker.child_value(&mut state, side, depth - 1, -INFINITY, INFINITY, 1);
                let score = if worker.stopped { None } else { Some(score) };
                (mv, score, worker.stats)
            })
            .collect();

        let mut best: Option<(Move, i32)> = None;
        let mut completed = true;
        for (mv, score, stats) in &results {
            self.stats.absorb(stats);
            match score {
                Some(score) => {
                    if best.map_or(true, |(_, s)| *score > s) {
                        best = Some((*mv, *score));
                    }
                }
                None => completed = false,
            }
        }
        if !completed {
            self.stopped = true;
        }
        RootPass { best, completed }
    }

    /// Value of `state` (reached by a move of `mover`) for `mover`.
    ///
    /// When the move kept the turn (a free-action bomb) the child is searched
    /// from the same side without negation.
    fn child_value(
        &mut self,
        state: &mut BoardState,
        mover: Player,
        depth: u8,
        alpha: i32,
        beta: i32,
        ply: u32,
    ) -> i32 {
        if state.turn() == mover {
            self.negamax(state, mover, depth, alpha, beta, ply)
        } else {
            -self.negamax(state, mover, depth, -beta, -alpha, ply)
        }
    }

    /// Value of `state` for its side to move
    fn negamax(
        &mut self,
        state: &mut BoardState,
        mover: Player,
        depth: u8,
        mut alpha: i32,
        mut beta: i32,
        ply: u32,
    ) -> i32 {
        self.stats.nodes += 1;
        if self.stats.nodes % self.limits.node_check_interval.max(1) == 0 && self.out_of_budget() {
            return 0;
        }

        if depth == 0 || state.is_terminal().is_some() {
            self.stats.leaves += 1;
            return static_value(self.evaluator, state, mover, ply, self.paths, self.loops);
        }

        let fingerprint = state.fingerprint();
        let alpha_orig = alpha;
        let mut hint = None;
        if let Some(cache) = self.cache {
            self.stats.cache_probes += 1;
            if let Some(entry) = cache.probe(fingerprint) {
                self.stats.cache_hits += 1;
                hint = entry.best_move;
                if entry.depth >= depth {
                    let score = score_from_cache(entry.score, ply, self.evaluator.win_score());
                    match entry.bound {
                        Bound::Exact => {
                            self.stats.cache_cutoffs += 1;
                            return score;
                        }
                        Bound::LowerBound => alpha = alpha.max(score),
                        Bound::UpperBound => beta = beta.min(score),
                    }
                    if alpha >= beta {
                        self.stats.cache_cutoffs += 1;
                        return score;
                    }
                }
            }
        }

        let side = state.turn();
        let moves = movegen::ordered_moves(state, hint, self.paths, self.loops);
        if moves.is_empty() {
            self.stats.leaves += 1;
            return static_value(self.evaluator, state, mover, ply, self.paths, self.loops);
        }

        let mut best = -INFINITY;
        let mut best_move = None;
        for mv in moves {
            let undo = state.make_move_unchecked(mv);
            let score = self.child_value(state, side, depth - 1, alpha, beta, ply + 1);
            state.unmake_move(undo);
            if self.stopped {
                return 0;
            }
            if score > best {
                best = score;
                best_move = Some(mv);
            }
            alpha = alpha.max(best);
            if alpha >= beta {
                self.stats.beta_cutoffs += 1;
                break;
            }
        }

        if let Some(cache) = self.cache {
            let bound = if best <= alpha_orig {
                Bound::UpperBound
            } else if best >= beta {
                Bound::LowerBound
            } else {
                Bound::Exact
            };
            cache.store(CacheEntry {
                fingerprint,
                score: score_to_cache(best, ply, self.evaluator.win_score()),
                best_move,
                depth,
                bound,
            });
        }

        best
    }

    fn out_of_budget(&mut self) -> bool {
        if self.stopped {
            return true;
        }
        if self.stats.nodes >= self.limits.node_budget
            || self.start.elapsed() >= self.limits.time_budget
        {
            self.stopped = true;
        }
        self.stopped
    }
}
