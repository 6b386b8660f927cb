// Replay module for analyzing logged decisions and debugging the search
//
// This module provides functionality to:
// 1. Parse JSONL decision logs
// 2. Re-run the engine on each logged board
// 3. Compare logged vs replayed moves
// 4. Generate summary reports

use log::{info, warn};
use std::convert::TryFrom;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::board::BoardState;
use crate::config::Config;
use crate::debug_logger::DecisionLogEntry;
use crate::engine::Engine;
use crate::types::Move;

/// Lines of the decision log are read back as-is
pub type LogEntry = DecisionLogEntry;

/// Result of replaying a single decision
#[derive(Debug, Clone)]
pub struct ReplayResult {
    pub turn: u32,
    pub original_move: Move,
    pub replayed_move: Move,
    pub matches: bool,
    pub original_score: i32,
    pub replayed_score: i32,
    pub original_depth: u8,
    pub search_depth: u8,
    pub nodes: u64,
    pub computation_time_ms: u64,
}

/// Statistics for a complete replay session
#[derive(Debug, Default)]
pub struct ReplayStats {
    pub total_turns: usize,
    pub matches: usize,
    pub mismatches: usize,
    pub match_rate: f64,
}

/// Replay engine for analyzing decision logs
pub struct ReplayEngine {
    engine: Engine,
    verbose: bool,
}

impl ReplayEngine {
    /// Creates a replay engine. Persisted caches are never touched so every
    /// replay starts from the same cold state.
    pub fn new(mut config: Config, verbose: bool) -> Self {
        config.cache.enabled = false;
        ReplayEngine {
            engine: Engine::new(config),
            verbose,
        }
    }

    /// Loads all log entries from a JSONL file
    pub fn load_log_file<P: AsRef<Path>>(&self, log_path: P) -> Result<Vec<LogEntry>, String> {
        let file = File::open(log_path.as_ref())
            .map_err(|e| format!("Failed to open log file: {}", e))?;

        let reader = BufReader::new(file);
        let mut entries = Vec::new();

        for (line_num, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| format!("Failed to read line {}: {}", line_num + 1, e))?;

            if line.trim().is_empty() {
                continue;
            }

            let entry: LogEntry = serde_json::from_str(&line).map_err(|e| {
                format!("Failed to parse JSON on line {}: {}", line_num + 1, e)
            })?;

            entries.push(entry);
        }

        info!("Loaded {} log entries", entries.len());
        Ok(entries)
    }

    /// Replays a single log entry and compares the result
    pub fn replay_entry(&self, entry: &LogEntry) -> Result<ReplayResult, String> {
        if self.verbose {
            info!("Replaying turn {}...", entry.turn);
        }

        let board = BoardState::try_from(entry.board.clone())
            .map_err(|e| format!("Turn {}: invalid board: {}", entry.turn, e))?;

        // Each decision is judged on its own, without earlier turns' history
        let result = self
            .engine
            .analyze(&board, entry.difficulty)
            .map_err(|e| format!("Turn {}: {}", entry.turn, e))?;

        let matches = result.best_move == entry.chosen_move;
        let replay = ReplayResult {
            turn: entry.turn,
            original_move: entry.chosen_move,
            replayed_move: result.best_move,
            matches,
            original_score: entry.score,
            replayed_score: result.score,
            original_depth: entry.depth,
            search_depth: result.depth,
            nodes: result.stats.nodes,
            computation_time_ms: result.stats.elapsed_ms,
        };

        if self.verbose {
            if matches {
                info!(
                    "Turn {}: ✓ MATCH - {} (score: {}, depth: {}, time: {}ms)",
                    entry.turn,
                    replay.replayed_move,
                    replay.replayed_score,
                    replay.search_depth,
                    replay.computation_time_ms
                );
            } else {
                warn!(
                    "Turn {}: ✗ MISMATCH - Original: {}, Replayed: {} (score: {}, depth: {}, time: {}ms)",
                    entry.turn,
                    replay.original_move,
                    replay.replayed_move,
                    replay.replayed_score,
                    replay.search_depth,
                    replay.computation_time_ms
                );
            }
        }

        Ok(replay)
    }

    /// Replays all entries in a log file
    pub fn replay_all(&self, entries: &[LogEntry]) -> Vec<ReplayResult> {
        entries
            .iter()
            .filter_map(|entry| match self.replay_entry(entry) {
                Ok(result) => Some(result),
                Err(e) => {
                    warn!("Failed to replay turn {}: {}", entry.turn, e);
                    None
                }
            })
            .collect()
    }

    /// Replays specific turns from a log file
    pub fn replay_turns(
        &self,
        entries: &[LogEntry],
        turn_numbers: &[u32],
    ) -> Result<Vec<ReplayResult>, String> {
        let mut results = Vec::new();

        for turn_num in turn_numbers {
            let entry = entries
                .iter()
                .find(|e| e.turn == *turn_num)
                .ok_or_else(|| format!("Turn {} not found in log file", turn_num))?;

            match self.replay_entry(entry) {
                Ok(result) => results.push(result),
                Err(e) => {
                    warn!("Failed to replay turn {}: {}", turn_num, e);
                }
            }
        }

        Ok(results)
    }

    /// Generates statistics from replay results
    pub fn generate_stats(&self, results: &[ReplayResult]) -> ReplayStats {
        let total_turns = results.len();
        let matches = results.iter().filter(|r| r.matches).count();
        let mismatches = total_turns - matches;
        let match_rate = if total_turns > 0 {
            (matches as f64 / total_turns as f64) * 100.0
        } else {
            0.0
        };

        ReplayStats {
            total_turns,
            matches,
            mismatches,
            match_rate,
        }
    }

    /// Prints a detailed report of replay results
    pub fn print_report(&self, results: &[ReplayResult]) {
        let stats = self.generate_stats(results);

        println!("\n═══════════════════════════════════════════════════════════");
        println!("                    REPLAY REPORT");
        println!("═══════════════════════════════════════════════════════════");
        println!("Total Turns:    {}", stats.total_turns);
        println!("Matches:        {} ({:.1}%)", stats.matches, stats.match_rate);
        println!("Mismatches:     {}", stats.mismatches);
        println!("═══════════════════════════════════════════════════════════\n");

        if !results.is_empty() {
            let count = results.len() as f64;
            let avg_time =
                results.iter().map(|r| r.computation_time_ms as f64).sum::<f64>() / count;
            let avg_depth = results.iter().map(|r| r.search_depth as f64).sum::<f64>() / count;
            let avg_nodes = results.iter().map(|r| r.nodes as f64).sum::<f64>() / count;

            println!("Average Search Depth:       {:.1}", avg_depth);
            println!("Average Nodes:              {:.0}", avg_nodes);
            println!("Average Computation Time:   {:.1}ms\n", avg_time);
        }

        let mismatches: Vec<_> = results.iter().filter(|r| !r.matches).collect();
        if !mismatches.is_empty() {
            println!("═══════════════════════════════════════════════════════════");
            println!("                  DETAILED MISMATCHES");
            println!("═══════════════════════════════════════════════════════════");

            for result in mismatches {
                println!(
                    "Turn {}: {} (score {}, depth {}) → {} (score {}, depth {}, {}ms)",
                    result.turn,
                    result.original_move,
                    result.original_score,
                    result.original_depth,
                    result.replayed_move,
                    result.replayed_score,
                    result.search_depth,
                    result.computation_time_ms
                );
            }
            println!();
        }
    }

    /// Checks that the logged move for each listed turn is one of the acceptable ones
    pub fn validate_expected_moves(
        &self,
        entries: &[LogEntry],
        expected_moves: &[(u32, Vec<Move>)],
    ) -> Result<(), String> {
        for (turn, acceptable) in expected_moves {
            let entry = entries
                .iter()
                .find(|e| e.turn == *turn)
                .ok_or_else(|| format!("Turn {} not found in log", turn))?;

            if !acceptable.contains(&entry.chosen_move) {
                let listed: Vec<String> = acceptable.iter().map(|m| m.to_string()).collect();
                return Err(format!(
                    "Turn {}: Expected one of {:?}, but got {}",
                    turn, listed, entry.chosen_move
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Coord;
    use std::io::Write;

    fn forward() -> Move {
        Move::PawnMove {
            target: Coord::new(1, 4),
        }
    }

    fn entry(turn: u32, chosen_move: Move) -> LogEntry {
        LogEntry {
            turn,
            difficulty: 1,
            chosen_move,
            score: 0,
            depth: 1,
            board: BoardState::new(9, 9, 10).unwrap().snapshot(),
            timestamp: "2025-01-01T00:00:00+00:00".to_string(),
        }
    }

    #[test]
    fn test_load_and_replay_log() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        for e in [entry(0, forward()), entry(1, Move::PowerBomb)] {
            writeln!(file, "{}", serde_json::to_string(&e).unwrap()).unwrap();
        }
        writeln!(file).unwrap();

        let replay = ReplayEngine::new(Config::default_hardcoded(), false);
        let entries = replay.load_log_file(file.path()).unwrap();
        assert_eq!(entries.len(), 2);

        let results = replay.replay_all(&entries);
        assert_eq!(results.len(), 2);
        assert!(results[0].matches);
        assert!(!results[1].matches);

        let stats = replay.generate_stats(&results);
        assert_eq!((stats.matches, stats.mismatches), (1, 1));
        assert!((stats.match_rate - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_bad_line_is_reported() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{{\"turn\": 1}}").unwrap();
        let replay = ReplayEngine::new(Config::default_hardcoded(), false);
        let err = replay.load_log_file(file.path()).unwrap_err();
        assert!(err.contains("line 1"));
    }

    #[test]
    fn test_validate_expected_moves() {
        let replay = ReplayEngine::new(Config::default_hardcoded(), false);
        let entries = vec![entry(0, forward())];
        assert!(replay
            .validate_expected_moves(&entries, &[(0, vec![forward()])])
            .is_ok());
        assert!(replay
            .validate_expected_moves(&entries, &[(0, vec![Move::PowerBomb])])
            .is_err());
        assert!(replay
            .validate_expected_moves(&entries, &[(5, vec![forward()])])
            .is_err());
    }
}
