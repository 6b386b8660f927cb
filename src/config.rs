// Configuration module for reading Quoridor.toml
// Every tunable the engine uses lives here; nothing else holds global settings.

use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::board::{Rules, MAX_WALLS_PER_PLAYER};
use crate::search::SearchLimits;

pub const DEFAULT_CONFIG_PATH: &str = "Quoridor.toml";

/// Main configuration structure containing all tunable parameters
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub search: SearchConfig,
    pub difficulty: Vec<DifficultyProfile>,
    pub scores: ScoresConfig,
    pub loop_detection: LoopDetectionConfig,
    pub cache: CacheConfig,
    pub rules: Rules,
    pub debug: DebugConfig,
}

/// Search engine constants shared by every difficulty level
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct SearchConfig {
    /// Nodes between budget checks inside the tree walk
    pub node_check_interval: u64,
    /// Held back from each time budget for move application and I/O
    pub time_safety_margin_ms: u64,
    pub parallel_root: bool,
}

/// One row of the difficulty table
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct DifficultyProfile {
    /// Highest level this profile covers
    pub max_level: u8,
    pub rows: i32,
    pub cols: i32,
    pub walls_per_player: u32,
    /// Depth cap; the requested level is the depth below it
    pub depth: u8,
    pub time_budget_ms: u64,
    pub node_budget: u64,
}

/// Evaluation weights
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct ScoresConfig {
    pub path_weight: i32,
    pub progress_weight: i32,
    pub proximity_weight: i32,
    pub loop_weight: i32,
    pub win_score: i32,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct LoopDetectionConfig {
    pub history_capacity: usize,
    /// Number of most recent entries compared against a candidate position
    pub window: usize,
    pub recency_weight: i32,
}

/// Persisted cache locations and sizes
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    pub enabled: bool,
    pub search_cache_path: String,
    pub path_cache_path: String,
    pub max_search_entries: usize,
    pub max_path_entries: usize,
}

/// Debug configuration
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct DebugConfig {
    pub enabled: bool,
    pub log_file_path: String,
}

impl Config {
    /// Loads configuration from a TOML file
    ///
    /// # Arguments
    /// * `path` - Path to the Quoridor.toml configuration file
    ///
    /// # Returns
    /// * `Result<Config, String>` - Parsed configuration or error message
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let contents = fs::read_to_string(path.as_ref())
            .map_err(|e| format!("Failed to read config file: {}", e))?;

        let config: Config = toml::from_str(&contents)
            .map_err(|e| format!("Failed to parse config file: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads default configuration from Quoridor.toml in the project root
    pub fn load_default() -> Result<Self, String> {
        Self::from_file(DEFAULT_CONFIG_PATH)
    }

    /// Creates a configuration with hardcoded default values as fallback
    /// This should match the constants defined in Quoridor.toml
    pub fn default_hardcoded() -> Self {
        Config {
            search: SearchConfig {
                node_check_interval: 1024,
                time_safety_margin_ms: 50,
                parallel_root: false,
            },
            difficulty: vec![
                DifficultyProfile {
                    max_level: 2,
                    rows: 9,
                    cols: 9,
                    walls_per_player: 10,
                    depth: 2,
                    time_budget_ms: 2000,
                    node_budget: 2_000_000,
                },
                DifficultyProfile {
                    max_level: 4,
                    rows: 7,
                    cols: 7,
                    walls_per_player: 7,
                    depth: 4,
                    time_budget_ms: 4000,
                    node_budget: 4_000_000,
                },
                DifficultyProfile {
                    max_level: 255,
                    rows: 5,
                    cols: 5,
                    walls_per_player: 5,
                    depth: 6,
                    time_budget_ms: 6000,
                    node_budget: 8_000_000,
                },
            ],
            scores: ScoresConfig {
                path_weight: 100,
                progress_weight: 20,
                proximity_weight: 5,
                loop_weight: 30,
                win_score: 1_000_000,
            },
            loop_detection: LoopDetectionConfig {
                history_capacity: 12,
                window: 6,
                recency_weight: 1,
            },
            cache: CacheConfig {
                enabled: true,
                search_cache_path: "cache/search_cache.json".to_string(),
                path_cache_path: "cache/path_cache.json".to_string(),
                max_search_entries: 500_000,
                max_path_entries: 200_000,
            },
            rules: Rules::default(),
            debug: DebugConfig {
                enabled: false,
                log_file_path: "quoridor_debug.jsonl".to_string(),
            },
        }
    }

    /// Attempts to load from file, falls back to hardcoded defaults on error
    pub fn load_or_default() -> Self {
        Self::load_default()
            .unwrap_or_else(|e| {
                eprintln!("Warning: Could not load Quoridor.toml ({}), using hardcoded defaults", e);
                Self::default_hardcoded()
            })
    }

    fn validate(&self) -> Result<(), String> {
        if self.difficulty.is_empty() {
            return Err("Config needs at least one [[difficulty]] profile".to_string());
        }
        for profile in &self.difficulty {
            if profile.walls_per_player > MAX_WALLS_PER_PLAYER {
                return Err(format!(
                    "Difficulty profile for level {} has {} walls per player, the limit is {}",
                    profile.max_level, profile.walls_per_player, MAX_WALLS_PER_PLAYER
                ));
            }
            if profile.depth == 0 {
                return Err(format!(
                    "Difficulty profile for level {} has depth 0",
                    profile.max_level
                ));
            }
        }
        if self.loop_detection.window == 0 {
            return Err("loop_detection.window must be positive".to_string());
        }
        Ok(())
    }

    /// Profile for a difficulty level: the first whose `max_level` covers it,
    /// else the last one. Level 0 counts as level 1.
    pub fn difficulty(&self, level: u8) -> &DifficultyProfile {
        let level = level.max(1);
        self.difficulty
            .iter()
            .find(|p| p.max_level >= level)
            .or_else(|| self.difficulty.last())
            .unwrap_or(&FALLBACK_PROFILE)
    }

    /// Search limits for a difficulty level: depth equals the level, capped
    /// by the profile's depth.
    pub fn search_limits(&self, level: u8) -> SearchLimits {
        let profile = self.difficulty(level);
        let budget = profile
            .time_budget_ms
            .saturating_sub(self.search.time_safety_margin_ms)
            .max(1);
        SearchLimits {
            max_depth: level.max(1).min(profile.depth),
            time_budget: Duration::from_millis(budget),
            node_budget: profile.node_budget,
            node_check_interval: self.search.node_check_interval.max(1),
            parallel_root: self.search.parallel_root,
        }
    }

    /// Stable tag of everything that changes cached search scores.
    ///
    /// FNV-1a over the little-endian bytes of the weights, rule switches and
    /// loop settings, in a fixed order; persisted caches written under
    /// another tag are dropped.
    pub fn rules_tag(&self) -> u64 {
        let ScoresConfig {
            path_weight,
            progress_weight,
            proximity_weight,
            loop_weight,
            win_score,
        } = self.scores;
        let LoopDetectionConfig {
            history_capacity,
            window,
            recency_weight,
        } = self.loop_detection;
        let fields: [i64; 10] = [
            path_weight as i64,
            progress_weight as i64,
            proximity_weight as i64,
            loop_weight as i64,
            win_score as i64,
            self.rules.power_bomb_ends_turn as i64,
            self.rules.power_bomb_radius as i64,
            history_capacity as i64,
            window as i64,
            recency_weight as i64,
        ];
        fields
            .iter()
            .flat_map(|field| field.to_le_bytes())
            .fold(0xcbf2_9ce4_8422_2325u64, |hash, byte| {
                (hash ^ byte as u64).wrapping_mul(0x0000_0100_0000_01b3)
            })
    }
}

/// Only reachable for a hand-built `Config` with an empty table
static FALLBACK_PROFILE: DifficultyProfile = DifficultyProfile {
    max_level: u8::MAX,
    rows: 9,
    cols: 9,
    walls_per_player: 10,
    depth: 2,
    time_budget_ms: 2000,
    node_budget: 2_000_000,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_can_be_created() {
        let config = Config::default_hardcoded();
        assert_eq!(config.difficulty.len(), 3);
        assert_eq!(config.scores.path_weight, 100);
        assert!(config.rules.power_bomb_ends_turn);
    }

    #[test]
    fn test_quoridor_toml_can_be_parsed() {
        // This test ensures Quoridor.toml is valid and can be parsed
        let result = Config::from_file("Quoridor.toml");
        assert!(
            result.is_ok(),
            "Failed to parse Quoridor.toml: {:?}",
            result.err()
        );
    }

    #[test]
    fn test_all_config_values_match_hardcoded_defaults() {
        let file_config = Config::from_file("Quoridor.toml")
            .expect("Quoridor.toml should be parseable");
        let hardcoded_config = Config::default_hardcoded();

        assert_eq!(file_config.search, hardcoded_config.search);
        assert_eq!(file_config.difficulty, hardcoded_config.difficulty);
        assert_eq!(file_config.scores, hardcoded_config.scores);
        assert_eq!(file_config.loop_detection, hardcoded_config.loop_detection);
        assert_eq!(file_config.cache, hardcoded_config.cache);
        assert_eq!(file_config.rules, hardcoded_config.rules);
        assert_eq!(file_config.debug, hardcoded_config.debug);
        assert_eq!(file_config.rules_tag(), hardcoded_config.rules_tag());
    }

    #[test]
    fn test_difficulty_mapping() {
        let config = Config::default_hardcoded();
        assert_eq!(config.difficulty(0).rows, 9);
        assert_eq!(config.difficulty(2).walls_per_player, 10);
        assert_eq!(config.difficulty(3).rows, 7);
        assert_eq!(config.difficulty(4).walls_per_player, 7);
        assert_eq!(config.difficulty(5).rows, 5);
        assert_eq!(config.difficulty(200).cols, 5);
    }

    #[test]
    fn test_search_depth_follows_level() {
        let config = Config::default_hardcoded();
        assert_eq!(config.search_limits(0).max_depth, 1);
        assert_eq!(config.search_limits(1).max_depth, 1);
        assert_eq!(config.search_limits(2).max_depth, 2);
        assert_eq!(config.search_limits(3).max_depth, 3);
        assert_eq!(config.search_limits(9).max_depth, 6);
        assert_eq!(
            config.search_limits(1).time_budget,
            Duration::from_millis(1950)
        );
    }

    #[test]
    fn test_rules_tag_tracks_weights() {
        let a = Config::default_hardcoded();
        let mut b = Config::default_hardcoded();
        assert_eq!(a.rules_tag(), b.rules_tag());
        b.scores.loop_weight += 1;
        assert_ne!(a.rules_tag(), b.rules_tag());
        b = Config::default_hardcoded();
        b.rules.power_bomb_ends_turn = false;
        assert_ne!(a.rules_tag(), b.rules_tag());
        b = Config::default_hardcoded();
        b.loop_detection.window += 1;
        assert_ne!(a.rules_tag(), b.rules_tag());
        // Settings outside scoring leave the tag alone
        b = Config::default_hardcoded();
        b.cache.max_search_entries = 7;
        b.debug.enabled = true;
        assert_eq!(a.rules_tag(), b.rules_tag());
    }

    /// The tag is part of the on-disk format and must not drift between builds
    #[test]
    fn test_rules_tag_is_pinned() {
        let fields: [i64; 10] = [100, 20, 5, 30, 1_000_000, 1, 1, 12, 6, 1];
        let expected = fields
            .iter()
            .flat_map(|f| f.to_le_bytes())
            .fold(0xcbf2_9ce4_8422_2325u64, |h, b| {
                (h ^ b as u64).wrapping_mul(0x0000_0100_0000_01b3)
            });
        assert_eq!(Config::default_hardcoded().rules_tag(), expected);
    }

    #[test]
    fn test_load_or_default_works() {
        // This should succeed with the actual file
        let config = Config::load_or_default();
        assert_eq!(config.scores.win_score, 1_000_000);
    }

    #[test]
    fn test_invalid_toml_returns_error() {
        // Test with a non-existent file
        let result = Config::from_file("nonexistent.toml");
        assert!(result.is_err());
    }

    #[test]
    fn test_oversized_inventory_rejected() {
        let mut config = Config::default_hardcoded();
        config.difficulty[0].walls_per_player = MAX_WALLS_PER_PLAYER + 1;
        assert!(config.validate().is_err());
        config.difficulty[0].walls_per_player = MAX_WALLS_PER_PLAYER;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_difficulty_table_rejected() {
        let mut config = Config::default_hardcoded();
        config.difficulty.clear();
        assert!(config.validate().is_err());
        // Still answers with the built-in profile
        assert_eq!(config.difficulty(3).rows, 9);
    }
}
