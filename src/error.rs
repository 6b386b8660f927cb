//! Error types for move application, cache loading and search

use thiserror::Error;

use crate::types::{Coord, Player};

/// Why a move could not be applied. Always surfaced to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IllegalMoveError {
    #[error("target {0} is outside the board")]
    OutOfBounds(Coord),

    #[error("target {0} is occupied by the other pawn")]
    Occupied(Coord),

    #[error("target {0} is not reachable with a single step or jump")]
    Unreachable(Coord),

    #[error("wall anchor {0} is outside the wall grid")]
    WallOutOfBounds(Coord),

    #[error("wall at {0} overlaps or crosses an existing wall")]
    WallOverlap(Coord),

    #[error("player {0} has no walls remaining")]
    NoWallsRemaining(Player),

    #[error("wall would cut player {0} off from their goal row")]
    WouldDisconnect(Player),

    #[error("player {0} has already used the power bomb")]
    PowerBombUsed(Player),

    #[error("it is not player {0}'s turn")]
    WrongTurn(Player),

    #[error("the game is already over")]
    GameOver,
}

/// Problems reading a persisted cache file. Never escapes the cache loader.
#[derive(Debug, Error)]
pub enum CacheFormatError {
    #[error("cache file unreadable: {0}")]
    Io(#[from] std::io::Error),

    #[error("cache file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("cache format version {found} does not match expected {expected}")]
    VersionMismatch { found: u32, expected: u32 },

    #[error("cache file holds {found} entries, expected {expected}")]
    KindMismatch { found: String, expected: String },

    #[error("cache entry {index} is malformed: {reason}")]
    InvalidEntry { index: usize, reason: String },

    #[error("cache was written under different rules ({found:#x} != {expected:#x})")]
    RulesMismatch { found: u64, expected: u64 },
}

/// The only situations in which `choose_move` cannot produce a move.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SearchError {
    #[error("the game is already over")]
    GameOver,

    #[error("player {0} has no legal move")]
    NoLegalMoves(Player),
}

/// Errors from constructing a board from external input
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BoardError {
    #[error("board dimensions {rows}x{cols} are outside 3..=16")]
    InvalidDimensions { rows: i32, cols: i32 },

    #[error("pawn position {0} is outside the board")]
    PawnOutOfBounds(Coord),

    #[error("both pawns occupy {0}")]
    PawnsOverlap(Coord),

    #[error("invalid wall: {0}")]
    InvalidWall(IllegalMoveError),

    #[error("player {0} has no path to their goal row")]
    Disconnected(Player),

    #[error("player {player} would hold {count} walls, more than a board can track")]
    TooManyWalls { player: Player, count: u32 },
}
