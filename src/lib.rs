// Library exports for the Quoridor AI
// The server binary, the replay and self-play tools and the integration tests
// all drive the engine through this crate.

pub mod board;
pub mod bomb;
pub mod bot;
pub mod cache;
pub mod config;
pub mod debug_logger;
pub mod engine;
pub mod error;
pub mod eval;
pub mod handler;
pub mod loop_detector;
pub mod movegen;
pub mod path;
pub mod replay;
pub mod search;
pub mod types;
pub mod zobrist;

pub use board::BoardState;
pub use config::Config;
pub use engine::Engine;
pub use types::{Coord, Move, Orientation, Player, Wall};
