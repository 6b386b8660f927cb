//! Zobrist keys for board fingerprints.
//!
//! Keys are generated at compile time from a fixed xorshift64 seed so that
//! fingerprints are stable across processes and can key the persisted caches.

use crate::types::{Coord, Orientation, Player};

/// Largest supported board side
pub const MAX_DIM: usize = 16;
const CELLS: usize = MAX_DIM * MAX_DIM;
/// Upper bound for per-player wall inventories that get a distinct key
pub const MAX_INVENTORY: usize = 64;

pub struct ZobristKeys {
    pawn: [[u64; CELLS]; 2],
    wall_shape: [[u64; CELLS]; 2],
    wall_owner: [[u64; CELLS]; 2],
    remaining: [[u64; MAX_INVENTORY]; 2],
    bomb_used: [u64; 2],
    side_b: u64,
    override_center: [[u64; CELLS]; 2],
    dims: [[u64; MAX_DIM + 1]; MAX_DIM + 1],
    goal: [u64; 2],
}

const fn generate() -> ZobristKeys {
    let mut state: u64 = 0x9E37_79B9_7F4A_7C15;

    macro_rules! next_key {
        () => {{
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            state
        }};
    }

    let mut keys = ZobristKeys {
        pawn: [[0; CELLS]; 2],
        wall_shape: [[0; CELLS]; 2],
        wall_owner: [[0; CELLS]; 2],
        remaining: [[0; MAX_INVENTORY]; 2],
        bomb_used: [0; 2],
        side_b: 0,
        override_center: [[0; CELLS]; 2],
        dims: [[0; MAX_DIM + 1]; MAX_DIM + 1],
        goal: [0; 2],
    };

    let mut p = 0;
    while p < 2 {
        let mut i = 0;
        while i < CELLS {
            keys.pawn[p][i] = next_key!();
            keys.wall_shape[p][i] = next_key!();
            keys.wall_owner[p][i] = next_key!();
            keys.override_center[p][i] = next_key!();
            i += 1;
        }
        let mut n = 0;
        while n < MAX_INVENTORY {
            keys.remaining[p][n] = next_key!();
            n += 1;
        }
        keys.bomb_used[p] = next_key!();
        keys.goal[p] = next_key!();
        p += 1;
    }

    keys.side_b = next_key!();

    let mut r = 0;
    while r <= MAX_DIM {
        let mut c = 0;
        while c <= MAX_DIM {
            keys.dims[r][c] = next_key!();
            c += 1;
        }
        r += 1;
    }

    keys
}

static KEYS: ZobristKeys = generate();

fn cell_index(coord: Coord) -> usize {
    coord.row as usize * MAX_DIM + coord.col as usize
}

fn orientation_index(orientation: Orientation) -> usize {
    match orientation {
        Orientation::Horizontal => 0,
        Orientation::Vertical => 1,
    }
}

pub fn pawn(player: Player, at: Coord) -> u64 {
    KEYS.pawn[player.index()][cell_index(at)]
}

/// Key for a wall's shape only; owner-independent
pub fn wall_shape(orientation: Orientation, anchor: Coord) -> u64 {
    KEYS.wall_shape[orientation_index(orientation)][cell_index(anchor)]
}

/// Key for which player owns the wall at `anchor`
pub fn wall_owner(owner: Player, anchor: Coord) -> u64 {
    KEYS.wall_owner[owner.index()][cell_index(anchor)]
}

pub fn remaining(player: Player, count: u32) -> u64 {
    KEYS.remaining[player.index()][(count as usize).min(MAX_INVENTORY - 1)]
}

pub fn bomb_used(player: Player) -> u64 {
    KEYS.bomb_used[player.index()]
}

pub fn side_b() -> u64 {
    KEYS.side_b
}

pub fn override_center(player: Player, center: Coord) -> u64 {
    KEYS.override_center[player.index()][cell_index(center)]
}

pub fn dims(rows: i32, cols: i32) -> u64 {
    KEYS.dims[rows as usize][cols as usize]
}

pub fn goal(player: Player) -> u64 {
    KEYS.goal[player.index()]
}
