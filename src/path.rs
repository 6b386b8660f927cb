//! Path oracle: breadth-first distances to a goal row.
//!
//! Distances are computed backwards from the goal row, producing a field that
//! answers "how many steps from here" for every cell at once. Fields depend
//! only on board dimensions and wall shapes, so `PathCache` memoizes them by
//! `BoardState::wall_shape_hash` and they are shared across many branches of a
//! search (and across runs, see `cache`).

use log::debug;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::board::{BoardState, MIN_DIM};
use crate::types::{Coord, Direction, Player};
use crate::zobrist::{self, MAX_DIM};

pub const UNREACHABLE: u16 = u16::MAX;

/// Steps-to-goal for every cell of a board
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistanceField {
    pub rows: i32,
    pub cols: i32,
    pub dist: Vec<u16>,
}

impl DistanceField {
    /// Steps from `cell` to the goal row, `None` when walled off
    pub fn at(&self, cell: Coord) -> Option<u32> {
        if cell.row < 0 || cell.row >= self.rows || cell.col < 0 || cell.col >= self.cols {
            return None;
        }
        match self.dist.get((cell.row * self.cols + cell.col) as usize) {
            None | Some(&UNREACHABLE) => None,
            Some(&d) => Some(d as u32),
        }
    }

    /// Whether the field could have come from `distance_field`: board
    /// dimensions in range and one distance per cell.
    pub fn check(&self) -> Result<(), String> {
        let max = MAX_DIM as i32;
        if self.rows < MIN_DIM || self.cols < MIN_DIM || self.rows > max || self.cols > max {
            return Err(format!("dimensions {}x{} out of range", self.rows, self.cols));
        }
        let cells = (self.rows * self.cols) as usize;
        if self.dist.len() != cells {
            return Err(format!(
                "{} distances for a {}x{} board",
                self.dist.len(),
                self.rows,
                self.cols
            ));
        }
        Ok(())
    }
}

/// Multi-source BFS from every cell of `goal_row`, honouring walls only
pub fn distance_field(state: &BoardState, goal_row: i32) -> DistanceField {
    let rows = state.rows();
    let cols = state.cols();
    let mut dist = vec![UNREACHABLE; (rows * cols) as usize];
    let mut queue = VecDeque::with_capacity((rows * cols) as usize);

    for col in 0..cols {
        dist[(goal_row * cols + col) as usize] = 0;
        queue.push_back(Coord::new(goal_row, col));
    }

    while let Some(cell) = queue.pop_front() {
        let d = dist[(cell.row * cols + cell.col) as usize];
        for dir in Direction::ALL {
            if state.wall_blocks(cell, dir) {
                continue;
            }
            let next = cell.step(dir);
            let idx = (next.row * cols + next.col) as usize;
            if dist[idx] == UNREACHABLE {
                dist[idx] = d + 1;
                queue.push_back(next);
            }
        }
    }

    DistanceField { rows, cols, dist }
}

/// Whether `player`'s pawn can still reach its goal row
pub fn is_connected(state: &BoardState, player: Player) -> bool {
    distance_field(state, state.goal_row(player))
        .at(state.pawn(player))
        .is_some()
}

/// Uncached shortest path length for `player`
pub fn shortest_path_length(state: &BoardState, player: Player) -> u32 {
    let field = distance_field(state, state.goal_row(player));
    resolve(state, player, &field)
}

fn resolve(state: &BoardState, player: Player, field: &DistanceField) -> u32 {
    match field.at(state.pawn(player)) {
        Some(d) => d,
        None => {
            debug_assert!(false, "player {} has no path to goal", player);
            (state.rows() * state.cols()) as u32
        }
    }
}

fn cache_key(state: &BoardState, player: Player) -> u64 {
    state.wall_shape_hash() ^ zobrist::goal(player)
}

/// Memo of distance fields keyed by wall layout and goal
#[derive(Debug)]
pub struct PathCache {
    fields: RwLock<HashMap<u64, Arc<DistanceField>>>,
    capacity: usize,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl PathCache {
    pub fn new(capacity: usize) -> Self {
        PathCache {
            fields: RwLock::new(HashMap::new()),
            capacity,
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
        }
    }

    /// Distance field towards `player`'s goal for the current wall layout
    pub fn field(&self, state: &BoardState, player: Player) -> Arc<DistanceField> {
        let key = cache_key(state, player);
        if let Some(field) = self.fields.read().get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return field.clone();
        }
        self.misses.fetch_add(1, Ordering::Relaxed);

        let field = Arc::new(distance_field(state, state.goal_row(player)));
        let mut fields = self.fields.write();
        if fields.len() >= self.capacity {
            debug!("Path cache full ({} fields), clearing", fields.len());
            fields.clear();
        }
        fields.insert(key, field.clone());
        field
    }

    pub fn shortest_path_length(&self, state: &BoardState, player: Player) -> u32 {
        let field = self.field(state, player);
        resolve(state, player, &field)
    }

    pub fn is_connected(&self, state: &BoardState, player: Player) -> bool {
        self.field(state, player).at(state.pawn(player)).is_some()
    }

    pub fn len(&self) -> usize {
        self.fields.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// (hits, misses) since creation
    pub fn stats(&self) -> (usize, usize) {
        (
            self.hits.load(Ordering::Relaxed),
            self.misses.load(Ordering::Relaxed),
        )
    }

    pub(crate) fn export(&self) -> Vec<(u64, DistanceField)> {
        self.fields
            .read()
            .iter()
            .map(|(k, v)| (*k, DistanceField::clone(v)))
            .collect()
    }

    pub(crate) fn import(&self, entries: Vec<(u64, DistanceField)>) {
        let mut fields = self.fields.write();
        for (key, field) in entries.into_iter().take(self.capacity) {
            fields.insert(key, Arc::new(field));
        }
    }
}
