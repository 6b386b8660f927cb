// Board state model
//
// A `BoardState` is a value: cloning it is cheap enough to hand to worker
// threads, and search code mutates it in place only through `make_move` /
// `unmake_move` pairs so that every ancestor frame sees its own state again
// once a child returns.

use serde::{Deserialize, Serialize};
use std::convert::TryFrom;

use crate::bomb;
use crate::config::Config;
use crate::error::{BoardError, IllegalMoveError};
use crate::path;
use crate::types::{Coord, Direction, Move, Orientation, Player, Wall};
use crate::zobrist::{self, MAX_DIM};

pub const MIN_DIM: i32 = 3;
/// Largest wall inventory a player may hold
pub const MAX_WALLS_PER_PLAYER: u32 = zobrist::MAX_INVENTORY as u32 - 1;

/// Rule switches that change how moves resolve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rules {
    /// When false the power bomb is a free action followed by a regular move
    pub power_bomb_ends_turn: bool,
    /// Chebyshev radius of the blast zone around the bomber's pawn
    pub power_bomb_radius: i32,
}

impl Default for Rules {
    fn default() -> Self {
        Rules {
            power_bomb_ends_turn: true,
            power_bomb_radius: 1,
        }
    }
}

/// Cells a player may cross without wall checks for the rest of their turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraversalOverride {
    pub player: Player,
    pub center: Coord,
    pub radius: i32,
}

impl TraversalOverride {
    pub fn contains(&self, cell: Coord) -> bool {
        (cell.row - self.center.row).abs() <= self.radius
            && (cell.col - self.center.col).abs() <= self.radius
    }
}

/// Token returned by `make_move`; hand it back to `unmake_move` to restore.
#[derive(Debug, Clone)]
pub struct Undo {
    kind: UndoKind,
    turn: Player,
    traversal_override: Option<TraversalOverride>,
}

#[derive(Debug, Clone)]
enum UndoKind {
    Pawn { from: Coord },
    Wall { wall: Wall },
    Bomb { outcome: bomb::BombOutcome },
}

/// Per-player pair used in the JSON form of a board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerPlayer<T> {
    #[serde(rename = "A")]
    pub a: T,
    #[serde(rename = "B")]
    pub b: T,
}

impl<T: Copy> PerPlayer<T> {
    pub fn from_array(values: [T; 2]) -> Self {
        PerPlayer {
            a: values[0],
            b: values[1],
        }
    }

    pub fn to_array(self) -> [T; 2] {
        [self.a, self.b]
    }
}

/// Wire representation of a board, as exchanged with the UI and written to logs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardSnapshot {
    pub rows: i32,
    pub cols: i32,
    pub pawn_positions: PerPlayer<Coord>,
    pub walls: Vec<Wall>,
    pub walls_remaining: PerPlayer<u32>,
    pub power_bomb_used: PerPlayer<bool>,
    pub turn: Player,
    #[serde(default)]
    pub traversal_override: Option<TraversalOverride>,
    #[serde(default)]
    pub rules: Rules,
}

/// Snapshot of a game in progress
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BoardSnapshot", into = "BoardSnapshot")]
pub struct BoardState {
    rows: i32,
    cols: i32,
    pawns: [Coord; 2],
    /// Wall slots indexed by anchor, `(rows - 1) * (cols - 1)` entries
    wall_grid: Vec<Option<(Orientation, Player)>>,
    wall_count: usize,
    walls_remaining: [u32; 2],
    power_bomb_used: [bool; 2],
    turn: Player,
    traversal_override: Option<TraversalOverride>,
    rules: Rules,
    wall_shape_hash: u64,
    wall_owner_hash: u64,
}

impl BoardState {
    /// Standard opening: A on the top row heading down, B on the bottom row heading up
    pub fn new(rows: i32, cols: i32, walls_per_player: u32) -> Result<Self, BoardError> {
        Self::check_dims(rows, cols)?;
        for player in Player::BOTH {
            Self::check_inventory(player, walls_per_player)?;
        }
        let mid = cols / 2;
        Ok(Self::empty(
            rows,
            cols,
            [Coord::new(0, mid), Coord::new(rows - 1, mid)],
            [walls_per_player, walls_per_player],
        ))
    }

    fn check_dims(rows: i32, cols: i32) -> Result<(), BoardError> {
        let max = MAX_DIM as i32;
        if rows < MIN_DIM || cols < MIN_DIM || rows > max || cols > max {
            return Err(BoardError::InvalidDimensions { rows, cols });
        }
        Ok(())
    }

    /// Every count a player can hold needs its own fingerprint key
    fn check_inventory(player: Player, count: u32) -> Result<(), BoardError> {
        if count > MAX_WALLS_PER_PLAYER {
            return Err(BoardError::TooManyWalls { player, count });
        }
        Ok(())
    }

    fn empty(rows: i32, cols: i32, pawns: [Coord; 2], walls_remaining: [u32; 2]) -> Self {
        BoardState {
            rows,
            cols,
            pawns,
            wall_grid: vec![None; ((rows - 1) * (cols - 1)) as usize],
            wall_count: 0,
            walls_remaining,
            power_bomb_used: [false, false],
            turn: Player::A,
            traversal_override: None,
            rules: Rules::default(),
            wall_shape_hash: zobrist::dims(rows, cols),
            wall_owner_hash: 0,
        }
    }

    pub fn with_rules(mut self, rules: Rules) -> Self {
        self.rules = rules;
        self
    }

    /// Opening position for a difficulty level, sized by its profile
    pub fn for_difficulty(config: &Config, level: u8) -> Result<Self, BoardError> {
        let profile = config.difficulty(level);
        Ok(Self::new(profile.rows, profile.cols, profile.walls_per_player)?.with_rules(config.rules))
    }

    pub fn rows(&self) -> i32 {
        self.rows
    }

    pub fn cols(&self) -> i32 {
        self.cols
    }

    pub fn rules(&self) -> Rules {
        self.rules
    }

    pub fn turn(&self) -> Player {
        self.turn
    }

    pub fn pawn(&self, player: Player) -> Coord {
        self.pawns[player.index()]
    }

    pub fn walls_remaining(&self, player: Player) -> u32 {
        self.walls_remaining[player.index()]
    }

    pub fn power_bomb_used(&self, player: Player) -> bool {
        self.power_bomb_used[player.index()]
    }

    pub fn traversal_override(&self) -> Option<TraversalOverride> {
        self.traversal_override
    }

    pub fn wall_count(&self) -> usize {
        self.wall_count
    }

    /// Row a player must reach to win
    pub fn goal_row(&self, player: Player) -> i32 {
        match player {
            Player::A => self.rows - 1,
            Player::B => 0,
        }
    }

    /// Row a player starts on
    pub fn start_row(&self, player: Player) -> i32 {
        match player {
            Player::A => 0,
            Player::B => self.rows - 1,
        }
    }

    /// Number of rows a player has advanced from their start row
    pub fn advance(&self, player: Player) -> i32 {
        (self.pawn(player).row - self.start_row(player)).abs()
    }

    pub fn in_bounds(&self, c: Coord) -> bool {
        c.row >= 0 && c.row < self.rows && c.col >= 0 && c.col < self.cols
    }

    pub fn anchor_in_bounds(&self, a: Coord) -> bool {
        a.row >= 0 && a.row < self.rows - 1 && a.col >= 0 && a.col < self.cols - 1
    }

    fn anchor_index(&self, a: Coord) -> usize {
        (a.row * (self.cols - 1) + a.col) as usize
    }

    pub fn wall_at(&self, anchor: Coord) -> Option<Wall> {
        if !self.anchor_in_bounds(anchor) {
            return None;
        }
        self.wall_grid[self.anchor_index(anchor)].map(|(orientation, owner)| Wall {
            orientation,
            anchor,
            owner,
        })
    }

    fn has_wall(&self, orientation: Orientation, row: i32, col: i32) -> bool {
        let anchor = Coord::new(row, col);
        if !self.anchor_in_bounds(anchor) {
            return false;
        }
        matches!(self.wall_grid[self.anchor_index(anchor)], Some((o, _)) if o == orientation)
    }

    /// All placed walls in anchor order
    pub fn walls(&self) -> impl Iterator<Item = Wall> + '_ {
        let width = self.cols - 1;
        self.wall_grid.iter().enumerate().filter_map(move |(i, slot)| {
            slot.map(|(orientation, owner)| Wall {
                orientation,
                anchor: Coord::new(i as i32 / width, i as i32 % width),
                owner,
            })
        })
    }

    /// Whether a wall sits on the edge leaving `from` in `dir`, or the edge
    /// leads off the board. Ignores any traversal override.
    pub fn wall_blocks(&self, from: Coord, dir: Direction) -> bool {
        let to = from.step(dir);
        if !self.in_bounds(to) {
            return true;
        }
        let Coord { row, col } = from;
        match dir {
            Direction::North => {
                self.has_wall(Orientation::Horizontal, row - 1, col)
                    || self.has_wall(Orientation::Horizontal, row - 1, col - 1)
            }
            Direction::South => {
                self.has_wall(Orientation::Horizontal, row, col)
                    || self.has_wall(Orientation::Horizontal, row, col - 1)
            }
            Direction::East => {
                self.has_wall(Orientation::Vertical, row, col)
                    || self.has_wall(Orientation::Vertical, row - 1, col)
            }
            Direction::West => {
                self.has_wall(Orientation::Vertical, row, col - 1)
                    || self.has_wall(Orientation::Vertical, row - 1, col - 1)
            }
        }
    }

    /// Whether `player` may cross the edge from `from` in `dir` this turn
    pub fn can_step(&self, player: Player, from: Coord, dir: Direction) -> bool {
        let to = from.step(dir);
        if !self.in_bounds(to) {
            return false;
        }
        if let Some(ov) = self.traversal_override {
            if ov.player == player && ov.contains(from) && ov.contains(to) {
                return true;
            }
        }
        !self.wall_blocks(from, dir)
    }

    /// Cells `player`'s pawn can reach this turn: steps plus standard jumps
    pub fn pawn_targets(&self, player: Player) -> Vec<Coord> {
        let here = self.pawn(player);
        let other = self.pawn(player.opponent());
        let mut targets = Vec::with_capacity(5);

        for dir in Direction::ALL {
            if !self.can_step(player, here, dir) {
                continue;
            }
            let next = here.step(dir);
            if next != other {
                targets.push(next);
                continue;
            }
            if self.can_step(player, other, dir) {
                targets.push(other.step(dir));
            } else {
                for side in dir.perpendicular() {
                    if self.can_step(player, other, side) {
                        let diagonal = other.step(side);
                        if diagonal != here && !targets.contains(&diagonal) {
                            targets.push(diagonal);
                        }
                    }
                }
            }
        }

        targets
    }

    /// The winner, if a pawn already stands on its goal row
    pub fn is_terminal(&self) -> Option<Player> {
        Player::BOTH
            .iter()
            .copied()
            .find(|&p| self.pawn(p).row == self.goal_row(p))
    }

    /// Canonical fingerprint of everything that influences future play:
    /// dimensions, pawns, walls with owners, inventories, bomb flags,
    /// side to move and any live traversal override.
    pub fn fingerprint(&self) -> u64 {
        let mut h = self.position_fingerprint();
        for p in Player::BOTH {
            h ^= zobrist::remaining(p, self.walls_remaining(p));
            if self.power_bomb_used(p) {
                h ^= zobrist::bomb_used(p);
            }
        }
        if self.turn == Player::B {
            h ^= zobrist::side_b();
        }
        if let Some(ov) = self.traversal_override {
            h ^= zobrist::override_center(ov.player, ov.center);
        }
        h
    }

    /// Fingerprint of the physical position only (pawns and owned walls),
    /// used for repetition detection
    pub fn position_fingerprint(&self) -> u64 {
        self.wall_shape_hash
            ^ self.wall_owner_hash
            ^ zobrist::pawn(Player::A, self.pawn(Player::A))
            ^ zobrist::pawn(Player::B, self.pawn(Player::B))
    }

    /// Hash of board dimensions and wall shapes only; shortest-path results
    /// depend on nothing else
    pub fn wall_shape_hash(&self) -> u64 {
        self.wall_shape_hash
    }

    /// Checks whether a wall may be placed by `player`, excluding connectivity
    pub fn check_wall_slot(
        &self,
        player: Player,
        orientation: Orientation,
        anchor: Coord,
    ) -> Result<(), IllegalMoveError> {
        if !self.anchor_in_bounds(anchor) {
            return Err(IllegalMoveError::WallOutOfBounds(anchor));
        }
        if self.walls_remaining(player) == 0 {
            return Err(IllegalMoveError::NoWallsRemaining(player));
        }
        let candidate = Wall {
            orientation,
            anchor,
            owner: player,
        };
        let neighbours = [
            Coord::new(anchor.row, anchor.col - 1),
            Coord::new(anchor.row, anchor.col + 1),
            Coord::new(anchor.row - 1, anchor.col),
            Coord::new(anchor.row + 1, anchor.col),
        ];
        let clash = std::iter::once(anchor)
            .chain(neighbours.iter().copied())
            .filter_map(|a| self.wall_at(a))
            .any(|w| w.collides(&candidate));
        if clash {
            return Err(IllegalMoveError::WallOverlap(anchor));
        }
        Ok(())
    }

    pub(crate) fn insert_wall(&mut self, wall: Wall) {
        let idx = self.anchor_index(wall.anchor);
        debug_assert!(self.wall_grid[idx].is_none(), "wall slot already taken");
        self.wall_grid[idx] = Some((wall.orientation, wall.owner));
        self.wall_count += 1;
        self.wall_shape_hash ^= zobrist::wall_shape(wall.orientation, wall.anchor);
        self.wall_owner_hash ^= zobrist::wall_owner(wall.owner, wall.anchor);
    }

    pub(crate) fn remove_wall(&mut self, wall: Wall) {
        let idx = self.anchor_index(wall.anchor);
        debug_assert!(self.wall_grid[idx].is_some(), "removing a missing wall");
        self.wall_grid[idx] = None;
        self.wall_count -= 1;
        self.wall_shape_hash ^= zobrist::wall_shape(wall.orientation, wall.anchor);
        self.wall_owner_hash ^= zobrist::wall_owner(wall.owner, wall.anchor);
    }

    pub(crate) fn adjust_walls_remaining(&mut self, player: Player, delta: i32) {
        let slot = &mut self.walls_remaining[player.index()];
        *slot = (*slot as i32 + delta).max(0) as u32;
    }

    pub(crate) fn set_power_bomb_used(&mut self, player: Player, used: bool) {
        self.power_bomb_used[player.index()] = used;
    }

    pub(crate) fn set_traversal_override(&mut self, ov: Option<TraversalOverride>) {
        self.traversal_override = ov;
    }

    fn pass_turn(&mut self) {
        self.turn = self.turn.opponent();
        self.traversal_override = None;
    }

    /// Applies a move for the side to move, validating it completely.
    pub fn make_move(&mut self, mv: Move) -> Result<Undo, IllegalMoveError> {
        if self.is_terminal().is_some() {
            return Err(IllegalMoveError::GameOver);
        }
        let player = self.turn;
        match mv {
            Move::PawnMove { target } => {
                if !self.in_bounds(target) {
                    return Err(IllegalMoveError::OutOfBounds(target));
                }
                if target == self.pawn(player.opponent()) {
                    return Err(IllegalMoveError::Occupied(target));
                }
                if !self.pawn_targets(player).contains(&target) {
                    return Err(IllegalMoveError::Unreachable(target));
                }
            }
            Move::PlaceWall {
                orientation,
                anchor,
            } => {
                self.check_wall_slot(player, orientation, anchor)?;
                let wall = Wall {
                    orientation,
                    anchor,
                    owner: player,
                };
                self.insert_wall(wall);
                let cut = Player::BOTH
                    .iter()
                    .copied()
                    .find(|&p| !path::is_connected(self, p));
                self.remove_wall(wall);
                if let Some(p) = cut {
                    return Err(IllegalMoveError::WouldDisconnect(p));
                }
            }
            Move::PowerBomb => {
                if self.power_bomb_used(player) {
                    return Err(IllegalMoveError::PowerBombUsed(player));
                }
            }
        }
        Ok(self.make_move_unchecked(mv))
    }

    /// Applies a move already known to be legal (as produced by the move generator).
    pub fn make_move_unchecked(&mut self, mv: Move) -> Undo {
        let player = self.turn;
        let saved_turn = self.turn;
        let saved_override = self.traversal_override;

        let kind = match mv {
            Move::PawnMove { target } => {
                let from = self.pawn(player);
                self.pawns[player.index()] = target;
                self.pass_turn();
                UndoKind::Pawn { from }
            }
            Move::PlaceWall {
                orientation,
                anchor,
            } => {
                let wall = Wall {
                    orientation,
                    anchor,
                    owner: player,
                };
                self.insert_wall(wall);
                self.adjust_walls_remaining(player, -1);
                self.pass_turn();
                debug_assert!(
                    Player::BOTH.iter().all(|&p| path::is_connected(self, p)),
                    "generated wall {:?} disconnected a player",
                    wall
                );
                UndoKind::Wall { wall }
            }
            Move::PowerBomb => {
                let outcome = bomb::detonate_unchecked(self, player);
                if self.rules.power_bomb_ends_turn {
                    self.pass_turn();
                }
                UndoKind::Bomb { outcome }
            }
        };

        Undo {
            kind,
            turn: saved_turn,
            traversal_override: saved_override,
        }
    }

    /// Reverts the move that produced `undo`. Tokens must be replayed in LIFO order.
    pub fn unmake_move(&mut self, undo: Undo) {
        self.turn = undo.turn;
        match undo.kind {
            UndoKind::Pawn { from } => {
                self.pawns[undo.turn.index()] = from;
            }
            UndoKind::Wall { wall } => {
                self.remove_wall(wall);
                self.adjust_walls_remaining(wall.owner, 1);
            }
            UndoKind::Bomb { outcome } => {
                bomb::revert(self, &outcome);
            }
        }
        self.traversal_override = undo.traversal_override;
    }

    /// Value-style application: returns the successor state, leaving `self` untouched
    pub fn apply_move(&self, mv: Move) -> Result<BoardState, IllegalMoveError> {
        let mut next = self.clone();
        next.make_move(mv)?;
        Ok(next)
    }

    /// Like `apply_move`, but also checks that `player` is the side to move
    pub fn apply_move_for(&self, player: Player, mv: Move) -> Result<BoardState, IllegalMoveError> {
        if player != self.turn {
            return Err(IllegalMoveError::WrongTurn(player));
        }
        self.apply_move(mv)
    }

    pub fn snapshot(&self) -> BoardSnapshot {
        BoardSnapshot {
            rows: self.rows,
            cols: self.cols,
            pawn_positions: PerPlayer::from_array(self.pawns),
            walls: self.walls().collect(),
            walls_remaining: PerPlayer::from_array(self.walls_remaining),
            power_bomb_used: PerPlayer::from_array(self.power_bomb_used),
            turn: self.turn,
            traversal_override: self.traversal_override,
            rules: self.rules,
        }
    }
}

impl TryFrom<BoardSnapshot> for BoardState {
    type Error = BoardError;

    fn try_from(snap: BoardSnapshot) -> Result<Self, Self::Error> {
        BoardState::check_dims(snap.rows, snap.cols)?;
        let pawns = snap.pawn_positions.to_array();
        let mut state = BoardState::empty(
            snap.rows,
            snap.cols,
            pawns,
            snap.walls_remaining.to_array(),
        );
        for &p in &pawns {
            if !state.in_bounds(p) {
                return Err(BoardError::PawnOutOfBounds(p));
            }
        }
        if pawns[0] == pawns[1] {
            return Err(BoardError::PawnsOverlap(pawns[0]));
        }
        for wall in snap.walls {
            if !state.anchor_in_bounds(wall.anchor) {
                return Err(BoardError::InvalidWall(IllegalMoveError::WallOutOfBounds(
                    wall.anchor,
                )));
            }
            let clash = state.walls().any(|w| w.collides(&wall));
            if clash {
                return Err(BoardError::InvalidWall(IllegalMoveError::WallOverlap(
                    wall.anchor,
                )));
            }
            state.insert_wall(wall);
        }
        // A bomb can hand every placed wall back, so bound the total
        for player in Player::BOTH {
            let placed = state.walls().filter(|w| w.owner == player).count() as u32;
            Self::check_inventory(player, state.walls_remaining(player).saturating_add(placed))?;
        }
        state.power_bomb_used = snap.power_bomb_used.to_array();
        state.turn = snap.turn;
        state.traversal_override = snap.traversal_override;
        state.rules = snap.rules;
        for p in Player::BOTH {
            if !path::is_connected(&state, p) {
                return Err(BoardError::Disconnected(p));
            }
        }
        Ok(state)
    }
}

impl From<BoardState> for BoardSnapshot {
    fn from(state: BoardState) -> Self {
        state.snapshot()
    }
}
