// Core game types shared by the board model, move generator and search
//
// Coordinates are (row, col) with row 0 at the top of the board.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 2D coordinate on the board
#[derive(Deserialize, Serialize, Debug, PartialEq, Eq, Clone, Copy, Hash, PartialOrd, Ord)]
pub struct Coord {
    pub row: i32,
    pub col: i32,
}

impl Coord {
    pub const fn new(row: i32, col: i32) -> Self {
        Coord { row, col }
    }

    /// Calculates Manhattan distance between two coordinates
    pub fn manhattan(&self, other: &Coord) -> i32 {
        (self.row - other.row).abs() + (self.col - other.col).abs()
    }

    /// Returns the neighbouring coordinate in the given direction (may be off-board)
    pub fn step(&self, dir: Direction) -> Coord {
        let (dr, dc) = dir.delta();
        Coord {
            row: self.row + dr,
            col: self.col + dc,
        }
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// The four orthogonal movement directions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    North,
    South,
    East,
    West,
}

const OPPOSITE: [Direction; 4] = [
    Direction::South,
    Direction::North,
    Direction::West,
    Direction::East,
];

const DELTA: [(i32, i32); 4] = [(-1, 0), (1, 0), (0, 1), (0, -1)];

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
    ];

    fn index(self) -> usize {
        match self {
            Direction::North => 0,
            Direction::South => 1,
            Direction::East => 2,
            Direction::West => 3,
        }
    }

    pub fn opposite(self) -> Direction {
        OPPOSITE[self.index()]
    }

    /// (row, col) offset of one step in this direction
    pub fn delta(self) -> (i32, i32) {
        DELTA[self.index()]
    }

    /// The two directions perpendicular to this one
    pub fn perpendicular(self) -> [Direction; 2] {
        match self {
            Direction::North | Direction::South => [Direction::West, Direction::East],
            Direction::East | Direction::West => [Direction::North, Direction::South],
        }
    }
}

/// Player identifier. `A` always moves first from a fresh board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub enum Player {
    A,
    B,
}

impl Player {
    pub const BOTH: [Player; 2] = [Player::A, Player::B];

    pub fn index(self) -> usize {
        match self {
            Player::A => 0,
            Player::B => 1,
        }
    }

    pub fn opponent(self) -> Player {
        match self {
            Player::A => Player::B,
            Player::B => Player::A,
        }
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Player::A => write!(f, "A"),
            Player::B => write!(f, "B"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Horizontal,
    Vertical,
}

/// A wall segment spanning two cells.
///
/// The anchor is the top-left cell of the 2x2 block the wall sits in. A
/// horizontal wall at `(r, c)` separates rows `r` and `r + 1` across columns
/// `c` and `c + 1`; a vertical wall at `(r, c)` separates columns `c` and
/// `c + 1` across rows `r` and `r + 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Wall {
    pub orientation: Orientation,
    pub anchor: Coord,
    pub owner: Player,
}

impl Wall {
    /// The four cells whose mutual edges this wall touches
    pub fn footprint(&self) -> [Coord; 4] {
        let Coord { row, col } = self.anchor;
        [
            Coord::new(row, col),
            Coord::new(row, col + 1),
            Coord::new(row + 1, col),
            Coord::new(row + 1, col + 1),
        ]
    }

    /// Whether two walls overlap or cross, regardless of owner
    pub fn collides(&self, other: &Wall) -> bool {
        if self.anchor == other.anchor {
            return true;
        }
        if self.orientation != other.orientation {
            return false;
        }
        match self.orientation {
            Orientation::Horizontal => {
                self.anchor.row == other.anchor.row
                    && (self.anchor.col - other.anchor.col).abs() == 1
            }
            Orientation::Vertical => {
                self.anchor.col == other.anchor.col
                    && (self.anchor.row - other.anchor.row).abs() == 1
            }
        }
    }
}

/// A single turn action. Moves are plain data; the board applies them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Move {
    PawnMove { target: Coord },
    PlaceWall { orientation: Orientation, anchor: Coord },
    PowerBomb,
}

impl Move {
    pub fn is_pawn_move(&self) -> bool {
        matches!(self, Move::PawnMove { .. })
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Move::PawnMove { target } => write!(f, "pawn->{}", target),
            Move::PlaceWall {
                orientation: Orientation::Horizontal,
                anchor,
            } => write!(f, "hwall@{}", anchor),
            Move::PlaceWall {
                orientation: Orientation::Vertical,
                anchor,
            } => write!(f, "vwall@{}", anchor),
            Move::PowerBomb => write!(f, "bomb"),
        }
    }
}

/// Compact notation used by the command-line tools:
/// `p<row>.<col>` pawn move, `h<row>.<col>` / `v<row>.<col>` wall, `bomb`.
impl FromStr for Move {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        if s == "bomb" {
            return Ok(Move::PowerBomb);
        }
        let mut chars = s.chars();
        let kind = chars.next().ok_or("Empty move")?;
        let (row, col) = chars
            .as_str()
            .split_once('.')
            .ok_or_else(|| format!("Invalid move '{}': expected <kind><row>.<col>", s))?;
        let at = Coord::new(
            row.parse().map_err(|e| format!("Invalid row in '{}': {}", s, e))?,
            col.parse().map_err(|e| format!("Invalid column in '{}': {}", s, e))?,
        );
        match kind {
            'p' => Ok(Move::PawnMove { target: at }),
            'h' => Ok(Move::PlaceWall {
                orientation: Orientation::Horizontal,
                anchor: at,
            }),
            'v' => Ok(Move::PlaceWall {
                orientation: Orientation::Vertical,
                anchor: at,
            }),
            _ => Err(format!("Invalid move kind '{}' in '{}'", kind, s)),
        }
    }
}
