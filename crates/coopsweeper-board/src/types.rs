//! Coordinates, cells, and the game status.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Coord
// ---------------------------------------------------------------------------

/// A cell position. `x` is the column, `y` the row, `(0, 0)` top-left.
///
/// Signed so that out-of-range client input such as `{"x": -1, "y": 0}`
/// still decodes and is then rejected by the board as out of bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coord {
    pub x: i32,
    pub y: i32,
}

impl Coord {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

// ---------------------------------------------------------------------------
// Cell
// ---------------------------------------------------------------------------

/// One square of the board.
///
/// Fields are only writable from inside the engine; everything else reads
/// through the accessors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cell {
    pub(crate) is_mine: bool,
    pub(crate) is_revealed: bool,
    pub(crate) is_flagged: bool,
    pub(crate) is_exploded: bool,
    pub(crate) adjacent_mines: u8,
}

impl Cell {
    pub fn is_mine(&self) -> bool {
        self.is_mine
    }

    pub fn is_revealed(&self) -> bool {
        self.is_revealed
    }

    pub fn is_flagged(&self) -> bool {
        self.is_flagged
    }

    pub fn is_exploded(&self) -> bool {
        self.is_exploded
    }

    /// Number of mines among the (up to) eight neighbors.
    pub fn adjacent_mines(&self) -> u8 {
        self.adjacent_mines
    }
}

// ---------------------------------------------------------------------------
// GameStatus
// ---------------------------------------------------------------------------

/// Outcome of a board.
///
/// Once `Won` or `Lost`, the board accepts no further moves; only a fresh
/// board (room reset) returns to `Playing`.
///
/// On the wire this is the integer code clients already know:
/// `0 = Playing`, `1 = Won`, `2 = Lost`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum GameStatus {
    #[default]
    Playing,
    Won,
    Lost,
}

impl GameStatus {
    /// Returns `true` once the game is won or lost.
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Won | Self::Lost)
    }
}

impl From<GameStatus> for u8 {
    fn from(status: GameStatus) -> Self {
        match status {
            GameStatus::Playing => 0,
            GameStatus::Won => 1,
            GameStatus::Lost => 2,
        }
    }
}

impl TryFrom<u8> for GameStatus {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::Playing),
            1 => Ok(Self::Won),
            2 => Ok(Self::Lost),
            other => Err(format!("unknown game status code {other}")),
        }
    }
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Playing => write!(f, "Playing"),
            Self::Won => write!(f, "Won"),
            Self::Lost => write!(f, "Lost"),
        }
    }
}
