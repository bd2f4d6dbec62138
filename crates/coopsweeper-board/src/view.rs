//! Client-safe projection of a board.
//!
//! While a game is running, clients must not learn where the mines are or
//! what an unrevealed cell's number is. The view types carry `Option`s for
//! exactly those fields; the engine fills them only when allowed.

use serde::{Deserialize, Serialize};

use crate::GameStatus;

/// What a client may know about one cell.
///
/// ```json
/// { "isRevealed": true, "isFlagged": false, "isExploded": false,
///   "adjMines": 2, "isMine": null }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellView {
    pub is_revealed: bool,
    pub is_flagged: bool,
    pub is_exploded: bool,
    /// Adjacent mine count, `None` until the cell is revealed.
    pub adj_mines: Option<u8>,
    /// Mine flag, `None` while the game is still being played.
    pub is_mine: Option<bool>,
}

/// Snapshot of a whole board. `cells[y][x]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardView {
    pub cells: Vec<Vec<CellView>>,
    pub status: GameStatus,
    pub flags_left: u32,
    /// Milliseconds since the first click (0 before it); frozen once the
    /// game is over.
    pub elapsed_ms: u64,
}

impl BoardView {
    /// Number of columns.
    pub fn width(&self) -> usize {
        self.cells.first().map_or(0, Vec::len)
    }

    /// Number of rows.
    pub fn height(&self) -> usize {
        self.cells.len()
    }

    /// Returns the cell at `(x, y)`, if in bounds.
    pub fn cell(&self, x: usize, y: usize) -> Option<&CellView> {
        self.cells.get(y).and_then(|row| row.get(x))
    }
}
