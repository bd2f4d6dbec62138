//! The board state machine.

use std::iter;
use std::time::{Duration, Instant};

use rand::Rng;
use rand::seq::index;

use crate::{BoardConfig, BoardError, BoardView, Cell, CellView, Coord, GameStatus};

/// One Minesweeper board.
///
/// Cells are stored row-major, `index = y * width + x`. All mutation goes
/// through [`click`](Self::click) and [`flag`](Self::flag); neither can
/// fail; an illegal move just reports that nothing happened.
#[derive(Debug, Clone)]
pub struct Board {
    config: BoardConfig,
    cells: Vec<Cell>,
    status: GameStatus,
    flags_remaining: u32,
    revealed: usize,
    started_at: Option<Instant>,
    finished_at: Option<Instant>,
}

impl Board {
    /// Creates a board with mines placed uniformly at random.
    ///
    /// # Errors
    /// [`BoardError::InvalidConfig`] if `config` does not validate.
    pub fn new(config: BoardConfig) -> Result<Self, BoardError> {
        Self::with_rng(config, &mut rand::rng())
    }

    /// Creates a board drawing the mine layout from `rng`.
    ///
    /// # Errors
    /// [`BoardError::InvalidConfig`] if `config` does not validate.
    pub fn with_rng<R: Rng + ?Sized>(
        config: BoardConfig,
        rng: &mut R,
    ) -> Result<Self, BoardError> {
        config.validate()?;

        let mut board = Self::empty(config);
        for index in index::sample(rng, board.cells.len(), config.mines as usize) {
            board.cells[index].is_mine = true;
        }
        board.recount_adjacency();
        Ok(board)
    }

    /// Creates a board with mines at exactly the given coordinates.
    ///
    /// # Errors
    /// [`BoardError::InvalidConfig`] if `config` does not validate, if the
    /// number of coordinates differs from `config.mines`, or if a
    /// coordinate is out of bounds or repeated.
    pub fn with_mines(config: BoardConfig, mines: &[Coord]) -> Result<Self, BoardError> {
        config.validate()?;
        if mines.len() != config.mines as usize {
            return Err(BoardError::InvalidConfig(format!(
                "expected {} mine positions, got {}",
                config.mines,
                mines.len()
            )));
        }

        let mut board = Self::empty(config);
        for &coord in mines {
            let index = board.index_of(coord).ok_or_else(|| {
                BoardError::InvalidConfig(format!("mine at {coord} is out of bounds"))
            })?;
            if board.cells[index].is_mine {
                return Err(BoardError::InvalidConfig(format!(
                    "duplicate mine at {coord}"
                )));
            }
            board.cells[index].is_mine = true;
        }
        board.recount_adjacency();
        Ok(board)
    }

    fn empty(config: BoardConfig) -> Self {
        Self {
            config,
            cells: vec![Cell::default(); config.cell_count()],
            status: GameStatus::Playing,
            flags_remaining: config.mines,
            revealed: 0,
            started_at: None,
            finished_at: None,
        }
    }

    // -----------------------------------------------------------------------
    // Moves
    // -----------------------------------------------------------------------

    /// Left-click at `coord`. Returns the number of newly revealed cells.
    ///
    /// - Unrevealed safe cell: flood-fill reveal.
    /// - Mine: explode, the game is lost.
    /// - Revealed number: chord, if the flagged neighbors match the number.
    ///
    /// The very first click of a game never hits a mine: mines on and
    /// around the target are moved away first.
    ///
    /// Does nothing (returns 0) when the game is over, the target is out
    /// of bounds, or the target is flagged.
    pub fn click(&mut self, coord: Coord) -> u32 {
        if self.status != GameStatus::Playing {
            return 0;
        }
        let Some(index) = self.index_of(coord) else {
            return 0;
        };
        if self.cells[index].is_flagged {
            return 0;
        }

        if self.started_at.is_none() {
            self.started_at = Some(Instant::now());
            self.clear_opening(index);
        }

        let cell = self.cells[index];
        let cleared = if cell.is_mine {
            self.explode(index);
            0
        } else if !cell.is_revealed {
            self.flood_reveal(index)
        } else if cell.adjacent_mines > 0 {
            self.chord(index)
        } else {
            0
        };

        if self.status == GameStatus::Playing && self.revealed == self.config.safe_cell_count() {
            self.status = GameStatus::Won;
            self.finished_at = Some(Instant::now());
            tracing::debug!(elapsed_ms = self.elapsed().as_millis(), "board cleared");
        }
        cleared
    }

    /// Right-click at `coord`: toggles the flag. Returns whether it changed.
    ///
    /// Removing a flag always works. Placing one fails once every flag is
    /// in use. Revealed cells cannot be flagged.
    pub fn flag(&mut self, coord: Coord) -> bool {
        if self.status != GameStatus::Playing {
            return false;
        }
        let Some(index) = self.index_of(coord) else {
            return false;
        };

        let cell = &mut self.cells[index];
        if cell.is_revealed {
            false
        } else if cell.is_flagged {
            cell.is_flagged = false;
            self.flags_remaining += 1;
            true
        } else if self.flags_remaining == 0 {
            false
        } else {
            cell.is_flagged = true;
            self.flags_remaining -= 1;
            true
        }
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    /// Moves mines off the first-click target and its neighbors.
    ///
    /// Each mine in the zone goes to the first free cell outside it, in
    /// row-major order. On a board too dense for that, a mine on the target
    /// itself goes to the first free cell anywhere else; a neighbor mine
    /// stays put.
    fn clear_opening(&mut self, target: usize) {
        let (width, height) = self.dims();
        let zone: Vec<usize> = iter::once(target)
            .chain(neighbor_indices(width, height, target))
            .collect();

        let mut moved = false;
        for &index in &zone {
            if !self.cells[index].is_mine {
                continue;
            }
            let destination = self
                .first_free_cell(|i| !zone.contains(&i))
                .or_else(|| {
                    if index == target {
                        self.first_free_cell(|i| i != target)
                    } else {
                        None
                    }
                });
            match destination {
                Some(dest) => {
                    self.cells[index].is_mine = false;
                    self.cells[dest].is_mine = true;
                    moved = true;
                }
                None => {
                    tracing::debug!(index, "no free cell to move neighbor mine to");
                }
            }
        }

        if moved {
            self.recount_adjacency();
        }
    }

    fn first_free_cell(&self, allowed: impl Fn(usize) -> bool) -> Option<usize> {
        (0..self.cells.len()).find(|&i| !self.cells[i].is_mine && allowed(i))
    }

    /// Reveals `start` and spreads through zero cells. Flags in the way are
    /// taken back.
    fn flood_reveal(&mut self, start: usize) -> u32 {
        let (width, height) = self.dims();
        let mut worklist = vec![start];
        let mut cleared = 0;

        while let Some(index) = worklist.pop() {
            let cell = &mut self.cells[index];
            if cell.is_revealed || cell.is_mine {
                continue;
            }
            if cell.is_flagged {
                cell.is_flagged = false;
                self.flags_remaining += 1;
            }
            cell.is_revealed = true;
            cleared += 1;

            if cell.adjacent_mines == 0 {
                worklist.extend(neighbor_indices(width, height, index));
            }
        }

        self.revealed += cleared as usize;
        cleared
    }

    fn chord(&mut self, index: usize) -> u32 {
        let (width, height) = self.dims();
        let neighbors: Vec<usize> = neighbor_indices(width, height, index).collect();
        let flagged = neighbors
            .iter()
            .filter(|&&n| self.cells[n].is_flagged)
            .count();
        if flagged != usize::from(self.cells[index].adjacent_mines) {
            return 0;
        }

        let mut cleared = 0;
        for n in neighbors {
            let cell = self.cells[n];
            if cell.is_flagged || cell.is_revealed {
                continue;
            }
            if cell.is_mine {
                self.explode(n);
                break;
            }
            cleared += self.flood_reveal(n);
        }
        cleared
    }

    fn explode(&mut self, index: usize) {
        self.cells[index].is_exploded = true;
        self.status = GameStatus::Lost;
        self.finished_at = Some(Instant::now());
        tracing::debug!(index, "mine exploded");
    }

    fn recount_adjacency(&mut self) {
        let (width, height) = self.dims();
        for i in 0..self.cells.len() {
            let count = neighbor_indices(width, height, i)
                .filter(|&n| self.cells[n].is_mine)
                .count();
            self.cells[i].adjacent_mines = count as u8;
        }
    }

    fn dims(&self) -> (usize, usize) {
        (self.config.width as usize, self.config.height as usize)
    }

    fn index_of(&self, coord: Coord) -> Option<usize> {
        let (width, height) = self.dims();
        let x = usize::try_from(coord.x).ok()?;
        let y = usize::try_from(coord.y).ok()?;
        (x < width && y < height).then_some(y * width + x)
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Client-safe view of the board.
    ///
    /// Adjacent counts are only shown for revealed cells, and mine
    /// positions only once the game is over.
    pub fn snapshot(&self) -> BoardView {
        let show_mines = self.status != GameStatus::Playing;
        let cells = self
            .cells
            .chunks(self.config.width as usize)
            .map(|row| {
                row.iter()
                    .map(|cell| CellView {
                        is_revealed: cell.is_revealed,
                        is_flagged: cell.is_flagged,
                        is_exploded: cell.is_exploded,
                        adj_mines: cell.is_revealed.then_some(cell.adjacent_mines),
                        is_mine: show_mines.then_some(cell.is_mine),
                    })
                    .collect()
            })
            .collect();

        BoardView {
            cells,
            status: self.status,
            flags_left: self.flags_remaining,
            elapsed_ms: u64::try_from(self.elapsed().as_millis()).unwrap_or(u64::MAX),
        }
    }

    pub fn config(&self) -> BoardConfig {
        self.config
    }

    pub fn status(&self) -> GameStatus {
        self.status
    }

    pub fn flags_remaining(&self) -> u32 {
        self.flags_remaining
    }

    /// Returns the cell at `coord`, or `None` if out of bounds.
    pub fn cell(&self, coord: Coord) -> Option<&Cell> {
        self.index_of(coord).map(|i| &self.cells[i])
    }

    /// Whether the first click has happened.
    pub fn is_started(&self) -> bool {
        self.started_at.is_some()
    }

    /// Time since the first click; stops counting when the game ends.
    pub fn elapsed(&self) -> Duration {
        match (self.started_at, self.finished_at) {
            (None, _) => Duration::ZERO,
            (Some(start), Some(end)) => end.duration_since(start),
            (Some(start), None) => start.elapsed(),
        }
    }

    pub fn revealed_count(&self) -> usize {
        self.revealed
    }

    /// Coordinates of every mine, row-major.
    pub fn mine_positions(&self) -> Vec<Coord> {
        let width = self.config.width as usize;
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, cell)| cell.is_mine)
            .map(|(i, _)| Coord::new((i % width) as i32, (i / width) as i32))
            .collect()
    }
}

/// In-bounds neighbors of `index`, row-major.
fn neighbor_indices(width: usize, height: usize, index: usize) -> impl Iterator<Item = usize> {
    let x = (index % width) as isize;
    let y = (index / width) as isize;
    (-1isize..=1)
        .flat_map(|dy| (-1isize..=1).map(move |dx| (dx, dy)))
        .filter(|&(dx, dy)| dx != 0 || dy != 0)
        .filter_map(move |(dx, dy)| {
            let (nx, ny) = (x + dx, y + dy);
            let in_bounds =
                nx >= 0 && ny >= 0 && (nx as usize) < width && (ny as usize) < height;
            in_bounds.then(|| ny as usize * width + nx as usize)
        })
}
