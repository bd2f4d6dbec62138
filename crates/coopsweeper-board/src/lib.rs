//! Minesweeper board engine for Coopsweeper.
//!
//! A [`Board`] is a pure state machine: it knows about mines, reveals and
//! flags, and nothing about players, rooms, or networking. The room layer
//! owns one board per room and drives it from player events.
//!
//! # Key types
//!
//! - [`Board`] — the engine: `click`, `flag`, `snapshot`
//! - [`BoardConfig`] — width, height, mine count (plus difficulty presets)
//! - [`BoardView`] / [`CellView`] — the client-safe projection of a board
//! - [`GameStatus`] — `Playing → Won | Lost`, only left by building a new board
//!
//! # Example
//!
//! ```rust
//! use coopsweeper_board::{Board, BoardConfig, Coord, GameStatus};
//!
//! let mut board = Board::new(BoardConfig::EASY).unwrap();
//!
//! // The first click never hits a mine.
//! let cleared = board.click(Coord::new(3, 3));
//! assert!(cleared > 0);
//! assert_ne!(board.status(), GameStatus::Lost);
//! ```

mod board;
mod config;
mod error;
mod types;
mod view;

pub use board::Board;
pub use config::{BoardConfig, Difficulty, MAX_DIMENSION};
pub use error::BoardError;
pub use types::{Cell, Coord, GameStatus};
pub use view::{BoardView, CellView};
