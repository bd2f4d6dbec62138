//! Board configuration and difficulty presets.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::BoardError;

/// Largest accepted width or height.
///
/// Room creation takes its config straight from a client message, so the
/// grid size needs an upper bound.
pub const MAX_DIMENSION: u32 = 128;

// ---------------------------------------------------------------------------
// BoardConfig
// ---------------------------------------------------------------------------

/// Dimensions and mine count of a board.
///
/// Serializes as `{ "width": 8, "height": 8, "mines": 10 }`, which is also
/// the shape clients send when creating a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoardConfig {
    /// Number of columns.
    pub width: u32,
    /// Number of rows.
    pub height: u32,
    /// Number of mines. Must be strictly less than `width * height`.
    pub mines: u32,
}

impl BoardConfig {
    /// 8×8 with 10 mines.
    pub const EASY: Self = Self::new(8, 8, 10);
    /// 16×16 with 40 mines.
    pub const MEDIUM: Self = Self::new(16, 16, 40);
    /// 24×24 with 99 mines.
    pub const HARD: Self = Self::new(24, 24, 99);

    /// Creates a config. Validation happens in [`validate`](Self::validate).
    pub const fn new(width: u32, height: u32, mines: u32) -> Self {
        Self {
            width,
            height,
            mines,
        }
    }

    /// Total number of cells on the board.
    pub fn cell_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Number of cells without a mine.
    pub fn safe_cell_count(&self) -> usize {
        self.cell_count().saturating_sub(self.mines as usize)
    }

    /// Checks that this config describes a playable board.
    ///
    /// # Errors
    /// [`BoardError::InvalidConfig`] if a side is zero or larger than
    /// [`MAX_DIMENSION`], or if there is not at least one safe cell.
    pub fn validate(&self) -> Result<(), BoardError> {
        if self.width == 0 || self.height == 0 {
            return Err(BoardError::InvalidConfig(format!(
                "dimensions must be positive, got {}x{}",
                self.width, self.height
            )));
        }
        if self.width > MAX_DIMENSION || self.height > MAX_DIMENSION {
            return Err(BoardError::InvalidConfig(format!(
                "dimensions must be at most {MAX_DIMENSION}, got {}x{}",
                self.width, self.height
            )));
        }
        if self.mines as usize >= self.cell_count() {
            return Err(BoardError::InvalidConfig(format!(
                "{} mines do not fit on a {}x{} board",
                self.mines, self.width, self.height
            )));
        }
        Ok(())
    }

    /// Classifies this config by its dimensions.
    ///
    /// Best-time bookkeeping is keyed by difficulty. Any size other than
    /// the three presets counts as [`Difficulty::Custom`].
    pub fn difficulty(&self) -> Difficulty {
        match (self.width, self.height) {
            (8, 8) => Difficulty::Easy,
            (16, 16) => Difficulty::Medium,
            (24, 24) => Difficulty::Hard,
            _ => Difficulty::Custom,
        }
    }
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self::EASY
    }
}

impl fmt::Display for BoardConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}/{}", self.width, self.height, self.mines)
    }
}

// ---------------------------------------------------------------------------
// Difficulty
// ---------------------------------------------------------------------------

/// Difficulty bucket of a board, derived from its size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
    Custom,
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Easy => write!(f, "easy"),
            Self::Medium => write!(f, "medium"),
            Self::Hard => write!(f, "hard"),
            Self::Custom => write!(f, "custom"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_presets_ok() {
        assert!(BoardConfig::EASY.validate().is_ok());
        assert!(BoardConfig::MEDIUM.validate().is_ok());
        assert!(BoardConfig::HARD.validate().is_ok());
    }

    #[test]
    fn test_validate_zero_dimension_rejected() {
        assert!(BoardConfig::new(0, 8, 0).validate().is_err());
        assert!(BoardConfig::new(8, 0, 0).validate().is_err());
    }

    #[test]
    fn test_validate_too_many_mines_rejected() {
        let err = BoardConfig::new(2, 2, 4).validate().unwrap_err();
        assert!(matches!(err, BoardError::InvalidConfig(_)));
        assert!(BoardConfig::new(2, 2, 3).validate().is_ok());
    }

    #[test]
    fn test_validate_zero_mines_ok() {
        assert!(BoardConfig::new(3, 3, 0).validate().is_ok());
    }

    #[test]
    fn test_validate_oversized_rejected() {
        let config = BoardConfig::new(MAX_DIMENSION + 1, 4, 1);
        assert!(config.validate().is_err());
        assert!(BoardConfig::new(MAX_DIMENSION, 4, 1).validate().is_ok());
    }

    #[test]
    fn test_difficulty_matches_presets() {
        assert_eq!(BoardConfig::EASY.difficulty(), Difficulty::Easy);
        assert_eq!(BoardConfig::MEDIUM.difficulty(), Difficulty::Medium);
        assert_eq!(BoardConfig::HARD.difficulty(), Difficulty::Hard);
        assert_eq!(BoardConfig::new(8, 8, 3).difficulty(), Difficulty::Easy);
        assert_eq!(
            BoardConfig::new(10, 8, 10).difficulty(),
            Difficulty::Custom
        );
    }

    #[test]
    fn test_config_json_shape() {
        let json = serde_json::to_value(BoardConfig::EASY).unwrap();
        assert_eq!(json, serde_json::json!({"width": 8, "height": 8, "mines": 10}));
    }

    #[test]
    fn test_difficulty_serializes_lowercase() {
        let json = serde_json::to_string(&Difficulty::Hard).unwrap();
        assert_eq!(json, "\"hard\"");
        assert_eq!(Difficulty::Custom.to_string(), "custom");
    }
}
