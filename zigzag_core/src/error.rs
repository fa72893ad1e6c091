//! Errors raised while describing, building or generating a maze.

use thiserror::Error;
use zigzag_env::EnvError;

/// Maze construction and generation errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MazeError {
    #[error("Malformed maze description at line {line}: {reason}")]
    Malformed { line: usize, reason: String },

    #[error("Coordinate ({x}, {y}) is outside the {cols}x{rows} maze")]
    OutOfBounds { x: i64, y: i64, cols: usize, rows: usize },

    #[error("Start position ({x}, {y}) is not an open cell")]
    StartBlocked { x: usize, y: usize },

    #[error("Generation failed: {0}")]
    Generation(String),

    #[error(transparent)]
    Env(#[from] EnvError),
}

impl MazeError {
    pub fn malformed(line: usize, reason: impl Into<String>) -> Self {
        Self::Malformed {
            line,
            reason: reason.into(),
        }
    }

    /// True for integrity violations (second goal, rebinding).
    pub fn is_illegal_action(&self) -> bool {
        matches!(self, Self::Env(EnvError::IllegalAction(_)))
    }
}
