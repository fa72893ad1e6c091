//! Harness-level errors (everything outside a single run's verdict).

use std::path::PathBuf;
use thiserror::Error;
use zigzag_core::MazeError;
use zigzag_env::EnvError;

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("Failed to build runtime: {0}")]
    Runtime(#[source] std::io::Error),

    #[error("Failed to read config {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write export {path}: {source}")]
    Export {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Env(#[from] EnvError),

    #[error(transparent)]
    Maze(#[from] MazeError),
}
