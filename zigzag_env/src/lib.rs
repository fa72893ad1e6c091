//! ZigZag Environment Layer
//!
//! Everything a run needs from the outside world lives here, so the maze
//! model and the harness never touch files, sockets or global state
//! directly:
//!
//! - `RunContext`: run-scoped "at most once" flags, cancellation, violations
//! - `MazeChannel`: plain-text input and output protocol
//! - `Sandbox`: capability handle through which robot logic reaches the OS
//!
//! # Example
//!
//! ```ignore
//! use zigzag_env::{MazeChannel, PlaintextChannel, ResultRecord, RunContext};
//!
//! let ctx = RunContext::new(0);
//! let channel = PlaintextChannel::default();
//! let lines = channel.read_lines()?;
//! // ... build the maze, drive the robot ...
//! channel.emit(&ResultRecord::error("An error occurred: no maze"))?;
//! ```

mod channel;
mod context;
mod error;
mod file_impl;
mod memory_impl;
mod sandbox;
mod types;

pub use channel::MazeChannel;
pub use context::RunContext;
pub use error::EnvError;
pub use file_impl::{PlaintextChannel, DEFAULT_INPUT_FILE, DEFAULT_OUTPUT_FILE};
pub use memory_impl::MemoryChannel;
pub use sandbox::{Endpoint, Sandbox, SecurityPolicy, DEFAULT_ARTIFACTS, REFLECTABLE_SYMBOLS};
pub use types::{ResultRecord, RunId, GOAL_MISSED_LINE, GOAL_REACHED_LINE};
