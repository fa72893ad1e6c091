//! ZigZag Execution Harness
//!
//! Runs untrusted robot logic against a maze and guarantees that exactly one
//! result record comes out, whatever the logic does.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                         Harness                          │
//! │  MazeGenerator ──► MazeBuilder ──► RobotController       │
//! │                                        │                 │
//! │  ┌─────────────────────────────────────▼──────────────┐  │
//! │  │ spawn_blocking worker: init() + periodic() x N     │  │
//! │  │   every OS access goes through the Sandbox         │  │
//! │  └────────────────────────────────────────────────────┘  │
//! │        ▲ timeout(deadline)                               │
//! │  Supervisor ──► Verdict ──► MazeChannel (written once)   │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use zigzag_sim::{Harness, HarnessConfig, LogicRegistry};
//!
//! let config = HarnessConfig::default().with_deadline_ms(2000);
//! let harness = Harness::new(config);
//! let channel = harness.config().channel();
//! let report = harness.run_named(&LogicRegistry::builtin(), "right_hand", &channel)?;
//! println!("{}", report.verdict.label());
//! ```

mod config;
mod error;
mod exporter;
mod harness;
mod registry;
pub mod robots;
mod verdict;

pub use config::{HarnessConfig, DEFAULT_DEADLINE_MS, DEFAULT_MAX_TICKS};
pub use error::HarnessError;
pub use exporter::{ExportStep, RunExport};
pub use harness::{Harness, RunReport};
pub use registry::LogicRegistry;
pub use verdict::{Verdict, TIMEOUT_MESSAGE};
