//! ZigZag Core - maze model and robot control
//!
//! The pieces a run is made of:
//! 1. **Layouts**: maze descriptions and their plain-text codec
//! 2. **Generators**: noise, recursive backtracker, wall carver, external input
//! 3. **Maze graph**: immutable linked cells with exactly one goal per run
//! 4. **Controller**: the move/rotate/sense API untrusted logic drives

pub mod controller;
pub mod error;
pub mod generator;
pub mod heading;
pub mod layout;
pub mod maze;
pub mod render;
pub mod robot;

// Re-export key types for convenience
pub use controller::{MoveOutcome, RobotController, RunSummary, SensorReading, TraceEntry};
pub use error::MazeError;
pub use generator::{
    BacktrackerGenerator, ExternalGenerator, MazeGenerator, MazeStrategy, NoiseGenerator,
    WallCarverGenerator,
};
pub use heading::Heading;
pub use layout::{Coord, GridFormat, MazeGrid, MazeLayout, WallMask};
pub use maze::{Cell, CellId, Maze, MazeBuilder};
pub use render::render_ascii;
pub use robot::RobotLogic;
