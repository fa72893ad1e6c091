//! The robot controller: the only API robot logic has to the maze.
//!
//! The controller owns the agent state (heading, current cell, move count)
//! and the run trace. Logic never sees the `Maze` itself; it moves, rotates
//! and queries sensors relative to its own heading.

use crate::heading::Heading;
use crate::layout::Coord;
use crate::maze::{CellId, Maze};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};
use zigzag_env::{EnvError, MazeChannel, ResultRecord, RunContext, Sandbox};

/// What a sensor sees in one direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SensorReading {
    /// No cell there
    Wall,
    /// An ordinary cell
    Space,
    /// The goal cell
    Goal,
}

impl SensorReading {
    pub fn label(&self) -> &'static str {
        match self {
            SensorReading::Wall => "WALL",
            SensorReading::Space => "SPACE",
            SensorReading::Goal => "GOAL",
        }
    }

    /// True if the agent could move there.
    pub fn is_open(&self) -> bool {
        !matches!(self, SensorReading::Wall)
    }
}

impl fmt::Display for SensorReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Result of a move attempt. Being blocked is not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MoveOutcome {
    Moved,
    Blocked,
}

impl MoveOutcome {
    pub fn is_moved(&self) -> bool {
        matches!(self, MoveOutcome::Moved)
    }
}

/// One `<orientation> <x> <y>` line of the trace (state after the action).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceEntry {
    pub heading: Heading,
    pub x: usize,
    pub y: usize,
}

impl fmt::Display for TraceEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.heading.index(), self.x, self.y)
    }
}

/// Final state of a run, returned by `finalize_run`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub moves: u64,
    pub reached_goal: bool,
    pub position: Option<Coord>,
    pub heading: Heading,
    /// Trace entries, not counting the goal marker line
    pub actions: usize,
}

/// Agent state bound to exactly one maze per run.
#[derive(Debug)]
pub struct RobotController {
    maze: Option<Arc<Maze>>,
    current: Option<CellId>,
    heading: Heading,

    /// Successful moves plus rotations
    moves: u64,

    trace: Vec<TraceEntry>,

    /// Human-readable log, one line per action
    narrative: Vec<String>,

    context: RunContext,
    sandbox: Sandbox,
}

impl RobotController {
    /// Creates an unbound controller for the run behind `context`.
    pub fn new(context: RunContext, sandbox: Sandbox) -> Self {
        Self {
            maze: None,
            current: None,
            heading: Heading::North,
            moves: 0,
            trace: Vec::new(),
            narrative: Vec::new(),
            context,
            sandbox,
        }
    }

    /// Binds the controller to its maze and records the starting state.
    ///
    /// Only the first call in a run succeeds. Later calls fail with
    /// `IllegalAction` and flag the run as violated.
    pub fn initialize(&mut self, maze: Arc<Maze>) -> Result<(), EnvError> {
        if let Err(err) = self.context.bind_controller() {
            warn!(run = %self.context.run_id(), "Rejected controller rebind: {}", err);
            self.context.record_violation(&err);
            return Err(err);
        }

        self.current = Some(maze.start());
        self.maze = Some(maze);
        self.record_trace();
        if let Some(position) = self.position() {
            debug!(run = %self.context.run_id(), "Robot starts at {} facing {}", position, self.heading);
        }
        Ok(())
    }

    pub fn is_bound(&self) -> bool {
        self.maze.is_some()
    }

    pub fn moves(&self) -> u64 {
        self.moves
    }

    pub fn heading(&self) -> Heading {
        self.heading
    }

    /// Coordinates of the agent's current cell.
    pub fn position(&self) -> Option<Coord> {
        let maze = self.maze.as_ref()?;
        maze.cell(self.current?).map(|cell| cell.coord())
    }

    pub fn trace(&self) -> &[TraceEntry] {
        &self.trace
    }

    pub fn trace_lines(&self) -> Vec<String> {
        self.trace.iter().map(TraceEntry::to_string).collect()
    }

    pub fn narrative(&self) -> &[String] {
        &self.narrative
    }

    /// Capability handle for file, network and process access.
    pub fn sandbox(&self) -> &Sandbox {
        &self.sandbox
    }

    /// True once the harness gave up on this run.
    pub fn is_cancelled(&self) -> bool {
        self.context.is_cancelled()
    }

    /// True if the agent stands on the goal.
    pub fn on_goal(&self) -> bool {
        self.query_below_sensor() == SensorReading::Goal
    }

    pub fn move_forward(&mut self) -> MoveOutcome {
        self.step(self.heading, "MOVE FORWARDS")
    }

    pub fn move_backward(&mut self) -> MoveOutcome {
        self.step(self.heading.opposite(), "MOVE BACKWARDS")
    }

    pub fn rotate_clockwise(&mut self) {
        self.rotate(self.heading.clockwise(), "ROTATE CLOCKWISE");
    }

    pub fn rotate_counter_clockwise(&mut self) {
        self.rotate(self.heading.counter_clockwise(), "ROTATE COUNTER-CLOCKWISE");
    }

    pub fn query_front_sensor(&self) -> SensorReading {
        self.read(self.heading)
    }

    pub fn query_right_sensor(&self) -> SensorReading {
        self.read(self.heading.turned(1))
    }

    pub fn query_back_sensor(&self) -> SensorReading {
        self.read(self.heading.turned(2))
    }

    pub fn query_left_sensor(&self) -> SensorReading {
        self.read(self.heading.turned(3))
    }

    /// Reading for the current cell: `Space` or `Goal`, `Wall` when unbound.
    pub fn query_below_sensor(&self) -> SensorReading {
        match (&self.maze, self.current) {
            (Some(maze), Some(id)) => match maze.cell(id) {
                Some(cell) if cell.is_goal() => SensorReading::Goal,
                Some(_) => SensorReading::Space,
                None => SensorReading::Wall,
            },
            _ => SensorReading::Wall,
        }
    }

    /// Appends the goal marker and writes the trace through `channel`.
    pub fn finalize_run(&mut self, channel: &dyn MazeChannel) -> Result<RunSummary, EnvError> {
        let summary = self.summary();
        let record = ResultRecord::Trace {
            lines: self.trace_lines(),
            reached_goal: summary.reached_goal,
        };
        channel.emit(&record)?;

        info!(
            run = %self.context.run_id(),
            "Run finished after {} moves, goal reached: {}",
            summary.moves,
            summary.reached_goal
        );
        Ok(summary)
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            moves: self.moves,
            reached_goal: self.on_goal(),
            position: self.position(),
            heading: self.heading,
            actions: self.trace.len(),
        }
    }

    fn read(&self, heading: Heading) -> SensorReading {
        let (Some(maze), Some(id)) = (&self.maze, self.current) else {
            return SensorReading::Wall;
        };
        match maze.neighbor(id, heading).and_then(|next| maze.cell(next)) {
            Some(cell) if cell.is_goal() => SensorReading::Goal,
            Some(_) => SensorReading::Space,
            None => SensorReading::Wall,
        }
    }

    /// Actions are dropped before binding and after cancellation.
    fn accepts_actions(&self, action: &str) -> bool {
        if !self.is_bound() {
            warn!(run = %self.context.run_id(), "{} ignored: controller is not initialized", action);
            return false;
        }
        !self.context.is_cancelled()
    }

    fn step(&mut self, direction: Heading, action: &str) -> MoveOutcome {
        if !self.accepts_actions(action) {
            return MoveOutcome::Blocked;
        }

        let next = match (&self.maze, self.current) {
            (Some(maze), Some(id)) => maze.neighbor(id, direction),
            _ => None,
        };
        let outcome = match next {
            Some(next) => {
                self.current = Some(next);
                self.moves += 1;
                MoveOutcome::Moved
            }
            None => MoveOutcome::Blocked,
        };

        let status = if outcome.is_moved() { "SUCCESS" } else { "FAIL" };
        self.record(action, status);
        outcome
    }

    fn rotate(&mut self, heading: Heading, action: &str) {
        if !self.accepts_actions(action) {
            return;
        }
        self.heading = heading;
        self.moves += 1;
        self.record(action, "SUCCESS");
    }

    fn record(&mut self, action: &str, status: &str) {
        let position = self.position().unwrap_or(Coord::new(0, 0));
        let line = format!("{} - {} -> {} {}", action, status, self.heading, position);
        debug!(run = %self.context.run_id(), "{}", line);
        self.narrative.push(line);
        self.record_trace();
    }

    fn record_trace(&mut self) {
        if let Some(position) = self.position() {
            self.trace.push(TraceEntry {
                heading: self.heading,
                x: position.x,
                y: position.y,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{GridFormat, MazeLayout};
    use crate::maze::MazeBuilder;
    use zigzag_env::{MemoryChannel, SecurityPolicy};

    const RING: &str = "3 3\n1 1 1\n1 0 1\n1 1 1\n0 0\n2 2\n";

    fn bound_controller(text: &str) -> (RobotController, RunContext) {
        let ctx = RunContext::new(0);
        let layout = MazeLayout::parse_str(text, GridFormat::Auto).unwrap();
        let maze = Arc::new(MazeBuilder::from_layout(&layout, &ctx).unwrap());
        let sandbox = Sandbox::new(SecurityPolicy::default(), ctx.clone());
        let mut rc = RobotController::new(ctx.clone(), sandbox);
        rc.initialize(maze).unwrap();
        (rc, ctx)
    }

    #[test]
    fn test_initialize_records_start() {
        let (rc, _) = bound_controller(RING);
        assert_eq!(rc.position(), Some(Coord::new(0, 0)));
        assert_eq!(rc.heading(), Heading::North);
        assert_eq!(rc.trace_lines(), vec!["0 0 0"]);
        assert_eq!(rc.moves(), 0);
    }

    #[test]
    fn test_second_initialize_is_illegal() {
        let (mut rc, ctx) = bound_controller(RING);

        let other_ctx = RunContext::new(1);
        let layout = MazeLayout::parse_str(RING, GridFormat::Auto).unwrap();
        let other = Arc::new(MazeBuilder::from_layout(&layout, &other_ctx).unwrap());

        let err = rc.initialize(other).unwrap_err();
        assert!(matches!(err, EnvError::IllegalAction(_)));
        assert!(ctx.has_violation());
        assert_eq!(rc.trace().len(), 1);
    }

    #[test]
    fn test_blocked_move_keeps_position() {
        let (mut rc, _) = bound_controller(RING);

        // Facing north from the top-left corner
        assert_eq!(rc.query_front_sensor(), SensorReading::Wall);
        assert_eq!(rc.move_forward(), MoveOutcome::Blocked);

        assert_eq!(rc.position(), Some(Coord::new(0, 0)));
        assert_eq!(rc.moves(), 0);
        assert_eq!(rc.trace_lines(), vec!["0 0 0", "0 0 0"]);
        assert_eq!(rc.narrative().last().unwrap(), "MOVE FORWARDS - FAIL -> NORTH (0, 0)");
    }

    #[test]
    fn test_open_move_reaches_neighbor() {
        let (mut rc, _) = bound_controller(RING);
        rc.rotate_clockwise();

        assert_eq!(rc.query_front_sensor(), SensorReading::Space);
        assert_eq!(rc.move_forward(), MoveOutcome::Moved);

        assert_eq!(rc.position(), Some(Coord::new(1, 0)));
        assert_eq!(rc.moves(), 2);
        assert_eq!(rc.trace_lines(), vec!["0 0 0", "1 0 0", "1 1 0"]);
        assert_eq!(rc.narrative()[0], "ROTATE CLOCKWISE - SUCCESS -> EAST (0, 0)");
        assert_eq!(rc.narrative()[1], "MOVE FORWARDS - SUCCESS -> EAST (1, 0)");
    }

    #[test]
    fn test_move_backward_uses_opposite_heading() {
        let (mut rc, _) = bound_controller(RING);
        // Facing north, backwards is south: (0, 1) is open
        assert_eq!(rc.query_back_sensor(), SensorReading::Space);
        assert_eq!(rc.move_backward(), MoveOutcome::Moved);
        assert_eq!(rc.position(), Some(Coord::new(0, 1)));
        assert_eq!(rc.narrative()[0], "MOVE BACKWARDS - SUCCESS -> NORTH (0, 1)");
    }

    #[test]
    fn test_sensors_are_relative_and_see_goal() {
        let (mut rc, _) = bound_controller("1 2\n1 1\n0 0\n1 0\n");
        assert_eq!(rc.query_right_sensor(), SensorReading::Goal);
        assert_eq!(rc.query_left_sensor(), SensorReading::Wall);
        assert_eq!(rc.query_below_sensor(), SensorReading::Space);

        rc.rotate_counter_clockwise();
        assert_eq!(rc.heading(), Heading::West);
        assert_eq!(rc.query_back_sensor(), SensorReading::Goal);

        // Sensors never touch the trace
        assert_eq!(rc.trace().len(), 2);
    }

    #[test]
    fn test_unbound_controller_ignores_actions() {
        let ctx = RunContext::new(0);
        let mut rc = RobotController::new(ctx.clone(), Sandbox::new(SecurityPolicy::default(), ctx));

        assert_eq!(rc.move_forward(), MoveOutcome::Blocked);
        rc.rotate_clockwise();
        assert_eq!(rc.query_below_sensor(), SensorReading::Wall);
        assert_eq!(rc.heading(), Heading::North);
        assert!(rc.trace().is_empty());
        assert_eq!(rc.moves(), 0);
    }

    #[test]
    fn test_cancelled_run_stops_recording() {
        let (mut rc, ctx) = bound_controller(RING);
        ctx.cancel();

        rc.rotate_clockwise();
        assert_eq!(rc.move_forward(), MoveOutcome::Blocked);
        assert!(rc.is_cancelled());
        assert_eq!(rc.trace().len(), 1);
    }

    #[test]
    fn test_finalize_writes_trace_and_marker() {
        let (mut rc, _) = bound_controller("1 2\n1 1\n0 0\n1 0\n");
        rc.rotate_clockwise();
        rc.move_forward();

        let channel = MemoryChannel::new("");
        let summary = rc.finalize_run(&channel).unwrap();

        assert!(summary.reached_goal);
        assert_eq!(summary.moves, 2);
        assert_eq!(channel.write_count(), 1);
        assert_eq!(
            channel.last_output().unwrap(),
            vec!["0 0 0", "1 0 0", "1 1 0", "1 (Successfully ended on goal)"]
        );
    }
}
