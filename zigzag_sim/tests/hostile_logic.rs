//! End-to-end runs of misbehaving robot logic through the harness.

use proptest::prelude::*;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use zigzag_core::{GridFormat, MazeBuilder, MazeLayout, MazeStrategy, RobotController, RobotLogic};
use zigzag_env::{MemoryChannel, PlaintextChannel, RunContext, Sandbox, GOAL_MISSED_LINE, GOAL_REACHED_LINE};
use zigzag_sim::{Harness, HarnessConfig, LogicRegistry, Verdict, TIMEOUT_MESSAGE};

const RING: &str = "3 3\n1 1 1\n1 0 1\n1 1 1\n0 0\n2 2\n";

fn short_deadline() -> Harness {
    Harness::new(HarnessConfig::default().with_deadline_ms(200))
}

/// Never returns from `periodic` and ignores cancellation.
struct Spinner;

impl RobotLogic for Spinner {
    fn init(&mut self, _rc: &mut RobotController) {}

    fn periodic(&mut self, _rc: &mut RobotController) {
        loop {
            thread::sleep(Duration::from_millis(10));
        }
    }
}

/// Loops inside `init` until the harness cancels the run.
struct Runaway;

impl RobotLogic for Runaway {
    fn init(&mut self, rc: &mut RobotController) {
        while !rc.is_cancelled() {
            rc.rotate_clockwise();
            thread::sleep(Duration::from_millis(1));
        }
    }

    fn periodic(&mut self, _rc: &mut RobotController) {}
}

struct Panicker;

impl RobotLogic for Panicker {
    fn init(&mut self, _rc: &mut RobotController) {}

    fn periodic(&mut self, rc: &mut RobotController) {
        rc.move_forward();
        panic!("robot exploded");
    }
}

/// Tries every forbidden operation and swallows the errors.
struct Snooper;

impl RobotLogic for Snooper {
    fn init(&mut self, rc: &mut RobotController) {
        let sandbox = rc.sandbox().clone();
        let _ = sandbox.read_to_string("/etc/passwd");
        let _ = sandbox.exec("ls /");
        let _ = sandbox.connect("10.0.0.1", 80);
        let _ = sandbox.exit(0);
        let _ = sandbox.reflect("Maze");
    }

    fn periodic(&mut self, rc: &mut RobotController) {
        rc.move_forward();
    }
}

/// Builds its own maze and tries to bind the controller to it.
struct Rebinder;

impl RobotLogic for Rebinder {
    fn init(&mut self, rc: &mut RobotController) {
        let layout = match MazeLayout::parse_str("2 2\n1 1\n1 1\n0 0\n1 1\n", GridFormat::Array) {
            Ok(layout) => layout,
            Err(_) => return,
        };
        if let Ok(maze) = MazeBuilder::from_layout(&layout, &RunContext::new(0)) {
            let _ = rc.initialize(Arc::new(maze));
        }
    }

    fn periodic(&mut self, rc: &mut RobotController) {
        rc.move_forward();
    }
}

/// Waits for cancellation, then tries to overwrite the result with a success.
struct Forger {
    output: std::path::PathBuf,
}

impl RobotLogic for Forger {
    fn init(&mut self, rc: &mut RobotController) {
        while !rc.is_cancelled() {
            thread::sleep(Duration::from_millis(1));
        }
        thread::sleep(Duration::from_millis(20));
        let _ = rc
            .sandbox()
            .write(&self.output, "0 2 2\n1 (Successfully ended on goal)\n");
    }

    fn periodic(&mut self, _rc: &mut RobotController) {}
}

/// Performs one sandboxed operation in `init` and ignores the result.
struct Attempt {
    op: fn(&Sandbox),
}

impl RobotLogic for Attempt {
    fn init(&mut self, rc: &mut RobotController) {
        (self.op)(rc.sandbox());
    }

    fn periodic(&mut self, rc: &mut RobotController) {
        rc.move_forward();
    }
}

/// Reads the maze description through the sandbox, turning once on success.
struct InputReader {
    path: std::path::PathBuf,
}

impl RobotLogic for InputReader {
    fn init(&mut self, rc: &mut RobotController) {
        let text = rc.sandbox().read_to_string(&self.path).unwrap_or_default();
        if text.starts_with("3 3") {
            rc.rotate_clockwise();
        }
    }

    fn periodic(&mut self, _rc: &mut RobotController) {}
}

#[test]
fn test_ring_with_forward_rotate() {
    let channel = MemoryChannel::new(RING);
    let report = Harness::default()
        .run_named(&LogicRegistry::builtin(), "forward_rotate", &channel)
        .unwrap();

    assert_eq!(report.verdict, Verdict::Completed { reached_goal: false });
    let output = channel.last_output().unwrap();
    assert_eq!(output.len(), 10_002);
    assert_eq!(&output[..5], &["0 0 0", "0 0 0", "1 0 0", "1 1 0", "2 1 0"]);
    assert_eq!(output.last().unwrap(), GOAL_MISSED_LINE);
}

#[test]
fn test_non_cooperative_spin_times_out() {
    let channel = MemoryChannel::new(RING);
    let report = short_deadline().run(Box::new(Spinner), &channel).unwrap();

    assert_eq!(report.verdict, Verdict::Timeout);
    assert!(report.summary.is_none());
    assert!(report.elapsed < Duration::from_millis(200 + 500), "{:?}", report.elapsed);
    assert_eq!(channel.write_count(), 1);
    assert_eq!(channel.last_output().unwrap(), vec!["-1", TIMEOUT_MESSAGE]);
}

#[test]
fn test_cooperative_runaway_times_out() {
    let channel = MemoryChannel::new(RING);
    let report = short_deadline().run(Box::new(Runaway), &channel).unwrap();

    assert_eq!(report.verdict, Verdict::Timeout);
    assert_eq!(channel.write_count(), 1);
    assert_eq!(channel.last_output().unwrap()[0], "-1");

    // The worker stopped in time, so the partial path is kept for export
    assert_eq!(report.ticks, Some(0));
    assert!(report.summary.is_some());
    assert!(report.trace.len() > 1);
    assert_eq!(report.trace.len(), report.narrative.len() + 1);
}

#[test]
fn test_cancelled_worker_cannot_forge_result() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("simservicein.txt");
    let output = dir.path().join("simserviceout.txt");
    std::fs::write(&input, RING).unwrap();

    let config = HarnessConfig::default()
        .with_input(&input)
        .with_output(&output)
        .with_deadline_ms(200);
    let harness = Harness::new(config);
    let channel = harness.config().channel();
    let report = harness.run(Box::new(Forger { output: output.clone() }), &channel).unwrap();
    assert_eq!(report.verdict, Verdict::Timeout);

    let expected = format!("-1\n{}\n", TIMEOUT_MESSAGE);
    assert_eq!(std::fs::read_to_string(&output).unwrap(), expected);

    thread::sleep(Duration::from_millis(200));
    assert_eq!(std::fs::read_to_string(&output).unwrap(), expected);
}

#[test]
fn test_each_denied_capability_uses_error_form() {
    let cases: [(fn(&Sandbox), &str); 6] = [
        (
            |s: &Sandbox| {
                let _ = s.read_to_string("/etc/passwd");
            },
            "read denied for /etc/passwd",
        ),
        (
            |s: &Sandbox| {
                let _ = s.write("/tmp/zigzag-elsewhere.txt", "x");
            },
            "write denied for /tmp/zigzag-elsewhere.txt",
        ),
        (
            |s: &Sandbox| {
                let _ = s.exec("ls /");
            },
            "exec denied for ls /",
        ),
        (
            |s: &Sandbox| {
                let _ = s.connect("10.0.0.1", 80);
            },
            "connect denied for 10.0.0.1:80",
        ),
        (
            |s: &Sandbox| {
                let _ = s.exit(0);
            },
            "exit denied for exit(0)",
        ),
        (
            |s: &Sandbox| {
                let _ = s.reflect("Maze");
            },
            "reflect denied for Maze",
        ),
    ];

    for (op, denial) in cases {
        let channel = MemoryChannel::new(RING);
        let report = Harness::default().run(Box::new(Attempt { op }), &channel).unwrap();

        assert_eq!(report.verdict, Verdict::PermissionViolation(denial.to_string()), "{}", denial);
        assert_eq!(report.ticks, Some(0));
        assert_eq!(
            channel.last_output().unwrap(),
            vec!["-1".to_string(), format!("Error in loaded code: {}", denial)]
        );
    }
}

#[test]
fn test_panic_is_a_fault() {
    let channel = MemoryChannel::new(RING);
    let report = Harness::default().run(Box::new(Panicker), &channel).unwrap();

    assert_eq!(report.verdict, Verdict::Fault("robot exploded".into()));
    assert_eq!(
        channel.last_output().unwrap(),
        vec!["-1", "Error in loaded code: robot exploded"]
    );
}

#[test]
fn test_swallowed_denial_still_fails_the_run() {
    let channel = MemoryChannel::new(RING);
    let report = Harness::default().run(Box::new(Snooper), &channel).unwrap();

    assert_eq!(
        report.verdict,
        Verdict::PermissionViolation("read denied for /etc/passwd".into())
    );
    // Stopped before the first tick
    assert_eq!(report.ticks, Some(0));
    assert_eq!(channel.write_count(), 1);
    assert_eq!(
        channel.last_output().unwrap(),
        vec!["-1", "Error in loaded code: read denied for /etc/passwd"]
    );
}

#[test]
fn test_rebinding_is_illegal() {
    let channel = MemoryChannel::new(RING);
    let report = Harness::default().run(Box::new(Rebinder), &channel).unwrap();

    assert!(matches!(report.verdict, Verdict::IllegalAction(_)));
    let output = channel.last_output().unwrap();
    assert_eq!(output[0], "-1");
    assert!(output[1].contains("ILLEGALLY TRYING TO INITIALIZE MAZE"));
}

#[test]
fn test_input_file_is_readable_through_sandbox() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("simservicein.txt");
    let output = dir.path().join("simserviceout.txt");
    std::fs::write(&input, RING).unwrap();

    let config = HarnessConfig::default().with_input(&input).with_output(&output);
    let harness = Harness::new(config);
    let channel = harness.config().channel();
    let report = harness.run(Box::new(InputReader { path: input.clone() }), &channel).unwrap();

    assert_eq!(report.verdict, Verdict::Completed { reached_goal: false });
    let written = std::fs::read_to_string(&output).unwrap();
    let lines: Vec<&str> = written.lines().collect();
    assert_eq!(lines, vec!["0 0 0", "1 0 0", GOAL_MISSED_LINE]);
}

#[test]
fn test_file_channel_receives_error_form() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.txt");
    let output = dir.path().join("out.txt");
    std::fs::write(&input, "3 3\n1 1 1\n").unwrap();

    let channel = PlaintextChannel::new(&input, &output);
    let report = Harness::default().run(Box::new(Snooper), &channel).unwrap();

    assert!(matches!(report.verdict, Verdict::Setup(_)));
    let written = std::fs::read_to_string(&output).unwrap();
    assert!(written.starts_with("-1\nAn error occurred: "));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn test_right_hand_solves_carved_mazes(seed in 1u64..10_000, rows in 2usize..8, cols in 2usize..8) {
        let config = HarnessConfig::default()
            .with_strategy(MazeStrategy::Walls)
            .with_size(rows, cols)
            .with_seed(seed);
        let channel = MemoryChannel::new("");
        let report = Harness::new(config)
            .run_named(&LogicRegistry::builtin(), "right_hand", &channel)
            .unwrap();

        prop_assert!(report.verdict.reached_goal());
        prop_assert_eq!(channel.write_count(), 1);
        let last_output = channel.last_output().unwrap();
        prop_assert_eq!(last_output.last().unwrap().as_str(), GOAL_REACHED_LINE);
    }
}
