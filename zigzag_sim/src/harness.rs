//! Sandboxed execution harness.
//!
//! One run, start to finish:
//!
//! ```text
//! Supervisor                                   Worker (spawn_blocking)
//!   | build maze, bind controller                 |
//!   |-- spawn ----------------------------------->| init()
//!   |   timeout(deadline, handle)                 | periodic() x max_ticks
//!   |<------------------- controller (or panic) --|
//!   | classify, write exactly one result record
//! ```
//!
//! At the deadline the supervisor raises the cancellation flag and gives the
//! worker a short grace period to hand the controller back, so the partial
//! trace still reaches the report. Then it reports a timeout and shuts the
//! runtime down without waiting. A worker stuck inside a hook keeps running
//! in the background, but the sandbox refuses it everything and the output
//! is sealed before the supervisor writes it.

use crate::config::HarnessConfig;
use crate::error::HarnessError;
use crate::registry::LogicRegistry;
use crate::verdict::Verdict;
use std::any::Any;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Builder;
use tracing::{debug, error, info, warn};
use zigzag_core::{
    render_ascii, ExternalGenerator, MazeBuilder, MazeError, MazeGenerator, MazeLayout, MazeStrategy,
    RobotController, RobotLogic, RunSummary, TraceEntry,
};
use zigzag_env::{MazeChannel, RunContext, RunId, Sandbox};

/// Everything known about a finished run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: RunId,
    pub strategy: MazeStrategy,
    pub seed: u64,
    pub verdict: Verdict,

    /// The maze description, if it could be produced
    pub layout: Option<MazeLayout>,

    /// Final controller state; absent when the worker never handed it back
    pub summary: Option<RunSummary>,

    pub trace: Vec<TraceEntry>,
    pub narrative: Vec<String>,

    /// Ticks of `periodic` that completed
    pub ticks: Option<u64>,

    pub elapsed: Duration,
}

/// How long a cancelled worker may take to return its controller.
const CANCEL_GRACE: Duration = Duration::from_millis(50);

/// How the worker ended.
enum WorkerExit {
    Finished { controller: RobotController, ticks: u64 },
    Panicked(String),
    /// The controller is present when the worker stopped within the grace period
    TimedOut(Option<(RobotController, u64)>),
}

/// Runs robot logic against one maze under a deadline and the sandbox.
#[derive(Debug, Clone, Default)]
pub struct Harness {
    config: HarnessConfig,
}

impl Harness {
    pub fn new(config: HarnessConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Resolves `name` in `registry` and runs it. An unknown name is reported
    /// through the error form like any other failed run.
    pub fn run_named(
        &self,
        registry: &LogicRegistry,
        name: &str,
        channel: &dyn MazeChannel,
    ) -> Result<RunReport, HarnessError> {
        let seed = self.seed();
        match registry.create(name, seed) {
            Some(logic) => self.run_with_seed(logic, channel, seed),
            None => {
                error!("Robot logic '{}' is not registered", name);
                let ctx = RunContext::new(seed);
                let verdict = Verdict::LoadFailure(name.to_string());
                self.emit_error(channel, &verdict)?;
                Ok(self.report(&ctx, verdict, None, None, None))
            }
        }
    }

    /// Runs `logic` and writes exactly one result record to `channel`.
    ///
    /// Returns `Err` only when the result itself cannot be written (or the
    /// runtime cannot start); every failure of the logic is a `Verdict`.
    pub fn run(&self, logic: Box<dyn RobotLogic>, channel: &dyn MazeChannel) -> Result<RunReport, HarnessError> {
        self.run_with_seed(logic, channel, self.seed())
    }

    /// External mazes carry no seed.
    fn seed(&self) -> u64 {
        if self.config.strategy.is_random() {
            self.config.effective_seed()
        } else {
            self.config.seed
        }
    }

    fn run_with_seed(
        &self,
        logic: Box<dyn RobotLogic>,
        channel: &dyn MazeChannel,
        seed: u64,
    ) -> Result<RunReport, HarnessError> {
        let ctx = RunContext::new(seed);
        info!(
            run = %ctx.run_id(),
            "Starting run (strategy={}, seed={}, deadline={}ms, ticks={})",
            self.config.strategy,
            seed,
            self.config.deadline_ms,
            self.config.max_ticks
        );

        let layout = match self.generate(channel, seed) {
            Ok(layout) => layout,
            Err(err) => return self.fail_setup(&ctx, channel, &err, None),
        };

        let maze = match MazeBuilder::from_layout(&layout, &ctx) {
            Ok(maze) => Arc::new(maze),
            Err(err) => return self.fail_setup(&ctx, channel, &err, Some(layout)),
        };
        debug!(run = %ctx.run_id(), "Maze {}x{}:\n{}", maze.cols(), maze.rows(), render_ascii(&maze, None));

        let sandbox = Sandbox::new(self.config.policy(), ctx.clone());
        let mut controller = RobotController::new(ctx.clone(), sandbox);
        if let Err(err) = controller.initialize(maze) {
            return self.fail_setup(&ctx, channel, &err.into(), Some(layout));
        }

        let runtime = match Builder::new_current_thread().enable_time().build() {
            Ok(runtime) => runtime,
            Err(err) => {
                let verdict = Verdict::Setup(format!("cannot start runtime: {}", err));
                self.emit_error(channel, &verdict)?;
                return Err(HarnessError::Runtime(err));
            }
        };

        let exit = runtime.block_on(supervise(
            logic,
            controller,
            ctx.clone(),
            self.config.max_ticks,
            self.config.deadline(),
        ));
        // Never wait for an abandoned worker
        runtime.shutdown_background();
        ctx.seal_output();

        let report = match exit {
            WorkerExit::Finished { mut controller, ticks } => match ctx.violation() {
                Some(violation) => {
                    warn!(run = %ctx.run_id(), "Run stopped by violation: {}", violation);
                    let verdict = Verdict::from_violation(&violation);
                    self.emit_error(channel, &verdict)?;
                    self.report_from(&ctx, verdict, layout, &controller, ticks)
                }
                None => {
                    let summary = controller.finalize_run(channel)?;
                    let verdict = Verdict::Completed {
                        reached_goal: summary.reached_goal,
                    };
                    self.report_from(&ctx, verdict, layout, &controller, ticks)
                }
            },
            WorkerExit::Panicked(message) => {
                let verdict = match ctx.violation() {
                    Some(violation) => Verdict::from_violation(&violation),
                    None => Verdict::Fault(message),
                };
                error!(run = %ctx.run_id(), "Robot logic failed: {:?}", verdict);
                self.emit_error(channel, &verdict)?;
                self.report(&ctx, verdict, Some(layout), None, None)
            }
            WorkerExit::TimedOut(returned) => {
                let verdict = match ctx.violation() {
                    Some(violation) => Verdict::from_violation(&violation),
                    None => Verdict::Timeout,
                };
                self.emit_error(channel, &verdict)?;
                match returned {
                    Some((controller, ticks)) => {
                        warn!(run = %ctx.run_id(), "Run cancelled after {}ms ({} ticks)", self.config.deadline_ms, ticks);
                        self.report_from(&ctx, verdict, layout, &controller, ticks)
                    }
                    None => {
                        warn!(run = %ctx.run_id(), "Run abandoned after {}ms", self.config.deadline_ms);
                        self.report(&ctx, verdict, Some(layout), None, None)
                    }
                }
            }
        };

        info!(run = %ctx.run_id(), "Run verdict: {} ({:.1?})", report.verdict.label(), report.elapsed);
        Ok(report)
    }

    fn generate(&self, channel: &dyn MazeChannel, seed: u64) -> Result<MazeLayout, MazeError> {
        let config = &self.config;
        let mut generator: Box<dyn MazeGenerator + '_> = match config.strategy.random_generator(config.rows, config.cols, seed) {
            Some(generator) => generator,
            None => Box::new(ExternalGenerator::new(channel, config.format)),
        };
        debug!("Generating maze with {}", generator.name());
        generator.generate()
    }

    fn fail_setup(
        &self,
        ctx: &RunContext,
        channel: &dyn MazeChannel,
        err: &MazeError,
        layout: Option<MazeLayout>,
    ) -> Result<RunReport, HarnessError> {
        error!(run = %ctx.run_id(), "Maze setup failed: {}", err);
        let verdict = Verdict::from_setup(err);
        self.emit_error(channel, &verdict)?;
        Ok(self.report(ctx, verdict, layout, None, None))
    }

    fn emit_error(&self, channel: &dyn MazeChannel, verdict: &Verdict) -> Result<(), HarnessError> {
        if let Some(record) = verdict.error_record() {
            channel.emit(&record)?;
        }
        Ok(())
    }

    fn report_from(
        &self,
        ctx: &RunContext,
        verdict: Verdict,
        layout: MazeLayout,
        controller: &RobotController,
        ticks: u64,
    ) -> RunReport {
        let mut report = self.report(ctx, verdict, Some(layout), Some(controller.summary()), Some(ticks));
        report.trace = controller.trace().to_vec();
        report.narrative = controller.narrative().to_vec();
        report
    }

    fn report(
        &self,
        ctx: &RunContext,
        verdict: Verdict,
        layout: Option<MazeLayout>,
        summary: Option<RunSummary>,
        ticks: Option<u64>,
    ) -> RunReport {
        RunReport {
            run_id: ctx.run_id(),
            strategy: self.config.strategy,
            seed: ctx.seed(),
            verdict,
            layout,
            summary,
            trace: Vec::new(),
            narrative: Vec::new(),
            ticks,
            elapsed: ctx.elapsed(),
        }
    }
}

/// Runs the logic on a blocking worker and waits at most `deadline`.
async fn supervise(
    logic: Box<dyn RobotLogic>,
    controller: RobotController,
    ctx: RunContext,
    max_ticks: u64,
    deadline: Duration,
) -> WorkerExit {
    let worker_ctx = ctx.clone();
    let mut handle = tokio::task::spawn_blocking(move || drive(logic, controller, &worker_ctx, max_ticks));

    match tokio::time::timeout(deadline, &mut handle).await {
        Ok(Ok((controller, ticks))) => WorkerExit::Finished { controller, ticks },
        Ok(Err(join_err)) if join_err.is_panic() => WorkerExit::Panicked(panic_message(join_err.into_panic())),
        Ok(Err(join_err)) => WorkerExit::Panicked(join_err.to_string()),
        Err(_) => {
            ctx.cancel();
            let returned = match tokio::time::timeout(CANCEL_GRACE, &mut handle).await {
                Ok(Ok(returned)) => Some(returned),
                _ => None,
            };
            handle.abort();
            WorkerExit::TimedOut(returned)
        }
    }
}

/// Worker body: `init` once, then `periodic` until the cap, a violation or
/// cancellation.
fn drive(
    mut logic: Box<dyn RobotLogic>,
    mut controller: RobotController,
    ctx: &RunContext,
    max_ticks: u64,
) -> (RobotController, u64) {
    logic.init(&mut controller);

    let mut ticks = 0;
    while ticks < max_ticks && !ctx.is_cancelled() && !ctx.has_violation() {
        logic.periodic(&mut controller);
        ticks += 1;
    }
    debug!(run = %ctx.run_id(), "Worker stopped after {} ticks", ticks);
    (controller, ticks)
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "robot logic panicked".to_string()
    }
}
