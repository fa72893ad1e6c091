//! ZigZag Simulator CLI
//!
//! Runs a registered robot against a maze and writes the result protocol.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;
use zigzag_core::{GridFormat, MazeStrategy};
use zigzag_sim::{Harness, HarnessConfig, LogicRegistry, RunExport};

/// ZigZag robot simulation CLI
#[derive(Parser, Debug)]
#[command(name = "zigzag-sim")]
#[command(about = "Run robot logic against a maze inside the ZigZag sandbox", long_about = None)]
struct Args {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// JSON config file (flags override its values)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a registered robot and write the result file
    Run(RunArgs),

    /// Print a generated maze in the input format
    Generate(MazeArgs),

    /// List registered robots
    Robots,
}

#[derive(clap::Args, Debug)]
struct RunArgs {
    /// Registered robot name (see `robots`)
    #[arg(short, long)]
    robot: String,

    /// Input file (maze description)
    #[arg(long)]
    input: Option<PathBuf>,

    /// Output file (result record)
    #[arg(long)]
    output: Option<PathBuf>,

    /// Wall-clock deadline in milliseconds
    #[arg(long)]
    deadline_ms: Option<u64>,

    /// Maximum number of ticks
    #[arg(long)]
    ticks: Option<u64>,

    /// Grid encoding of the input (auto, array, hex)
    #[arg(long)]
    format: Option<GridFormat>,

    #[command(flatten)]
    maze: MazeArgs,

    /// Export the run to a JSON file for the frontend
    #[arg(long)]
    export: Option<PathBuf>,

    /// JSON summary on stdout
    #[arg(long)]
    json: bool,
}

#[derive(clap::Args, Debug)]
struct MazeArgs {
    /// Maze strategy (external, noise, backtracker, walls)
    #[arg(short = 'S', long)]
    strategy: Option<MazeStrategy>,

    /// Rows for random strategies
    #[arg(long)]
    rows: Option<usize>,

    /// Columns for random strategies
    #[arg(long)]
    cols: Option<usize>,

    /// Seed for random strategies (0 = random from time)
    #[arg(short, long)]
    seed: Option<u64>,
}

impl MazeArgs {
    fn apply(&self, mut config: HarnessConfig) -> HarnessConfig {
        if let Some(strategy) = self.strategy {
            config = config.with_strategy(strategy);
        }
        let rows = self.rows.unwrap_or(config.rows);
        let cols = self.cols.unwrap_or(config.cols);
        config = config.with_size(rows, cols);
        if let Some(seed) = self.seed {
            config = config.with_seed(seed);
        }
        config
    }

    /// `apply`, with `walls` as the default for the generate command.
    fn maze_defaults(&self, config: HarnessConfig) -> HarnessConfig {
        let config = self.apply(config);
        if self.strategy.is_none() && !config.strategy.is_random() {
            config.with_strategy(MazeStrategy::Walls)
        } else {
            config
        }
    }
}

fn load_config(path: Option<&PathBuf>) -> HarnessConfig {
    match path {
        Some(path) => HarnessConfig::from_file(path).unwrap_or_else(|e| {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }),
        None => HarnessConfig::default(),
    }
}

fn run(config: HarnessConfig, args: &RunArgs) -> i32 {
    let mut config = args.maze.apply(config);
    if let Some(input) = &args.input {
        config = config.with_input(input);
    }
    if let Some(output) = &args.output {
        config = config.with_output(output);
    }
    if let Some(ms) = args.deadline_ms {
        config = config.with_deadline_ms(ms);
    }
    if let Some(ticks) = args.ticks {
        config = config.with_max_ticks(ticks);
    }
    if let Some(format) = args.format {
        config = config.with_format(format);
    }

    let harness = Harness::new(config);
    let channel = harness.config().channel();
    let registry = LogicRegistry::builtin();

    let report = match harness.run_named(&registry, &args.robot, &channel) {
        Ok(report) => report,
        Err(e) => {
            error!("Run failed: {}", e);
            return 1;
        }
    };

    if let Some(path) = &args.export {
        let export = RunExport::from_report(&report);
        if let Err(e) = export.write_to_file(path) {
            error!("Failed to write export: {:?}", e);
        } else {
            info!("Exported {} steps to {}", export.steps.len(), path.display());
        }
    }

    if args.json {
        let summary = serde_json::json!({
            "run_id": report.run_id.to_string(),
            "robot": args.robot,
            "strategy": report.strategy.name(),
            "seed": report.seed,
            "verdict": report.verdict.label(),
            "message": report.verdict.message(),
            "reached_goal": report.verdict.reached_goal(),
            "moves": report.summary.as_ref().map(|s| s.moves),
            "ticks": report.ticks,
            "elapsed_ms": report.elapsed.as_millis() as u64,
        });
        match serde_json::to_string_pretty(&summary) {
            Ok(text) => println!("{}", text),
            Err(e) => error!("Failed to render summary: {}", e),
        }
    } else if report.verdict.is_error() {
        error!(
            "✗ {} FAILED: {}",
            args.robot,
            report.verdict.message().unwrap_or_default()
        );
    } else {
        info!(
            "✓ {} finished in {} moves, goal reached: {}",
            args.robot,
            report.summary.as_ref().map_or(0, |s| s.moves),
            report.verdict.reached_goal()
        );
    }

    report.verdict.exit_code()
}

fn generate(config: HarnessConfig, args: &MazeArgs) -> i32 {
    let config = args.maze_defaults(config);
    let seed = config.effective_seed();
    let Some(mut generator) = config
        .strategy
        .random_generator(config.rows, config.cols, seed)
    else {
        eprintln!("Error: strategy '{}' does not generate mazes", config.strategy);
        eprintln!("Available strategies: noise, backtracker, walls");
        return 1;
    };

    match generator.generate() {
        Ok(layout) => {
            info!("Generated {}x{} {} maze (seed={})", layout.cols, layout.rows, generator.name(), seed);
            print!("{}", layout.to_text());
            0
        }
        Err(e) => {
            error!("Generation failed: {}", e);
            1
        }
    }
}

fn main() {
    let args = Args::parse();

    // Initialize logging (stderr, so stdout stays clean for mazes and JSON)
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }

    let config = load_config(args.config.as_ref());

    let code = match &args.command {
        Command::Run(run_args) => run(config, run_args),
        Command::Generate(maze_args) => generate(config, maze_args),
        Command::Robots => {
            for (name, description) in LogicRegistry::builtin().describe() {
                println!("{:<16} {}", name, description);
            }
            0
        }
    };

    // Exit with proper code for graders
    if code != 0 {
        std::process::exit(code);
    }
}
