//! Harness configuration.

use crate::error::HarnessError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use zigzag_core::{GridFormat, MazeStrategy};
use zigzag_env::{Endpoint, PlaintextChannel, SecurityPolicy, DEFAULT_INPUT_FILE, DEFAULT_OUTPUT_FILE};

/// Wall-clock budget for one run.
pub const DEFAULT_DEADLINE_MS: u64 = 5000;

/// Maximum number of `periodic` ticks per run.
pub const DEFAULT_MAX_TICKS: u64 = 5000;

/// Configuration for a harness run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Input file of the plain-text protocol
    pub input: PathBuf,

    /// Output file of the plain-text protocol
    pub output: PathBuf,

    /// Wall-clock deadline in milliseconds
    pub deadline_ms: u64,

    /// Tick cap for the per-tick hook
    pub max_ticks: u64,

    /// Where the maze comes from
    pub strategy: MazeStrategy,

    /// Grid size for random strategies
    pub rows: usize,
    pub cols: usize,

    /// Seed for random strategies (0 = derive from wall clock)
    pub seed: u64,

    /// Grid encoding of external input
    pub format: GridFormat,

    /// The single network endpoint logic may use
    pub endpoint: Option<Endpoint>,

    /// Extra artifact file names logic may read
    pub artifacts: Vec<String>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from(DEFAULT_INPUT_FILE),
            output: PathBuf::from(DEFAULT_OUTPUT_FILE),
            deadline_ms: DEFAULT_DEADLINE_MS,
            max_ticks: DEFAULT_MAX_TICKS,
            strategy: MazeStrategy::External,
            rows: 7,
            cols: 7,
            seed: 0,
            format: GridFormat::Auto,
            endpoint: None,
            artifacts: Vec::new(),
        }
    }
}

impl HarnessConfig {
    /// Loads a JSON config file. Missing fields take their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, HarnessError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| HarnessError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| HarnessError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn with_input(mut self, input: impl Into<PathBuf>) -> Self {
        self.input = input.into();
        self
    }

    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = output.into();
        self
    }

    pub fn with_deadline_ms(mut self, ms: u64) -> Self {
        self.deadline_ms = ms;
        self
    }

    pub fn with_max_ticks(mut self, ticks: u64) -> Self {
        self.max_ticks = ticks;
        self
    }

    pub fn with_strategy(mut self, strategy: MazeStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_size(mut self, rows: usize, cols: usize) -> Self {
        self.rows = rows;
        self.cols = cols;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_format(mut self, format: GridFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_endpoint(mut self, endpoint: Endpoint) -> Self {
        self.endpoint = Some(endpoint);
        self
    }

    pub fn with_artifact(mut self, name: impl Into<String>) -> Self {
        self.artifacts.push(name.into());
        self
    }

    pub fn deadline(&self) -> Duration {
        Duration::from_millis(self.deadline_ms)
    }

    /// Seed to generate with: the configured one, or one from the clock.
    pub fn effective_seed(&self) -> u64 {
        if self.seed != 0 {
            return self.seed;
        }
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(1)
    }

    /// Sandbox policy for this job's files and endpoint.
    pub fn policy(&self) -> SecurityPolicy {
        let mut policy = SecurityPolicy::for_job(&self.input, &self.output);
        if let Some(endpoint) = &self.endpoint {
            policy = policy.with_endpoint(endpoint.clone());
        }
        for artifact in &self.artifacts {
            policy = policy.with_artifact(artifact.clone());
        }
        policy
    }

    /// File channel for this job.
    pub fn channel(&self) -> PlaintextChannel {
        PlaintextChannel::new(&self.input, &self.output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_job_protocol() {
        let config = HarnessConfig::default();
        assert_eq!(config.input, PathBuf::from("simservicein.txt"));
        assert_eq!(config.output, PathBuf::from("simserviceout.txt"));
        assert_eq!(config.deadline(), Duration::from_millis(5000));
        assert_eq!(config.max_ticks, 5000);
        assert_eq!(config.strategy, MazeStrategy::External);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("harness.json");
        fs::write(&path, r#"{ "strategy": "walls", "rows": 9, "endpoint": { "host": "grader", "port": 9000 } }"#).unwrap();

        let config = HarnessConfig::from_file(&path).unwrap();
        assert_eq!(config.strategy, MazeStrategy::Walls);
        assert_eq!(config.rows, 9);
        assert_eq!(config.cols, 7);
        assert_eq!(config.endpoint, Some(Endpoint::new("grader", 9000)));
        assert!(config.policy().check_connect("grader", 9000).is_ok());
    }

    #[test]
    fn test_bad_json_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("harness.json");
        fs::write(&path, "{ nope").unwrap();

        let err = HarnessConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, HarnessError::ConfigParse { .. }));
    }

    #[test]
    fn test_builders() {
        let config = HarnessConfig::default()
            .with_strategy(MazeStrategy::Backtracker)
            .with_size(11, 13)
            .with_seed(42)
            .with_artifact("helper.txt");

        assert_eq!((config.rows, config.cols), (11, 13));
        assert_eq!(config.effective_seed(), 42);
        assert!(config.policy().check_read(Path::new("helper.txt")).is_ok());
        assert!(config.policy().check_read(Path::new("simservicein.txt")).is_ok());
        assert!(config.policy().check_write(Path::new("simservicein.txt")).is_err());
    }
}
