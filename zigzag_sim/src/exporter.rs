//! JSON export of a finished run for the frontend animation.

use crate::harness::RunReport;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// One animation step: state after an action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportStep {
    /// 0 = north, clockwise
    pub orientation: usize,
    pub x: usize,
    pub y: usize,
}

/// Complete run export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunExport {
    /// Run id (short form)
    pub run_id: String,

    /// Generation strategy
    pub strategy: String,

    /// Seed used (0 for external mazes)
    pub seed: u64,

    /// Maze in the input text format
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub maze: Vec<String>,

    /// Verdict label
    pub verdict: String,

    /// Error-form diagnostic if the run failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    pub reached_goal: bool,
    pub moves: u64,

    /// All steps, starting with the initial state
    pub steps: Vec<ExportStep>,

    /// Human-readable log lines
    pub narrative: Vec<String>,

    pub elapsed_ms: u64,
}

impl RunExport {
    pub fn from_report(report: &RunReport) -> Self {
        Self {
            run_id: report.run_id.to_string(),
            strategy: report.strategy.name().to_string(),
            seed: report.seed,
            maze: report.layout.as_ref().map(|l| l.to_lines()).unwrap_or_default(),
            verdict: report.verdict.label().to_string(),
            message: report.verdict.message(),
            reached_goal: report.verdict.reached_goal(),
            moves: report.summary.as_ref().map_or(0, |s| s.moves),
            steps: report
                .trace
                .iter()
                .map(|entry| ExportStep {
                    orientation: entry.heading.index(),
                    x: entry.x,
                    y: entry.y,
                })
                .collect(),
            narrative: report.narrative.clone(),
            elapsed_ms: report.elapsed.as_millis() as u64,
        }
    }

    /// Writes to a JSON file.
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}
