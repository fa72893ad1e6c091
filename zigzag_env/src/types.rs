//! Common types for the ZigZag environment layer.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Final line of a trace that ended on the goal.
pub const GOAL_REACHED_LINE: &str = "1 (Successfully ended on goal)";

/// Final line of a trace that did not end on the goal.
pub const GOAL_MISSED_LINE: &str = "-1 (Did not successfully end on goal)";

/// Unique identifier for a single simulation run.
///
/// Uses UUID v4 so logs from different jobs never collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Creates a new random RunId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a deterministic RunId from a seed (for reproducible runs).
    pub fn from_seed(seed: u64) -> Self {
        let mut bytes = [0u8; 16];
        bytes[0..8].copy_from_slice(&seed.to_le_bytes());
        bytes[8..16].copy_from_slice(&seed.wrapping_mul(0x517cc1b727220a95).to_le_bytes());
        Self(Uuid::from_bytes(bytes))
    }

    /// Returns the inner UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Show first 8 chars for readability
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

/// The record written to the output channel at the end of a run.
///
/// Exactly one of the two forms is produced per run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResultRecord {
    /// One line per agent action followed by the goal marker line.
    Trace {
        /// `<orientation> <x> <y>` lines, in order
        lines: Vec<String>,
        /// Whether the agent's final cell is the goal
        reached_goal: bool,
    },

    /// `-1` followed by a single diagnostic line.
    Error {
        /// Free-text diagnostic
        message: String,
    },
}

impl ResultRecord {
    /// Creates an error record.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Renders the record as the lines of the output protocol.
    pub fn to_lines(&self) -> Vec<String> {
        match self {
            ResultRecord::Trace { lines, reached_goal } => {
                let mut out = lines.clone();
                let marker = if *reached_goal { GOAL_REACHED_LINE } else { GOAL_MISSED_LINE };
                out.push(marker.to_string());
                out
            }
            ResultRecord::Error { message } => {
                // The error form is exactly two lines
                let flat: String = message
                    .lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty())
                    .collect::<Vec<_>>()
                    .join(" ");
                vec!["-1".to_string(), flat]
            }
        }
    }

    /// Returns true for the error form.
    pub fn is_error(&self) -> bool {
        matches!(self, ResultRecord::Error { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trace_record_lines() {
        let record = ResultRecord::Trace {
            lines: vec!["0 0 0".to_string(), "1 0 0".to_string()],
            reached_goal: false,
        };

        assert_eq!(
            record.to_lines(),
            vec!["0 0 0", "1 0 0", "-1 (Did not successfully end on goal)"]
        );
        assert!(!record.is_error());
    }

    #[test]
    fn test_error_record_is_two_lines() {
        let record = ResultRecord::error("An error occurred:\n  boom\n");
        let lines = record.to_lines();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "-1");
        assert_eq!(lines[1], "An error occurred: boom");
    }

    #[test]
    fn test_run_id_from_seed_is_deterministic() {
        assert_eq!(RunId::from_seed(7), RunId::from_seed(7));
        assert_ne!(RunId::from_seed(7), RunId::from_seed(8));
    }
}
