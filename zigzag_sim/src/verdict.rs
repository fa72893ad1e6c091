//! Classification of how a run ended.

use serde::{Deserialize, Serialize};
use zigzag_core::MazeError;
use zigzag_env::{EnvError, ResultRecord};

/// Diagnostic written when the deadline passes.
pub const TIMEOUT_MESSAGE: &str = "Execution timed out. Maybe there was an infinite loop?";

/// Outcome of one run. Everything but `Completed` uses the error form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    /// Logic ran to the tick cap (or stopped on its own)
    Completed { reached_goal: bool },

    /// The requested logic does not exist
    LoadFailure(String),

    /// The sandbox denied an operation
    PermissionViolation(String),

    /// The logic panicked
    Fault(String),

    /// Rebinding the controller or assigning a second goal
    IllegalAction(String),

    /// The deadline passed
    Timeout,

    /// The maze could not be read or built
    Setup(String),
}

impl Verdict {
    /// Verdict for a recorded environment violation.
    pub fn from_violation(err: &EnvError) -> Self {
        match err {
            EnvError::PermissionDenied { .. } => Verdict::PermissionViolation(err.to_string()),
            EnvError::IllegalAction(_) => Verdict::IllegalAction(err.to_string()),
            EnvError::Timeout(_) => Verdict::Timeout,
            EnvError::Channel(_) => Verdict::Setup(err.to_string()),
        }
    }

    /// Verdict for a failure before logic started.
    pub fn from_setup(err: &MazeError) -> Self {
        if err.is_illegal_action() {
            Verdict::IllegalAction(err.to_string())
        } else {
            Verdict::Setup(err.to_string())
        }
    }

    /// Short machine-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Verdict::Completed { .. } => "completed",
            Verdict::LoadFailure(_) => "load_failure",
            Verdict::PermissionViolation(_) => "permission_violation",
            Verdict::Fault(_) => "fault",
            Verdict::IllegalAction(_) => "illegal_action",
            Verdict::Timeout => "timeout",
            Verdict::Setup(_) => "setup",
        }
    }

    pub fn is_error(&self) -> bool {
        !matches!(self, Verdict::Completed { .. })
    }

    pub fn reached_goal(&self) -> bool {
        matches!(self, Verdict::Completed { reached_goal: true })
    }

    /// Diagnostic line of the error form; `None` for completed runs.
    pub fn message(&self) -> Option<String> {
        match self {
            Verdict::Completed { .. } => None,
            Verdict::LoadFailure(name) => Some(format!("Robot logic not found: {}", name)),
            Verdict::PermissionViolation(msg) | Verdict::Fault(msg) | Verdict::IllegalAction(msg) => {
                Some(format!("Error in loaded code: {}", msg))
            }
            Verdict::Timeout => Some(TIMEOUT_MESSAGE.to_string()),
            Verdict::Setup(msg) => Some(format!("An error occurred: {}", msg)),
        }
    }

    /// Error-form record, for every verdict but `Completed`.
    pub fn error_record(&self) -> Option<ResultRecord> {
        self.message().map(ResultRecord::error)
    }

    /// Process exit code: 0 only when the goal was reached.
    pub fn exit_code(&self) -> i32 {
        if self.reached_goal() {
            0
        } else {
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_violation_classification() {
        let denied = Verdict::from_violation(&EnvError::denied("exec", "ls"));
        assert_eq!(denied, Verdict::PermissionViolation("exec denied for ls".into()));
        assert_eq!(denied.message().unwrap(), "Error in loaded code: exec denied for ls");

        let illegal = Verdict::from_violation(&EnvError::illegal("ILLEGALLY SETTING GOAL"));
        assert_eq!(illegal.label(), "illegal_action");
    }

    #[test]
    fn test_timeout_record() {
        let record = Verdict::Timeout.error_record().unwrap();
        assert_eq!(record.to_lines(), vec!["-1", TIMEOUT_MESSAGE]);
    }

    #[test]
    fn test_completed_has_no_error_record() {
        let verdict = Verdict::Completed { reached_goal: false };
        assert!(!verdict.is_error());
        assert!(verdict.error_record().is_none());
        assert_eq!(verdict.exit_code(), 1);
        assert_eq!(Verdict::Completed { reached_goal: true }.exit_code(), 0);
    }

    #[test]
    fn test_setup_from_maze_error() {
        let verdict = Verdict::from_setup(&MazeError::StartBlocked { x: 1, y: 1 });
        assert_eq!(
            verdict.message().unwrap(),
            "An error occurred: Start position (1, 1) is not an open cell"
        );

        let illegal: MazeError = EnvError::illegal("ILLEGALLY SETTING GOAL").into();
        assert_eq!(Verdict::from_setup(&illegal).label(), "illegal_action");
    }
}
