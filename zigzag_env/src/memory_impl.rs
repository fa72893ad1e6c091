//! In-memory implementation of MazeChannel for tests and embedding.

use crate::channel::MazeChannel;
use crate::error::EnvError;
use std::sync::{Mutex, PoisonError};

/// Channel holding its input text in memory and recording every write.
///
/// Keeps all writes (not just the last one) so tests can assert that a run
/// emitted exactly one result record.
#[derive(Debug, Default)]
pub struct MemoryChannel {
    input: String,
    writes: Mutex<Vec<Vec<String>>>,
}

impl MemoryChannel {
    /// Creates a channel whose input side returns `input`.
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            writes: Mutex::new(Vec::new()),
        }
    }

    /// Number of times the output side was written.
    pub fn write_count(&self) -> usize {
        self.writes.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Lines of the most recent write, if any.
    pub fn last_output(&self) -> Option<Vec<String>> {
        self.writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }
}

impl MazeChannel for MemoryChannel {
    fn read_lines(&self) -> Result<Vec<String>, EnvError> {
        Ok(self.input.lines().map(str::to_string).collect())
    }

    fn write_lines(&self, lines: &[String]) -> Result<(), EnvError> {
        self.writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(lines.to_vec());
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ResultRecord;

    #[test]
    fn test_memory_channel_counts_writes() {
        let channel = MemoryChannel::new("1 1\n1\n0 0\n0 0\n");
        assert_eq!(channel.read_lines().unwrap().len(), 4);
        assert_eq!(channel.write_count(), 0);
        assert!(channel.last_output().is_none());

        channel.emit(&ResultRecord::error("first")).unwrap();
        channel.emit(&ResultRecord::error("second")).unwrap();

        assert_eq!(channel.write_count(), 2);
        assert_eq!(channel.last_output().unwrap(), vec!["-1", "second"]);
    }
}
