//! Text channel abstraction between a run and its outside world.

use crate::error::EnvError;
use crate::types::ResultRecord;

/// Abstraction for the plain-text input/output protocol of a run.
///
/// # Implementations
///
/// - **Production**: `PlaintextChannel` - one input file, one output file
/// - **Testing**: `MemoryChannel` - in-memory buffers that count writes
///
/// # Data Flow
///
/// ```text
/// Grader                     Channel                     Harness
///   |                           |                           |
///   |-- maze description ------>|                           |
///   |                           |-- read_lines() ---------->|
///   |                           |<--------- write_lines() --|
///   |<-- trace or error form ---|                           |
/// ```
pub trait MazeChannel: Send + Sync {
    /// Reads every line of the input side.
    ///
    /// # Returns
    /// * `Ok(lines)` - The input, one entry per line, without terminators
    /// * `Err(EnvError::Channel)` - The input could not be read
    fn read_lines(&self) -> Result<Vec<String>, EnvError>;

    /// Replaces the output side with the given lines.
    fn write_lines(&self, lines: &[String]) -> Result<(), EnvError>;

    /// Short human-readable description (for logs).
    fn describe(&self) -> String;

    /// Writes a result record using the output protocol.
    fn emit(&self, record: &ResultRecord) -> Result<(), EnvError> {
        self.write_lines(&record.to_lines())
    }
}
