//! Production implementation of MazeChannel backed by two text files.

use crate::channel::MazeChannel;
use crate::error::EnvError;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Default input file name inside the job volume.
pub const DEFAULT_INPUT_FILE: &str = "simservicein.txt";

/// Default output file name inside the job volume.
pub const DEFAULT_OUTPUT_FILE: &str = "simserviceout.txt";

/// Channel backed by an input file and an output file.
///
/// This is the "real" implementation used inside a job container: the maze
/// description is dropped into the input file and the result is picked up
/// from the output file by a directory watcher.
#[derive(Debug, Clone)]
pub struct PlaintextChannel {
    input: PathBuf,
    output: PathBuf,
}

impl PlaintextChannel {
    /// Creates a channel for the given input and output paths.
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
        }
    }

    /// Path of the input file.
    pub fn input(&self) -> &Path {
        &self.input
    }

    /// Path of the output file.
    pub fn output(&self) -> &Path {
        &self.output
    }
}

impl Default for PlaintextChannel {
    fn default() -> Self {
        Self::new(DEFAULT_INPUT_FILE, DEFAULT_OUTPUT_FILE)
    }
}

impl MazeChannel for PlaintextChannel {
    fn read_lines(&self) -> Result<Vec<String>, EnvError> {
        let text = fs::read_to_string(&self.input).map_err(|e| {
            EnvError::Channel(format!("cannot read {}: {}", self.input.display(), e))
        })?;
        Ok(text.lines().map(str::to_string).collect())
    }

    fn write_lines(&self, lines: &[String]) -> Result<(), EnvError> {
        let file = File::create(&self.output).map_err(|e| {
            EnvError::Channel(format!("cannot create {}: {}", self.output.display(), e))
        })?;
        let mut writer = BufWriter::new(file);
        for line in lines {
            writer.write_all(line.as_bytes())?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("{} -> {}", self.input.display(), self.output.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ResultRecord;

    #[test]
    fn test_plaintext_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join(DEFAULT_INPUT_FILE);
        let output = dir.path().join(DEFAULT_OUTPUT_FILE);
        fs::write(&input, "3 3\n111\n").unwrap();

        let channel = PlaintextChannel::new(&input, &output);
        assert_eq!(channel.read_lines().unwrap(), vec!["3 3", "111"]);

        channel.emit(&ResultRecord::error("boom")).unwrap();
        assert_eq!(fs::read_to_string(&output).unwrap(), "-1\nboom\n");
    }

    #[test]
    fn test_missing_input_is_channel_error() {
        let dir = tempfile::tempdir().unwrap();
        let channel = PlaintextChannel::new(dir.path().join("nope.txt"), dir.path().join("out.txt"));

        let err = channel.read_lines().unwrap_err();
        assert!(matches!(err, EnvError::Channel(_)));
    }
}
