//! JSONL Logger
//!
//! Append-only run log: one JSON object per line, in the same form
//! `RunLog::to_jsonl` produces.

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use survival_events::{LogLine, RunHeader, Termination, TurnRecord};

use super::TurnSink;

/// Writes run log lines to a file
pub struct JsonlLogger {
    writer: Option<BufWriter<File>>,
    line_count: u64,
}

impl JsonlLogger {
    /// Create a logger writing to `path`, truncating any previous run
    pub fn new(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        Ok(Self {
            writer: Some(BufWriter::new(file)),
            line_count: 0,
        })
    }

    /// Create a logger that only counts lines (for testing)
    pub fn null() -> Self {
        Self {
            writer: None,
            line_count: 0,
        }
    }

    /// Lines written so far
    pub fn line_count(&self) -> u64 {
        self.line_count
    }

    fn write_line(&mut self, line: &LogLine) -> io::Result<()> {
        self.line_count += 1;
        if let Some(ref mut writer) = self.writer {
            let json = serde_json::to_string(line)?;
            writeln!(writer, "{}", json)?;
        }
        Ok(())
    }

    /// Flush the buffer to disk
    pub fn flush(&mut self) -> io::Result<()> {
        if let Some(ref mut writer) = self.writer {
            writer.flush()?;
        }
        Ok(())
    }
}

impl TurnSink for JsonlLogger {
    fn start(&mut self, header: &RunHeader) -> io::Result<()> {
        self.write_line(&LogLine::Header(header.clone()))?;
        self.flush()
    }

    fn turn(&mut self, record: &TurnRecord) -> io::Result<()> {
        self.write_line(&LogLine::Turn(record.clone()))?;
        self.flush()
    }

    fn finish(&mut self, termination: &Termination) -> io::Result<()> {
        self.write_line(&LogLine::Termination(termination.clone()))?;
        self.flush()
    }
}

impl Drop for JsonlLogger {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}
