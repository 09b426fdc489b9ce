//! Run Log Output
//!
//! Sinks receive the run as it happens: the header before turn one, each
//! turn record once it is final, and the termination entry.

pub mod logger;

use std::io;
use survival_events::{RunHeader, Termination, TurnRecord};

pub use logger::JsonlLogger;

/// Streaming consumer of a run log.
pub trait TurnSink: Send {
    fn start(&mut self, header: &RunHeader) -> io::Result<()>;
    fn turn(&mut self, record: &TurnRecord) -> io::Result<()>;
    fn finish(&mut self, termination: &Termination) -> io::Result<()>;
}

/// Discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl TurnSink for NullSink {
    fn start(&mut self, _header: &RunHeader) -> io::Result<()> {
        Ok(())
    }

    fn turn(&mut self, _record: &TurnRecord) -> io::Result<()> {
        Ok(())
    }

    fn finish(&mut self, _termination: &Termination) -> io::Result<()> {
        Ok(())
    }
}
