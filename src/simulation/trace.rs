//! Interface state traces.
//!
//! Every MAC status change is reported to an optional [`TraceSink`] as
//! `<time>\t<interface>\t<STATUS>`:
//! - [`AsciiTrace`] writes the lines to a buffered file
//! - [`MemoryTrace`] keeps them in memory, readable through a cloned handle

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

use super::types::{Status, Tick};

pub trait TraceSink: Send {
    fn record(&mut self, time: Tick, interface: &str, status: Status);

    /// Flush buffered output at the end of a run.
    fn flush(&mut self) {}
}

pub fn format_line(time: Tick, interface: &str, status: Status) -> String {
    format!("{}\t{}\t{}", time, interface, status)
}

/// Trace written to a text file.
///
/// Write failures are logged once and further output is discarded; a broken
/// trace never aborts the simulation.
pub struct AsciiTrace {
    writer: BufWriter<File>,
    failed: bool,
}

impl AsciiTrace {
    pub fn create(path: &Path) -> std::io::Result<Self> {
        let file = File::create(path)?;
        Ok(Self { writer: BufWriter::new(file), failed: false })
    }

    fn report(&mut self, err: std::io::Error) {
        if !self.failed {
            log::warn!("Trace output failed, further trace lines are dropped: {}", err);
            self.failed = true;
        }
    }
}

impl TraceSink for AsciiTrace {
    fn record(&mut self, time: Tick, interface: &str, status: Status) {
        if self.failed {
            return;
        }
        if let Err(err) = writeln!(self.writer, "{}", format_line(time, interface, status)) {
            self.report(err);
        }
    }

    fn flush(&mut self) {
        if self.failed {
            return;
        }
        if let Err(err) = self.writer.flush() {
            self.report(err);
        }
    }
}

impl Drop for AsciiTrace {
    fn drop(&mut self) {
        TraceSink::flush(self);
    }
}

/// In-memory trace. Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct MemoryTrace {
    lines: Arc<Mutex<Vec<String>>>,
}

impl MemoryTrace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).clone()
    }

    /// Statuses recorded for `interface`, in order.
    pub fn statuses_of(&self, interface: &str) -> Vec<String> {
        self.lines()
            .iter()
            .filter_map(|line| {
                let mut parts = line.split('\t');
                let (_time, name, status) = (parts.next()?, parts.next()?, parts.next()?);
                (name == interface).then(|| status.to_string())
            })
            .collect()
    }
}

impl TraceSink for MemoryTrace {
    fn record(&mut self, time: Tick, interface: &str, status: Status) {
        self.lines
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(format_line(time, interface, status));
    }
}
