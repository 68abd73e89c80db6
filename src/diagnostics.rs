//! `--debug` timing checkpoints
//!
//! Written straight to stderr rather than through `tracing` so they show up
//! regardless of the configured log level. Line formats are consumed by
//! existing tooling and must not change:
//!
//! ```text
//! starting at Mon Oct 19 09:14:03 2026
//! extracted tar after 0.004211 seconds
//! loaded pickled data after 0.004907 seconds
//! ```

use std::io::{self, Write};
use std::time::Instant;

/// Checkpoint emitted after the optional archive stage
pub const EXTRACTED_ARCHIVE: &str = "extracted tar";

/// Checkpoint emitted after the task has been materialized
pub const LOADED_TASK: &str = "loaded pickled data";

/// Elapsed-time reporter, inert unless enabled
pub struct Diagnostics {
    start: Option<Instant>,
    sink: Box<dyn Write>,
}

impl Diagnostics {
    /// Diagnostics on stderr
    pub fn stderr(enabled: bool) -> Self {
        Self::with_writer(enabled, Box::new(io::stderr()))
    }

    /// Diagnostics on an arbitrary writer; writes the start line immediately
    pub fn with_writer(enabled: bool, sink: Box<dyn Write>) -> Self {
        let mut diagnostics = Self {
            start: enabled.then(Instant::now),
            sink,
        };
        if enabled {
            let now = chrono::Local::now().format("%a %b %e %H:%M:%S %Y");
            diagnostics.emit(format_args!("starting at {}", now));
        }
        diagnostics
    }

    /// Write `<label> after <seconds> seconds`
    pub fn checkpoint(&mut self, label: &str) {
        if let Some(start) = self.start {
            let secs = start.elapsed().as_secs_f64();
            self.emit(format_args!("{} after {:.6} seconds", label, secs));
        }
    }

    fn emit(&mut self, line: std::fmt::Arguments<'_>) {
        // Diagnostics are best effort; a closed stderr must not fail the job.
        let _ = writeln!(self.sink, "{}", line);
        let _ = self.sink.flush();
    }
}
