//! Bootstrap stage tracking
//!
//! `Start → PreconditionCheck → [ArchiveExtraction] → TaskDeserialization
//! → TaskExecution → Succeeded`, with any non-terminal stage able to move to
//! `Failed`. Stages are never revisited.

use std::fmt;
use std::time::{Duration, Instant};

use tracing::trace;

use crate::error::{Error, Result};

/// Stage of a single bootstrap run
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    /// Nothing has run yet
    Start,
    /// Verifying the staging directory exists
    PreconditionCheck,
    /// Unpacking the dependency archive
    ArchiveExtraction,
    /// Loading the serialized task
    TaskDeserialization,
    /// Running the task's work operation
    TaskExecution,
    /// Work completed
    Succeeded,
    /// Some stage failed
    Failed,
}

impl Stage {
    /// Whether no further transitions are possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Succeeded | Stage::Failed)
    }

    /// Stable name used in logs
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Start => "start",
            Stage::PreconditionCheck => "precondition_check",
            Stage::ArchiveExtraction => "archive_extraction",
            Stage::TaskDeserialization => "task_deserialization",
            Stage::TaskExecution => "task_execution",
            Stage::Succeeded => "succeeded",
            Stage::Failed => "failed",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Enforces forward-only progress through the stages
#[derive(Debug)]
pub struct StageTracker {
    current: Stage,
    entered_at: Instant,
    started_at: Instant,
    completed: Vec<(Stage, Duration)>,
}

impl StageTracker {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            current: Stage::Start,
            entered_at: now,
            started_at: now,
            completed: Vec::new(),
        }
    }

    /// Current stage
    pub fn current(&self) -> Stage {
        self.current
    }

    /// Time since the tracker was created
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Stages left so far with the time spent in each
    pub fn completed(&self) -> &[(Stage, Duration)] {
        &self.completed
    }

    /// Move to a later stage
    pub fn advance(&mut self, next: Stage) -> Result<()> {
        if self.current.is_terminal() || next <= self.current || next == Stage::Failed {
            return Err(Error::Internal(format!(
                "invalid stage transition {} -> {}",
                self.current, next
            )));
        }
        self.enter(next);
        Ok(())
    }

    /// Mark the run as failed, returning the stage that failed
    pub fn fail(&mut self) -> Stage {
        let failed_at = self.current;
        if !failed_at.is_terminal() {
            self.enter(Stage::Failed);
        }
        failed_at
    }

    fn enter(&mut self, next: Stage) {
        let spent = self.entered_at.elapsed();
        trace!(from = %self.current, to = %next, spent_ms = spent.as_millis() as u64, "Stage transition");
        self.completed.push((self.current, spent));
        self.current = next;
        self.entered_at = Instant::now();
    }
}

impl Default for StageTracker {
    fn default() -> Self {
        Self::new()
    }
}
