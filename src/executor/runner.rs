//! Task execution runner
//!
//! Invokes the materialized task's work operation exactly once, with no
//! timeout and no retry.

use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::task::{MaterializedTask, Task};

/// Outcome of a successful execution
#[derive(Debug, Clone, Copy)]
pub struct ExecutionReport {
    /// Wall time spent in the work operation
    pub elapsed: Duration,
}

/// Runs a materialized task
#[derive(Debug, Default)]
pub struct ExecutionRunner;

impl ExecutionRunner {
    pub fn new() -> Self {
        Self
    }

    /// Run the task's work operation
    ///
    /// Any failure is wrapped as [`Error::ExecutionFailed`] with the task's
    /// own error kept as the source.
    pub fn run(&self, materialized: &MaterializedTask) -> Result<ExecutionReport> {
        let task: &dyn Task = materialized.task.as_ref();
        let started = Instant::now();

        debug!(task = %materialized.name, kind = task.kind(), "Starting task execution");

        task.work()
            .map_err(|source| Error::execution_failed(materialized.name.clone(), source))?;

        let elapsed = started.elapsed();
        info!(
            task = %materialized.name,
            kind = task.kind(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Task completed successfully"
        );

        Ok(ExecutionReport { elapsed })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Counting {
        calls: Arc<AtomicUsize>,
        fail_with: Option<&'static str>,
    }

    impl Task for Counting {
        fn kind(&self) -> &str {
            "counting"
        }

        fn work(&self) -> anyhow::Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.fail_with {
                Some(message) => Err(anyhow::anyhow!(message)),
                None => Ok(()),
            }
        }
    }

    fn materialized(calls: &Arc<AtomicUsize>, fail_with: Option<&'static str>) -> MaterializedTask {
        MaterializedTask {
            source: PathBuf::from("/stage/1.job-instance.json"),
            name: "counting-job".to_string(),
            task: Box::new(Counting {
                calls: calls.clone(),
                fail_with,
            }),
        }
    }

    #[test]
    fn test_runs_work_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        ExecutionRunner::new().run(&materialized(&calls, None)).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failure_is_relayed_not_retried() {
        let calls = Arc::new(AtomicUsize::new(0));
        let err = ExecutionRunner::new()
            .run(&materialized(&calls, Some("out of cheese")))
            .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(err.exit_code(), 60);
        assert!(err.format_for_output().contains("out of cheese"));
        assert!(err.to_string().contains("counting-job"));
    }
}
