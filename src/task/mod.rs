//! Task model
//!
//! - The serialized envelope format written by the control node
//! - The registry mapping task kinds to factories
//! - Built-in task kinds
//! - Materialization of a job's task from the staging directory

mod builtin;
mod envelope;
mod materializer;
mod registry;

pub use envelope::{job_file_name, TaskEnvelope};
pub use materializer::{MaterializedTask, TaskMaterializer};
pub use registry::{MaterializeContext, TaskRegistry};

/// A unit of work restored on the compute node
///
/// Failures from [`Task::work`] are opaque to the bootstrap and are relayed
/// with their full cause chain.
pub trait Task: Send {
    /// Registered kind this task was built from
    fn kind(&self) -> &str;

    /// Perform the work
    fn work(&self) -> anyhow::Result<()>;
}
