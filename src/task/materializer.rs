//! Task materialization
//!
//! Locates the serialized task for a job id inside the staging directory,
//! checks its schema version and builds the task instance through the
//! registry. All paths are explicit; the process working directory is never
//! changed.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::resolver::ResolverContext;

use super::envelope::{job_file_name, SCHEMA_VERSION};
use super::{MaterializeContext, Task, TaskEnvelope, TaskRegistry};

/// A deserialized task ready to run
pub struct MaterializedTask {
    /// Blob the task was loaded from
    pub source: PathBuf,
    /// Display name from the envelope
    pub name: String,
    /// The task instance
    pub task: Box<dyn Task>,
}

impl std::fmt::Debug for MaterializedTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MaterializedTask")
            .field("source", &self.source)
            .field("name", &self.name)
            .field("kind", &self.task.kind())
            .finish()
    }
}

/// Loads the one task bound to a job id
pub struct TaskMaterializer<'a> {
    registry: &'a TaskRegistry,
}

impl<'a> TaskMaterializer<'a> {
    /// Create a materializer backed by `registry`
    pub fn new(registry: &'a TaskRegistry) -> Self {
        Self { registry }
    }

    /// Path of the serialized task for a job
    pub fn blob_path(staging_dir: &Path, job_id: &str) -> PathBuf {
        staging_dir.join(job_file_name(job_id))
    }

    /// Read and decode the envelope for a job
    pub fn load_envelope(&self, staging_dir: &Path, job_id: &str) -> Result<TaskEnvelope> {
        let path = Self::blob_path(staging_dir, job_id);
        debug!(path = %path.display(), "Reading serialized task");

        let bytes = fs::read(&path).map_err(|source| match source.kind() {
            ErrorKind::NotFound => Error::TaskBlobNotFound {
                path: path.clone(),
                source,
            },
            _ => Error::TaskBlobUnreadable {
                path: path.clone(),
                source,
            },
        })?;

        let raw: serde_json::Value =
            serde_json::from_slice(&bytes).map_err(|source| Error::TaskDecode {
                path: path.clone(),
                source,
            })?;

        // Check the version before the full decode so an envelope from a newer
        // control node reports the mismatch rather than a missing field.
        if let Some(found) = raw.get("schema_version").and_then(serde_json::Value::as_u64) {
            if found != u64::from(SCHEMA_VERSION) {
                return Err(Error::TaskSchemaUnsupported {
                    path,
                    found: u32::try_from(found).unwrap_or(u32::MAX),
                    supported: SCHEMA_VERSION,
                });
            }
        }

        serde_json::from_value(raw).map_err(|source| Error::TaskDecode { path, source })
    }

    /// Load the job's envelope and build its task
    pub fn materialize(
        &self,
        staging_dir: &Path,
        job_id: &str,
        resolver: &ResolverContext,
    ) -> Result<MaterializedTask> {
        let envelope = self.load_envelope(staging_dir, job_id)?;
        let ctx = MaterializeContext {
            staging_dir,
            resolver,
        };
        let task = self.registry.build(&envelope, &ctx)?;

        info!(
            job_id,
            kind = %envelope.kind,
            name = %envelope.display_name(),
            "Task materialized"
        );

        Ok(MaterializedTask {
            source: Self::blob_path(staging_dir, job_id),
            name: envelope.display_name().to_string(),
            task,
        })
    }
}
