//! Serialized task envelope
//!
//! The control node writes one envelope per job as
//! `<job_id>.job-instance.json` in the staging directory:
//!
//! ```json
//! {
//!   "schema_version": 1,
//!   "kind": "write_file",
//!   "name": "export-report",
//!   "params": { "path": "out/report.txt", "contents": "done" }
//! }
//! ```
//!
//! `kind` names a factory in the [`TaskRegistry`](super::TaskRegistry);
//! `params` is decoded by that factory into its own typed parameters.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Envelope schema version understood by this build
pub const SCHEMA_VERSION: u32 = 1;

/// Extension of serialized task files
pub const JOB_FILE_EXTENSION: &str = "json";

/// File name holding the serialized task for a job
pub fn job_file_name(job_id: &str) -> String {
    format!("{}.job-instance.{}", job_id, JOB_FILE_EXTENSION)
}

/// One serialized task instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskEnvelope {
    /// Envelope format version
    pub schema_version: u32,

    /// Registered task kind that knows how to build this task
    pub kind: String,

    /// Optional human-readable name, used for logging only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Kind-specific parameters
    #[serde(default = "empty_params")]
    pub params: serde_json::Value,
}

fn empty_params() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

// Envelopes are produced by the control node; these builders exist for tests.
#[cfg(test)]
impl TaskEnvelope {
    pub fn new(kind: impl Into<String>, params: serde_json::Value) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            kind: kind.into(),
            name: None,
            params,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

impl TaskEnvelope {
    /// Name used in logs and failure messages
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.kind)
    }

    /// Decode `params` into the kind's parameter type
    pub fn decode_params<T: DeserializeOwned>(&self) -> Result<T> {
        let params = if self.params.is_null() {
            empty_params()
        } else {
            self.params.clone()
        };
        serde_json::from_value(params).map_err(|source| Error::TaskParamsInvalid {
            kind: self.kind.clone(),
            source,
        })
    }
}
