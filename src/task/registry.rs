//! Task kind registry
//!
//! Maps the `kind` named in a task envelope to the factory that builds it.
//! This is the explicit, by-name code reference the control node relies on.

use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{Error, Result};
use crate::resolver::ResolverContext;

use super::builtin::{CommandTask, WriteFileTask};
use super::{Task, TaskEnvelope};

/// What a factory may consult while building a task
#[derive(Debug, Clone, Copy)]
pub struct MaterializeContext<'a> {
    /// Base for relative references inside the envelope
    pub staging_dir: &'a Path,
    /// Search path for named code references
    pub resolver: &'a ResolverContext,
}

/// Builds a task instance from its envelope
pub type TaskFactory =
    Box<dyn Fn(&TaskEnvelope, &MaterializeContext<'_>) -> Result<Box<dyn Task>> + Send + Sync>;

/// Registry of known task kinds
pub struct TaskRegistry {
    factories: BTreeMap<String, TaskFactory>,
}

impl TaskRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// Create a registry with the built-in task kinds
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(WriteFileTask::KIND, WriteFileTask::from_envelope);
        registry.register(CommandTask::KIND, CommandTask::from_envelope);
        registry
    }

    /// Register a factory, replacing any previous one for the same kind
    pub fn register<F>(&mut self, kind: impl Into<String>, factory: F)
    where
        F: Fn(&TaskEnvelope, &MaterializeContext<'_>) -> Result<Box<dyn Task>>
            + Send
            + Sync
            + 'static,
    {
        self.factories.insert(kind.into(), Box::new(factory));
    }

    /// Registered kinds in sorted order
    pub fn kinds(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    /// Build the task an envelope describes
    pub fn build(
        &self,
        envelope: &TaskEnvelope,
        ctx: &MaterializeContext<'_>,
    ) -> Result<Box<dyn Task>> {
        let factory = self
            .factories
            .get(&envelope.kind)
            .ok_or_else(|| Error::TaskKindUnknown {
                kind: envelope.kind.clone(),
                known: self.kinds().join(", "),
            })?;
        factory(envelope, ctx)
    }
}

impl Default for TaskRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}
