//! Bootstrap pipeline
//!
//! Drives one run through its stages: verify the staging directory, build the
//! resolver, optionally unpack the dependency archive, materialize the task
//! and run it. The first failing stage ends the run.

use std::path::PathBuf;
use std::time::Duration;

use tracing::{debug, error, info};

use crate::archive::ArchiveExtractor;
use crate::config::BootstrapConfig;
use crate::diagnostics::{Diagnostics, EXTRACTED_ARCHIVE, LOADED_TASK};
use crate::error::{Error, Result};
use crate::executor::{ExecutionRunner, Stage, StageTracker};
use crate::resolver::ResolverContext;
use crate::task::{MaterializedTask, TaskMaterializer, TaskRegistry};

/// Inputs of a single run
#[derive(Debug, Clone)]
pub struct BootstrapRequest {
    /// Directory holding the serialized task and optional archive
    pub staging_dir: PathBuf,
    /// Directory holding the user's project code
    pub project_dir: PathBuf,
    /// Identifier of the task instance inside the staging directory
    pub job_id: String,
    /// Unpack the dependency archive before loading the task
    pub tarball: bool,
}

/// Summary of a successful run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub task_name: String,
    pub task_source: PathBuf,
    pub archive_entries: Option<usize>,
    /// Time spent in the task's work operation
    pub work_elapsed: Duration,
    /// Time for the whole run
    pub elapsed: Duration,
}

/// Runs the bootstrap pipeline
pub struct Bootstrap<'a> {
    config: &'a BootstrapConfig,
    registry: &'a TaskRegistry,
}

impl<'a> Bootstrap<'a> {
    pub fn new(config: &'a BootstrapConfig, registry: &'a TaskRegistry) -> Self {
        Self { config, registry }
    }

    /// Run every stage for `request`
    pub fn run(&self, request: &BootstrapRequest, diagnostics: &mut Diagnostics) -> Result<RunSummary> {
        let mut tracker = StageTracker::new();

        match self.run_stages(request, diagnostics, &mut tracker) {
            Ok(summary) => {
                tracker.advance(Stage::Succeeded)?;
                for (stage, spent) in tracker.completed() {
                    debug!(stage = %stage, spent_ms = spent.as_millis() as u64, "Stage timing");
                }
                info!(
                    job_id = %request.job_id,
                    task = %summary.task_name,
                    elapsed_ms = tracker.elapsed().as_millis() as u64,
                    "Bootstrap finished"
                );
                Ok(RunSummary {
                    elapsed: tracker.elapsed(),
                    ..summary
                })
            }
            Err(e) => {
                let stage = tracker.fail();
                error!(
                    job_id = %request.job_id,
                    stage = %stage,
                    error = %e.format_for_log(),
                    "Bootstrap failed"
                );
                Err(e)
            }
        }
    }

    fn run_stages(
        &self,
        request: &BootstrapRequest,
        diagnostics: &mut Diagnostics,
        tracker: &mut StageTracker,
    ) -> Result<RunSummary> {
        tracker.advance(Stage::PreconditionCheck)?;
        if !request.staging_dir.is_dir() {
            return Err(Error::StagingDirMissing {
                path: request.staging_dir.clone(),
            });
        }

        let mut resolver = self.resolver_for(request);

        let mut archive_entries = None;
        if request.tarball {
            tracker.advance(Stage::ArchiveExtraction)?;
            let extractor = ArchiveExtractor::new(&self.config.archive);
            if let Some(report) = extractor.extract(&request.staging_dir, &mut resolver)? {
                debug!(
                    archive = %report.archive.display(),
                    root = %report.root.display(),
                    "Staging directory added to resolver"
                );
                archive_entries = Some(report.entries);
            }
        }
        diagnostics.checkpoint(EXTRACTED_ARCHIVE);

        tracker.advance(Stage::TaskDeserialization)?;
        let materialized = self.materialize(request, &resolver)?;
        diagnostics.checkpoint(LOADED_TASK);

        tracker.advance(Stage::TaskExecution)?;
        let report = ExecutionRunner::new().run(&materialized)?;

        Ok(RunSummary {
            task_name: materialized.name,
            task_source: materialized.source,
            archive_entries,
            work_elapsed: report.elapsed,
            elapsed: Duration::ZERO,
        })
    }

    fn resolver_for(&self, request: &BootstrapRequest) -> ResolverContext {
        let mut resolver = if self.config.task.inherit_path {
            ResolverContext::from_env()
        } else {
            ResolverContext::new()
        };
        resolver.append(&request.project_dir);
        debug!(search_path = ?resolver.search_path(), "Resolver initialized");
        resolver
    }

    fn materialize(&self, request: &BootstrapRequest, resolver: &ResolverContext) -> Result<MaterializedTask> {
        TaskMaterializer::new(self.registry).materialize(&request.staging_dir, &request.job_id, resolver)
    }
}
