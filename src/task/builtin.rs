//! Built-in task kinds

use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{bail, Context};
use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};

use super::{MaterializeContext, Task, TaskEnvelope};

// ─────────────────────────────────────────────────────────────────
// write_file
// ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct WriteFileParams {
    path: PathBuf,
    contents: String,
    #[serde(default)]
    create_dirs: bool,
    #[serde(default)]
    append: bool,
}

/// Writes a fixed payload to a file
///
/// A relative `path` is relative to the bootstrap's working directory when
/// the work runs, not to the staging directory.
#[derive(Debug)]
pub struct WriteFileTask {
    path: PathBuf,
    contents: String,
    create_dirs: bool,
    append: bool,
}

impl WriteFileTask {
    pub const KIND: &'static str = "write_file";

    pub fn from_envelope(
        envelope: &TaskEnvelope,
        _ctx: &MaterializeContext<'_>,
    ) -> Result<Box<dyn Task>> {
        let params: WriteFileParams = envelope.decode_params()?;
        Ok(Box::new(Self {
            path: params.path,
            contents: params.contents,
            create_dirs: params.create_dirs,
            append: params.append,
        }))
    }
}

impl Task for WriteFileTask {
    fn kind(&self) -> &str {
        Self::KIND
    }

    fn work(&self) -> anyhow::Result<()> {
        if self.create_dirs {
            if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)
                    .with_context(|| format!("creating directory {}", parent.display()))?;
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .append(self.append)
            .truncate(!self.append)
            .open(&self.path)
            .with_context(|| format!("opening {}", self.path.display()))?;

        file.write_all(self.contents.as_bytes())
            .with_context(|| format!("writing {}", self.path.display()))?;

        debug!(path = %self.path.display(), bytes = self.contents.len(), "File written");
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────
// command
// ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CommandParams {
    program: String,
    #[serde(default)]
    args: Vec<String>,
    #[serde(default)]
    env: BTreeMap<String, String>,
    #[serde(default)]
    working_dir: Option<PathBuf>,
}

/// Runs a program shipped with the job or found on the resolver path
///
/// The program is resolved while the task is materialized, so a missing
/// program fails the job before any work starts.
#[derive(Debug)]
pub struct CommandTask {
    program: PathBuf,
    args: Vec<String>,
    env: BTreeMap<String, String>,
    working_dir: Option<PathBuf>,
}

impl CommandTask {
    pub const KIND: &'static str = "command";

    pub fn from_envelope(
        envelope: &TaskEnvelope,
        ctx: &MaterializeContext<'_>,
    ) -> Result<Box<dyn Task>> {
        let params: CommandParams = envelope.decode_params()?;
        let program = resolve_program(&params.program, ctx).ok_or_else(|| {
            Error::TaskReferenceUnresolved {
                kind: Self::KIND.to_string(),
                reference: params.program.clone(),
                searched: ctx.resolver.search_path().len(),
            }
        })?;

        debug!(program = %program.display(), "Resolved command program");

        Ok(Box::new(Self {
            program,
            args: params.args,
            env: params.env,
            working_dir: params.working_dir,
        }))
    }
}

/// Absolute paths are taken as-is, paths with a separator are relative to the
/// staging directory, and bare names go through the resolver search path.
fn resolve_program(program: &str, ctx: &MaterializeContext<'_>) -> Option<PathBuf> {
    let candidate = Path::new(program);
    if program.is_empty() {
        None
    } else if candidate.is_absolute() {
        candidate.is_file().then(|| candidate.to_path_buf())
    } else if candidate.components().count() > 1 {
        let staged = ctx.staging_dir.join(candidate);
        staged.is_file().then_some(staged)
    } else {
        ctx.resolver.resolve(program)
    }
}

impl Task for CommandTask {
    fn kind(&self) -> &str {
        Self::KIND
    }

    fn work(&self) -> anyhow::Result<()> {
        let mut command = Command::new(&self.program);
        command.args(&self.args).envs(&self.env);
        if let Some(ref dir) = self.working_dir {
            command.current_dir(dir);
        }

        let status = command
            .status()
            .with_context(|| format!("spawning {}", self.program.display()))?;

        if !status.success() {
            bail!("{} exited unsuccessfully ({})", self.program.display(), status);
        }
        Ok(())
    }
}
