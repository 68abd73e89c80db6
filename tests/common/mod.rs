//! Common test utilities and fixtures
//!
//! Builds throwaway staging and project directories the way the control node
//! lays them out.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use serde_json::Value;
use tempfile::TempDir;

/// Get a command for the task-bootstrap binary with a clean environment
pub fn bootstrap_cmd() -> Command {
    let mut cmd = Command::cargo_bin("task-bootstrap").unwrap();
    for var in [
        "TASK_BOOTSTRAP_CONFIG",
        "TASK_BOOTSTRAP_LOG_LEVEL",
        "TASK_BOOTSTRAP_LOG_FILE",
        "TASK_BOOTSTRAP_LOG_JSON",
        "TASK_BOOTSTRAP_ARCHIVE_NAME",
        "TASK_BOOTSTRAP_ON_EXISTING",
        "TASK_BOOTSTRAP_INHERIT_PATH",
        "TASK_BOOTSTRAP_RUN_RECORD_DIR",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

/// Staging and project directories for one job
pub struct JobFixture {
    pub staging: TempDir,
    pub project: TempDir,
}

impl JobFixture {
    pub fn new() -> Self {
        Self {
            staging: TempDir::new().unwrap(),
            project: TempDir::new().unwrap(),
        }
    }

    pub fn staging_dir(&self) -> &Path {
        self.staging.path()
    }

    pub fn project_dir(&self) -> &Path {
        self.project.path()
    }

    /// Write the serialized task for `job_id`
    pub fn write_task(&self, job_id: &str, envelope: &Value) -> PathBuf {
        let path = self
            .staging_dir()
            .join(format!("{}.job-instance.json", job_id));
        fs::write(&path, serde_json::to_vec_pretty(envelope).unwrap()).unwrap();
        path
    }

    /// Write raw bytes as the serialized task for `job_id`
    pub fn write_raw_task(&self, job_id: &str, bytes: &[u8]) {
        fs::write(
            self.staging_dir().join(format!("{}.job-instance.json", job_id)),
            bytes,
        )
        .unwrap();
    }

    /// Stage a dependency archive holding `files` as (path, contents, mode)
    pub fn write_archive(&self, name: &str, files: &[(&str, &str, u32)]) {
        let file = fs::File::create(self.staging_dir().join(name)).unwrap();
        let mut builder = tar::Builder::new(file);
        for (path, contents, mode) in files {
            let mut header = tar::Header::new_gnu();
            header.set_size(contents.len() as u64);
            header.set_mode(*mode);
            header.set_cksum();
            builder
                .append_data(&mut header, path, contents.as_bytes())
                .unwrap();
        }
        builder.finish().unwrap();
    }

    /// Command invoking the bootstrap for `job_id` with the given flags
    pub fn cmd(&self, job_id: &str, flags: &[&str]) -> Command {
        let mut cmd = bootstrap_cmd();
        cmd.args(flags)
            .arg(self.staging_dir())
            .arg(self.project_dir())
            .arg(job_id);
        cmd
    }
}
