//! Per-invocation run records
//!
//! Optional breadcrumb of where and how a job was launched, written before
//! the task runs so it survives a job that is later killed by the scheduler.
//! Records are sharded by scheduler job number: job `1234` lands in
//! `<dir>/00/00/12/34/run-record.json`.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::RunRecordSettings;
use crate::error::{Error, Result};

/// File name of a record inside its shard directory
pub const RECORD_FILE_NAME: &str = "run-record.json";

/// Snapshot of the invocation
#[derive(Debug, Clone, Serialize)]
pub struct RunRecord {
    pub hostname: String,
    pub args: Vec<String>,
    pub job_number: String,
    pub recorded_at: DateTime<Utc>,
    pub env: BTreeMap<String, String>,
}

impl RunRecord {
    /// Capture the current process context
    pub fn capture(args: &[String], job_id_env: &str) -> Self {
        let hostname = hostname::get()
            .ok()
            .and_then(|h| h.into_string().ok())
            .unwrap_or_else(|| "unknown".to_string());

        let env: BTreeMap<String, String> = std::env::vars_os()
            .map(|(k, v)| (k.to_string_lossy().into_owned(), v.to_string_lossy().into_owned()))
            .collect();

        let job_number = env.get(job_id_env).cloned().unwrap_or_else(|| "0".to_string());

        Self {
            hostname,
            args: args.to_vec(),
            job_number,
            recorded_at: Utc::now(),
            env,
        }
    }

    /// Write the record under `root`, returning the file path
    pub fn write(&self, root: &Path) -> Result<PathBuf> {
        let dir = root.join(shard_path(&self.job_number));
        fs::create_dir_all(&dir).map_err(|source| Error::IoWrite {
            path: dir.clone(),
            source,
        })?;

        let path = dir.join(RECORD_FILE_NAME);
        let body = serde_json::to_vec_pretty(self)
            .map_err(|e| Error::Internal(format!("Failed to encode run record: {}", e)))?;
        fs::write(&path, body).map_err(|source| Error::IoWrite {
            path: path.clone(),
            source,
        })?;

        Ok(path)
    }
}

/// Shard directory for a job number
///
/// Numbers are zero-padded to eight digits and split into two-digit levels.
/// Anything that is not a plain number goes under `unknown/`.
pub fn shard_path(job_number: &str) -> PathBuf {
    let Ok(number) = job_number.trim().parse::<u64>() else {
        return PathBuf::from("unknown");
    };

    let digits = format!("{:08}", number);
    digits
        .as_bytes()
        .chunks(2)
        .map(|pair| String::from_utf8_lossy(pair).into_owned())
        .collect()
}

/// Write a run record if enabled; failures are logged, never fatal
pub fn record_invocation(settings: &RunRecordSettings, args: &[String]) {
    if !settings.enabled {
        return;
    }
    let Some(ref dir) = settings.dir else {
        return;
    };

    let record = RunRecord::capture(args, &settings.job_id_env);
    match record.write(Path::new(dir)) {
        Ok(path) => debug!(path = %path.display(), "Run record written"),
        Err(e) => warn!(error = %e.format_for_log(), "Failed to write run record"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_shard_path() {
        assert_eq!(shard_path("1234"), PathBuf::from("00/00/12/34"));
        assert_eq!(shard_path("0"), PathBuf::from("00/00/00/00"));
        assert_eq!(shard_path("987654321"), PathBuf::from("98/76/54/32/1"));
        assert_eq!(shard_path("abc"), PathBuf::from("unknown"));
    }

    #[test]
    fn test_write_record() {
        let root = TempDir::new().unwrap();
        let record = RunRecord {
            hostname: "node-17".to_string(),
            args: vec!["task-bootstrap".into(), "/stage".into(), "/proj".into(), "42".into()],
            job_number: "42".to_string(),
            recorded_at: Utc::now(),
            env: BTreeMap::from([("JOB_ID".to_string(), "42".to_string())]),
        };

        let path = record.write(root.path()).unwrap();

        assert_eq!(path, root.path().join("00/00/00/42").join(RECORD_FILE_NAME));
        let written: serde_json::Value =
            serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        assert_eq!(written["hostname"], "node-17");
        assert_eq!(written["args"][3], "42");
    }

    #[test]
    fn test_capture_defaults_job_number() {
        let record = RunRecord::capture(&["prog".to_string()], "TASK_BOOTSTRAP_TEST_UNSET_JOB");
        assert_eq!(record.job_number, "0");
        assert!(!record.hostname.is_empty());
    }

    #[test]
    fn test_disabled_does_nothing() {
        let root = TempDir::new().unwrap();
        let settings = RunRecordSettings {
            enabled: false,
            dir: Some(root.path().to_string_lossy().into_owned()),
            ..Default::default()
        };

        record_invocation(&settings, &["prog".to_string()]);

        assert_eq!(fs::read_dir(root.path()).unwrap().count(), 0);
    }
}
