//! Configuration system for task-bootstrap
//!
//! Supports multiple configuration sources with the following precedence (highest to lowest):
//! 1. CLI arguments
//! 2. Environment variables (TASK_BOOTSTRAP_* prefix)
//! 3. Configuration file (TOML)
//! 4. Default values
//!
//! Every setting has a default so a bare scheduler invocation works without
//! any file on the compute node.

use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

/// Main bootstrap configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapConfig {
    /// Logging configuration
    pub logging: LoggingSettings,

    /// Dependency archive handling
    pub archive: ArchiveSettings,

    /// Task resolution settings
    pub task: TaskSettings,

    /// Per-invocation diagnostic record
    pub run_record: RunRecordSettings,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log level: trace, debug, info, warn, error
    pub level: String,

    /// Log file path (empty = no file logging)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,

    /// Number of rotated log files to keep
    pub max_files: u32,

    /// Enable JSON formatted logging
    pub json_format: bool,
}

/// What to do when an archive entry's destination already exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExistingEntryPolicy {
    /// Replace existing files with the archive's version
    #[default]
    Overwrite,
    /// Abort extraction on the first pre-existing destination
    Fail,
}

impl ExistingEntryPolicy {
    /// Parse from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "overwrite" => Some(ExistingEntryPolicy::Overwrite),
            "fail" => Some(ExistingEntryPolicy::Fail),
            _ => None,
        }
    }
}

/// Dependency archive settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveSettings {
    /// Archive file name inside the staging directory
    pub file_name: String,

    /// Re-extraction policy
    pub on_existing: ExistingEntryPolicy,
}

/// Task resolution settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskSettings {
    /// Include the ambient PATH in the resolver search path
    pub inherit_path: bool,
}

/// Run record settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunRecordSettings {
    /// Write a run record before executing the task
    pub enabled: bool,

    /// Root directory for sharded run records
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,

    /// Environment variable holding the scheduler's job number
    pub job_id_env: String,
}

// Default implementations

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            file: None,
            max_files: 5,
            json_format: false,
        }
    }
}

impl Default for ArchiveSettings {
    fn default() -> Self {
        Self {
            file_name: "packages.tar".to_string(),
            on_existing: ExistingEntryPolicy::Overwrite,
        }
    }
}

impl Default for TaskSettings {
    fn default() -> Self {
        Self { inherit_path: true }
    }
}

impl Default for RunRecordSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            dir: None,
            job_id_env: "JOB_ID".to_string(),
        }
    }
}

impl BootstrapConfig {
    /// Load configuration from file with environment variable overrides
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut config = Self::default();

        // 1. Load from config file if it exists
        if let Some(path) = Self::find_config_file(config_path)? {
            debug!(path = %path.display(), "Loading configuration file");
            let content = fs::read_to_string(&path).map_err(|e| Error::IoRead {
                path: path.clone(),
                source: e,
            })?;
            config = toml::from_str(&content).map_err(|e| Error::ConfigParse {
                path: path.clone(),
                source: e,
            })?;
        }

        // 2. Apply environment variable overrides
        config.apply_env_overrides()?;

        // 3. Expand paths
        config.expand_paths();

        // 4. Validate
        config.validate()?;

        Ok(config)
    }

    /// Find the configuration file to use
    fn find_config_file(explicit_path: Option<&str>) -> Result<Option<PathBuf>> {
        // If explicit path provided, use it (error if not found)
        if let Some(path) = explicit_path {
            let path = PathBuf::from(expand_path(path));
            if path.exists() {
                return Ok(Some(path));
            }
            return Err(Error::ConfigNotFound { path });
        }

        let search_paths = [
            PathBuf::from("task-bootstrap.toml"),
            dirs::config_dir()
                .map(|p| p.join("task-bootstrap").join("config.toml"))
                .unwrap_or_default(),
            dirs::home_dir()
                .map(|p| p.join(".task-bootstrap").join("config.toml"))
                .unwrap_or_default(),
            PathBuf::from("/etc/task-bootstrap/config.toml"),
        ];

        for path in &search_paths {
            if !path.as_os_str().is_empty() && path.exists() {
                debug!(path = %path.display(), "Found configuration file");
                return Ok(Some(path.clone()));
            }
        }

        Ok(None)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(val) = std::env::var("TASK_BOOTSTRAP_LOG_LEVEL") {
            self.logging.level = val;
        }
        if let Ok(val) = std::env::var("TASK_BOOTSTRAP_LOG_FILE") {
            self.logging.file = Some(val);
        }
        if let Ok(val) = std::env::var("TASK_BOOTSTRAP_LOG_JSON") {
            self.logging.json_format = parse_bool(&val);
        }

        if let Ok(val) = std::env::var("TASK_BOOTSTRAP_ARCHIVE_NAME") {
            self.archive.file_name = val;
        }
        if let Ok(val) = std::env::var("TASK_BOOTSTRAP_ON_EXISTING") {
            self.archive.on_existing = ExistingEntryPolicy::from_str(&val).ok_or_else(|| {
                Error::config_field_invalid(
                    "archive.on_existing",
                    format!(
                        "Invalid TASK_BOOTSTRAP_ON_EXISTING '{}'. Must be one of: overwrite, fail",
                        val
                    ),
                )
            })?;
        }

        if let Ok(val) = std::env::var("TASK_BOOTSTRAP_INHERIT_PATH") {
            self.task.inherit_path = parse_bool(&val);
        }

        if let Ok(val) = std::env::var("TASK_BOOTSTRAP_RUN_RECORD_DIR") {
            self.run_record.dir = Some(val);
            self.run_record.enabled = true;
        }

        Ok(())
    }

    /// Expand ~ and other path variables
    fn expand_paths(&mut self) {
        if let Some(ref file) = self.logging.file {
            self.logging.file = Some(expand_path(file));
        }
        if let Some(ref dir) = self.run_record.dir {
            self.run_record.dir = Some(expand_path(dir));
        }
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(Error::config_field_invalid(
                "logging.level",
                format!(
                    "Invalid log level '{}'. Must be one of: {}",
                    self.logging.level,
                    valid_levels.join(", ")
                ),
            ));
        }

        let name = self.archive.file_name.as_str();
        if name.is_empty() || name.contains('/') || name.contains('\\') {
            return Err(Error::config_field_invalid(
                "archive.file_name",
                format!("Archive file name '{}' must be a bare file name", name),
            ));
        }

        if self.run_record.enabled && self.run_record.dir.is_none() {
            return Err(Error::config_field_invalid(
                "run_record.dir",
                "run_record.enabled requires run_record.dir",
            ));
        }

        if self.run_record.job_id_env.is_empty() {
            return Err(Error::config_field_invalid(
                "run_record.job_id_env",
                "job_id_env cannot be empty",
            ));
        }

        Ok(())
    }
}

fn parse_bool(val: &str) -> bool {
    val.to_lowercase() == "true" || val == "1"
}

/// Expand ~ and environment variables in paths
fn expand_path(path: &str) -> String {
    shellexpand::full(path)
        .unwrap_or_else(|_| std::borrow::Cow::Borrowed(path))
        .into_owned()
}
