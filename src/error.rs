//! Error types for task-bootstrap
//!
//! Provides structured error handling with:
//! - Numeric error codes for machine parsing
//! - User-friendly messages with suggestions
//! - Cause chains preserved for the stdout failure rendering
//! - Exit codes for the scheduler

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for bootstrap operations
pub type Result<T> = std::result::Result<T, Error>;

/// Boxed cause used for opaque task failures
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Numeric error codes for machine parsing and documentation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum ErrorCode {
    // Configuration errors (1xx)
    ConfigNotFound = 100,
    ConfigParseError = 101,
    ConfigValidation = 102,
    CliUsage = 103,

    // IO errors (2xx)
    IoRead = 200,
    IoWrite = 201,

    // Precondition errors (3xx)
    StagingDirMissing = 300,

    // Extraction errors (4xx)
    ArchiveUnreadable = 400,
    ArchiveEntryFailed = 401,
    ArchiveConflict = 402,

    // Materialization errors (5xx)
    TaskBlobNotFound = 500,
    TaskBlobUnreadable = 501,
    TaskDecodeFailed = 502,
    TaskSchemaUnsupported = 503,
    TaskKindUnknown = 504,
    TaskParamsInvalid = 505,
    TaskReferenceUnresolved = 506,

    // Execution errors (6xx)
    ExecutionFailed = 600,

    // Internal errors (9xx)
    InternalError = 900,
}

impl ErrorCode {
    /// Get the string code (e.g., "E100")
    pub fn as_str(&self) -> String {
        format!("E{}", *self as u16)
    }

    /// Get the process exit status (maps to 1-125 range)
    pub fn exit_code(&self) -> i32 {
        match *self as u16 {
            100..=199 => 10, // Config errors
            200..=299 => 20, // IO errors
            300..=399 => 30, // Precondition errors
            400..=499 => 40, // Extraction errors
            500..=599 => 50, // Materialization errors
            600..=699 => 60, // Execution errors
            900..=999 => 90, // Internal errors
            _ => 1,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Main error type for the bootstrap
#[derive(Error, Debug)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Configuration parse error
    #[error("Failed to parse configuration {path}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// Configuration validation error
    #[error("Configuration validation failed: {message}")]
    ConfigValidation { message: String, field: Option<String> },

    /// Arguments rejected by the command-line parser
    #[error("Invalid command line: {message}")]
    Usage { message: String },

    // ─────────────────────────────────────────────────────────────
    // IO Errors
    // ─────────────────────────────────────────────────────────────

    /// File read error
    #[error("Failed to read file: {path}")]
    IoRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File write error
    #[error("Failed to write file: {path}")]
    IoWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },


    // ─────────────────────────────────────────────────────────────
    // Precondition Errors
    // ─────────────────────────────────────────────────────────────

    /// The staging directory handed to us by the scheduler does not exist
    #[error("Staging directory does not exist: {path}")]
    StagingDirMissing { path: PathBuf },

    // ─────────────────────────────────────────────────────────────
    // Extraction Errors
    // ─────────────────────────────────────────────────────────────

    /// Archive could not be opened or its entry table could not be read
    #[error("Failed to read dependency archive {path}")]
    ArchiveUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A single entry failed to unpack
    #[error("Failed to extract {entry} from {archive}")]
    ArchiveEntryFailed {
        archive: PathBuf,
        entry: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Entry destination already exists and the policy forbids overwriting
    #[error("Refusing to overwrite {destination} while extracting {archive}")]
    ArchiveConflict {
        archive: PathBuf,
        destination: PathBuf,
    },

    // ─────────────────────────────────────────────────────────────
    // Materialization Errors
    // ─────────────────────────────────────────────────────────────

    /// No serialized task for this job id
    #[error("No serialized task found at {path}")]
    TaskBlobNotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Serialized task exists but could not be read
    #[error("Failed to read serialized task {path}")]
    TaskBlobUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Serialized task is not a valid envelope
    #[error("Failed to decode serialized task {path}")]
    TaskDecode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Envelope written by an incompatible control node
    #[error("Unsupported task schema version {found} in {path} (supported: {supported})")]
    TaskSchemaUnsupported {
        path: PathBuf,
        found: u32,
        supported: u32,
    },

    /// Envelope names a task kind nobody registered
    #[error("Unknown task kind '{kind}' (known kinds: {known})")]
    TaskKindUnknown { kind: String, known: String },

    /// Envelope params do not match the kind's parameter schema
    #[error("Invalid parameters for task kind '{kind}'")]
    TaskParamsInvalid {
        kind: String,
        #[source]
        source: serde_json::Error,
    },

    /// A code reference in the task could not be resolved
    #[error("Cannot resolve '{reference}' for task kind '{kind}' (searched {searched} locations)")]
    TaskReferenceUnresolved {
        kind: String,
        reference: String,
        searched: usize,
    },

    // ─────────────────────────────────────────────────────────────
    // Execution Errors
    // ─────────────────────────────────────────────────────────────

    /// The task's work operation failed
    #[error("Task '{task}' failed")]
    ExecutionFailed {
        task: String,
        #[source]
        source: BoxError,
    },

    // ─────────────────────────────────────────────────────────────
    // Internal Errors
    // ─────────────────────────────────────────────────────────────

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    // ─────────────────────────────────────────────────────────────
    // Error Classification
    // ─────────────────────────────────────────────────────────────

    /// Get the numeric error code
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::ConfigNotFound { .. } => ErrorCode::ConfigNotFound,
            Error::ConfigParse { .. } => ErrorCode::ConfigParseError,
            Error::ConfigValidation { .. } => ErrorCode::ConfigValidation,
            Error::Usage { .. } => ErrorCode::CliUsage,

            Error::IoRead { .. } => ErrorCode::IoRead,
            Error::IoWrite { .. } => ErrorCode::IoWrite,

            Error::StagingDirMissing { .. } => ErrorCode::StagingDirMissing,

            Error::ArchiveUnreadable { .. } => ErrorCode::ArchiveUnreadable,
            Error::ArchiveEntryFailed { .. } => ErrorCode::ArchiveEntryFailed,
            Error::ArchiveConflict { .. } => ErrorCode::ArchiveConflict,

            Error::TaskBlobNotFound { .. } => ErrorCode::TaskBlobNotFound,
            Error::TaskBlobUnreadable { .. } => ErrorCode::TaskBlobUnreadable,
            Error::TaskDecode { .. } => ErrorCode::TaskDecodeFailed,
            Error::TaskSchemaUnsupported { .. } => ErrorCode::TaskSchemaUnsupported,
            Error::TaskKindUnknown { .. } => ErrorCode::TaskKindUnknown,
            Error::TaskParamsInvalid { .. } => ErrorCode::TaskParamsInvalid,
            Error::TaskReferenceUnresolved { .. } => ErrorCode::TaskReferenceUnresolved,

            Error::ExecutionFailed { .. } => ErrorCode::ExecutionFailed,

            Error::Internal(_) => ErrorCode::InternalError,
        }
    }

    /// Get the exit code for the process
    pub fn exit_code(&self) -> i32 {
        self.code().exit_code()
    }

    // ─────────────────────────────────────────────────────────────
    // User-Friendly Messages
    // ─────────────────────────────────────────────────────────────

    /// Get a user-friendly suggestion for how to fix this error
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Error::ConfigNotFound { .. } => Some(
                "Check the --config path or unset TASK_BOOTSTRAP_CONFIG to use the default search locations."
            ),
            Error::ConfigParse { .. } => Some(
                "Check your configuration file syntax."
            ),
            Error::Usage { .. } => Some(
                "Expected: task-bootstrap [--debug] [--tarball] <staging_dir> <project_dir> <job_id>"
            ),
            Error::StagingDirMissing { .. } => Some(
                "The staging directory must be on a filesystem shared with the control node and must exist before the job starts."
            ),
            Error::ArchiveConflict { .. } => Some(
                "The staging directory was already extracted. Use a fresh directory per job or set archive.on_existing = \"overwrite\"."
            ),
            Error::TaskBlobNotFound { .. } => Some(
                "Verify that the job id matches the <job_id>.job-instance.json file staged by the control node."
            ),
            Error::TaskSchemaUnsupported { .. } => Some(
                "The control node and this bootstrap disagree on the task envelope format. Upgrade one side."
            ),
            Error::TaskKindUnknown { .. } | Error::TaskReferenceUnresolved { .. } => Some(
                "Ship the missing code in the dependency archive (--tarball) or place it in the project directory."
            ),
            _ => None,
        }
    }

    /// Format the error for terminal display with colors
    pub fn format_for_terminal(&self) -> String {
        let mut output = format!(
            "\x1b[31mError [{}]\x1b[0m: {}\n",
            self.code().as_str(),
            self
        );

        for cause in self.causes() {
            output.push_str(&format!("  caused by: {}\n", cause));
        }

        if let Some(hint) = self.suggestion() {
            output.push_str(&format!("\n\x1b[33mHint\x1b[0m: {}\n", hint));
        }

        output
    }

    /// Format the error for captured stdout (no colors, full cause chain)
    pub fn format_for_output(&self) -> String {
        let mut output = format!("Error [{}]: {}\n", self.code().as_str(), self);
        for cause in self.causes() {
            output.push_str(&format!("  caused by: {}\n", cause));
        }
        output
    }

    /// Format the error for logging (no colors)
    pub fn format_for_log(&self) -> String {
        let mut output = format!("[{}] {}", self.code().as_str(), self);
        for cause in self.causes() {
            output.push_str(&format!(": {}", cause));
        }
        output
    }

    /// Iterate over the source chain, outermost first
    fn causes(&self) -> impl Iterator<Item = &(dyn std::error::Error + 'static)> {
        std::iter::successors(std::error::Error::source(self), |e| e.source())
    }
}

// ─────────────────────────────────────────────────────────────────
// Error Constructors (for ergonomic error creation)
// ─────────────────────────────────────────────────────────────────

impl Error {
    /// Create a config validation error with field name
    pub fn config_field_invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Error::ConfigValidation {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Create an execution failure from the task's own error
    pub fn execution_failed(task: impl Into<String>, source: anyhow::Error) -> Self {
        Error::ExecutionFailed {
            task: task.into(),
            source: source.into(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
