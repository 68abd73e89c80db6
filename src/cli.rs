//! CLI argument parsing using clap v4
//!
//! Defines the command-line interface for the task bootstrap.

use std::path::PathBuf;

use clap::Parser;

/// Task bootstrap - runs one staged task on a compute node
///
/// Invoked by a batch scheduler on a node that shares a filesystem with the
/// control node. Loads the serialized task for JOB_ID from STAGING_DIR and
/// runs it, optionally unpacking the staged dependency archive first.
#[derive(Parser, Debug)]
#[command(name = "task-bootstrap")]
#[command(author, version, about, long_about = None)]
#[command(long_version = crate::version::long_version())]
pub struct Cli {
    /// Print timing checkpoints to stderr
    #[arg(long)]
    pub debug: bool,

    /// Unpack the staged dependency archive before loading the task
    #[arg(long)]
    pub tarball: bool,

    /// Path to configuration file
    #[arg(short, long, env = "TASK_BOOTSTRAP_CONFIG")]
    pub config: Option<String>,

    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all log output except errors
    #[arg(short, long)]
    pub quiet: bool,

    /// Directory holding the serialized task and optional archive
    pub staging_dir: PathBuf,

    /// Directory holding the project's code
    pub project_dir: PathBuf,

    /// Identifier of the task instance to run
    pub job_id: String,
}
