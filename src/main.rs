//! Task bootstrap - compute-node entry point for staged tasks
//!
//! This is the main entry point for the task-bootstrap binary.
//! The scheduler launches it with a staging directory, a project directory
//! and a job id; it loads that job's serialized task and runs it. On failure
//! the error is printed to stdout, where the control node collects it, and
//! the process exits with the error's exit code.

mod archive;
mod bootstrap;
mod cli;
mod config;
mod diagnostics;
mod error;
mod executor;
mod logging;
mod resolver;
mod run_record;
mod task;
mod version;

use std::io::{IsTerminal, Write};

use clap::Parser;
use tracing::debug;

use crate::bootstrap::{Bootstrap, BootstrapRequest};
use crate::cli::Cli;
use crate::config::BootstrapConfig;
use crate::diagnostics::Diagnostics;
use crate::error::{Error, Result};
use crate::task::TaskRegistry;

fn main() {
    // Parse CLI arguments first (before logging, so we know verbosity)
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        // --help and --version
        Err(e) if !e.use_stderr() => e.exit(),
        Err(e) => report_failure(&usage_error(&e)),
    };
    let mut diagnostics = Diagnostics::stderr(cli.debug);

    if let Err(e) = run(&cli, &mut diagnostics) {
        report_failure(&e);
    }
}

/// Convert a parser rejection into a bootstrap error
fn usage_error(e: &clap::Error) -> Error {
    let rendered = e.to_string();
    let message = rendered
        .trim_end()
        .strip_prefix("error: ")
        .unwrap_or(rendered.trim_end())
        .to_string();
    Error::Usage { message }
}

/// Render a failure on stdout and exit with its code
fn report_failure(e: &Error) -> ! {
    // stdout carries the failure back to the control node
    let mut stdout = std::io::stdout().lock();
    let _ = stdout.write_all(e.format_for_output().as_bytes());
    let _ = stdout.flush();
    if std::io::stderr().is_terminal() {
        eprint!("{}", e.format_for_terminal());
    }
    std::process::exit(e.exit_code());
}

/// Load configuration, set up logging and run the bootstrap
///
/// Log guards live in this frame so buffered file output is flushed before
/// `main` decides the exit code.
fn run(cli: &Cli, diagnostics: &mut Diagnostics) -> Result<()> {
    let config = BootstrapConfig::load(cli.config.as_deref())?;

    let _log_guards = logging::init_logging(&config.logging, cli.verbose, cli.quiet)?;

    let build = version::build_info();
    debug!(
        version = %build.full_version(),
        target = %build.target,
        profile = %build.profile,
        "Starting task bootstrap"
    );

    let args: Vec<String> = std::env::args_os()
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect();
    run_record::record_invocation(&config.run_record, &args);

    let request = BootstrapRequest {
        staging_dir: cli.staging_dir.clone(),
        project_dir: cli.project_dir.clone(),
        job_id: cli.job_id.clone(),
        tarball: cli.tarball,
    };

    let registry = TaskRegistry::with_builtins();
    let summary = Bootstrap::new(&config, &registry).run(&request, diagnostics)?;
    debug!(
        task = %summary.task_name,
        source = %summary.task_source.display(),
        archive_entries = ?summary.archive_entries,
        work_ms = summary.work_elapsed.as_millis() as u64,
        elapsed_ms = summary.elapsed.as_millis() as u64,
        "Task finished"
    );

    Ok(())
}
