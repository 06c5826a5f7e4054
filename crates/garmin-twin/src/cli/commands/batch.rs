//! The `run` command

use std::ffi::OsString;

use crate::config::AppConfig;
use crate::error::Result;
use crate::pipeline::{Orchestrator, ProcessRunner, RunOutcome, DEFAULT_STAGES};

/// Run the morning batch; returns the process exit code
pub async fn run(config: &AppConfig, global_args: Vec<OsString>) -> Result<i32> {
    let mut runner = ProcessRunner::current_exe(global_args)?;
    let orchestrator = Orchestrator::new(DEFAULT_STAGES, config.settle_interval());

    let outcome = orchestrator.run(&mut runner).await;
    match &outcome {
        RunOutcome::Completed => println!("Batch completed successfully."),
        RunOutcome::Halted { stage, exit_code } => {
            println!("Batch halted at '{}' (exit code {}).", stage, exit_code)
        }
    }
    Ok(outcome.exit_code())
}
