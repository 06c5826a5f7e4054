//! Batch runner: stages in order, stop at the first failure
//!
//! ```text
//!   extract ──ok──▶ settle ──▶ transform ──ok──▶ settle ──▶ load ──ok──▶ ... ──▶ Completed
//!      │                          │                          │
//!      └─────────── exit != 0 ────┴──────────────────────────┴──────────────────▶ Halted
//! ```

use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Local;
use tokio::process::Command;
use tracing::{error, info};

use crate::error::{Result, TwinError};

/// The morning batch
pub const DEFAULT_STAGES: [&str; 4] = ["extract", "transform", "load", "coach"];

/// Executes one stage and reports its exit status
#[async_trait]
pub trait StageRunner: Send {
    async fn run_stage(&mut self, stage: &str) -> Result<i32>;
}

/// Terminal state of a batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    Halted { stage: String, exit_code: i32 },
}

impl RunOutcome {
    pub fn exit_code(&self) -> i32 {
        match self {
            RunOutcome::Completed => 0,
            RunOutcome::Halted { exit_code, .. } => *exit_code,
        }
    }
}

pub struct Orchestrator {
    stages: Vec<String>,
    settle: Duration,
}

impl Orchestrator {
    pub fn new<S: Into<String>>(stages: impl IntoIterator<Item = S>, settle: Duration) -> Self {
        Self {
            stages: stages.into_iter().map(Into::into).collect(),
            settle,
        }
    }

    pub fn stages(&self) -> &[String] {
        &self.stages
    }

    pub async fn run(&self, runner: &mut dyn StageRunner) -> RunOutcome {
        info!("==================================================");
        info!(" DIGITAL TWIN BATCH {}", Local::now().format("%Y-%m-%d %H:%M:%S"));
        info!("==================================================");

        for (index, stage) in self.stages.iter().enumerate() {
            if index > 0 && !self.settle.is_zero() {
                tokio::time::sleep(self.settle).await;
            }

            info!("---> Stage: {}", stage);
            let exit_code = match runner.run_stage(stage).await {
                Ok(code) => code,
                Err(e) => {
                    error!("Could not start stage {}: {}", stage, e);
                    1
                }
            };

            if exit_code != 0 {
                error!(
                    "Stage {} exited with {}; skipping {} remaining stage(s)",
                    stage,
                    exit_code,
                    self.stages.len() - index - 1
                );
                return RunOutcome::Halted {
                    stage: stage.clone(),
                    exit_code,
                };
            }
        }

        info!("Batch completed: {} stage(s) succeeded", self.stages.len());
        RunOutcome::Completed
    }
}

/// Runs each stage as a child process of this executable
pub struct ProcessRunner {
    program: PathBuf,
    /// Global flags forwarded to every stage (`--config`, `-v`)
    global_args: Vec<OsString>,
}

impl ProcessRunner {
    pub fn new(program: impl Into<PathBuf>, global_args: Vec<OsString>) -> Self {
        Self {
            program: program.into(),
            global_args,
        }
    }

    /// Re-invoke the running binary
    pub fn current_exe(global_args: Vec<OsString>) -> Result<Self> {
        let program = std::env::current_exe()
            .map_err(|e| TwinError::Other(format!("Cannot locate own executable: {}", e)))?;
        Ok(Self::new(program, global_args))
    }
}

#[async_trait]
impl StageRunner for ProcessRunner {
    async fn run_stage(&mut self, stage: &str) -> Result<i32> {
        let status = Command::new(&self.program)
            .args(&self.global_args)
            .arg(stage)
            .status()
            .await?;
        // killed by a signal: no code
        Ok(status.code().unwrap_or(1))
    }
}
