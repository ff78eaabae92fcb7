//! Flash job orchestrator
//!
//! Owns the single process-wide job record and enforces that at most one
//! flash runs at a time. A flash is started synchronously by [`FlashOrchestrator::start`]
//! and then runs on a background tokio task that streams the tool's output
//! into the bounded log until the process exits.
//!
//! ```text
//!   ready ──start──▶ flashing ──exit 0──▶ success
//!                       │                   │
//!                       └──error/exit≠0──▶ failed
//!   success | failed ──start──▶ flashing
//! ```
//!
//! The job lock is only held while reading or updating the record, never
//! across a line read or the process wait.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::credentials::CredentialDirectory;
use crate::dispatch::Dispatcher;
use crate::error::StartError;
use crate::identity::{UnitIdentity, UnitRequest};
use crate::launcher::{ProcessLauncher, RunningProcess};
use crate::log_buffer::{sanitize_line, LogBuffer};

/// Returned to the caller when a job is accepted
pub const FLASH_STARTED: &str = "Flash started.";

const READY_MESSAGE: &str = "Ready to flash Flex Plus";
const COMPLETED_LINE: &str = "Flash completed successfully.";
const FAILED_LINE: &str = "Flash failed. Check above logs.";

/// Job status as shown to operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Ready,
    Flashing,
    Success,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Success | JobStatus::Failed)
    }
}

/// The mutable job record
#[derive(Debug)]
struct Job {
    busy: bool,
    status: JobStatus,
    message: String,
    log: LogBuffer,
}

impl Default for Job {
    fn default() -> Self {
        Self {
            busy: false,
            status: JobStatus::Ready,
            message: READY_MESSAGE.to_string(),
            log: LogBuffer::default(),
        }
    }
}

/// Point-in-time copy of the job record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobSnapshot {
    pub status: JobStatus,
    pub message: String,
    pub busy: bool,
    /// Log lines joined with `\n`
    pub logs: String,
}

/// Orchestrator tuning
#[derive(Debug, Clone, Default)]
pub struct OrchestratorConfig {
    /// Kill the flashing tool after this long. `None` waits forever.
    pub flash_timeout: Option<Duration>,
}

struct Inner {
    job: Mutex<Job>,
    credentials: Arc<CredentialDirectory>,
    dispatcher: Dispatcher,
    launcher: Arc<dyn ProcessLauncher>,
    config: OrchestratorConfig,
}

/// Handle to the job state machine, cheap to clone
#[derive(Clone)]
pub struct FlashOrchestrator {
    inner: Arc<Inner>,
}

enum Outcome {
    Success,
    Failure,
}

impl FlashOrchestrator {
    pub fn new(
        credentials: Arc<CredentialDirectory>,
        dispatcher: Dispatcher,
        launcher: Arc<dyn ProcessLauncher>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                job: Mutex::new(Job::default()),
                credentials,
                dispatcher,
                launcher,
                config,
            }),
        }
    }

    pub fn credentials(&self) -> &CredentialDirectory {
        &self.inner.credentials
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.inner.dispatcher
    }

    /// Start flashing the unit described by `request`.
    ///
    /// Returns immediately; the flash itself runs on a spawned task and its
    /// result is only visible through [`FlashOrchestrator::state`]. Must be
    /// called from within a tokio runtime.
    pub fn start(&self, request: &UnitRequest, port: Option<&str>) -> Result<(), StartError> {
        let unit = self.inner.credentials.lookup(request)?;

        {
            let mut job = self.inner.job.lock();
            if job.busy {
                debug!(identifier = %unit.identifier, "Rejected flash, job busy");
                return Err(StartError::Busy);
            }
            job.busy = true;
            job.status = JobStatus::Flashing;
            job.message = format!("Flashing {}...", unit.identifier);
            job.log
                .reset([unit.banner(), format!("SSID: {}", unit.identifier)]);
        }

        info!(
            identifier = %unit.identifier,
            batch = unit.batch,
            serial = unit.serial_number,
            "Flash started"
        );

        let port = port
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string);
        let inner = self.inner.clone();
        tokio::spawn(async move { inner.run_flash(unit, port).await });

        Ok(())
    }

    /// Consistent copy of the current job record
    pub fn state(&self) -> JobSnapshot {
        let job = self.inner.job.lock();
        JobSnapshot {
            status: job.status,
            message: job.message.clone(),
            busy: job.busy,
            logs: job.log.joined(),
        }
    }
}

impl Inner {
    fn append(&self, line: &str) {
        let line = sanitize_line(line);
        self.job.lock().log.push(line);
    }

    async fn run_flash(self: Arc<Self>, unit: UnitIdentity, port: Option<String>) {
        let outcome = self.execute(&unit, port.as_deref()).await;
        self.finish(&unit, outcome);
    }

    async fn execute(&self, unit: &UnitIdentity, port: Option<&str>) -> Outcome {
        let command = match self.dispatcher.build(unit, port) {
            Ok(command) => command,
            Err(e) => {
                warn!(identifier = %unit.identifier, error = %e, "Flash dispatch failed");
                self.append(&format!("Error: {}", e));
                return Outcome::Failure;
            }
        };

        self.append(&format!("Command: {}", command.display_redacted()));

        let mut process = match self.launcher.launch(&command) {
            Ok(process) => process,
            Err(e) => {
                warn!(identifier = %unit.identifier, error = %e, "Failed to launch flash tool");
                self.append(&format!("Error launching flash: {}", e));
                return Outcome::Failure;
            }
        };

        match self.config.flash_timeout {
            None => self.supervise(process.as_mut()).await,
            Some(limit) => {
                let supervised =
                    tokio::time::timeout(limit, self.supervise(process.as_mut())).await;
                match supervised {
                    Ok(outcome) => outcome,
                    Err(_) => {
                        warn!(
                            identifier = %unit.identifier,
                            timeout = ?limit,
                            "Flash timed out, killing tool"
                        );
                        if let Err(e) = process.kill().await {
                            warn!(error = %e, "Failed to kill flash tool");
                        }
                        self.append(&format!("Error: flash timed out after {:?}", limit));
                        Outcome::Failure
                    }
                }
            }
        }
    }

    /// Feed output into the log line by line, then wait for exit.
    async fn supervise(&self, process: &mut dyn RunningProcess) -> Outcome {
        loop {
            match process.next_line().await {
                Ok(Some(line)) => self.append(&line),
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "Failed reading flash output");
                    self.append(&format!("Error reading flash output: {}", e));
                    break;
                }
            }
        }

        match process.wait().await {
            Ok(exit) if exit.success() => Outcome::Success,
            Ok(exit) => {
                info!(exit_code = ?exit.code, "Flash tool exited with failure");
                Outcome::Failure
            }
            Err(e) => {
                warn!(error = %e, "Failed waiting for flash tool");
                self.append(&format!("Error launching flash: {}", e));
                Outcome::Failure
            }
        }
    }

    fn finish(&self, unit: &UnitIdentity, outcome: Outcome) {
        let mut job = self.job.lock();
        job.busy = false;
        match outcome {
            Outcome::Success => {
                job.status = JobStatus::Success;
                job.message = format!("Successfully flashed {}.", unit.identifier);
                job.log.push(COMPLETED_LINE);
                info!(identifier = %unit.identifier, "Flash succeeded");
            }
            Outcome::Failure => {
                job.status = JobStatus::Failed;
                job.message = format!("Failed flashing {}. Retry.", unit.identifier);
                job.log.push(FAILED_LINE);
                warn!(identifier = %unit.identifier, "Flash failed");
            }
        }
    }
}
