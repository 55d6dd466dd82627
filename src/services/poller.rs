// src/services/poller.rs
//! Client-side status polling for video jobs.
//!
//! A [`JobPoller`] issues one status query per cycle and reports the observed
//! status together with the delay before the next query, or `None` once the
//! job is terminal. [`JobPoller::spawn`] drives the cycles on a background
//! task and hands back a [`PollHandle`] that can cancel it.
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::config::PollConfig;
use crate::errors::GenError;
use crate::models::{JobSnapshot, JobStatus};
use crate::services::VideoGenerator;

#[derive(Debug, Clone)]
pub struct PollPolicy {
    pub processing_interval: Duration,
    pub queued_interval: Duration,
    pub max_attempts: u32,
    pub timeout: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        PollPolicy::from(&PollConfig::default())
    }
}

impl From<&PollConfig> for PollPolicy {
    fn from(config: &PollConfig) -> Self {
        Self {
            processing_interval: config.processing_interval,
            queued_interval: config.queued_interval,
            max_attempts: config.max_attempts,
            timeout: config.timeout,
        }
    }
}

impl PollPolicy {
    /// Delay before the next status query, `None` when the status is terminal.
    pub fn delay_for(&self, status: JobStatus) -> Option<Duration> {
        if status.is_terminal() {
            None
        } else if status == JobStatus::Processing {
            Some(self.processing_interval)
        } else {
            Some(self.queued_interval)
        }
    }
}

#[derive(Debug, Clone)]
pub struct PollCycle {
    pub snapshot: JobSnapshot,
    pub status: JobStatus,
    pub next_delay: Option<Duration>,
}

pub struct JobPoller {
    generator: Arc<dyn VideoGenerator>,
    job_id: String,
    policy: PollPolicy,
    attempts: u32,
    started: Instant,
    finished: bool,
}

impl JobPoller {
    pub fn new(
        generator: Arc<dyn VideoGenerator>,
        job_id: impl Into<String>,
        policy: PollPolicy,
    ) -> Self {
        Self {
            generator,
            job_id: job_id.into(),
            policy,
            attempts: 0,
            started: Instant::now(),
            finished: false,
        }
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// Runs one poll cycle. Returns `Ok(None)` without touching the provider
    /// once a terminal status or an error has been observed.
    pub async fn next_cycle(&mut self) -> Result<Option<PollCycle>, GenError> {
        if self.finished {
            return Ok(None);
        }
        if self.attempts >= self.policy.max_attempts {
            self.finished = true;
            return Err(self.timeout());
        }

        self.attempts += 1;
        let snapshot = match self.generator.poll_video_job(&self.job_id).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                self.finished = true;
                return Err(e);
            }
        };

        let status = snapshot.job_status();
        let next_delay = self.policy.delay_for(status);
        if next_delay.is_none() {
            self.finished = true;
        }

        debug!(
            "Video job {} poll #{}: {} (next in {:?})",
            self.job_id, self.attempts, snapshot.status, next_delay
        );

        Ok(Some(PollCycle {
            snapshot,
            status,
            next_delay,
        }))
    }

    /// Polls until the job is terminal, the budget runs out, or `cancel` fires.
    /// Dropping the sender side of `cancel` counts as cancellation.
    pub async fn run(mut self, mut cancel: watch::Receiver<bool>) -> Result<JobSnapshot, GenError> {
        loop {
            // The in-flight query counts against the same wall-clock budget.
            let remaining = self.policy.timeout.saturating_sub(self.started.elapsed());
            let polled = tokio::select! {
                cycle = tokio::time::timeout(remaining, self.next_cycle()) => Some(cycle),
                _ = cancel_requested(&mut cancel) => None,
            };
            let Some(cycle) = polled else {
                return Err(self.cancelled());
            };
            let Ok(cycle) = cycle else {
                self.finished = true;
                return Err(self.timeout());
            };
            let Some(cycle) = cycle? else {
                return Err(GenError::Unexpected(format!(
                    "Polling for video job {} already finished",
                    self.job_id
                )));
            };

            let Some(delay) = cycle.next_delay else {
                info!(
                    "Video job {} finished as {:?} after {} polls",
                    self.job_id, cycle.status, self.attempts
                );
                return settle(cycle.snapshot);
            };

            if self.started.elapsed() + delay > self.policy.timeout {
                self.finished = true;
                return Err(self.timeout());
            }

            let slept = tokio::select! {
                _ = tokio::time::sleep(delay) => true,
                _ = cancel_requested(&mut cancel) => false,
            };
            if !slept {
                return Err(self.cancelled());
            }
        }
    }

    pub fn spawn(self) -> PollHandle {
        let (cancel, rx) = watch::channel(false);
        let task = tokio::spawn(self.run(rx));
        PollHandle { cancel, task }
    }

    fn timeout(&self) -> GenError {
        warn!(
            "Giving up on video job {} after {} polls",
            self.job_id, self.attempts
        );
        GenError::Timeout {
            attempts: self.attempts,
            elapsed: self.started.elapsed(),
        }
    }

    fn cancelled(&mut self) -> GenError {
        self.finished = true;
        info!("Polling for video job {} cancelled", self.job_id);
        GenError::Cancelled
    }
}

async fn cancel_requested(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow() {
            return;
        }
        if rx.changed().await.is_err() {
            return;
        }
    }
}

/// Turns a terminal snapshot into the caller-facing outcome.
pub fn settle(snapshot: JobSnapshot) -> Result<JobSnapshot, GenError> {
    match snapshot.job_status() {
        JobStatus::Succeeded if snapshot.first_output().is_some() => Ok(snapshot),
        JobStatus::Succeeded => Err(GenError::provider(
            None,
            format!("Video job {} succeeded without output", snapshot.id),
        )),
        _ => {
            let reason = snapshot
                .error
                .filter(|e| !e.trim().is_empty())
                .unwrap_or_else(|| "no error message was reported".to_string());
            Err(GenError::JobFailed(format!(
                "Video generation failed: {}",
                reason
            )))
        }
    }
}

/// Owner side of a spawned poll loop. Dropping it stops further polling.
pub struct PollHandle {
    cancel: watch::Sender<bool>,
    task: JoinHandle<Result<JobSnapshot, GenError>>,
}

impl PollHandle {
    pub fn cancel(&self) {
        let _ = self.cancel.send(true);
    }

    pub async fn join(self) -> Result<JobSnapshot, GenError> {
        let PollHandle { cancel, task } = self;
        let result = task.await;
        drop(cancel);
        result.unwrap_or_else(|e| Err(GenError::Unexpected(e.to_string())))
    }
}
