// Status Poller - sequential status polling for one job

use crate::application::cancel::CancelToken;
use crate::application::policy::{PollDecision, PollPolicy};
use crate::domain::{JobHandle, JobState, JobStatus};
use crate::error::AppError;
use crate::port::BlastService;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Lifecycle of a poller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerState {
    Idle,
    Polling,
    Stopped,
}

/// Emitted once per tick
#[derive(Debug, Clone)]
pub enum PollEvent {
    /// A fresh snapshot replacing the previous one
    Status(JobStatus),
    /// The tick failed; the previous snapshot stays valid
    TransientError(String),
}

/// Why polling stopped
#[derive(Debug)]
pub enum PollOutcome {
    Completed(JobStatus),
    Failed(JobStatus),
    Cancelled,
    /// Policy bound hit (`PollTimeout` or a persistent `Poll` error)
    GaveUp(AppError),
}

/// Polls one job until it reaches a terminal status.
///
/// Ticks are strictly sequential: the next request is scheduled one interval
/// after the previous one resolved (or timed out), so requests never overlap.
pub struct StatusPoller {
    service: Arc<dyn BlastService>,
    policy: PollPolicy,
    state: watch::Sender<PollerState>,
}

impl StatusPoller {
    pub fn new(service: Arc<dyn BlastService>, policy: PollPolicy) -> Self {
        let (state, _) = watch::channel(PollerState::Idle);
        Self {
            service,
            policy,
            state,
        }
    }

    pub fn state(&self) -> PollerState {
        *self.state.borrow()
    }

    /// Poll `handle` until terminal, cancelled, or the policy gives up.
    ///
    /// The first request goes out immediately. `on_event` sees every accepted
    /// snapshot and every failed tick. A response that arrives after
    /// cancellation is dropped without reaching `on_event`.
    pub async fn run<F>(
        &self,
        handle: &JobHandle,
        mut cancel: CancelToken,
        mut on_event: F,
    ) -> PollOutcome
    where
        F: FnMut(PollEvent) + Send,
    {
        self.state.send_replace(PollerState::Polling);
        info!(
            job_id = %handle.id,
            interval_ms = self.policy.interval.as_millis() as u64,
            "Polling started"
        );

        let outcome = self.poll_loop(handle, &mut cancel, &mut on_event).await;

        self.state.send_replace(PollerState::Stopped);
        match &outcome {
            PollOutcome::Completed(_) => info!(job_id = %handle.id, "Job completed"),
            PollOutcome::Failed(s) => {
                warn!(job_id = %handle.id, error = ?s.error, "Job failed")
            }
            PollOutcome::Cancelled => debug!(job_id = %handle.id, "Polling cancelled"),
            PollOutcome::GaveUp(e) => warn!(job_id = %handle.id, error = %e, "Polling gave up"),
        }
        outcome
    }

    async fn poll_loop<F>(
        &self,
        handle: &JobHandle,
        cancel: &mut CancelToken,
        on_event: &mut F,
    ) -> PollOutcome
    where
        F: FnMut(PollEvent) + Send,
    {
        let mut attempts: u32 = 0;
        let mut consecutive_errors: u32 = 0;
        let mut last_state: Option<JobState> = None;
        let mut last_error = String::new();

        loop {
            if cancel.is_cancelled() {
                return PollOutcome::Cancelled;
            }

            attempts += 1;
            let response =
                tokio::time::timeout(self.policy.request_timeout, self.service.status(&handle.id))
                    .await;

            // In-flight request finished after cancel: discard its result
            if cancel.is_cancelled() {
                debug!(job_id = %handle.id, "Discarding status received after cancellation");
                return PollOutcome::Cancelled;
            }

            let tick = match response {
                Ok(Ok(status)) => self.accept(handle, status, last_state),
                Ok(Err(e)) => Err(e.to_string()),
                Err(_) => Err(format!(
                    "status request timed out after {}ms",
                    self.policy.request_timeout.as_millis()
                )),
            };

            match tick {
                Ok(Some(status)) => {
                    consecutive_errors = 0;
                    last_state = Some(status.status);
                    debug!(
                        job_id = %handle.id,
                        status = %status.status,
                        progress = status.progress,
                        attempt = attempts,
                        "Status received"
                    );
                    on_event(PollEvent::Status(status.clone()));
                    match status.status {
                        JobState::Completed => return PollOutcome::Completed(status),
                        JobState::Failed => return PollOutcome::Failed(status),
                        JobState::Pending | JobState::Running => {}
                    }
                }
                // Regressed snapshot: previous one stays current
                Ok(None) => consecutive_errors = 0,
                Err(message) => {
                    consecutive_errors += 1;
                    warn!(
                        job_id = %handle.id,
                        attempt = attempts,
                        consecutive_errors = consecutive_errors,
                        error = %message,
                        "Status poll failed, keeping previous snapshot"
                    );
                    last_error = message.clone();
                    on_event(PollEvent::TransientError(message));
                }
            }

            match self.policy.after_tick(attempts, consecutive_errors) {
                PollDecision::Continue => {}
                PollDecision::Exhausted { attempts } => {
                    return PollOutcome::GaveUp(AppError::PollTimeout { attempts })
                }
                PollDecision::ErrorsPersisted { .. } => {
                    return PollOutcome::GaveUp(AppError::Poll(last_error))
                }
            }

            tokio::select! {
                _ = tokio::time::sleep(self.policy.interval) => {}
                _ = cancel.cancelled() => return PollOutcome::Cancelled,
            }
        }
    }

    /// Normalize a snapshot and check it belongs to this job and moves forward.
    ///
    /// `Ok(None)` means the snapshot regressed and was dropped.
    fn accept(
        &self,
        handle: &JobHandle,
        mut status: JobStatus,
        last_state: Option<JobState>,
    ) -> Result<Option<JobStatus>, String> {
        if status.job_id.is_empty() {
            status.job_id = handle.id.clone();
        }
        if status.job_id != handle.id {
            return Err(format!(
                "status for job {} returned while polling {}",
                status.job_id, handle.id
            ));
        }

        let status = status.normalized();
        if let Some(prev) = last_state {
            if let Err(e) = prev.check_transition(status.status) {
                warn!(job_id = %handle.id, error = %e, "Ignoring regressed status");
                return Ok(None);
            }
        }
        Ok(Some(status))
    }
}
