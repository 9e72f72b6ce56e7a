//! Job Lifecycle Coordinator
//!
//! Owns the single "current job" slot and drives it through
//! `Idle -> Submitting -> Polling -> {Completed | Failed}`; `clear()` returns
//! to `Idle` from anywhere.
//!
//! Every submission bumps a generation counter. Background poll and fetch
//! work only writes to the slot while its generation is still current, so
//! anything that lands after `clear()` or a newer `submit()` is dropped.

mod view;


pub use view::{Phase, SearchView, SurfacedError};

use crate::application::cancel::{cancel_channel, CancelHandle, CancelToken};
use crate::application::fetcher::ResultFetcher;
use crate::application::policy::PollPolicy;
use crate::application::poller::{PollEvent, PollOutcome, StatusPoller};
use crate::application::submitter::{JobSubmitter, ValidatedSearch};
use crate::domain::{JobHandle, JobState, JobStatus, ResultSet, SearchParameters};
use crate::error::{AppError, Result};
use crate::port::time_provider::SystemTimeProvider;
use crate::port::{BlastService, TimeProvider};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Mutable state of the current job
struct Slot {
    generation: u64,
    phase: Phase,
    handle: Option<JobHandle>,
    status: Option<JobStatus>,
    result: Option<Arc<ResultSet>>,
    /// Validation or submission failure
    request_error: Option<SurfacedError>,
    /// Persistent poll failure, poll timeout, or fetch failure
    late_error: Option<SurfacedError>,
    is_loading_result: bool,
    poll_count: u32,
    submitted_at_ms: Option<i64>,
    last_polled_at_ms: Option<i64>,
    cancel: Option<CancelHandle>,
}

impl Slot {
    fn idle(generation: u64) -> Self {
        Self {
            generation,
            phase: Phase::Idle,
            handle: None,
            status: None,
            result: None,
            request_error: None,
            late_error: None,
            is_loading_result: false,
            poll_count: 0,
            submitted_at_ms: None,
            last_polled_at_ms: None,
            cancel: None,
        }
    }

    fn stop_polling(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
        }
    }

    fn resolved_error(&self) -> Option<SurfacedError> {
        if let Some(e) = &self.request_error {
            return Some(e.clone());
        }
        let job_failure = self
            .status
            .as_ref()
            .filter(|s| s.status == JobState::Failed)
            .and_then(|s| s.error.as_ref());
        if let Some(msg) = job_failure {
            return Some(SurfacedError::from(&AppError::JobFailed(msg.clone())));
        }
        self.late_error.clone()
    }

    fn view(&self) -> SearchView {
        SearchView {
            phase: self.phase,
            job_id: self.handle.as_ref().map(|h| h.id.clone()),
            status: self.status.clone(),
            result: self.result.clone(),
            is_submitting: self.phase == Phase::Submitting,
            is_polling: self.phase == Phase::Polling,
            is_loading_result: self.is_loading_result,
            error: self.resolved_error(),
            poll_count: self.poll_count,
            submitted_at_ms: self.submitted_at_ms,
            last_polled_at_ms: self.last_polled_at_ms,
        }
    }
}

struct Shared {
    service: Arc<dyn BlastService>,
    submitter: JobSubmitter,
    fetcher: ResultFetcher,
    policy: PollPolicy,
    clock: Arc<dyn TimeProvider>,
    slot: Mutex<Slot>,
    view_tx: watch::Sender<SearchView>,
}

impl Shared {
    /// Mutate the slot and publish the new view (lock never held across .await)
    fn with_slot<R>(&self, f: impl FnOnce(&mut Slot) -> R) -> R {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        let out = f(&mut slot);
        self.view_tx.send_replace(slot.view());
        out
    }

    /// Mutate only if `generation` is still current; returns whether it was
    fn update_if_current(&self, generation: u64, f: impl FnOnce(&mut Slot)) -> bool {
        self.with_slot(|slot| {
            if slot.generation != generation {
                return false;
            }
            f(slot);
            true
        })
    }

    fn is_current(&self, generation: u64) -> bool {
        let slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        slot.generation == generation
    }

    /// Stop the previous job and reset the slot; returns the new generation
    fn reset(&self, phase: Phase) -> u64 {
        let now = self.clock.now_millis();
        self.with_slot(|slot| {
            slot.stop_polling();
            if let Some(old) = slot.handle.take() {
                self.fetcher.forget(&old.id);
            }
            let generation = slot.generation + 1;
            *slot = Slot::idle(generation);
            slot.phase = phase;
            if phase == Phase::Submitting {
                slot.submitted_at_ms = Some(now);
            }
            generation
        })
    }

    fn apply_poll_event(&self, generation: u64, event: PollEvent) {
        let now = self.clock.now_millis();
        self.update_if_current(generation, |slot| {
            slot.poll_count += 1;
            slot.last_polled_at_ms = Some(now);
            match event {
                PollEvent::Status(status) => {
                    match status.status {
                        JobState::Completed => {
                            slot.phase = Phase::Completed;
                            slot.is_loading_result = true;
                        }
                        JobState::Failed => slot.phase = Phase::Failed,
                        JobState::Pending | JobState::Running => {}
                    }
                    slot.status = Some(status);
                }
                // Transient: keep the previous snapshot, surface nothing
                PollEvent::TransientError(_) => {}
            }
        });
    }

    /// Poll the job to a terminal state, then load its result once
    async fn drive(self: Arc<Self>, handle: JobHandle, generation: u64, token: CancelToken) {
        let poller = StatusPoller::new(self.service.clone(), self.policy.clone());
        let outcome = poller
            .run(&handle, token.clone(), |event| {
                self.apply_poll_event(generation, event)
            })
            .await;

        match outcome {
            PollOutcome::Completed(status) => {
                self.load_result(&handle, &status, generation, token).await
            }
            PollOutcome::Failed(_) => {}
            PollOutcome::Cancelled => {
                debug!(job_id = %handle.id, "Poll task ended by cancellation")
            }
            PollOutcome::GaveUp(err) => {
                self.update_if_current(generation, |slot| {
                    slot.phase = Phase::Failed;
                    slot.late_error = Some(SurfacedError::from(&err));
                });
            }
        }
    }

    /// Fetch the result; an upstream "not ready" is retried on the poll cadence
    async fn load_result(
        &self,
        handle: &JobHandle,
        status: &JobStatus,
        generation: u64,
        mut token: CancelToken,
    ) {
        let mut not_ready_answers = 0;
        let outcome = loop {
            if !self.is_current(generation) {
                return;
            }
            match self.fetcher.fetch(handle, status).await {
                Err(AppError::NotReady(_))
                    if not_ready_answers < self.policy.max_consecutive_errors =>
                {
                    not_ready_answers += 1;
                    debug!(
                        job_id = %handle.id,
                        attempt = not_ready_answers,
                        "Results not ready yet, waiting"
                    );
                    tokio::select! {
                        _ = tokio::time::sleep(self.policy.interval) => {}
                        _ = token.cancelled() => return,
                    }
                }
                other => break other,
            }
        };

        self.update_if_current(generation, |slot| {
            slot.is_loading_result = false;
            match outcome {
                Ok(result) => slot.result = Some(result),
                Err(e) => slot.late_error = Some(SurfacedError::from(&e)),
            }
        });
    }
}

/// Drives one search job at a time from submission to results.
///
/// Concurrent searches need separate coordinators. Dropping the coordinator
/// stops its background polling.
///
/// # Example
///
/// ```no_run
/// # use std::sync::Arc;
/// # use blastwatch_core::application::{JobCoordinator, PollPolicy};
/// # use blastwatch_core::domain::{Algorithm, SearchParameters};
/// # use blastwatch_core::port::BlastService;
/// # async fn example(service: Arc<dyn BlastService>) -> blastwatch_core::Result<()> {
/// let coordinator = JobCoordinator::new(service, PollPolicy::default());
/// coordinator
///     .submit(SearchParameters::new("MTEYKLVVVGAGGVGKSALT", Algorithm::Blastp))
///     .await?;
/// let view = coordinator.wait_until_settled().await;
/// if let Some(result) = view.result {
///     println!("{} hits", result.total_hits);
/// }
/// # Ok(())
/// # }
/// ```
pub struct JobCoordinator {
    shared: Arc<Shared>,
}

impl JobCoordinator {
    pub fn new(service: Arc<dyn BlastService>, policy: PollPolicy) -> Self {
        Self::with_clock(service, policy, Arc::new(SystemTimeProvider))
    }

    /// Create a coordinator with an injected clock (for deterministic timestamps)
    pub fn with_clock(
        service: Arc<dyn BlastService>,
        policy: PollPolicy,
        clock: Arc<dyn TimeProvider>,
    ) -> Self {
        let (view_tx, _) = watch::channel(SearchView::default());
        Self {
            shared: Arc::new(Shared {
                submitter: JobSubmitter::new(service.clone()),
                fetcher: ResultFetcher::new(service.clone()),
                service,
                policy,
                clock,
                slot: Mutex::new(Slot::idle(0)),
                view_tx,
            }),
        }
    }

    /// Validate and submit a search, then start polling it in the background.
    ///
    /// Any previous job is stopped and discarded first. Validation and
    /// submission errors are recorded in the view and returned.
    ///
    /// # Errors
    /// - `Validation` / `Domain` when local checks fail (nothing is sent)
    /// - `SubmissionRejected` / `Transport` from the service
    /// - `Superseded` if `clear()` or another `submit()` won the race
    pub async fn submit(&self, params: SearchParameters) -> Result<JobHandle> {
        let generation = self.shared.reset(Phase::Submitting);

        let search = match ValidatedSearch::new(params) {
            Ok(search) => search,
            Err(e) => {
                info!(error = %e, "Search rejected by validation");
                self.record_request_error(generation, &e);
                return Err(e);
            }
        };

        let handle = match self.shared.submitter.submit(&search).await {
            Ok(handle) => handle,
            Err(e) => {
                if !self.record_request_error(generation, &e) {
                    return Err(AppError::Superseded);
                }
                return Err(e);
            }
        };

        let (cancel, token) = cancel_channel();
        let accepted = self.shared.update_if_current(generation, |slot| {
            slot.handle = Some(handle.clone());
            slot.status = None;
            slot.result = None;
            slot.phase = Phase::Polling;
            slot.cancel = Some(cancel);
        });
        if !accepted {
            warn!(job_id = %handle.id, "Discarding job submitted before a clear/resubmit");
            return Err(AppError::Superseded);
        }

        info!(job_id = %handle.id, generation = generation, "Tracking job");
        tokio::spawn(self.shared.clone().drive(handle.clone(), generation, token));
        Ok(handle)
    }

    /// Discard the current job and stop polling. Safe to call at any time.
    pub fn clear(&self) {
        let generation = self.shared.reset(Phase::Idle);
        debug!(generation = generation, "Coordinator cleared");
    }

    /// Current view
    pub fn snapshot(&self) -> SearchView {
        self.shared.view_tx.borrow().clone()
    }

    /// Receive every published view
    pub fn subscribe(&self) -> watch::Receiver<SearchView> {
        self.shared.view_tx.subscribe()
    }

    /// Wait until nothing more happens without caller action
    pub async fn wait_until_settled(&self) -> SearchView {
        let mut rx = self.subscribe();
        let view = match rx.wait_for(SearchView::is_settled).await {
            Ok(view) => view.clone(),
            // Sender lives in `self`, so this only happens mid-drop
            Err(_) => self.snapshot(),
        };
        view
    }

    /// Handle of the job currently tracked
    pub fn current_job(&self) -> Option<JobHandle> {
        let slot = self.shared.slot.lock().unwrap_or_else(PoisonError::into_inner);
        slot.handle.clone()
    }

    fn record_request_error(&self, generation: u64, err: &AppError) -> bool {
        self.shared.update_if_current(generation, |slot| {
            slot.phase = Phase::Idle;
            slot.request_error = Some(SurfacedError::from(err));
        })
    }
}

impl Drop for JobCoordinator {
    fn drop(&mut self) {
        let mut slot = self
            .shared
            .slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        slot.stop_polling();
    }
}
