// Compute Service Port (Interface)
// The BLAST proxy that accepts jobs and reports their status/results

use crate::domain::{JobHandle, JobId, JobStatus, ResultSet, SearchParameters};
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Liveness report from `GET /health`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: String,
    #[serde(flatten)]
    pub details: serde_json::Map<String, serde_json::Value>,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        matches!(
            self.status.to_ascii_lowercase().as_str(),
            "ok" | "healthy" | "up"
        )
    }
}

/// Remote compute service running the alignment binary
///
/// Error contract:
/// - `submit`: `SubmissionRejected` on non-success, `Transport` on network failure
/// - `status`: `Poll` on non-success, `Transport` on network failure
/// - `results`: `NotReady` on "accepted, not complete", `ResultUnavailable` otherwise
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BlastService: Send + Sync {
    /// Submit a search; each call creates a new job (not idempotent)
    async fn submit(&self, params: &SearchParameters) -> Result<JobHandle>;

    /// Fetch the current status snapshot for a job
    async fn status(&self, job_id: &JobId) -> Result<JobStatus>;

    /// Fetch the result set of a completed job
    async fn results(&self, job_id: &JobId) -> Result<ResultSet>;

    /// Liveness probe
    async fn health(&self) -> Result<HealthReport>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::domain::{Hit, SearchStatistics};
    use crate::error::AppError;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio::sync::Semaphore;

    /// One scripted answer to a status request
    #[derive(Debug, Clone)]
    pub enum StatusStep {
        Report(JobStatus),
        Error(String),
    }

    /// How submissions should behave
    #[derive(Debug, Clone)]
    pub enum SubmitBehavior {
        Accept,
        Reject(String),
        TransportFailure(String),
    }

    /// Scripted compute service for testing
    ///
    /// Status answers are consumed in order; the last one repeats forever.
    pub struct ScriptedBlastService {
        job_id: String,
        submit_behavior: Mutex<SubmitBehavior>,
        steps: Mutex<VecDeque<StatusStep>>,
        result: Mutex<Option<ResultSet>>,
        not_ready_answers: AtomicUsize,
        result_delay: Mutex<Option<Duration>>,
        submit_delay: Mutex<Option<Duration>>,
        status_gate: Option<Arc<Semaphore>>,
        submit_calls: AtomicUsize,
        status_calls: AtomicUsize,
        result_calls: AtomicUsize,
    }

    impl ScriptedBlastService {
        pub fn new(job_id: impl Into<String>) -> Self {
            let job_id = job_id.into();
            Self {
                result: Mutex::new(Some(sample_result_set(&job_id))),
                steps: Mutex::new(VecDeque::from(vec![StatusStep::Report(
                    JobStatus::completed(job_id.clone()),
                )])),
                job_id,
                submit_behavior: Mutex::new(SubmitBehavior::Accept),
                not_ready_answers: AtomicUsize::new(0),
                result_delay: Mutex::new(None),
                submit_delay: Mutex::new(None),
                status_gate: None,
                submit_calls: AtomicUsize::new(0),
                status_calls: AtomicUsize::new(0),
                result_calls: AtomicUsize::new(0),
            }
        }

        pub fn with_steps(self, steps: Vec<StatusStep>) -> Self {
            *self.steps.lock().unwrap() = steps.into();
            self
        }

        /// Script plain status snapshots
        pub fn with_statuses(self, statuses: Vec<JobStatus>) -> Self {
            self.with_steps(statuses.into_iter().map(StatusStep::Report).collect())
        }

        pub fn with_submit_behavior(self, behavior: SubmitBehavior) -> Self {
            *self.submit_behavior.lock().unwrap() = behavior;
            self
        }

        pub fn with_result(self, result: Option<ResultSet>) -> Self {
            *self.result.lock().unwrap() = result;
            self
        }

        /// First `n` results calls answer "accepted, not complete"
        pub fn with_not_ready_answers(self, n: usize) -> Self {
            self.not_ready_answers.store(n, Ordering::SeqCst);
            self
        }

        pub fn with_result_delay(self, delay: Duration) -> Self {
            *self.result_delay.lock().unwrap() = Some(delay);
            self
        }

        pub fn with_submit_delay(self, delay: Duration) -> Self {
            *self.submit_delay.lock().unwrap() = Some(delay);
            self
        }

        /// Status calls block until a permit is released via [`Self::release_status`]
        pub fn gated(mut self) -> Self {
            self.status_gate = Some(Arc::new(Semaphore::new(0)));
            self
        }

        pub fn release_status(&self, n: usize) {
            if let Some(gate) = &self.status_gate {
                gate.add_permits(n);
            }
        }

        pub fn submit_calls(&self) -> usize {
            self.submit_calls.load(Ordering::SeqCst)
        }

        pub fn status_calls(&self) -> usize {
            self.status_calls.load(Ordering::SeqCst)
        }

        pub fn result_calls(&self) -> usize {
            self.result_calls.load(Ordering::SeqCst)
        }

        fn next_step(&self) -> Option<StatusStep> {
            let mut steps = self.steps.lock().unwrap();
            if steps.len() > 1 {
                steps.pop_front()
            } else {
                steps.front().cloned()
            }
        }
    }

    #[async_trait]
    impl BlastService for ScriptedBlastService {
        async fn submit(&self, _params: &SearchParameters) -> Result<JobHandle> {
            self.submit_calls.fetch_add(1, Ordering::SeqCst);
            let delay = *self.submit_delay.lock().unwrap();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            let behavior = self.submit_behavior.lock().unwrap().clone();
            match behavior {
                SubmitBehavior::Accept => Ok(JobHandle::new(self.job_id.clone())),
                SubmitBehavior::Reject(msg) => Err(AppError::SubmissionRejected(msg)),
                SubmitBehavior::TransportFailure(msg) => Err(AppError::Transport(msg)),
            }
        }

        async fn status(&self, job_id: &JobId) -> Result<JobStatus> {
            self.status_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.status_gate {
                gate.acquire()
                    .await
                    .map_err(|e| AppError::Internal(e.to_string()))?
                    .forget();
            }
            match self.next_step() {
                Some(StatusStep::Report(status)) => Ok(status),
                Some(StatusStep::Error(msg)) => Err(AppError::Poll(msg)),
                None => Err(AppError::Poll(format!("no status scripted for {}", job_id))),
            }
        }

        async fn results(&self, job_id: &JobId) -> Result<ResultSet> {
            self.result_calls.fetch_add(1, Ordering::SeqCst);
            let delay = *self.result_delay.lock().unwrap();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            let not_ready = self
                .not_ready_answers
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if not_ready {
                return Err(AppError::NotReady(job_id.clone()));
            }
            self.result
                .lock()
                .unwrap()
                .clone()
                .ok_or_else(|| AppError::ResultUnavailable(format!("no result for {}", job_id)))
        }

        async fn health(&self) -> Result<HealthReport> {
            Ok(HealthReport {
                status: "ok".to_string(),
                details: serde_json::Map::new(),
            })
        }
    }

    /// A small, plausible result set for the given job
    pub fn sample_result_set(job_id: &str) -> ResultSet {
        ResultSet {
            job_id: job_id.to_string(),
            query_length: 189,
            database_size: 205_000_000,
            total_hits: 1,
            hits: vec![Hit {
                id: "P01116".to_string(),
                gene_names: vec!["KRAS".to_string()],
                protein_name: Some("GTPase KRas".to_string()),
                score: 380.0,
                evalue: 1e-130,
                identity: 100.0,
                positives: 100.0,
                gaps: 0,
                query_start: 1,
                query_end: 189,
                subject_start: 1,
                subject_end: 189,
                query_seq: String::new(),
                subject_seq: String::new(),
                alignment: String::new(),
                alignment_length: 189,
            }],
            statistics: SearchStatistics {
                kappa: 0.041,
                lambda: 0.267,
                entropy: 0.14,
                database_name: "uniprot_sprot".to_string(),
                database_version: "2024_01".to_string(),
                total_sequences: 570_000,
            },
            execution_time: 1.25,
        }
    }
}
