// Observable coordinator state

use crate::domain::{JobId, JobState, JobStatus, ResultSet};
use crate::error::{AppError, ErrorKind};
use serde::Serialize;
use std::sync::Arc;

/// Coordinator-level lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Submitting,
    Polling,
    Completed,
    Failed,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Idle => write!(f, "idle"),
            Phase::Submitting => write!(f, "submitting"),
            Phase::Polling => write!(f, "polling"),
            Phase::Completed => write!(f, "completed"),
            Phase::Failed => write!(f, "failed"),
        }
    }
}

/// An error as shown to callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SurfacedError {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&AppError> for SurfacedError {
    fn from(err: &AppError) -> Self {
        let message = match err {
            // Bare message so callers can show exactly what the service said
            AppError::JobFailed(msg)
            | AppError::SubmissionRejected(msg)
            | AppError::ResultUnavailable(msg) => msg.clone(),
            other => other.to_string(),
        };
        Self {
            kind: err.kind(),
            message,
        }
    }
}

/// Consolidated loading/error/data view of the current job
#[derive(Debug, Clone)]
pub struct SearchView {
    pub phase: Phase,
    pub job_id: Option<JobId>,
    pub status: Option<JobStatus>,
    pub result: Option<Arc<ResultSet>>,
    pub is_submitting: bool,
    pub is_polling: bool,
    pub is_loading_result: bool,
    /// Already resolved by precedence: request error, then job failure, then poll/fetch error
    pub error: Option<SurfacedError>,
    /// Ticks observed for the current job (successful or not)
    pub poll_count: u32,
    pub submitted_at_ms: Option<i64>,
    pub last_polled_at_ms: Option<i64>,
}

impl Default for SearchView {
    fn default() -> Self {
        Self {
            phase: Phase::Idle,
            job_id: None,
            status: None,
            result: None,
            is_submitting: false,
            is_polling: false,
            is_loading_result: false,
            error: None,
            poll_count: 0,
            submitted_at_ms: None,
            last_polled_at_ms: None,
        }
    }
}

impl SearchView {
    fn state(&self) -> Option<JobState> {
        self.status.as_ref().map(|s| s.status)
    }

    /// Job is pending or running
    pub fn is_searching(&self) -> bool {
        self.state().is_some_and(|s| s.is_active())
    }

    pub fn is_completed(&self) -> bool {
        self.state() == Some(JobState::Completed)
    }

    /// The job failed or polling was abandoned
    pub fn is_failed(&self) -> bool {
        self.phase == Phase::Failed
    }

    pub fn progress(&self) -> u32 {
        self.status.as_ref().map_or(0, |s| s.progress)
    }

    pub fn estimated_time_remaining(&self) -> Option<u64> {
        self.status.as_ref().and_then(|s| s.estimated_time_remaining)
    }

    pub fn current_error(&self) -> Option<&str> {
        self.error.as_ref().map(|e| e.message.as_str())
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error.as_ref().map(|e| e.kind)
    }

    /// Nothing more will happen without a new call from the caller
    pub fn is_settled(&self) -> bool {
        match self.phase {
            Phase::Idle | Phase::Failed => true,
            Phase::Submitting | Phase::Polling => false,
            Phase::Completed => {
                !self.is_loading_result && (self.result.is_some() || self.error.is_some())
            }
        }
    }
}
