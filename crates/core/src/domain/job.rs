// Job Domain Model

use crate::domain::error::{DomainError, Result};
use serde::{Deserialize, Serialize};

/// Job ID (opaque, issued by the compute service)
pub type JobId = String;

/// Message used when a failed snapshot arrives without one
pub const DEFAULT_FAILURE_MESSAGE: &str = "Job failed";

/// Handle returned by a successful submission.
///
/// The only join key between a submission and later status/result calls.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobHandle {
    pub id: JobId,
}

impl JobHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

impl std::fmt::Display for JobHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.id)
    }
}

/// Job State as reported by the compute service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Pending,
    Running,
    Completed,
    Failed,
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobState::Pending => write!(f, "pending"),
            JobState::Running => write!(f, "running"),
            JobState::Completed => write!(f, "completed"),
            JobState::Failed => write!(f, "failed"),
        }
    }
}

impl JobState {
    /// Completed or failed: no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }

    /// Still queued or executing
    pub fn is_active(&self) -> bool {
        matches!(self, JobState::Pending | JobState::Running)
    }

    fn rank(&self) -> u8 {
        match self {
            JobState::Pending => 0,
            JobState::Running => 1,
            JobState::Completed | JobState::Failed => 2,
        }
    }

    /// Check a transition against pending -> running -> {completed | failed}.
    ///
    /// Staying in a non-terminal state is allowed (progress updates); skipping
    /// forward is allowed; moving backwards or leaving a terminal state is not.
    pub fn check_transition(&self, next: JobState) -> Result<()> {
        let legal = if self.is_terminal() {
            *self == next
        } else {
            next.rank() >= self.rank()
        };
        if legal {
            Ok(())
        } else {
            Err(DomainError::InvalidStatusTransition {
                from: self.to_string(),
                to: next.to_string(),
            })
        }
    }
}

/// One status snapshot for a job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatus {
    pub job_id: JobId,
    pub status: JobState,
    #[serde(default)]
    pub progress: u32,
    /// Seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_time_remaining: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobStatus {
    pub fn pending(job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            status: JobState::Pending,
            progress: 0,
            estimated_time_remaining: None,
            error: None,
        }
    }

    pub fn running(job_id: impl Into<String>, progress: u32) -> Self {
        Self {
            status: JobState::Running,
            progress,
            ..Self::pending(job_id)
        }
    }

    pub fn completed(job_id: impl Into<String>) -> Self {
        Self {
            status: JobState::Completed,
            progress: 100,
            ..Self::pending(job_id)
        }
    }

    pub fn failed(job_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status: JobState::Failed,
            error: Some(message.into()),
            ..Self::pending(job_id)
        }
    }

    /// Enforce the snapshot invariants on data received over the wire.
    ///
    /// - `error` is present iff the job failed
    /// - progress is at most 100, and exactly 100 once completed
    pub fn normalized(mut self) -> Self {
        self.progress = self.progress.min(100);
        match self.status {
            JobState::Failed => {
                let missing = self.error.as_deref().map_or(true, |m| m.trim().is_empty());
                if missing {
                    self.error = Some(DEFAULT_FAILURE_MESSAGE.to_string());
                }
            }
            JobState::Completed => {
                self.error = None;
                self.progress = 100;
            }
            JobState::Pending | JobState::Running => self.error = None,
        }
        self
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_transition_forward_only() {
        use JobState::*;

        assert!(Pending.check_transition(Pending).is_ok());
        assert!(Pending.check_transition(Running).is_ok());
        assert!(Pending.check_transition(Completed).is_ok());
        assert!(Running.check_transition(Running).is_ok());
        assert!(Running.check_transition(Failed).is_ok());

        assert!(Running.check_transition(Pending).is_err());
        assert!(Completed.check_transition(Running).is_err());
        assert!(Completed.check_transition(Failed).is_err());
        assert!(Failed.check_transition(Completed).is_err());
        assert!(Failed.check_transition(Failed).is_ok());
    }

    #[test]
    fn test_transition_error_message() {
        let err = JobState::Completed
            .check_transition(JobState::Pending)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid job status transition: completed -> pending"
        );
    }

    #[test]
    fn test_status_from_wire() {
        let status: JobStatus = serde_json::from_value(json!({
            "jobId": "job-1",
            "status": "running",
            "progress": 40,
            "estimatedTimeRemaining": 12
        }))
        .unwrap();

        assert_eq!(status.job_id, "job-1");
        assert_eq!(status.status, JobState::Running);
        assert_eq!(status.progress, 40);
        assert_eq!(status.estimated_time_remaining, Some(12));
        assert!(status.error.is_none());
    }

    #[test]
    fn test_normalize_failed_without_message() {
        let mut status = JobStatus::failed("job-1", "");
        status.error = None;
        let status = status.normalized();
        assert_eq!(status.error.as_deref(), Some(DEFAULT_FAILURE_MESSAGE));
    }

    #[test]
    fn test_normalize_drops_stray_error_and_clamps() {
        let status = JobStatus {
            job_id: "job-1".to_string(),
            status: JobState::Running,
            progress: 250,
            estimated_time_remaining: None,
            error: Some("noise".to_string()),
        }
        .normalized();

        assert_eq!(status.progress, 100);
        assert!(status.error.is_none());

        let done = JobStatus {
            progress: 80,
            ..JobStatus::completed("job-1")
        }
        .normalized();
        assert_eq!(done.progress, 100);
    }
}
