// Job Submitter - validated search -> job handle

use crate::domain::{validate_sequence, JobHandle, SearchParameters, SequenceKind};
use crate::error::{AppError, Result};
use crate::port::BlastService;
use std::sync::Arc;
use tracing::{info, warn};

/// Search parameters that passed local validation.
///
/// Only constructible through [`ValidatedSearch::new`], so the submitter can
/// never see unchecked input.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedSearch {
    params: SearchParameters,
    kind: SequenceKind,
}

impl ValidatedSearch {
    /// Validate sequence and numeric parameters.
    ///
    /// The sequence is replaced by its cleaned form (no whitespace, no `>`).
    /// An alphabet that does not fit the algorithm is logged, not rejected.
    pub fn new(mut params: SearchParameters) -> Result<Self> {
        let validated = validate_sequence(&params.sequence)?;
        params.check_numeric()?;

        let kind = validated.kind();
        if kind != params.algorithm.query_kind() {
            warn!(
                algorithm = %params.algorithm,
                detected = %kind,
                "Query alphabet does not match algorithm"
            );
        }

        params.sequence = validated.into_string();
        Ok(Self { params, kind })
    }

    pub fn params(&self) -> &SearchParameters {
        &self.params
    }

    pub fn kind(&self) -> SequenceKind {
        self.kind
    }
}

/// Sends validated searches to the compute service
///
/// Never retries: every call creates a new job.
pub struct JobSubmitter {
    service: Arc<dyn BlastService>,
}

impl JobSubmitter {
    pub fn new(service: Arc<dyn BlastService>) -> Self {
        Self { service }
    }

    /// Submit one search and return its handle
    ///
    /// # Errors
    /// - `SubmissionRejected` for any non-success answer (including an empty job id)
    /// - `Transport` on network failure
    pub async fn submit(&self, search: &ValidatedSearch) -> Result<JobHandle> {
        let params = search.params();
        info!(
            algorithm = %params.algorithm,
            query_length = params.sequence.len(),
            "Submitting search"
        );

        let handle = match self.service.submit(params).await {
            Ok(handle) => handle,
            Err(e @ (AppError::SubmissionRejected(_) | AppError::Transport(_))) => {
                warn!(error = %e, "Submission failed");
                return Err(e);
            }
            Err(other) => {
                warn!(error = %other, "Submission failed");
                return Err(AppError::SubmissionRejected(other.to_string()));
            }
        };

        if handle.id.trim().is_empty() {
            return Err(AppError::SubmissionRejected(
                "service returned an empty job id".to_string(),
            ));
        }

        info!(job_id = %handle.id, "Search submitted");
        Ok(handle)
    }
}
