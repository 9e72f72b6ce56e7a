// Result Fetcher - single-flight, cached result retrieval

use crate::domain::{JobHandle, JobId, JobState, JobStatus, ResultSet};
use crate::error::{AppError, Result};
use crate::port::BlastService;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

type Slot = Arc<OnceCell<Arc<ResultSet>>>;

/// Retrieves result sets for completed jobs.
///
/// At most one live fetch per job: concurrent callers share the in-flight
/// request and later callers get the cached value. Failures are not cached.
pub struct ResultFetcher {
    service: Arc<dyn BlastService>,
    cache: Mutex<HashMap<JobId, Slot>>,
}

impl ResultFetcher {
    pub fn new(service: Arc<dyn BlastService>) -> Self {
        Self {
            service,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Fetch (or return the cached) result set for `handle`.
    ///
    /// `status` is the latest observed snapshot; anything other than
    /// `completed` for this job fails with `NotReady` without a request.
    pub async fn fetch(&self, handle: &JobHandle, status: &JobStatus) -> Result<Arc<ResultSet>> {
        if status.job_id != handle.id || status.status != JobState::Completed {
            debug!(
                job_id = %handle.id,
                status = %status.status,
                "Result requested before completion"
            );
            return Err(AppError::NotReady(handle.id.clone()));
        }

        let slot = self.slot(&handle.id);
        if let Some(cached) = slot.get() {
            debug!(job_id = %handle.id, "Returning cached result");
            return Ok(cached.clone());
        }

        slot.get_or_try_init(|| self.load(handle)).await.cloned()
    }

    /// Cached result, if any
    pub fn cached(&self, job_id: &str) -> Option<Arc<ResultSet>> {
        let cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        cache.get(job_id).and_then(|slot| slot.get().cloned())
    }

    /// Drop the cached result for a job
    pub fn forget(&self, job_id: &str) {
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        if cache.remove(job_id).is_some() {
            debug!(job_id = %job_id, "Evicted cached result");
        }
    }

    fn slot(&self, job_id: &str) -> Slot {
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        cache
            .entry(job_id.to_string())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone()
    }

    async fn load(&self, handle: &JobHandle) -> Result<Arc<ResultSet>> {
        info!(job_id = %handle.id, "Fetching results");

        let result = match self.service.results(&handle.id).await {
            Ok(result) => result,
            Err(AppError::NotReady(id)) => {
                debug!(job_id = %id, "Results accepted but not complete");
                return Err(AppError::NotReady(id));
            }
            Err(AppError::ResultUnavailable(msg)) => {
                warn!(job_id = %handle.id, error = %msg, "Results unavailable");
                return Err(AppError::ResultUnavailable(msg));
            }
            Err(other) => {
                warn!(job_id = %handle.id, error = %other, "Results unavailable");
                return Err(AppError::ResultUnavailable(other.to_string()));
            }
        };

        if result.job_id != handle.id {
            return Err(AppError::ResultUnavailable(format!(
                "result for job {} returned for {}",
                result.job_id, handle.id
            )));
        }

        info!(
            job_id = %handle.id,
            total_hits = result.total_hits,
            execution_time = result.execution_time,
            "Results fetched"
        );
        Ok(Arc::new(result))
    }
}
