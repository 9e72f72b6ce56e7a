//! reqwest implementation of the compute service port

use crate::error::{ClientError, Endpoint};
use crate::wire::{error_message, SubmitResponse};
use async_trait::async_trait;
use blastwatch_core::domain::{JobHandle, JobId, JobStatus, ResultSet, SearchParameters};
use blastwatch_core::port::{BlastService, HealthReport};
use blastwatch_core::{AppError, Result};
use reqwest::{RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

/// Default per-request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Compute proxy client
///
/// # Example
///
/// ```no_run
/// use blastwatch_infra_http::HttpBlastService;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let service = HttpBlastService::builder("http://127.0.0.1:8080")
///     .timeout(std::time::Duration::from_secs(10))
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpBlastService {
    client: reqwest::Client,
    base_url: Url,
}

/// Builder for [`HttpBlastService`]
#[derive(Debug, Clone)]
pub struct HttpBlastServiceBuilder {
    base_url: String,
    timeout: Duration,
}

impl HttpBlastServiceBuilder {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn build(self) -> std::result::Result<HttpBlastService, ClientError> {
        let base_url = Url::parse(self.base_url.trim())
            .map_err(|e| ClientError::InvalidUrl(format!("{}: {}", self.base_url, e)))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(ClientError::InvalidUrl(format!(
                "{}: scheme must be http or https",
                self.base_url
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .connect_timeout(CONNECT_TIMEOUT)
            .user_agent(concat!("blastwatch/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ClientError::Connection(format!("Failed to create client: {}", e)))?;

        Ok(HttpBlastService { client, base_url })
    }
}

impl HttpBlastService {
    pub fn builder(base_url: impl Into<String>) -> HttpBlastServiceBuilder {
        HttpBlastServiceBuilder {
            base_url: base_url.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Client with default timeouts
    pub fn new(base_url: impl Into<String>) -> std::result::Result<Self, ClientError> {
        Self::builder(base_url).build()
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Join path segments onto the base URL (segments are percent-encoded)
    fn endpoint(&self, segments: &[&str]) -> std::result::Result<Url, ClientError> {
        let mut url = self.base_url.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| ClientError::InvalidUrl(self.base_url.to_string()))?;
            path.pop_if_empty().extend(segments);
        }
        Ok(url)
    }

    /// Send a request; returns the status code and raw body
    async fn send(
        &self,
        request: RequestBuilder,
    ) -> std::result::Result<(StatusCode, String), ClientError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        debug!(status = status.as_u16(), bytes = body.len(), "Response received");
        Ok((status, body))
    }

    /// Send a request and decode its 2xx body
    async fn fetch<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> std::result::Result<T, ClientError> {
        let (status, body) = self.send(request).await?;
        Self::decode(status, &body)
    }

    /// Decode a 2xx body, or turn anything else into `ClientError::Status`
    fn decode<T: DeserializeOwned>(
        status: StatusCode,
        body: &str,
    ) -> std::result::Result<T, ClientError> {
        if !status.is_success() {
            return Err(ClientError::Status {
                code: status.as_u16(),
                message: error_message(status.as_u16(), body),
            });
        }
        serde_json::from_str(body).map_err(|e| ClientError::Decode(e.to_string()))
    }
}

#[async_trait]
impl BlastService for HttpBlastService {
    async fn submit(&self, params: &SearchParameters) -> Result<JobHandle> {
        let url = self
            .endpoint(&["blast", "submit"])
            .map_err(|e| e.into_app_error(Endpoint::Submit))?;
        debug!(url = %url, algorithm = %params.algorithm, "POST submit");

        let submitted: SubmitResponse = self
            .fetch(self.client.post(url).json(params))
            .await
            .map_err(|e| {
                warn!(error = %e, "Submit request failed");
                e.into_app_error(Endpoint::Submit)
            })?;

        Ok(JobHandle::new(submitted.job_id))
    }

    async fn status(&self, job_id: &JobId) -> Result<JobStatus> {
        let url = self
            .endpoint(&["blast", "status", job_id.as_str()])
            .map_err(|e| e.into_app_error(Endpoint::Status))?;

        self.fetch::<JobStatus>(self.client.get(url))
            .await
            .map_err(|e| e.into_app_error(Endpoint::Status))
    }

    async fn results(&self, job_id: &JobId) -> Result<ResultSet> {
        let url = self
            .endpoint(&["blast", "results", job_id.as_str()])
            .map_err(|e| e.into_app_error(Endpoint::Results))?;

        let (status, body) = self
            .send(self.client.get(url))
            .await
            .map_err(|e| e.into_app_error(Endpoint::Results))?;

        // Accepted but not complete yet
        if status == StatusCode::ACCEPTED {
            return Err(AppError::NotReady(job_id.clone()));
        }

        Self::decode::<ResultSet>(status, &body).map_err(|e| e.into_app_error(Endpoint::Results))
    }

    async fn health(&self) -> Result<HealthReport> {
        let url = self
            .endpoint(&["health"])
            .map_err(|e| e.into_app_error(Endpoint::Health))?;

        self.fetch::<HealthReport>(self.client.get(url))
            .await
            .map_err(|e| e.into_app_error(Endpoint::Health))
    }
}
