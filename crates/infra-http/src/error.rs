//! HTTP adapter error types

use blastwatch_core::AppError;
use thiserror::Error;

/// Which endpoint a failure came from; decides the `AppError` it maps to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Endpoint {
    Submit,
    Status,
    Results,
    Health,
}

/// HTTP client error
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Invalid base URL: {0}")]
    InvalidUrl(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("{message}")]
    Status { code: u16, message: String },

    #[error("Malformed response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ClientError::Decode(e.to_string())
        } else if e.is_builder() {
            ClientError::InvalidUrl(e.to_string())
        } else {
            ClientError::Connection(e.to_string())
        }
    }
}

impl ClientError {
    /// Map into the port's error contract for `endpoint`
    pub(crate) fn into_app_error(self, endpoint: Endpoint) -> AppError {
        match (self, endpoint) {
            (ClientError::Connection(msg), _) => AppError::Transport(msg),
            (ClientError::InvalidUrl(msg), _) => AppError::Config(msg),
            (e, Endpoint::Submit) => AppError::SubmissionRejected(e.to_string()),
            (e, Endpoint::Status) => AppError::Poll(e.to_string()),
            (e, Endpoint::Results) => AppError::ResultUnavailable(e.to_string()),
            (e, Endpoint::Health) => AppError::Transport(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_shows_bare_message() {
        let err = ClientError::Status {
            code: 503,
            message: "queue full".to_string(),
        };
        assert!(matches!(
            err.into_app_error(Endpoint::Submit),
            AppError::SubmissionRejected(m) if m == "queue full"
        ));
    }

    #[test]
    fn test_connection_is_transport_everywhere() {
        for endpoint in [Endpoint::Submit, Endpoint::Status, Endpoint::Results] {
            let err = ClientError::Connection("refused".into()).into_app_error(endpoint);
            assert!(matches!(err, AppError::Transport(_)));
        }
    }

    #[test]
    fn test_decode_maps_per_endpoint() {
        let err = ClientError::Decode("bad json".into());
        assert!(matches!(
            err.into_app_error(Endpoint::Status),
            AppError::Poll(_)
        ));
        let err = ClientError::Decode("bad json".into());
        assert!(matches!(
            err.into_app_error(Endpoint::Results),
            AppError::ResultUnavailable(_)
        ));
    }
}
