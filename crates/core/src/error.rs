// Central Error Type for the Application

use crate::domain::{DomainError, JobId, ValidationError};
use serde::Serialize;
use thiserror::Error;

/// Application-level error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    #[error("Submission rejected: {0}")]
    SubmissionRejected(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Status poll failed: {0}")]
    Poll(String),

    #[error("Gave up polling after {attempts} attempts")]
    PollTimeout { attempts: u32 },

    #[error("{0}")]
    JobFailed(String),

    #[error("Results not ready for job {0}")]
    NotReady(JobId),

    #[error("Results unavailable: {0}")]
    ResultUnavailable(String),

    #[error("Superseded by a newer submission or clear")]
    Superseded,

    #[error("Record store error: {0}")]
    RecordStore(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Cloneable classification of an [`AppError`], used in observable state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    SubmissionRejected,
    Transport,
    Poll,
    PollTimeout,
    JobFailed,
    NotReady,
    ResultUnavailable,
    Superseded,
    Other,
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Validation(_) => ErrorKind::Validation,
            AppError::Domain(DomainError::InvalidParameter(_)) => ErrorKind::Validation,
            AppError::SubmissionRejected(_) => ErrorKind::SubmissionRejected,
            AppError::Transport(_) => ErrorKind::Transport,
            AppError::Poll(_) => ErrorKind::Poll,
            AppError::PollTimeout { .. } => ErrorKind::PollTimeout,
            AppError::JobFailed(_) => ErrorKind::JobFailed,
            AppError::NotReady(_) => ErrorKind::NotReady,
            AppError::ResultUnavailable(_) => ErrorKind::ResultUnavailable,
            AppError::Superseded => ErrorKind::Superseded,
            _ => ErrorKind::Other,
        }
    }
}
