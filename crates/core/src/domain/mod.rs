// Domain Layer - Pure search job model and validation

pub mod error;
pub mod job;
pub mod record;
pub mod result;
pub mod search;
pub mod sequence;

// Re-exports
pub use error::DomainError;
pub use job::{JobHandle, JobId, JobState, JobStatus};
pub use record::{Page, Pagination, Predicate, RecordQuery, SortDirection, SortKey};
pub use result::{Hit, ResultSet, SearchStatistics};
pub use search::{Algorithm, SearchParameters};
pub use sequence::{validate_sequence, SequenceKind, ValidatedSequence, ValidationError};
