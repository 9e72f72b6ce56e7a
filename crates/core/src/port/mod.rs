// Port Layer - Interfaces for external collaborators

pub mod blast_service;
pub mod record_store;
pub mod time_provider; // For deterministic testing

// Re-exports
pub use blast_service::{BlastService, HealthReport};
pub use record_store::{InMemoryRecordStore, RecordStore};
pub use time_provider::TimeProvider;
