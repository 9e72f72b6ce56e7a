// Application Layer - Use Cases and Business Logic

pub mod cancel;
pub mod catalog;
pub mod constants;
pub mod coordinator;
pub mod fetcher;
pub mod policy;
pub mod poller;
pub mod submitter;

// Re-exports
pub use cancel::{cancel_channel, CancelHandle, CancelToken};
pub use catalog::CatalogService;
pub use coordinator::{JobCoordinator, Phase, SearchView, SurfacedError};
pub use fetcher::ResultFetcher;
pub use policy::{PollDecision, PollPolicy};
pub use poller::{PollEvent, PollOutcome, PollerState, StatusPoller};
pub use submitter::{JobSubmitter, ValidatedSearch};
