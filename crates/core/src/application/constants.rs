// Search client constants (no magic values)
use std::time::Duration;

/// Fixed cadence between status polls (2s)
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2000);

/// Upper bound for a single status request before it counts as a failed tick (30s)
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Poll attempts before giving up (900 x 2s = 30 minutes)
pub const DEFAULT_MAX_POLL_ATTEMPTS: u32 = 900;

/// Consecutive failed status requests before the poll error is surfaced
pub const DEFAULT_MAX_CONSECUTIVE_POLL_ERRORS: u32 = 5;
