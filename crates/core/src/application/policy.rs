// Poll bounding policy
use crate::application::constants::*;
use std::time::Duration;
use tracing::warn;

/// What the poller should do after a non-terminal tick
#[derive(Debug, PartialEq, Eq)]
pub enum PollDecision {
    /// Schedule another tick after the interval
    Continue,
    /// Attempt budget used up without a terminal status
    Exhausted { attempts: u32 },
    /// Too many status requests failed in a row
    ErrorsPersisted { consecutive: u32 },
}

/// Poll policy
///
/// Determines whether polling should go on based on:
/// - Number of ticks issued so far
/// - Number of consecutive failed ticks
///
/// `max_attempts: None` polls until a terminal status arrives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub request_timeout: Duration,
    pub max_attempts: Option<u32>,
    pub max_consecutive_errors: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            max_attempts: Some(DEFAULT_MAX_POLL_ATTEMPTS),
            max_consecutive_errors: DEFAULT_MAX_CONSECUTIVE_POLL_ERRORS,
        }
    }
}

impl PollPolicy {
    /// Remove the attempt bound
    pub fn unbounded(mut self) -> Self {
        self.max_attempts = None;
        self
    }

    /// Decide after a tick that did not reach a terminal status
    ///
    /// # Arguments
    /// * `attempts` - Ticks issued so far, including the one just finished
    /// * `consecutive_errors` - Failed ticks in a row, 0 if the last one succeeded
    pub fn after_tick(&self, attempts: u32, consecutive_errors: u32) -> PollDecision {
        if self.max_consecutive_errors > 0 && consecutive_errors >= self.max_consecutive_errors {
            warn!(
                consecutive_errors = %consecutive_errors,
                limit = %self.max_consecutive_errors,
                "Status requests keep failing, giving up"
            );
            return PollDecision::ErrorsPersisted {
                consecutive: consecutive_errors,
            };
        }

        if let Some(max) = self.max_attempts {
            if attempts >= max {
                warn!(
                    attempts = %attempts,
                    max_attempts = %max,
                    "Max poll attempts reached"
                );
                return PollDecision::Exhausted { attempts };
            }
        }

        PollDecision::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_cadence() {
        let policy = PollPolicy::default();
        assert_eq!(policy.interval, Duration::from_millis(2000));
        assert_eq!(policy.max_attempts, Some(900));
        assert_eq!(policy.max_consecutive_errors, 5);
    }

    #[test]
    fn test_attempt_bound() {
        let policy = PollPolicy {
            max_attempts: Some(3),
            ..PollPolicy::default()
        };
        assert_eq!(policy.after_tick(2, 0), PollDecision::Continue);
        assert_eq!(
            policy.after_tick(3, 0),
            PollDecision::Exhausted { attempts: 3 }
        );
        assert_eq!(policy.unbounded().after_tick(10_000, 0), PollDecision::Continue);
    }

    #[test]
    fn test_error_bound_checked_first() {
        let policy = PollPolicy {
            max_attempts: Some(3),
            max_consecutive_errors: 2,
            ..PollPolicy::default()
        };
        assert_eq!(policy.after_tick(1, 1), PollDecision::Continue);
        assert_eq!(
            policy.after_tick(3, 2),
            PollDecision::ErrorsPersisted { consecutive: 2 }
        );
    }

    #[test]
    fn test_zero_error_limit_disables_bound() {
        let policy = PollPolicy {
            max_consecutive_errors: 0,
            ..PollPolicy::default()
        }
        .unbounded();
        assert_eq!(policy.after_tick(50, 50), PollDecision::Continue);
    }
}
