//! Deployment tracking domain types
//!
//! Defines status polling as a state machine with a bounded attempt budget
//! and a two-tier wait schedule.

use std::time::Duration;

/// Default number of status fetches before giving up
pub const DEFAULT_ATTEMPTS: u32 = 20;

/// Default wait before the first status fetch
pub const DEFAULT_INITIAL_WAIT: Duration = Duration::from_secs(4);

/// Default wait between later status fetches
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(8);

/// Current state of a deployment tracker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerState {
    /// Constructed, nothing fetched yet
    Initiated,
    /// Waiting for every environment to report
    Polling,
    /// Every expected environment reported
    Complete,
    /// Attempt budget exhausted
    TimedOut,
    /// Status fetch failed
    Failed,
    /// Caller abandoned tracking
    Cancelled,
}

impl TrackerState {
    /// Get human-readable name for the state
    pub fn name(&self) -> &'static str {
        match self {
            Self::Initiated => "initiated",
            Self::Polling => "polling",
            Self::Complete => "complete",
            Self::TimedOut => "timed out",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Terminal states never change again
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Complete | Self::TimedOut | Self::Failed | Self::Cancelled
        )
    }
}

/// When to poll: a short first probe, then a steady slower cadence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSchedule {
    /// Attempt budget (number of status fetches)
    pub attempts: u32,
    /// Wait before the first fetch
    pub initial_wait: Duration,
    /// Wait before every later fetch
    pub interval: Duration,
}

impl Default for PollSchedule {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_ATTEMPTS,
            initial_wait: DEFAULT_INITIAL_WAIT,
            interval: DEFAULT_INTERVAL,
        }
    }
}

impl PollSchedule {
    /// Wait preceding the given 1-based attempt
    pub fn wait_before(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            self.initial_wait
        } else {
            self.interval
        }
    }

    /// Total client-side waiting before the budget runs out
    pub fn worst_case(&self) -> Duration {
        if self.attempts == 0 {
            return Duration::ZERO;
        }
        self.initial_wait + self.interval * (self.attempts - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_schedule_worst_case() {
        let schedule = PollSchedule::default();
        assert_eq!(schedule.worst_case(), Duration::from_secs(156));
    }

    #[test]
    fn test_two_tier_waits() {
        let schedule = PollSchedule::default();
        assert_eq!(schedule.wait_before(1), Duration::from_secs(4));
        assert_eq!(schedule.wait_before(2), Duration::from_secs(8));
        assert_eq!(schedule.wait_before(20), Duration::from_secs(8));
    }

    #[test]
    fn test_terminal_states() {
        assert!(!TrackerState::Initiated.is_terminal());
        assert!(!TrackerState::Polling.is_terminal());
        assert!(TrackerState::Complete.is_terminal());
        assert!(TrackerState::TimedOut.is_terminal());
        assert!(TrackerState::Failed.is_terminal());
        assert!(TrackerState::Cancelled.is_terminal());
    }
}
