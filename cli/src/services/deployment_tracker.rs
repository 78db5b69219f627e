//! Deployment tracker - polls status until every environment reports
//!
//! The backend fans an upload out to every environment asynchronously.
//! The tracker waits per [`PollSchedule`] before each fetch (short first
//! probe, then a steady interval) and gives up after the attempt budget.
//! Giving up only stops client-side waiting; the backend keeps deploying.

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::domain::{DeploymentStatus, PollSchedule, Reference, TrackerState};
use crate::error::{DeployError, TransportError};
use crate::infrastructure::StatusSource;

/// Polls a [`StatusSource`] for one publish reference
pub struct DeploymentTracker<'a> {
    source: &'a dyn StatusSource,
    reference: Reference,
    expected: usize,
    schedule: PollSchedule,
    cancel: CancellationToken,
    state: TrackerState,
    attempts: u32,
    reported: usize,
    statuses: Vec<DeploymentStatus>,
    failure: Option<TransportError>,
}

impl<'a> DeploymentTracker<'a> {
    /// Create a tracker expecting `expected` environments to report
    pub fn new(source: &'a dyn StatusSource, reference: Reference, expected: usize) -> Self {
        Self {
            source,
            reference,
            expected,
            schedule: PollSchedule::default(),
            cancel: CancellationToken::new(),
            state: TrackerState::Initiated,
            attempts: 0,
            reported: 0,
            statuses: Vec::new(),
            failure: None,
        }
    }

    /// Builder: set the poll schedule
    pub fn with_schedule(mut self, schedule: PollSchedule) -> Self {
        self.schedule = schedule;
        self
    }

    /// Builder: abort pending waits when `cancel` fires
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Current state
    #[cfg(test)]
    pub fn state(&self) -> TrackerState {
        self.state
    }

    /// Status fetches performed so far
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Poll until complete, timed out, failed or cancelled
    ///
    /// Terminal states are absorbing: calling this again returns the same
    /// outcome without fetching.
    pub async fn track(&mut self) -> Result<Vec<DeploymentStatus>, DeployError> {
        if self.state.is_terminal() {
            return self.terminal_outcome();
        }

        self.state = TrackerState::Polling;
        info!(
            reference = %self.reference,
            expected = self.expected,
            attempts = self.schedule.attempts,
            "Waiting for deployment to reach every environment"
        );

        while self.attempts < self.schedule.attempts {
            let attempt = self.attempts + 1;
            let wait = self.schedule.wait_before(attempt);

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    self.state = TrackerState::Cancelled;
                    return self.terminal_outcome();
                }
                _ = tokio::time::sleep(wait) => {}
            }

            self.attempts = attempt;
            let fetched = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    self.state = TrackerState::Cancelled;
                    return self.terminal_outcome();
                }
                fetched = self.source.fetch_statuses(&self.reference) => fetched,
            };

            match fetched {
                Ok(statuses) => {
                    self.reported = statuses.len();
                    if statuses.len() == self.expected {
                        info!(attempts = attempt, "Deployment reported by every environment");
                        self.state = TrackerState::Complete;
                        self.statuses = statuses;
                        return Ok(self.statuses.clone());
                    }
                    debug!(
                        attempt,
                        reported = statuses.len(),
                        expected = self.expected,
                        "Deployment still in progress"
                    );
                }
                Err(e) => {
                    self.state = TrackerState::Failed;
                    warn!(attempt, state = self.state.name(), error = %e, "Status fetch failed");
                    self.failure = Some(match &e {
                        DeployError::Transport(transport) => transport.clone(),
                        other => TransportError::request("Poll deployment status", other),
                    });
                    return Err(e);
                }
            }
        }

        self.state = TrackerState::TimedOut;
        warn!(
            attempts = self.attempts,
            reported = self.reported,
            expected = self.expected,
            state = self.state.name(),
            "Gave up waiting for deployment"
        );
        self.terminal_outcome()
    }

    fn terminal_outcome(&self) -> Result<Vec<DeploymentStatus>, DeployError> {
        match self.state {
            TrackerState::Complete => Ok(self.statuses.clone()),
            TrackerState::Cancelled => Err(DeployError::Cancelled),
            TrackerState::Failed => Err(self
                .failure
                .clone()
                .unwrap_or_else(|| {
                    TransportError::request("Poll deployment status", "status fetch failed")
                })
                .into()),
            _ => Err(DeployError::Timeout {
                attempts: self.attempts,
                reported: self.reported,
                expected: self.expected,
            }),
        }
    }
}
