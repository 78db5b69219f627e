//! # Publish Observability Module
//!
//! Structured events for publish and release operations.
//!
//! ## Event Flow
//!
//! ```text
//! siteship → JSON stdout (SITESHIP_EVENT: prefix) → log shipper
//! ```
//!
//! Set `SITESHIP_EVENTS=1` to print events on stdout. Otherwise they are
//! logged at debug level only.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Event prefix for log shippers to identify structured events
const EVENT_PREFIX: &str = "SITESHIP_EVENT:";

/// Environment variable enabling event output on stdout
const EVENTS_ENV: &str = "SITESHIP_EVENTS";

/// Publish event types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type")]
pub enum PublishEvent {
    /// Publish pipeline started
    PublishStarted(PublishStartedEvent),
    /// Two-stage archive written
    ArchiveBuilt(ArchiveBuiltEvent),
    /// Archive uploaded to blob storage
    UploadCompleted(UploadCompletedEvent),
    /// Every environment reported the deployment
    DeploymentCompleted(DeploymentCompletedEvent),
    /// Publish pipeline completed
    PublishCompleted(PublishCompletedEvent),
    /// Publish pipeline failed
    PublishFailed(PublishFailedEvent),
    /// Domain bound to a deploy key
    ReleaseCreated(ReleaseCreatedEvent),
}

/// Common fields for all events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMetadata {
    /// Timestamp in RFC3339 format
    pub timestamp: String,
    /// Site name
    pub site: String,
    /// Publish reference, when the event belongs to a publish
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    /// Hostname of the machine running the publish
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    /// CI job ID if running in CI
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ci_job_id: Option<String>,
}

impl EventMetadata {
    pub fn new(site: impl Into<String>, reference: Option<String>) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            site: site.into(),
            reference,
            hostname: std::env::var("HOSTNAME").ok(),
            ci_job_id: std::env::var("GITHUB_RUN_ID")
                .ok()
                .or_else(|| std::env::var("CI_JOB_ID").ok()),
        }
    }

    /// Same metadata with a fresh timestamp
    fn refreshed(&self) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishStartedEvent {
    #[serde(flatten)]
    pub metadata: EventMetadata,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveBuiltEvent {
    #[serde(flatten)]
    pub metadata: EventMetadata,
    pub code_id: String,
    pub deploy_key: String,
    pub archive_bytes: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadCompletedEvent {
    #[serde(flatten)]
    pub metadata: EventMetadata,
    pub key: String,
    pub bytes: u64,
    pub duration_secs: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentCompletedEvent {
    #[serde(flatten)]
    pub metadata: EventMetadata,
    pub deploy_key: String,
    pub environments: Vec<String>,
    pub attempts: u32,
    pub duration_secs: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepDuration {
    pub step: String,
    pub duration_secs: f64,
    pub status: StepStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Success,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishCompletedEvent {
    #[serde(flatten)]
    pub metadata: EventMetadata,
    pub deploy_key: String,
    pub duration_secs: f64,
    pub step_durations: Vec<StepDuration>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishFailedEvent {
    #[serde(flatten)]
    pub metadata: EventMetadata,
    pub duration_secs: f64,
    pub failed_step: String,
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseCreatedEvent {
    #[serde(flatten)]
    pub metadata: EventMetadata,
    pub domain: String,
    pub environment: String,
    pub deploy_key: String,
}

fn events_enabled() -> bool {
    std::env::var(EVENTS_ENV)
        .map(|v| v != "0" && !v.eq_ignore_ascii_case("false"))
        .unwrap_or(false)
}

/// Emits a structured event as JSON
///
/// Printed to stdout with the `SITESHIP_EVENT:` prefix when enabled,
/// otherwise logged at debug level.
pub fn emit_event(event: PublishEvent) {
    match serde_json::to_string(&event) {
        Ok(json) if events_enabled() => println!("{}{}", EVENT_PREFIX, json),
        Ok(json) => tracing::debug!(event = %json, "Publish event"),
        Err(e) => tracing::error!("Failed to serialize event: {}", e),
    }
}

/// Helper to track step timing
pub struct StepTimer {
    name: String,
    start: Instant,
}

impl StepTimer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            start: Instant::now(),
        }
    }

    fn finish_with(self, status: StepStatus) -> StepDuration {
        StepDuration {
            step: self.name,
            duration_secs: self.start.elapsed().as_secs_f64(),
            status,
        }
    }
}

/// Publish workflow recorder
pub struct PublishRecorder {
    metadata: EventMetadata,
    start: Instant,
    steps: Vec<StepDuration>,
    current_step: Option<StepTimer>,
}

impl PublishRecorder {
    pub fn new(metadata: EventMetadata) -> Self {
        Self {
            metadata,
            start: Instant::now(),
            steps: Vec::new(),
            current_step: None,
        }
    }

    /// Start a new step, finishing any step still open
    pub fn start_step(&mut self, name: impl Into<String>) {
        self.complete_step();
        self.current_step = Some(StepTimer::new(name));
    }

    /// Mark current step as completed, returning its duration
    pub fn complete_step(&mut self) -> f64 {
        match self.current_step.take() {
            Some(timer) => {
                let step = timer.finish_with(StepStatus::Success);
                let secs = step.duration_secs;
                self.steps.push(step);
                secs
            }
            None => 0.0,
        }
    }

    /// Metadata stamped with the current time, for sub-events
    pub fn metadata(&self) -> EventMetadata {
        self.metadata.refreshed()
    }

    /// Get elapsed time
    pub fn elapsed_secs(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }

    /// Emit publish started event
    pub fn emit_started(&self, description: &str) {
        emit_event(PublishEvent::PublishStarted(PublishStartedEvent {
            metadata: self.metadata(),
            description: description.to_string(),
        }));
    }

    /// Emit publish completed event
    pub fn emit_completed(mut self, deploy_key: &str) {
        self.complete_step();
        emit_event(PublishEvent::PublishCompleted(PublishCompletedEvent {
            metadata: self.metadata(),
            deploy_key: deploy_key.to_string(),
            duration_secs: self.elapsed_secs(),
            step_durations: self.steps,
        }));
    }

    /// Emit publish failed event
    pub fn emit_failed(mut self, error: String) {
        let failed_step = self
            .current_step
            .take()
            .map(|timer| {
                let step = timer.finish_with(StepStatus::Failed);
                let name = step.step.clone();
                self.steps.push(step);
                name
            })
            .unwrap_or_else(|| "unknown".to_string());

        emit_event(PublishEvent::PublishFailed(PublishFailedEvent {
            metadata: self.metadata(),
            duration_secs: self.elapsed_secs(),
            failed_step,
            error,
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let event = PublishEvent::ReleaseCreated(ReleaseCreatedEvent {
            metadata: EventMetadata::new("blog", None),
            domain: "blog.example.com".into(),
            environment: "prod".into(),
            deploy_key: "0a1b2c3d".into(),
        });

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"event_type\":\"ReleaseCreated\""));
        assert!(json.contains("\"site\":\"blog\""));
        assert!(!json.contains("reference"));
    }

    #[test]
    fn test_step_timer() {
        let timer = StepTimer::new("pack");
        std::thread::sleep(std::time::Duration::from_millis(10));
        let duration = timer.finish_with(StepStatus::Success);
        assert_eq!(duration.step, "pack");
        assert!(duration.duration_secs >= 0.01);
    }

    #[test]
    fn test_recorder_tracks_steps() {
        let mut recorder = PublishRecorder::new(EventMetadata::new("blog", Some("ref".into())));
        recorder.start_step("pack");
        recorder.start_step("upload");
        assert_eq!(
            recorder.current_step.as_ref().map(|t| t.name.as_str()),
            Some("upload")
        );
        recorder.complete_step();
        assert!(recorder.current_step.is_none());
        assert_eq!(recorder.steps.len(), 2);
        assert!(recorder.steps.iter().all(|s| s.status == StepStatus::Success));
    }
}
