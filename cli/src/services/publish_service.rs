//! Publish service - pack, upload, track, release
//!
//! Runs the publish pipeline strictly in sequence:
//!
//! ```text
//! bundle → content ids → code.zip + settings.json → upload → poll → release
//! ```
//!
//! The current step is published on a watch channel so the CLI can switch
//! between a progress bar and a spinner without the service knowing about
//! either.

use std::future::Future;
use std::io::ErrorKind as IoErrorKind;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::deployment_tracker::DeploymentTracker;
use super::release_manager::ReleaseTarget;
use super::session::{PublishContext, Session};
use crate::config::SiteConfig;
use crate::domain::{ContentIds, DeploymentStatus, Domain, Reference};
use crate::error::{DeployError, NotFoundError};
use crate::infrastructure::blob_store::{blob_key, UploadReceipt};
use crate::infrastructure::{Packager, UploadMetadata};
use crate::observability::{
    emit_event, ArchiveBuiltEvent, DeploymentCompletedEvent, PublishEvent, PublishRecorder,
    ReleaseCreatedEvent, UploadCompletedEvent, EventMetadata,
};

/// Pipeline step currently running
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishStep {
    Pending,
    Preparing,
    Packaging,
    Uploading,
    Tracking,
    Releasing,
    Done,
}

impl PublishStep {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Preparing => "prepare",
            Self::Packaging => "package",
            Self::Uploading => "upload",
            Self::Tracking => "track",
            Self::Releasing => "release",
            Self::Done => "done",
        }
    }
}

/// Result of a successful publish
#[derive(Debug, Clone)]
pub struct PublishOutcome {
    pub ids: ContentIds,
    pub reference: Reference,
    pub receipt: UploadReceipt,
    pub statuses: Vec<DeploymentStatus>,
    pub releases: Vec<ReleaseTarget>,
}

/// Service running one publish for a session
pub struct PublishService<'a> {
    session: &'a Session,
    config: &'a SiteConfig,
    cancel: CancellationToken,
    step: watch::Sender<PublishStep>,
}

impl<'a> PublishService<'a> {
    pub fn new(session: &'a Session, config: &'a SiteConfig) -> Self {
        let (step, _) = watch::channel(PublishStep::Pending);
        Self {
            session,
            config,
            cancel: CancellationToken::new(),
            step,
        }
    }

    /// Builder: abandon the publish when `cancel` fires. Network steps stop
    /// at once; packaging finishes first since it is local.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Subscribe to step changes
    pub fn subscribe(&self) -> watch::Receiver<PublishStep> {
        self.step.subscribe()
    }

    /// Publish the site and release it to `domains` once every environment
    /// reported the new deployment
    pub async fn publish(
        &self,
        ctx: &PublishContext,
        domains: &[&Domain],
    ) -> Result<PublishOutcome, DeployError> {
        let mut recorder = PublishRecorder::new(EventMetadata::new(
            self.session.site(),
            Some(ctx.reference.to_string()),
        ));
        recorder.emit_started(&ctx.description);

        let result = self.run(ctx, domains, &mut recorder).await;
        match result {
            Ok(outcome) => {
                self.step.send_replace(PublishStep::Done);
                recorder.emit_completed(outcome.ids.deploy_key.as_str());
                Ok(outcome)
            }
            Err(e) => {
                recorder.emit_failed(e.to_string());
                Err(e)
            }
        }
    }

    fn enter(&self, recorder: &mut PublishRecorder, step: PublishStep) {
        recorder.start_step(step.name());
        self.step.send_replace(step);
    }

    async fn cancellable<T>(
        &self,
        step: impl Future<Output = Result<T, DeployError>>,
    ) -> Result<T, DeployError> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(DeployError::Cancelled),
            result = step => result,
        }
    }

    async fn run(
        &self,
        ctx: &PublishContext,
        domains: &[&Domain],
        recorder: &mut PublishRecorder,
    ) -> Result<PublishOutcome, DeployError> {
        let site = self.session.site();

        self.enter(recorder, PublishStep::Preparing);
        let bundle_path = self.config.bundle_path();
        let bundle = tokio::fs::read(&bundle_path).await.map_err(|e| {
            if e.kind() == IoErrorKind::NotFound {
                NotFoundError::Bundle {
                    path: bundle_path.display().to_string(),
                }
                .into()
            } else {
                DeployError::filesystem(&bundle_path, e)
            }
        })?;
        let ids = ContentIds::compute(&bundle, site, &self.config.settings);
        info!(code_id = %ids.code_id, deploy_key = %ids.deploy_key, "Computed content ids");

        let environments = self
            .cancellable(self.session.releases().list_environments(site))
            .await?;
        info!(count = environments.len(), "Deployment will fan out to environments");

        self.enter(recorder, PublishStep::Packaging);
        let work_dir =
            tempfile::TempDir::new().map_err(|e| DeployError::filesystem(std::env::temp_dir(), e))?;
        let archive_name = format!("{}-{}.zip", site, ids.code_id);
        let archive = Packager::new(work_dir.path()).package_site(
            &self.config.build_path(),
            &self.config.settings,
            &archive_name,
        )?;
        let archive_bytes = std::fs::metadata(&archive)
            .map_err(|e| DeployError::filesystem(&archive, e))?
            .len();
        emit_event(PublishEvent::ArchiveBuilt(ArchiveBuiltEvent {
            metadata: recorder.metadata(),
            code_id: ids.code_id.clone(),
            deploy_key: ids.deploy_key.to_string(),
            archive_bytes,
        }));

        self.enter(recorder, PublishStep::Uploading);
        let key = blob_key(self.session.user_id(), site, &ids.code_id);
        let metadata = UploadMetadata {
            description: ctx.description.clone(),
            reference: ctx.reference,
        };
        let receipt = self
            .cancellable(self.session.blob().upload(&archive, &key, &metadata))
            .await?;
        let upload_secs = recorder.complete_step();
        emit_event(PublishEvent::UploadCompleted(UploadCompletedEvent {
            metadata: recorder.metadata(),
            key: receipt.key.clone(),
            bytes: receipt.bytes,
            duration_secs: upload_secs,
        }));

        self.enter(recorder, PublishStep::Tracking);
        let feed = self.session.api().status_feed(site);
        let mut tracker = DeploymentTracker::new(&feed, ctx.reference, environments.len())
            .with_schedule(self.config.polling.schedule())
            .with_cancellation(self.cancel.clone());
        let statuses = tracker.track().await?;
        let tracking_secs = recorder.complete_step();
        emit_event(PublishEvent::DeploymentCompleted(DeploymentCompletedEvent {
            metadata: recorder.metadata(),
            deploy_key: ids.deploy_key.to_string(),
            environments: statuses.iter().map(|s| s.env.clone()).collect(),
            attempts: tracker.attempts(),
            duration_secs: tracking_secs,
        }));

        let mut releases = Vec::new();
        if !domains.is_empty() {
            self.enter(recorder, PublishStep::Releasing);
            releases = self
                .cancellable(
                    self.session
                        .releases()
                        .release_to_domains(site, &ids.deploy_key, domains),
                )
                .await?;
            for target in &releases {
                emit_event(PublishEvent::ReleaseCreated(ReleaseCreatedEvent {
                    metadata: recorder.metadata(),
                    domain: target.domain_name.clone(),
                    environment: target.env_name.clone(),
                    deploy_key: target.deploy_key.to_string(),
                }));
            }
        }

        Ok(PublishOutcome {
            ids,
            reference: ctx.reference,
            receipt,
            statuses,
            releases,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::infrastructure::AuthToken;
    use serde_json::json;
    use std::path::Path;
    use std::time::Duration;
    use tempfile::TempDir;
    use wiremock::matchers::{body_json, method, path, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const BUNDLE: &str = "export default { fetch() {} }";

    fn site_config(root: &Path, server: &MockServer) -> SiteConfig {
        let yaml = format!(
            "site: blog\n\
             user_id: u-1\n\
             api_url: {uri}\n\
             blob_url: {uri}/blobs\n\
             settings:\n  env:\n    MODE: live\n\
             polling:\n  attempts: 3\n  initial_wait: 5ms\n  interval: 5ms\n",
            uri = server.uri()
        );
        let mut config = SiteConfig::parse(&yaml).unwrap();
        config.root = root.to_path_buf();
        config
    }

    fn write_build(root: &Path) {
        std::fs::create_dir_all(root.join("dist/server")).unwrap();
        std::fs::write(root.join("dist/index.html"), "<html></html>").unwrap();
        std::fs::write(root.join("dist/server/index.js"), BUNDLE).unwrap();
    }

    async fn mount_backend(server: &MockServer, reported: usize) {
        Mock::given(method("GET"))
            .and(path("/sites/blog/environments"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "environments": [{ "name": "prod" }, { "name": "staging" }]
            })))
            .mount(server)
            .await;

        Mock::given(method("PUT"))
            .and(path_regex(r"^/blobs/u-1/blog-[0-9a-f]{64}\.zip$"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(server)
            .await;

        let statuses: Vec<_> = ["prod", "staging"]
            .iter()
            .take(reported)
            .map(|env| json!({ "env": env, "url": format!("https://{}.blog.test", env) }))
            .collect();
        Mock::given(method("GET"))
            .and(path_regex(r"^/sites/blog/deployments/[0-9a-f]{32}$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "statuses": statuses })))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_publish_end_to_end() {
        let server = MockServer::start().await;
        let tmp = TempDir::new().unwrap();
        write_build(tmp.path());
        mount_backend(&server, 2).await;

        let config = site_config(tmp.path(), &server);
        let expected = ContentIds::compute(BUNDLE.as_bytes(), "blog", &config.settings);

        Mock::given(method("POST"))
            .and(path("/sites/blog/releases"))
            .and(body_json(json!({
                "domainName": "blog.example.com",
                "deployKey": expected.deploy_key.as_str(),
                "envName": "prod"
            })))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let session = Session::from_config(&config, AuthToken::new("t")).unwrap();
        let service = PublishService::new(&session, &config);
        let steps = service.subscribe();
        let domain = Domain {
            domain_name: "blog.example.com".to_string(),
            env: "prod".to_string(),
        };

        let ctx = PublishContext::new("first");
        let outcome = service.publish(&ctx, &[&domain]).await.unwrap();

        assert_eq!(outcome.ids, expected);
        assert_eq!(outcome.reference, ctx.reference);
        assert_eq!(
            outcome.receipt.key,
            format!("u-1/blog-{}.zip", expected.code_id)
        );
        assert_eq!(outcome.statuses.len(), 2);
        assert_eq!(outcome.releases.len(), 1);
        assert_eq!(*steps.borrow(), PublishStep::Done);
    }

    #[tokio::test]
    async fn test_missing_bundle_fails_before_any_request() {
        let server = MockServer::start().await;
        let tmp = TempDir::new().unwrap();
        let config = site_config(tmp.path(), &server);
        let session = Session::from_config(&config, AuthToken::new("t")).unwrap();

        let err = PublishService::new(&session, &config)
            .publish(&PublishContext::new("x"), &[])
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_publish_times_out_when_environment_missing() {
        let server = MockServer::start().await;
        let tmp = TempDir::new().unwrap();
        write_build(tmp.path());
        mount_backend(&server, 1).await;

        let config = site_config(tmp.path(), &server);
        let session = Session::from_config(&config, AuthToken::new("t")).unwrap();

        let err = PublishService::new(&session, &config)
            .publish(&PublishContext::new("x"), &[])
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DeployError::Timeout { attempts: 3, reported: 1, expected: 2 }
        ));
    }

    #[tokio::test]
    async fn test_cancel_interrupts_slow_upload() {
        let server = MockServer::start().await;
        let tmp = TempDir::new().unwrap();
        write_build(tmp.path());

        Mock::given(method("GET"))
            .and(path("/sites/blog/environments"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "environments": [{ "name": "prod" }]
            })))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path_regex(r"^/blobs/"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(30)))
            .mount(&server)
            .await;

        let config = site_config(tmp.path(), &server);
        let session = Session::from_config(&config, AuthToken::new("t")).unwrap();
        let cancel = CancellationToken::new();
        let service = PublishService::new(&session, &config).with_cancellation(cancel.clone());

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            trigger.cancel();
        });

        let started = std::time::Instant::now();
        let err = service
            .publish(&PublishContext::new("x"), &[])
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Cancelled);
        assert!(started.elapsed() < Duration::from_secs(10));
        let requests = server.received_requests().await.unwrap();
        assert!(requests
            .iter()
            .all(|r| !r.url.path().contains("/deployments/")));
    }
}
