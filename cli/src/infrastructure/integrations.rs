//! Third-party integrations
//!
//! Each provider exposes the same capability set: an authorisation URL,
//! webhook creation and webhook deletion. Provider differences live in the
//! match arms below.

use serde_json::{json, Value};
use tracing::info;

use super::backend::IntegrationBackend;
use crate::error::DeployError;

/// Supported integration providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Integration {
    /// GitHub repository pushes
    Github,
    /// Bitbucket repository pushes
    Bitbucket,
    /// Slack deployment notifications
    Slack,
}

impl Integration {
    /// Path segment used by the backend
    pub fn slug(&self) -> &'static str {
        match self {
            Self::Github => "github",
            Self::Bitbucket => "bitbucket",
            Self::Slack => "slack",
        }
    }

    /// Human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Github => "GitHub",
            Self::Bitbucket => "Bitbucket",
            Self::Slack => "Slack",
        }
    }

    /// What the webhook target names (repository or channel)
    pub fn target_label(&self) -> &'static str {
        match self {
            Self::Github | Self::Bitbucket => "repository",
            Self::Slack => "channel",
        }
    }

    /// URL the operator opens to grant the backend access
    pub fn authorise_url(&self, api_url: &str, site: &str) -> String {
        format!(
            "{}/integrations/{}/authorise?site={}",
            api_url.trim_end_matches('/'),
            self.slug(),
            urlencoding::encode(site)
        )
    }

    fn webhook_body(&self, target: &str) -> Value {
        match self {
            Self::Github | Self::Bitbucket => json!({ "repository": target }),
            Self::Slack => json!({ "channel": target }),
        }
    }

    /// Register the webhook for `site`
    pub async fn create_webhook(
        &self,
        backend: &dyn IntegrationBackend,
        site: &str,
        target: &str,
    ) -> Result<(), DeployError> {
        backend
            .create_webhook(site, self.slug(), &self.webhook_body(target))
            .await?;
        info!(provider = %self.slug(), site = %site, "Webhook created");
        Ok(())
    }

    /// Remove the webhook for `site`
    pub async fn delete_webhook(
        &self,
        backend: &dyn IntegrationBackend,
        site: &str,
    ) -> Result<(), DeployError> {
        backend.delete_webhook(site, self.slug()).await?;
        info!(provider = %self.slug(), site = %site, "Webhook deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingBackend {
        calls: Mutex<Vec<(String, String, Option<Value>)>>,
    }

    #[async_trait]
    impl IntegrationBackend for RecordingBackend {
        async fn create_webhook(
            &self,
            site: &str,
            provider: &str,
            body: &Value,
        ) -> Result<(), DeployError> {
            self.calls.lock().unwrap().push((
                site.to_string(),
                provider.to_string(),
                Some(body.clone()),
            ));
            Ok(())
        }

        async fn delete_webhook(&self, site: &str, provider: &str) -> Result<(), DeployError> {
            self.calls
                .lock()
                .unwrap()
                .push((site.to_string(), provider.to_string(), None));
            Ok(())
        }
    }

    #[test]
    fn test_authorise_url() {
        assert_eq!(
            Integration::Github.authorise_url("https://api.example.com/", "my blog"),
            "https://api.example.com/integrations/github/authorise?site=my%20blog"
        );
    }

    #[test]
    fn test_disconnect_only_names_provider() {
        let backend = RecordingBackend::default();
        tokio_test::block_on(Integration::Github.delete_webhook(&backend, "blog")).unwrap();

        let calls = backend.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0], ("blog".to_string(), "github".to_string(), None));
    }

    #[tokio::test]
    async fn test_webhook_body_per_provider() {
        let backend = RecordingBackend::default();
        Integration::Bitbucket
            .create_webhook(&backend, "blog", "team/blog")
            .await
            .unwrap();
        Integration::Slack
            .create_webhook(&backend, "blog", "#deploys")
            .await
            .unwrap();
        Integration::Slack.delete_webhook(&backend, "blog").await.unwrap();

        let calls = backend.calls.lock().unwrap();
        assert_eq!(calls[0].1, "bitbucket");
        assert_eq!(calls[0].2, Some(json!({"repository": "team/blog"})));
        assert_eq!(calls[1].2, Some(json!({"channel": "#deploys"})));
        assert_eq!(calls[2], ("blog".to_string(), "slack".to_string(), None));
    }
}
