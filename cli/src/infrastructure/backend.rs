//! Backend seams
//!
//! The services talk to the hosting backend only through these traits.
//! [`ApiClient`](super::ApiClient) implements them over HTTP; tests use
//! in-memory fakes.

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::{DeployKey, Deployment, DeploymentStatus, Domain, Environment, Reference, Release};
use crate::error::DeployError;

/// Site-scoped CRUD operations
#[async_trait]
pub trait SiteBackend: Send + Sync {
    async fn list_environments(&self, site: &str) -> Result<Vec<Environment>, DeployError>;

    async fn create_environment(
        &self,
        site: &str,
        env_name: &str,
        settings: &Value,
    ) -> Result<Environment, DeployError>;

    async fn update_environment(
        &self,
        site: &str,
        env_name: &str,
        settings: &Value,
    ) -> Result<(), DeployError>;

    async fn delete_environment(&self, site: &str, env_name: &str) -> Result<(), DeployError>;

    async fn list_domains(&self, site: &str) -> Result<Vec<Domain>, DeployError>;

    async fn add_domain(&self, site: &str, domain_name: &str, env_name: &str)
        -> Result<(), DeployError>;

    async fn list_deployments(&self, site: &str) -> Result<Vec<Deployment>, DeployError>;

    async fn create_release(
        &self,
        site: &str,
        domain_name: &str,
        deploy_key: &DeployKey,
        env_name: &str,
    ) -> Result<(), DeployError>;

    async fn list_releases(&self, site: &str) -> Result<Vec<Release>, DeployError>;
}

/// Source of per-environment deployment status reports
#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn fetch_statuses(&self, reference: &Reference)
        -> Result<Vec<DeploymentStatus>, DeployError>;
}

/// Webhook management for third-party integrations
#[async_trait]
pub trait IntegrationBackend: Send + Sync {
    async fn create_webhook(&self, site: &str, provider: &str, body: &Value)
        -> Result<(), DeployError>;

    async fn delete_webhook(&self, site: &str, provider: &str) -> Result<(), DeployError>;
}
