//! Release manager - environments, domains, deployments and releases
//!
//! Validates input before anything reaches the backend, enforces the
//! protected `prod` environment and projects the release list down to one
//! effective release per `(domain, environment)` pair.

use chrono::DateTime;
use serde_json::Value;
use std::collections::HashMap;
use tracing::info;

use crate::domain::site::{validate_domain_name, validate_environment_name};
use crate::domain::{DeployKey, Deployment, Domain, Environment, Release, PROD_ENV};
use crate::error::{DeployError, NotFoundError, ValidationError};
use crate::infrastructure::SiteBackend;

/// A release that was requested for a domain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseTarget {
    pub domain_name: String,
    pub env_name: String,
    pub deploy_key: DeployKey,
}

/// Keep only the latest release for each `(domain, env)` pair
///
/// Releases the backend reports without a domain/env pair are kept as-is.
/// Order follows the first appearance of each pair.
pub fn effective_releases(releases: Vec<Release>) -> Vec<Release> {
    let mut effective: Vec<Release> = Vec::with_capacity(releases.len());
    let mut positions: HashMap<(String, String), usize> = HashMap::new();

    for release in releases {
        let Some((domain, env)) = release.target() else {
            effective.push(release);
            continue;
        };
        let key = (domain.to_string(), env.to_string());
        match positions.get(&key) {
            Some(&index) => {
                if not_older(&release.created_at, &effective[index].created_at) {
                    effective[index] = release;
                }
            }
            None => {
                positions.insert(key, effective.len());
                effective.push(release);
            }
        }
    }

    effective
}

/// `a` is at least as recent as `b`
///
/// RFC 3339 timestamps are compared as instants, so precision and UTC
/// offset do not matter. Anything that does not parse falls back to plain
/// string order.
fn not_older(a: &str, b: &str) -> bool {
    match (
        DateTime::parse_from_rfc3339(a),
        DateTime::parse_from_rfc3339(b),
    ) {
        (Ok(a), Ok(b)) => a >= b,
        _ => a >= b,
    }
}

fn non_empty<T>(items: Vec<T>, collection: &'static str, site: &str) -> Result<Vec<T>, DeployError> {
    if items.is_empty() {
        Err(NotFoundError::NoResults {
            collection,
            site: site.to_string(),
        }
        .into())
    } else {
        Ok(items)
    }
}

/// Operations over a site's environments, domains, deployments and releases
pub struct ReleaseManager<'a> {
    backend: &'a dyn SiteBackend,
}

impl<'a> ReleaseManager<'a> {
    pub fn new(backend: &'a dyn SiteBackend) -> Self {
        Self { backend }
    }

    /// Environments in creation order, `prod` always included
    pub async fn list_environments(&self, site: &str) -> Result<Vec<Environment>, DeployError> {
        let mut environments = self.backend.list_environments(site).await?;
        if !environments.iter().any(Environment::is_prod) {
            environments.insert(0, Environment::new(PROD_ENV));
        }
        Ok(environments)
    }

    pub async fn list_domains(&self, site: &str) -> Result<Vec<Domain>, DeployError> {
        non_empty(self.backend.list_domains(site).await?, "domains", site)
    }

    pub async fn list_deployments(&self, site: &str) -> Result<Vec<Deployment>, DeployError> {
        non_empty(self.backend.list_deployments(site).await?, "deployments", site)
    }

    /// Effective releases, one per `(domain, env)` pair
    pub async fn list_releases(&self, site: &str) -> Result<Vec<Release>, DeployError> {
        let releases = self.backend.list_releases(site).await?;
        non_empty(effective_releases(releases), "releases", site)
    }

    /// Bind `domain_name` in `env_name` to `deploy_key`
    ///
    /// Idempotent: repeating the call, or calling with a new key for the
    /// same pair, leaves exactly one effective release (the latest).
    pub async fn create_release(
        &self,
        site: &str,
        deploy_key: &DeployKey,
        domain_name: &str,
        env_name: &str,
    ) -> Result<ReleaseTarget, DeployError> {
        validate_domain_name(domain_name)?;
        validate_environment_name(env_name)?;

        self.backend
            .create_release(site, domain_name, deploy_key, env_name)
            .await?;
        info!(
            site = %site,
            domain = %domain_name,
            env = %env_name,
            deploy_key = %deploy_key,
            "Release created"
        );

        Ok(ReleaseTarget {
            domain_name: domain_name.to_string(),
            env_name: env_name.to_string(),
            deploy_key: deploy_key.clone(),
        })
    }

    /// Release `deploy_key` to each domain in its own environment
    ///
    /// Stops at the first failure; releases already created stay in place.
    pub async fn release_to_domains(
        &self,
        site: &str,
        deploy_key: &DeployKey,
        domains: &[&Domain],
    ) -> Result<Vec<ReleaseTarget>, DeployError> {
        let mut targets = Vec::with_capacity(domains.len());
        for domain in domains {
            targets.push(
                self.create_release(site, deploy_key, &domain.domain_name, &domain.env)
                    .await?,
            );
        }
        Ok(targets)
    }

    /// Bind a new hostname to an environment
    pub async fn add_domain(
        &self,
        site: &str,
        domain_name: &str,
        env_name: &str,
    ) -> Result<(), DeployError> {
        validate_domain_name(domain_name)?;
        validate_environment_name(env_name)?;
        self.backend.add_domain(site, domain_name, env_name).await?;
        info!(site = %site, domain = %domain_name, env = %env_name, "Domain added");
        Ok(())
    }

    pub async fn create_environment(
        &self,
        site: &str,
        env_name: &str,
        settings: &Value,
    ) -> Result<Environment, DeployError> {
        validate_environment_name(env_name)?;
        if env_name == PROD_ENV {
            return Err(ValidationError::ReservedEnvironment {
                name: env_name.to_string(),
            }
            .into());
        }
        let environment = self
            .backend
            .create_environment(site, env_name, settings)
            .await?;
        info!(site = %site, env = %env_name, "Environment created");
        Ok(environment)
    }

    pub async fn update_environment(
        &self,
        site: &str,
        env_name: &str,
        settings: &Value,
    ) -> Result<(), DeployError> {
        validate_environment_name(env_name)?;
        self.backend
            .update_environment(site, env_name, settings)
            .await?;
        info!(site = %site, env = %env_name, "Environment updated");
        Ok(())
    }

    /// Delete an environment; `prod` is refused without contacting the backend
    pub async fn delete_environment(&self, site: &str, env_name: &str) -> Result<(), DeployError> {
        ensure_deletable(env_name)?;
        self.backend.delete_environment(site, env_name).await?;
        info!(site = %site, env = %env_name, "Environment deleted");
        Ok(())
    }
}

/// Whether `env_name` may be deleted at all, checked before any prompt or request
pub fn ensure_deletable(env_name: &str) -> Result<(), DeployError> {
    if env_name == PROD_ENV {
        return Err(DeployError::ProtectedResource {
            name: env_name.to_string(),
        });
    }
    validate_environment_name(env_name)?;
    Ok(())
}
