//! Hosting backend API client
//!
//! Every call is bearer-token authenticated. Non-success responses are
//! surfaced as [`TransportError::Status`] with the response body; nothing is
//! retried here.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use super::auth::AuthToken;
use super::backend::{IntegrationBackend, SiteBackend, StatusSource};
use crate::domain::{DeployKey, Deployment, DeploymentStatus, Domain, Environment, Reference, Release};
use crate::error::{DeployError, TransportError};

/// Request to create an environment
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateEnvironmentRequest<'a> {
    env_name: &'a str,
    settings: &'a Value,
}

/// Request to update an environment
#[derive(Debug, Clone, Serialize)]
struct UpdateEnvironmentRequest<'a> {
    settings: &'a Value,
}

/// Request to bind a domain to an environment
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct AddDomainRequest<'a> {
    domain_name: &'a str,
    env_name: &'a str,
}

/// Request to create a release
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateReleaseRequest<'a> {
    domain_name: &'a str,
    deploy_key: &'a str,
    env_name: &'a str,
}

#[derive(Debug, Deserialize)]
struct EnvironmentsResponse {
    #[serde(default)]
    environments: Vec<Environment>,
}

#[derive(Debug, Deserialize)]
struct DomainsResponse {
    #[serde(default)]
    domains: Vec<Domain>,
}

#[derive(Debug, Deserialize)]
struct DeploymentsResponse {
    #[serde(default)]
    deployments: Vec<Deployment>,
}

#[derive(Debug, Deserialize)]
struct StatusesResponse {
    #[serde(default)]
    statuses: Vec<DeploymentStatus>,
}

#[derive(Debug, Deserialize)]
struct ReleasesResponse {
    #[serde(default)]
    releases: Vec<Release>,
}

/// Backend API client
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: AuthToken,
}

impl ApiClient {
    /// Create a new client for `base_url`
    pub fn new(base_url: impl Into<String>, token: AuthToken) -> Result<Self, DeployError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| TransportError::request("client setup", e))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
        })
    }

    fn site_url(&self, site: &str, path: &str) -> String {
        format!(
            "{}/sites/{}/{}",
            self.base_url,
            urlencoding::encode(site),
            path
        )
    }

    async fn send(
        &self,
        operation: &str,
        request: RequestBuilder,
    ) -> Result<reqwest::Response, DeployError> {
        let response = request
            .header("Authorization", self.token.bearer())
            .send()
            .await
            .map_err(|e| TransportError::request(operation, e))?;

        let status = response.status();
        debug!(operation = %operation, status = %status, "Backend responded");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                operation: operation.to_string(),
                status: status.as_u16(),
                body,
            }
            .into());
        }

        Ok(response)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        operation: &str,
        request: RequestBuilder,
    ) -> Result<T, DeployError> {
        let response = self.send(operation, request).await?;
        response.json().await.map_err(|e| {
            TransportError::Decode {
                operation: operation.to_string(),
                message: e.to_string(),
            }
            .into()
        })
    }

    /// Status source bound to one site
    pub fn status_feed(&self, site: impl Into<String>) -> SiteStatusFeed {
        SiteStatusFeed {
            client: self.clone(),
            site: site.into(),
        }
    }

    /// Fetch status reports for a publish reference
    pub async fn deployment_statuses(
        &self,
        site: &str,
        reference: &Reference,
    ) -> Result<Vec<DeploymentStatus>, DeployError> {
        let url = self.site_url(site, &format!("deployments/{}", reference));
        let response: StatusesResponse = self
            .send_json("Poll deployment status", self.client.get(&url))
            .await?;
        Ok(response.statuses)
    }
}

#[async_trait]
impl SiteBackend for ApiClient {
    async fn list_environments(&self, site: &str) -> Result<Vec<Environment>, DeployError> {
        let url = self.site_url(site, "environments");
        let response: EnvironmentsResponse = self
            .send_json("List environments", self.client.get(&url))
            .await?;
        Ok(response.environments)
    }

    async fn create_environment(
        &self,
        site: &str,
        env_name: &str,
        settings: &Value,
    ) -> Result<Environment, DeployError> {
        let url = self.site_url(site, "environments");
        let request = CreateEnvironmentRequest { env_name, settings };
        self.send_json("Create environment", self.client.post(&url).json(&request))
            .await
    }

    async fn update_environment(
        &self,
        site: &str,
        env_name: &str,
        settings: &Value,
    ) -> Result<(), DeployError> {
        let url = self.site_url(
            site,
            &format!("environments/{}", urlencoding::encode(env_name)),
        );
        let request = UpdateEnvironmentRequest { settings };
        self.send("Update environment", self.client.put(&url).json(&request))
            .await?;
        Ok(())
    }

    async fn delete_environment(&self, site: &str, env_name: &str) -> Result<(), DeployError> {
        let url = self.site_url(
            site,
            &format!("environments/{}", urlencoding::encode(env_name)),
        );
        self.send("Delete environment", self.client.delete(&url))
            .await?;
        Ok(())
    }

    async fn list_domains(&self, site: &str) -> Result<Vec<Domain>, DeployError> {
        let url = self.site_url(site, "domains");
        let response: DomainsResponse = self
            .send_json("List domains", self.client.get(&url))
            .await?;
        Ok(response.domains)
    }

    async fn add_domain(
        &self,
        site: &str,
        domain_name: &str,
        env_name: &str,
    ) -> Result<(), DeployError> {
        let url = self.site_url(site, "domains");
        let request = AddDomainRequest {
            domain_name,
            env_name,
        };
        self.send("Add domain", self.client.post(&url).json(&request))
            .await?;
        Ok(())
    }

    async fn list_deployments(&self, site: &str) -> Result<Vec<Deployment>, DeployError> {
        let url = self.site_url(site, "deployments");
        let response: DeploymentsResponse = self
            .send_json("List deployments", self.client.get(&url))
            .await?;
        Ok(response.deployments)
    }

    async fn create_release(
        &self,
        site: &str,
        domain_name: &str,
        deploy_key: &DeployKey,
        env_name: &str,
    ) -> Result<(), DeployError> {
        let url = self.site_url(site, "releases");
        let request = CreateReleaseRequest {
            domain_name,
            deploy_key: deploy_key.as_str(),
            env_name,
        };
        self.send("Create release", self.client.post(&url).json(&request))
            .await?;
        Ok(())
    }

    async fn list_releases(&self, site: &str) -> Result<Vec<Release>, DeployError> {
        let url = self.site_url(site, "releases");
        let response: ReleasesResponse = self
            .send_json("List releases", self.client.get(&url))
            .await?;
        Ok(response.releases)
    }
}

#[async_trait]
impl IntegrationBackend for ApiClient {
    async fn create_webhook(
        &self,
        site: &str,
        provider: &str,
        body: &Value,
    ) -> Result<(), DeployError> {
        let url = self.site_url(site, &format!("integrations/{}/webhook", provider));
        self.send("Create webhook", self.client.post(&url).json(body))
            .await?;
        Ok(())
    }

    async fn delete_webhook(&self, site: &str, provider: &str) -> Result<(), DeployError> {
        let url = self.site_url(site, &format!("integrations/{}/webhook", provider));
        self.send("Delete webhook", self.client.delete(&url))
            .await?;
        Ok(())
    }
}

/// [`StatusSource`] polling one site's deployment status endpoint
pub struct SiteStatusFeed {
    client: ApiClient,
    site: String,
}

#[async_trait]
impl StatusSource for SiteStatusFeed {
    async fn fetch_statuses(
        &self,
        reference: &Reference,
    ) -> Result<Vec<DeploymentStatus>, DeployError> {
        self.client.deployment_statuses(&self.site, reference).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> ApiClient {
        ApiClient::new(server.uri(), AuthToken::new("test-token")).unwrap()
    }

    #[tokio::test]
    async fn test_list_environments() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/sites/blog/environments"))
            .and(header("Authorization", "Bearer test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "environments": [{"name": "prod"}, {"name": "staging"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let envs = client(&server).list_environments("blog").await.unwrap();
        assert_eq!(envs, vec![Environment::new("prod"), Environment::new("staging")]);
    }

    #[tokio::test]
    async fn test_create_release_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/sites/blog/releases"))
            .and(body_json(json!({
                "domainName": "blog.example.com",
                "deployKey": "0a1b2c3d",
                "envName": "prod"
            })))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let key = DeployKey::parse("0a1b2c3d").unwrap();
        client(&server)
            .create_release("blog", "blog.example.com", &key, "prod")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_error_status_is_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/sites/blog/domains"))
            .respond_with(ResponseTemplate::new(403).set_body_string("quota exceeded"))
            .mount(&server)
            .await;

        let err = client(&server).list_domains("blog").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transport);
        assert!(err.to_string().contains("403"));
        assert!(err.to_string().contains("quota exceeded"));
    }

    #[tokio::test]
    async fn test_status_feed_polls_reference() {
        let server = MockServer::start().await;
        let reference = Reference::mint();
        Mock::given(method("GET"))
            .and(path(format!("/sites/blog/deployments/{}", reference)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "statuses": [{"env": "prod", "url": "https://abc.blog.example.com"}]
            })))
            .mount(&server)
            .await;

        let feed = client(&server).status_feed("blog");
        let statuses = feed.fetch_statuses(&reference).await.unwrap();
        assert_eq!(statuses.len(), 1);
        assert_eq!(statuses[0].env, "prod");
    }

    #[tokio::test]
    async fn test_malformed_body_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/sites/blog/releases"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = client(&server).list_releases("blog").await.unwrap_err();
        assert!(matches!(
            err,
            DeployError::Transport(TransportError::Decode { .. })
        ));
    }
}
