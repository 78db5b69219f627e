//! Session state threaded through every command
//!
//! A [`Session`] owns the authenticated clients for one site. A
//! [`PublishContext`] carries what belongs to a single publish.

use crate::config::SiteConfig;
use crate::domain::Reference;
use crate::error::DeployError;
use crate::infrastructure::{ApiClient, AuthToken, BlobStore};

use super::release_manager::ReleaseManager;

/// Authenticated clients bound to one site
pub struct Session {
    site: String,
    user_id: String,
    api: ApiClient,
    blob: BlobStore,
}

impl Session {
    /// Build the clients described by `config`
    pub fn from_config(config: &SiteConfig, token: AuthToken) -> Result<Self, DeployError> {
        Ok(Self {
            site: config.site.clone(),
            user_id: config.user_id.clone(),
            api: ApiClient::new(&config.api_url, token.clone())?,
            blob: BlobStore::new(&config.blob_url, token)?,
        })
    }

    pub fn site(&self) -> &str {
        &self.site
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn blob(&self) -> &BlobStore {
        &self.blob
    }

    /// Release manager over this session's backend
    pub fn releases(&self) -> ReleaseManager<'_> {
        ReleaseManager::new(&self.api)
    }
}

/// Per-publish state
#[derive(Debug, Clone)]
pub struct PublishContext {
    /// Correlation id for status polling, minted once per publish
    pub reference: Reference,
    pub description: String,
}

impl PublishContext {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            reference: Reference::mint(),
            description: description.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_each_publish_gets_fresh_reference() {
        let first = PublishContext::new("a");
        let second = PublishContext::new("a");
        assert_ne!(first.reference, second.reference);
    }

    #[test]
    fn test_session_from_config() {
        let config = SiteConfig::parse(
            "site: blog\nuser_id: u-1\napi_url: https://api.test\nblob_url: https://blob.test\n",
        )
        .unwrap();
        let session = Session::from_config(&config, AuthToken::new("t")).unwrap();
        assert_eq!(session.site(), "blog");
        assert_eq!(session.user_id(), "u-1");
    }
}
