//! Bearer token discovery
//!
//! The token is looked up once per invocation and carried in the
//! [`Session`](crate::services::Session); nothing caches it globally.

use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::ConfigError;

/// Environment variable holding the API token
pub const TOKEN_ENV: &str = "SITESHIP_TOKEN";

/// Bearer token for the backend and blob storage
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken(String);

impl AuthToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Value for an `Authorization` header
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthToken(***)")
    }
}

#[derive(Debug, Deserialize)]
struct CredentialsFile {
    token: Option<String>,
}

/// Default credentials file location (`~/.siteship/credentials.yaml`)
pub fn default_credentials_path() -> Option<PathBuf> {
    std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".siteship/credentials.yaml"))
}

/// Discover the API token
///
/// Priority:
/// 1. Provided token parameter
/// 2. SITESHIP_TOKEN environment variable
/// 3. `token` field of the credentials file
pub fn discover_token(
    token: Option<String>,
    credentials_path: Option<&Path>,
) -> Result<AuthToken, ConfigError> {
    token
        .filter(|t| !t.is_empty())
        .or_else(|| std::env::var(TOKEN_ENV).ok().filter(|t| !t.is_empty()))
        .or_else(|| credentials_path.and_then(read_credentials_token))
        .map(AuthToken::new)
        .ok_or(ConfigError::TokenNotFound)
}

fn read_credentials_token(path: &Path) -> Option<String> {
    let content = std::fs::read_to_string(path).ok()?;
    match serde_yaml::from_str::<CredentialsFile>(&content) {
        Ok(credentials) => credentials.token.filter(|t| !t.is_empty()),
        Err(e) => {
            debug!(path = %path.display(), error = %e, "Ignoring unreadable credentials file");
            None
        }
    }
}
