//! Site data model
//!
//! Environments, domains, deployments and releases as the backend reports
//! them, plus the locally minted identifiers of a publish
//! ([`DeployKey`] and [`Reference`]).

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;
use uuid::Uuid;

use crate::error::ValidationError;

/// The protected default environment every site has
pub const PROD_ENV: &str = "prod";

/// Number of hex characters in a deploy key
pub const DEPLOY_KEY_LEN: usize = 8;

const LABEL_PATTERN: &str = r"[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?";
const MAX_HOSTNAME_LEN: usize = 253;

fn hostname_regex() -> &'static Regex {
    static HOSTNAME: OnceLock<Regex> = OnceLock::new();
    HOSTNAME.get_or_init(|| {
        Regex::new(&format!(r"^{label}(?:\.{label})*$", label = LABEL_PATTERN))
            .expect("hostname pattern is valid")
    })
}

fn label_regex() -> &'static Regex {
    static LABEL: OnceLock<Regex> = OnceLock::new();
    LABEL.get_or_init(|| {
        Regex::new(&format!(r"^{}$", LABEL_PATTERN)).expect("label pattern is valid")
    })
}

/// Check a domain name against the RFC-1123-style hostname grammar
pub fn validate_domain_name(name: &str) -> Result<(), ValidationError> {
    if name.len() <= MAX_HOSTNAME_LEN && hostname_regex().is_match(name) {
        Ok(())
    } else {
        Err(ValidationError::InvalidDomainName {
            name: name.to_string(),
        })
    }
}

/// Environment names are single hostname labels
pub fn validate_environment_name(name: &str) -> Result<(), ValidationError> {
    if label_regex().is_match(name) {
        Ok(())
    } else {
        Err(ValidationError::InvalidEnvironmentName {
            name: name.to_string(),
        })
    }
}

/// Named deployment target within a site
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    pub name: String,
}

impl Environment {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn is_prod(&self) -> bool {
        self.name == PROD_ENV
    }
}

/// Hostname bound to exactly one environment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Domain {
    pub domain_name: String,
    pub env: String,
}

/// Result of one publish
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deployment {
    pub deploy_key: String,
    pub env: String,
    #[serde(default)]
    pub description: String,
}

/// Status report of a deployment in one environment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentStatus {
    pub env: String,
    pub url: String,
}

/// Binding of a domain and environment to a deploy key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    pub url: String,
    pub deploy_key: String,
    pub created_at: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<String>,
}

impl Release {
    /// The `(domain, env)` pair this release is effective for, when reported
    pub fn target(&self) -> Option<(&str, &str)> {
        match (&self.domain_name, &self.env) {
            (Some(domain), Some(env)) => Some((domain.as_str(), env.as_str())),
            _ => None,
        }
    }
}

/// 8-hex-char identifier of a (code, site, settings) combination
///
/// Truncated to 32 bits so it stays readable in URLs. Collisions are
/// possible in theory and are not detected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeployKey(String);

impl DeployKey {
    /// Parse a user-supplied deploy key
    pub fn parse(key: &str) -> Result<Self, ValidationError> {
        let valid = key.len() == DEPLOY_KEY_LEN
            && key
                .chars()
                .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c));
        if valid {
            Ok(Self(key.to_string()))
        } else {
            Err(ValidationError::InvalidDeployKey {
                key: key.to_string(),
            })
        }
    }

    /// Build from a full lowercase hex digest
    pub(crate) fn from_digest(hex_digest: &str) -> Self {
        Self(hex_digest[..DEPLOY_KEY_LEN].to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeployKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Correlation id for polling the status of one publish
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Reference(Uuid);

impl Reference {
    /// Mint a fresh random reference
    pub fn mint() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}
