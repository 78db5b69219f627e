//! Content addressing
//!
//! Derives stable identifiers from build artifacts. Everything here is a
//! pure function of its inputs: no timestamps, no randomness.

use serde_json::Value;
use sha2::{Digest, Sha256};

use super::site::DeployKey;

/// Calculate SHA256 hash of content
fn calculate_hash(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    format!("{:x}", hasher.finalize())
}

/// Identifier of the rendered server bundle
pub fn compute_code_id(bundle: &[u8]) -> String {
    calculate_hash(bundle)
}

/// Serialize settings with object keys sorted at every level
///
/// Two settings values with the same key/value pairs always produce the
/// same string, whatever order their keys were inserted in.
pub fn canonical_json(settings: &Value) -> String {
    canonicalize(settings).to_string()
}

fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(key, value)| (key.clone(), canonicalize(value)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

/// Identifier of the site settings
pub fn compute_settings_id(settings: &Value) -> String {
    calculate_hash(canonical_json(settings).as_bytes())
}

/// Deploy key for a (code, site, settings) combination
pub fn compute_deploy_key(code_id: &str, site_name: &str, settings_id: &str) -> DeployKey {
    let digest = calculate_hash(format!("{}.{}.{}", code_id, site_name, settings_id).as_bytes());
    DeployKey::from_digest(&digest)
}

/// The three content-derived identifiers of one publish
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentIds {
    pub code_id: String,
    pub settings_id: String,
    pub deploy_key: DeployKey,
}

impl ContentIds {
    pub fn compute(bundle: &[u8], site_name: &str, settings: &Value) -> Self {
        let code_id = compute_code_id(bundle);
        let settings_id = compute_settings_id(settings);
        let deploy_key = compute_deploy_key(&code_id, site_name, &settings_id);
        Self {
            code_id,
            settings_id,
            deploy_key,
        }
    }
}
