//! Command handlers
//!
//! Each handler turns parsed CLI arguments into service calls and prints
//! the result. Errors are `anyhow` from here up.

pub mod deploy;
pub mod domain;
pub mod env;
pub mod integration;
pub mod publish;
pub mod release;

use anyhow::{Context, Result};
use std::path::Path;

use crate::config::SiteConfig;
use crate::infrastructure::auth::{default_credentials_path, discover_token};
use crate::services::Session;
use crate::ui;

/// Load and validate the site configuration
pub fn load_config(config_path: Option<&Path>) -> Result<SiteConfig> {
    SiteConfig::discover(config_path).context("Failed to load site configuration")
}

/// Load config and open an authenticated session
pub fn open_session(
    config_path: Option<&Path>,
    token: Option<String>,
) -> Result<(SiteConfig, Session)> {
    let config = load_config(config_path)?;
    let token = discover_token(token, default_credentials_path().as_deref())?;
    let session = Session::from_config(&config, token)?;
    Ok((config, session))
}

/// Translate menu letters to 0-based positions
pub fn parse_letters(letters: &[String]) -> Result<Vec<usize>> {
    letters
        .iter()
        .map(|l| {
            ui::parse_letter(l)
                .ok_or_else(|| anyhow::anyhow!("'{}' is not a menu letter (expected A, B, C...)", l))
        })
        .collect()
}

/// Warn about requested positions that did not exist
pub fn warn_out_of_range(kind: &str, out_of_range: &[usize]) {
    for &index in out_of_range {
        ui::print_warning(&format!("Ignoring {} {}: no such entry", kind, ui::letter(index)));
    }
}
