//! Environment commands

use anyhow::{Context, Result};
use colored::Colorize;
use serde_json::Value;
use std::io::{self, Write};
use std::path::Path;

use crate::config::SiteConfig;
use crate::services::{ensure_deletable, Session};
use crate::ui;

pub async fn list(session: &Session) -> Result<()> {
    let environments = session.releases().list_environments(session.site()).await?;
    ui::print_info(&format!("Environments of {}", session.site()));
    ui::print_menu(&environments, |env| {
        if env.is_prod() {
            format!("{} {}", env.name, "(protected)".dimmed())
        } else {
            env.name.clone()
        }
    });
    Ok(())
}

pub async fn create(
    config: &SiteConfig,
    session: &Session,
    name: &str,
    settings_path: Option<&Path>,
) -> Result<()> {
    let settings = resolve_settings(config, settings_path)?;
    let environment = session
        .releases()
        .create_environment(session.site(), name, &settings)
        .await?;
    ui::print_success(&format!("Created environment {}", environment.name));
    Ok(())
}

pub async fn update(
    config: &SiteConfig,
    session: &Session,
    name: &str,
    settings_path: Option<&Path>,
) -> Result<()> {
    let settings = resolve_settings(config, settings_path)?;
    session
        .releases()
        .update_environment(session.site(), name, &settings)
        .await?;
    ui::print_success(&format!("Updated environment {}", name));
    Ok(())
}

pub async fn delete(session: &Session, name: &str, yes: bool) -> Result<()> {
    ensure_deletable(name)?;
    if !yes && !confirm(&format!("Delete environment '{}' of {}?", name, session.site()))? {
        ui::print_warning("Aborted");
        return Ok(());
    }
    session
        .releases()
        .delete_environment(session.site(), name)
        .await?;
    ui::print_success(&format!("Deleted environment {}", name));
    Ok(())
}

fn confirm(question: &str) -> Result<bool> {
    print!("{} [y/N] ", question);
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin()
        .read_line(&mut answer)
        .context("Failed to read confirmation")?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

/// Settings from `path` (YAML or JSON) or the site's own settings
fn resolve_settings(config: &SiteConfig, path: Option<&Path>) -> Result<Value> {
    let Some(path) = path else {
        return Ok(config.settings.clone());
    };
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read settings file {}", path.display()))?;
    let settings: Value = serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse settings file {}", path.display()))?;
    if !settings.is_object() {
        anyhow::bail!("Settings file {} must contain a mapping", path.display());
    }
    Ok(settings)
}
