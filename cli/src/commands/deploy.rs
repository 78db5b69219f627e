//! Deployment commands

use anyhow::Result;
use colored::Colorize;

use crate::services::Session;
use crate::ui;

pub async fn list(session: &Session) -> Result<()> {
    let deployments = session.releases().list_deployments(session.site()).await?;
    ui::print_info(&format!("Deployments of {}", session.site()));
    ui::print_menu(&deployments, |d| {
        format!("{} {:<12} {}", d.deploy_key.bold(), d.env, d.description.dimmed())
    });
    Ok(())
}
