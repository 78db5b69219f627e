//! Domain commands

use anyhow::Result;
use colored::Colorize;

use crate::services::Session;
use crate::ui;

pub async fn list(session: &Session) -> Result<()> {
    let domains = session.releases().list_domains(session.site()).await?;
    ui::print_info(&format!("Domains of {}", session.site()));
    ui::print_menu(&domains, |d| {
        format!("{:<40} {}", d.domain_name, d.env.dimmed())
    });
    Ok(())
}

pub async fn add(session: &Session, name: &str, env: &str) -> Result<()> {
    session
        .releases()
        .add_domain(session.site(), name, env)
        .await?;
    ui::print_success(&format!("Added {} to environment {}", name, env));
    Ok(())
}
