//! Integration commands

use anyhow::Result;

use crate::config::SiteConfig;
use crate::infrastructure::Integration;
use crate::services::Session;
use crate::ui;

pub fn authorise(config: &SiteConfig, provider: Integration) -> Result<()> {
    ui::print_info(&format!("Open this URL to authorise {}:", provider.name()));
    println!("  {}", provider.authorise_url(&config.api_url, &config.site));
    Ok(())
}

pub async fn connect(session: &Session, provider: Integration, target: &str) -> Result<()> {
    provider
        .create_webhook(session.api(), session.site(), target)
        .await?;
    ui::print_success(&format!(
        "{} webhook connected to {} {}",
        provider.name(),
        provider.target_label(),
        target
    ));
    Ok(())
}

pub async fn disconnect(session: &Session, provider: Integration) -> Result<()> {
    provider.delete_webhook(session.api(), session.site()).await?;
    ui::print_success(&format!("{} webhook disconnected", provider.name()));
    Ok(())
}
