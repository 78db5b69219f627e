//! Release commands

use anyhow::{Context, Result};
use colored::Colorize;

use super::{parse_letters, warn_out_of_range};
use crate::domain::{select_many, select_one, DeployKey};
use crate::observability::{emit_event, EventMetadata, PublishEvent, ReleaseCreatedEvent};
use crate::services::Session;
use crate::ui;

pub async fn list(session: &Session) -> Result<()> {
    let releases = session.releases().list_releases(session.site()).await?;
    ui::print_info(&format!("Releases of {}", session.site()));
    for release in &releases {
        let target = release
            .target()
            .map(|(domain, env)| format!("{} ({})", domain, env))
            .unwrap_or_else(|| release.url.clone());
        println!(
            "  {:<48} {} {}  {}",
            target,
            release.deploy_key.bold(),
            release.created_at.dimmed(),
            release.description
        );
    }
    Ok(())
}

pub async fn create(session: &Session, deployment: &str, domain_letters: &[String]) -> Result<()> {
    let site = session.site();
    let manager = session.releases();

    let (deployments, domains) =
        tokio::try_join!(manager.list_deployments(site), manager.list_domains(site))?;

    let deployment_index = ui::parse_letter(deployment)
        .with_context(|| format!("'{}' is not a menu letter (expected A, B, C...)", deployment))?;
    let deployment = select_one(&deployments, deployment_index)?;
    let deploy_key = DeployKey::parse(&deployment.deploy_key)?;

    let selection = select_many(&domains, &parse_letters(domain_letters)?)?;
    warn_out_of_range("domain", &selection.out_of_range);

    let targets = manager
        .release_to_domains(site, &deploy_key, &selection.chosen)
        .await?;

    for target in &targets {
        emit_event(PublishEvent::ReleaseCreated(ReleaseCreatedEvent {
            metadata: EventMetadata::new(site, None),
            domain: target.domain_name.clone(),
            environment: target.env_name.clone(),
            deploy_key: target.deploy_key.to_string(),
        }));
        ui::print_success(&format!(
            "Released {} to {} ({})",
            target.deploy_key, target.domain_name, target.env_name
        ));
    }
    Ok(())
}
