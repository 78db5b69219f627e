//! Publish command
//!
//! Runs the publish pipeline with an upload progress bar and a spinner
//! while environments deploy. Ctrl-C abandons the upload or the status
//! polling; a deployment the backend already accepted keeps going.

use anyhow::Result;
use colored::Colorize;
use indicatif::ProgressBar;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::{parse_letters, warn_out_of_range};
use crate::config::SiteConfig;
use crate::domain::{select_many, Domain};
use crate::infrastructure::UploadProgress;
use crate::services::{PublishContext, PublishOutcome, PublishService, PublishStep, Session};
use crate::ui;

pub async fn execute(
    config: &SiteConfig,
    session: &Session,
    description: Option<String>,
    domain_letters: Vec<String>,
) -> Result<()> {
    let site = session.site();

    // Resolve release targets before spending a publish on a typo
    let domains: Vec<Domain> = if domain_letters.is_empty() {
        Vec::new()
    } else {
        session.releases().list_domains(site).await?
    };
    let targets = if domain_letters.is_empty() {
        Vec::new()
    } else {
        let selection = select_many(&domains, &parse_letters(&domain_letters)?)?;
        warn_out_of_range("domain", &selection.out_of_range);
        selection.chosen
    };

    let description = description
        .or_else(|| config.description.clone())
        .unwrap_or_default();

    ui::print_header(&format!("Publish: {}", site));
    info!("Build output: {}", config.build_path().display());
    info!(
        "Polling: up to {} attempts over {}",
        config.polling.attempts,
        humantime::format_duration(config.polling.schedule().worst_case())
    );

    let ctx = PublishContext::new(description);
    let cancel = CancellationToken::new();
    let service = PublishService::new(session, config).with_cancellation(cancel.clone());

    let renderer = tokio::spawn(render_progress(
        service.subscribe(),
        session.blob().subscribe(),
    ));
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    let result = service.publish(&ctx, &targets).await;
    interrupt.abort();
    drop(service);
    let _ = renderer.await;

    let outcome = result?;
    print_outcome(&outcome);
    Ok(())
}

/// Switch between a byte bar while uploading and a spinner while waiting
async fn render_progress(
    mut steps: watch::Receiver<PublishStep>,
    mut upload: watch::Receiver<UploadProgress>,
) {
    let mut active: Option<(PublishStep, ProgressBar)> = None;

    loop {
        tokio::select! {
            changed = steps.changed() => {
                if changed.is_err() {
                    break;
                }
                let step = *steps.borrow_and_update();
                if let Some((_, bar)) = active.take() {
                    bar.finish_and_clear();
                }
                active = match step {
                    PublishStep::Uploading => {
                        Some((step, ui::upload_bar(upload.borrow().total)))
                    }
                    PublishStep::Tracking => {
                        Some((step, ui::spinner("Waiting for every environment to deploy")))
                    }
                    PublishStep::Releasing => Some((step, ui::spinner("Releasing to domains"))),
                    _ => None,
                };
            }
            changed = upload.changed() => {
                if changed.is_err() {
                    break;
                }
                let progress = *upload.borrow_and_update();
                if let Some((PublishStep::Uploading, bar)) = &active {
                    bar.set_length(progress.total);
                    bar.set_position(progress.transferred);
                    if progress.is_complete() {
                        bar.set_message("waiting for the blob store");
                    }
                }
            }
        }
    }

    if let Some((_, bar)) = active {
        bar.finish_and_clear();
    }
}

fn print_outcome(outcome: &PublishOutcome) {
    ui::print_success(&format!("Published deploy key {}", outcome.ids.deploy_key));
    println!("  Code id:   {}", outcome.ids.code_id);
    println!("  Reference: {}", outcome.reference);
    println!(
        "  Archive:   {} ({})",
        outcome.receipt.key,
        indicatif::HumanBytes(outcome.receipt.bytes)
    );
    if let Some(etag) = &outcome.receipt.etag {
        println!("  ETag:      {}", etag);
    }
    println!();
    for status in &outcome.statuses {
        println!("  {:<12} {}", status.env.bold(), status.url.cyan());
    }
    for release in &outcome.releases {
        println!(
            "  {} {} ({})",
            "released".green(),
            release.domain_name,
            release.env_name
        );
    }
}
