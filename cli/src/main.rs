use anyhow::Result;
use clap::Parser;

// Core modules
mod cli;
mod commands;
mod config;
mod observability;

// Layered architecture
mod domain;
mod error;
mod infrastructure;
mod services;
mod ui;

use cli::{
    Cli, Commands, DeployCommands, DomainCommands, EnvCommands, IntegrationCommands,
    ReleaseCommands,
};
use commands::{deploy, domain as domain_cmd, env, integration, publish, release};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging with LOGGING env var support
    // LOGGING=debug,info,warn,error or just LOGGING=debug
    let log_level = std::env::var("LOGGING")
        .or_else(|_| std::env::var("LOG_LEVEL"))
        .unwrap_or_else(|_| {
            if cli.verbose {
                "debug".to_string()
            } else {
                "info".to_string()
            }
        });

    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_ansi(false)
        .init();

    if let Err(e) = run(cli).await {
        ui::print_error(&format!("{:#}", e));
        let code = error::ErrorKind::of(&e).map_or(1, |kind| kind.exit_code());
        std::process::exit(code);
    }
    Ok(())
}

/// Commands that talk to the backend need a token; the rest only need config
fn requires_session(command: &Commands) -> bool {
    !matches!(
        command,
        Commands::Integration {
            command: IntegrationCommands::Authorise { .. }
        }
    )
}

async fn run(cli: Cli) -> Result<()> {
    if !requires_session(&cli.command) {
        let config = commands::load_config(cli.config.as_deref())?;
        if let Commands::Integration {
            command: IntegrationCommands::Authorise { provider },
        } = cli.command
        {
            integration::authorise(&config, provider)?;
        }
        return Ok(());
    }

    let (config, session) = commands::open_session(cli.config.as_deref(), cli.token)?;

    match cli.command {
        Commands::Publish {
            description,
            domains,
        } => {
            publish::execute(&config, &session, description, domains).await?;
        }
        Commands::Env { command } => match command {
            EnvCommands::List => env::list(&session).await?,
            EnvCommands::Create { name, settings } => {
                env::create(&config, &session, &name, settings.as_deref()).await?
            }
            EnvCommands::Update { name, settings } => {
                env::update(&config, &session, &name, settings.as_deref()).await?
            }
            EnvCommands::Delete { name, yes } => env::delete(&session, &name, yes).await?,
        },
        Commands::Domain { command } => match command {
            DomainCommands::List => domain_cmd::list(&session).await?,
            DomainCommands::Add { name, env } => domain_cmd::add(&session, &name, &env).await?,
        },
        Commands::Deploy { command } => match command {
            DeployCommands::List => deploy::list(&session).await?,
        },
        Commands::Release { command } => match command {
            ReleaseCommands::List => release::list(&session).await?,
            ReleaseCommands::Create {
                deployment,
                domains,
            } => release::create(&session, &deployment, &domains).await?,
        },
        Commands::Integration { command } => match command {
            IntegrationCommands::Authorise { provider } => {
                integration::authorise(&config, provider)?
            }
            IntegrationCommands::Connect { provider, target } => {
                integration::connect(&session, provider, &target).await?
            }
            IntegrationCommands::Disconnect { provider } => {
                integration::disconnect(&session, provider).await?
            }
        },
    }

    Ok(())
}
