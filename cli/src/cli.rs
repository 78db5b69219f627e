//! CLI definitions for siteship
//!
//! This module contains all CLI argument parsing structures using clap.
//! Items picked from a list (deployments, domains) are addressed by the
//! menu letters the list commands print.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::infrastructure::Integration;

#[derive(Parser)]
#[command(
    name = "siteship",
    version,
    about = "Publish web sites and manage their releases",
    long_about = "Packages a built site, uploads it, waits for every environment to deploy it\nand binds domains to the resulting deploy key."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to siteship.yaml (default: ./siteship.yaml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// API token (or set SITESHIP_TOKEN env var)
    #[arg(long, global = true, env = "SITESHIP_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Package, upload and deploy the build output
    Publish {
        /// Description attached to the deployment
        #[arg(long, short)]
        description: Option<String>,

        /// Release to these domains once deployed (letters from `domain list`)
        #[arg(long = "domain")]
        domains: Vec<String>,
    },

    /// Manage environments
    Env {
        #[command(subcommand)]
        command: EnvCommands,
    },

    /// Manage domains
    Domain {
        #[command(subcommand)]
        command: DomainCommands,
    },

    /// Inspect deployments
    Deploy {
        #[command(subcommand)]
        command: DeployCommands,
    },

    /// Manage releases
    Release {
        #[command(subcommand)]
        command: ReleaseCommands,
    },

    /// Connect third-party integrations
    Integration {
        #[command(subcommand)]
        command: IntegrationCommands,
    },
}

/// Environment subcommands
#[derive(Subcommand)]
pub enum EnvCommands {
    /// List environments in creation order
    List,

    /// Create an environment
    Create {
        /// Environment name
        name: String,

        /// YAML or JSON file with environment settings (default: site settings)
        #[arg(long)]
        settings: Option<PathBuf>,
    },

    /// Replace an environment's settings
    Update {
        /// Environment name
        name: String,

        /// YAML or JSON file with environment settings (default: site settings)
        #[arg(long)]
        settings: Option<PathBuf>,
    },

    /// Delete an environment (prod cannot be deleted)
    Delete {
        /// Environment name
        name: String,

        /// Skip the confirmation prompt
        #[arg(long, short)]
        yes: bool,
    },
}

/// Domain subcommands
#[derive(Subcommand)]
pub enum DomainCommands {
    /// List domains in creation order
    List,

    /// Bind a hostname to an environment
    Add {
        /// Hostname, e.g. blog.example.com
        name: String,

        /// Environment serving the hostname
        #[arg(long, default_value = "prod")]
        env: String,
    },
}

/// Deployment subcommands
#[derive(Subcommand)]
pub enum DeployCommands {
    /// List deployments in creation order
    List,
}

/// Release subcommands
#[derive(Subcommand)]
pub enum ReleaseCommands {
    /// List the effective release of each domain
    List,

    /// Release a deployment to one or more domains
    Create {
        /// Deployment letter from `deploy list`
        #[arg(long, required = true)]
        deployment: String,

        /// Domain letters from `domain list` (can be specified multiple times)
        #[arg(long = "domain", required = true)]
        domains: Vec<String>,
    },
}

/// Integration subcommands
#[derive(Subcommand)]
pub enum IntegrationCommands {
    /// Print the URL that grants the backend access to a provider
    Authorise {
        #[arg(value_enum)]
        provider: Integration,
    },

    /// Register the provider webhook for this site
    Connect {
        #[arg(value_enum)]
        provider: Integration,

        /// Repository (owner/name) or channel the webhook targets
        #[arg(long, required = true)]
        target: String,
    },

    /// Remove the provider webhook for this site
    Disconnect {
        #[arg(value_enum)]
        provider: Integration,
    },
}
