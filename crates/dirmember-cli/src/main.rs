//! dirmember - directory identity and group membership lookups
//!
//! Answers "does this user exist", "which groups is this user in", "who is
//! in this group" and "is this password right" against an LDAP directory.

mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use commands::CommandContext;
use dirmember_auth::LdapClient;
use dirmember_core::config::DirmemberConfig;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "dirmember")]
#[command(version = dirmember_core::VERSION)]
#[command(about = "Directory identity and group membership lookups", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true, env = "DIRMEMBER_CONFIG")]
    config: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "DIRMEMBER_LOG_LEVEL")]
    log_level: Option<String>,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value = "text")]
    output: OutputFormat,
}

#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Check whether a user exists
    UserExists { login: String },

    /// Check whether a group exists
    GroupExists { group: String },

    /// List the groups of a user
    Groups { login: String },

    /// List the members of a group, nested groups included
    Members { group: String },

    /// Check a user against one or more groups
    InGroups {
        login: String,

        /// Candidate groups
        groups: Vec<String>,

        /// Require every group instead of any one
        #[arg(long)]
        all: bool,
    },

    /// Check a password for a login or DN
    Authenticate {
        identity: String,

        /// Password to check
        #[arg(long, env = "DIRMEMBER_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let config = if let Some(config_path) = &cli.config {
        DirmemberConfig::from_file(config_path)?
    } else {
        DirmemberConfig::from_env()
    };

    init_logging(&config, cli.log_level.as_deref());

    if let Commands::Version = cli.command {
        println!("dirmember {}", dirmember_core::VERSION);
        return Ok(ExitCode::SUCCESS);
    }

    let client = LdapClient::connect(&config.directory).await?;
    debug!(
        "Using {} with users under {}",
        config.directory.server_url,
        client.config().base_dn
    );
    let ctx = CommandContext {
        client,
        output_format: cli.output,
    };

    let answer = match cli.command {
        Commands::UserExists { login } => commands::user::exists(&ctx, &login).await?,
        Commands::GroupExists { group } => commands::group::exists(&ctx, &group).await?,
        Commands::Groups { login } => commands::user::groups(&ctx, &login).await?,
        Commands::Members { group } => commands::group::members(&ctx, &group).await?,
        Commands::InGroups { login, groups, all } => {
            commands::user::in_groups(&ctx, &login, &groups, !all).await?
        }
        Commands::Authenticate { identity, password } => {
            commands::user::authenticate(&ctx, &identity, &password).await?
        }
        Commands::Version => true,
    };

    if let Err(e) = ctx.client.close().await {
        debug!("Closing connection failed: {}", e);
    }

    Ok(if answer {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn init_logging(config: &DirmemberConfig, level: Option<&str>) {
    let level = level.unwrap_or(&config.logging.level);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // Logs go to stderr so answers on stdout stay machine readable
    if config.logging.format == "json" {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .with(filter)
            .init();
    }
}
