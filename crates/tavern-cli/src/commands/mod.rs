//! CLI command definitions and dispatch.

pub mod roll;
pub mod say;
pub mod sessions;
pub mod token;
pub mod watch;

use clap::{Parser, Subcommand};

use tavern_client::SessionClient;
use tavern_core::config::AppConfig;
use tavern_core::error::AppError;
use tavern_core::types::SessionId;

use crate::output::OutputFormat;

/// Tavern: tabletop sessions from the terminal
#[derive(Debug, Parser)]
#[command(name = "tavern", version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: String,

    /// Server root URL
    #[arg(long, env = "TAVERN_SERVER", default_value = "http://localhost:8080")]
    pub server: String,

    /// Bearer token for API calls
    #[arg(long, env = "TAVERN_TOKEN")]
    pub token: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Mint a development token with the configured secret
    Token(token::TokenArgs),
    /// Roll dice locally or in a session
    Roll(roll::RollArgs),
    /// List sessions
    Sessions(sessions::SessionsArgs),
    /// Post a chat message
    Say(say::SayArgs),
    /// Follow a session's live events
    Watch(watch::WatchArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self) -> Result<(), AppError> {
        match &self.command {
            Commands::Token(args) => token::execute(args, &self.config),
            Commands::Roll(args) => roll::execute(args, self).await,
            Commands::Sessions(args) => sessions::execute(args, self).await,
            Commands::Say(args) => say::execute(args, self).await,
            Commands::Watch(args) => watch::execute(args, self).await,
        }
    }

    /// Authenticated client for the configured server.
    pub fn client(&self) -> Result<SessionClient, AppError> {
        let token = self.token.as_deref().ok_or_else(|| {
            AppError::authentication("No token given; pass --token or set TAVERN_TOKEN")
        })?;
        Ok(SessionClient::new(&self.server, token)?)
    }
}

/// Helper: load configuration from file
pub fn load_config(config_path: &str) -> Result<AppConfig, AppError> {
    AppConfig::from_file(config_path)
        .map_err(|e| AppError::configuration(format!("Failed to load config: {}", e.message)))
}

/// Helper: parse a session id argument
pub fn parse_session_id(raw: &str) -> Result<SessionId, AppError> {
    raw.parse()
        .map_err(|_| AppError::validation(format!("'{raw}' is not a session id")))
}
