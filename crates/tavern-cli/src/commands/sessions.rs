//! Session listing.

use clap::Args;
use serde::Serialize;
use tabled::Tabled;

use tavern_core::error::AppError;
use tavern_entity::SessionSummary;

use super::Cli;
use crate::output;

/// Arguments for `sessions`
#[derive(Debug, Args)]
pub struct SessionsArgs {
    /// Only publicly listed sessions
    #[arg(long)]
    pub public: bool,
}

/// Session display row
#[derive(Debug, Serialize, Tabled)]
struct SessionRow {
    /// Session ID
    id: String,
    /// Title
    title: String,
    /// Join key
    key: String,
    /// DM
    dm: String,
    /// Seats
    players: String,
    /// Created
    created: String,
}

impl From<&SessionSummary> for SessionRow {
    fn from(s: &SessionSummary) -> Self {
        Self {
            id: s.id.to_string(),
            title: s.title.clone(),
            key: s.session_key.clone(),
            dm: s.dm_name.clone().unwrap_or_else(|| "-".to_string()),
            players: format!("{}/{}", s.player_count, s.max_players),
            created: s.created_at.format("%Y-%m-%d %H:%M").to_string(),
        }
    }
}

/// Execute `sessions`
pub async fn execute(args: &SessionsArgs, cli: &Cli) -> Result<(), AppError> {
    let sessions = cli.client()?.list_sessions(args.public).await?;
    let rows: Vec<SessionRow> = sessions.iter().map(SessionRow::from).collect();
    output::print_list(&rows, cli.format);
    Ok(())
}
