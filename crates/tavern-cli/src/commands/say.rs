//! Chat posting.

use clap::Args;

use tavern_core::error::AppError;

use super::Cli;
use crate::output;

/// Arguments for `say`
#[derive(Debug, Args)]
pub struct SayArgs {
    /// Session ID
    pub session: String,

    /// Message text
    pub message: String,

    /// Room to post in; defaults to the general room
    #[arg(short, long)]
    pub room: Option<String>,
}

/// Execute `say`
pub async fn execute(args: &SayArgs, cli: &Cli) -> Result<(), AppError> {
    let session_id = super::parse_session_id(&args.session)?;
    let message = cli
        .client()?
        .send_message(session_id, &args.message, args.room.as_deref())
        .await?;
    output::print_item(
        &message,
        &format!("Posted {} to {}", message.id, message.room_id),
        cli.format,
    );
    if cli.format == output::OutputFormat::Table {
        output::print_success("Message sent");
    }
    Ok(())
}
