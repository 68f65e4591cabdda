//! Dice rolling.

use clap::Args;

use tavern_core::error::AppError;
use tavern_service::dice;

use super::Cli;
use crate::output;

/// Arguments for `roll`
#[derive(Debug, Args)]
pub struct RollArgs {
    /// Dice expression, e.g. `2d6+1d4+3`
    pub expression: String,

    /// Roll inside this session and post the result to its chat
    #[arg(short, long)]
    pub session: Option<String>,

    /// Label shown with the result
    #[arg(short, long)]
    pub label: Option<String>,
}

/// Execute `roll`
pub async fn execute(args: &RollArgs, cli: &Cli) -> Result<(), AppError> {
    match &args.session {
        Some(raw) => {
            let session_id = super::parse_session_id(raw)?;
            let reply = cli
                .client()?
                .roll(session_id, &args.expression, args.label.as_deref())
                .await?;
            output::print_item(&reply.roll, &reply.roll.breakdown, cli.format);
        }
        None => {
            let roll = dice::evaluate(&args.expression)?;
            output::print_item(&roll, &roll.breakdown, cli.format);
        }
    }
    Ok(())
}
