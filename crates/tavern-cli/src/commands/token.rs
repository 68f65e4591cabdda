//! Development token minting.

use clap::Args;

use tavern_auth::JwtEncoder;
use tavern_core::error::AppError;
use tavern_core::types::UserId;

use crate::output;

/// Arguments for `token`
#[derive(Debug, Args)]
pub struct TokenArgs {
    /// Display name carried in the token
    #[arg(short, long)]
    pub username: String,

    /// User id; a fresh one is generated when omitted
    #[arg(long)]
    pub user_id: Option<String>,
}

/// Print a signed token for local testing
pub fn execute(args: &TokenArgs, config_path: &str) -> Result<(), AppError> {
    let config = super::load_config(config_path)?;
    let user_id = match &args.user_id {
        Some(raw) => raw
            .parse::<UserId>()
            .map_err(|_| AppError::validation(format!("'{raw}' is not a user id")))?,
        None => UserId::new(),
    };

    let token = JwtEncoder::new(&config.auth).issue(user_id, &args.username)?;

    output::print_kv("user", &format!("{} ({user_id})", args.username));
    println!("{token}");
    Ok(())
}
