//! Live session follower.
//!
//! Prints every event as it arrives. With `--chat`, each stdin line is
//! posted to the session and counts as activity for presence.

use std::sync::Arc;

use clap::Args;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, BufReader};

use tavern_client::{
    ActivitySignal, BackoffPolicy, ClientError, HttpTransport, PresenceTracker, SessionEventHandler,
    SessionSubscriber, SubscriberState,
};
use tavern_core::config::PresenceConfig;
use tavern_core::error::AppError;
use tavern_core::types::{SessionId, UserId};
use tavern_entity::{ChatMessage, ChatRoom, InitiativeEntry, SessionSnapshot};

use super::Cli;
use crate::output;

/// Arguments for `watch`
#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Session ID
    pub session: String,

    /// Post stdin lines as chat and report presence
    #[arg(long)]
    pub chat: bool,
}

/// Prints events to stdout.
struct Printer;

impl SessionEventHandler for Printer {
    fn on_connected(&mut self, session_id: SessionId, _user_id: UserId) {
        output::print_success(&format!("Connected to {session_id}"));
    }

    fn on_session_update(&mut self, session: SessionSnapshot) {
        println!(
            "[session] {} | DM: {} | {} player(s) | turn {:?}",
            session.title,
            session.dm_name.as_deref().unwrap_or("none"),
            session.players.len(),
            session.current_turn,
        );
    }

    fn on_new_message(&mut self, message: ChatMessage) {
        println!(
            "[{}] {} {}: {}",
            message.room_id,
            message.timestamp.format("%H:%M:%S"),
            message.username,
            message.message
        );
    }

    fn on_participant_joined(&mut self, user_id: UserId) {
        println!("[presence] {user_id} opened the session");
    }

    fn on_participant_left(&mut self, user_id: UserId) {
        println!("[presence] {user_id} closed the session");
    }

    fn on_status_update(&mut self, user_id: UserId, is_online: bool, _previous: Option<bool>) {
        let status = if is_online { "online" } else { "away" };
        println!("[presence] {user_id} is {status}");
    }

    fn on_initiative_update(&mut self, order: Vec<InitiativeEntry>, current_turn: Option<usize>) {
        println!("[initiative]");
        for (index, entry) in order.iter().enumerate() {
            let marker = if Some(index) == current_turn { ">" } else { " " };
            let dead = if entry.is_dead { " (dead)" } else { "" };
            println!(
                "  {marker} {:>3}  {}{dead}",
                entry.initiative, entry.character_name
            );
        }
    }

    fn on_chat_rooms_update(&mut self, rooms: Vec<ChatRoom>) {
        let names: Vec<&str> = rooms.iter().map(|room| room.name.as_str()).collect();
        println!("[rooms] {}", names.join(", "));
    }

    fn on_webrtc_signal(&mut self, signal_type: String, _data: Value, from: UserId, _target: Option<UserId>) {
        tracing::debug!(%from, signal_type, "WebRTC signal");
    }

    fn on_user_kicked(&mut self, target: UserId, reason: Option<String>) {
        match reason {
            Some(reason) => println!("[kick] {target}: {reason}"),
            None => println!("[kick] {target}"),
        }
    }

    fn on_state_change(&mut self, state: &SubscriberState) {
        if let SubscriberState::Reconnecting { attempt } = state {
            eprintln!("… reconnecting (attempt {attempt})");
        }
    }

    fn on_error(&mut self, error: &ClientError) {
        output::print_error(&format!("Giving up: {error}"));
    }
}

/// Execute `watch`
pub async fn execute(args: &WatchArgs, cli: &Cli) -> Result<(), AppError> {
    let session_id = super::parse_session_id(&args.session)?;
    let client = cli.client()?;

    let transport = Arc::new(HttpTransport::new(client.clone()));
    let mut subscriber = SessionSubscriber::new(transport, session_id, BackoffPolicy::default());
    let mut state = subscriber.watch_state();
    subscriber.connect(Printer).await;

    let presence = if args.chat {
        Some(PresenceTracker::start(
            Arc::new(client.status_sink(session_id)),
            &PresenceConfig::default(),
        )?)
    } else {
        None
    };

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = args.chat;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = state.changed() => {
                if changed.is_err() || *state.borrow() == SubscriberState::Failed {
                    break;
                }
            }
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) if !line.trim().is_empty() => {
                    if let Some(presence) = &presence {
                        presence.signal(ActivitySignal::Key);
                    }
                    if let Err(e) = client.send_message(session_id, line.trim(), None).await {
                        output::print_error(&e.to_string());
                    }
                }
                Ok(Some(_)) => {}
                Ok(None) | Err(_) => stdin_open = false,
            },
        }
    }

    subscriber.disconnect().await;
    if let Some(presence) = presence {
        presence.stop().await;
    }
    Ok(())
}
