//! Joining, leaving, kicking and DM assignment.

use tracing::info;

use tavern_core::error::AppError;
use tavern_core::result::AppResult;
use tavern_core::types::{SessionId, UserId};
use tavern_entity::{ChatMessage, Player, Session, SessionEvent};

use crate::context::RequestContext;

use super::service::{SessionService, require_creator};
use super::types::{CharacterChoice, JoinOutcome, LeaveOutcome, ParticipantRole};

impl SessionService {
    /// Join an active session by its key.
    pub async fn join_by_key(
        &self,
        ctx: &RequestContext,
        key: &str,
        character: CharacterChoice,
    ) -> AppResult<JoinOutcome> {
        let session = self.load_by_key(key).await?;
        if session.is_dm(ctx.user_id) {
            return Ok(JoinOutcome {
                session,
                role: ParticipantRole::Dm,
                newly_joined: false,
            });
        }
        self.seat(ctx, session.id, character).await
    }

    /// Join by id, or refresh an existing seat.
    pub async fn auto_join(&self, ctx: &RequestContext, id: SessionId) -> AppResult<JoinOutcome> {
        let session = self.load(id).await?;
        if session.is_dm(ctx.user_id) {
            return Ok(JoinOutcome {
                session,
                role: ParticipantRole::Dm,
                newly_joined: false,
            });
        }
        self.seat(ctx, id, CharacterChoice::default()).await
    }

    async fn seat(
        &self,
        ctx: &RequestContext,
        id: SessionId,
        character: CharacterChoice,
    ) -> AppResult<JoinOutcome> {
        let (session, newly_joined) = self
            .mutate(id, |session| {
                if !session.is_active {
                    return Err(AppError::validation("Session is no longer active"));
                }

                if let Some(player) = session.player_mut(ctx.user_id) {
                    player.set_online(true);
                    if character.character_id.is_some() {
                        player.character_id = character.character_id.clone();
                    }
                    if character.character_name.is_some() {
                        player.character_name = character.character_name.clone();
                    }
                    return Ok(false);
                }

                if session.is_full() {
                    return Err(AppError::validation("Session is full"));
                }

                let announcement = match &character.character_name {
                    Some(name) => format!("{} joined the session with {name}", ctx.username),
                    None => format!("{} joined the session", ctx.username),
                };
                session.players.push(Player::new(
                    ctx.user_id,
                    &ctx.username,
                    character.character_id.clone(),
                    character.character_name.clone(),
                ));
                session.push_message(ChatMessage::system(announcement, None));
                Ok(true)
            })
            .await?;

        info!(
            session_id = %id,
            user_id = %ctx.user_id,
            newly_joined,
            players = session.players.len(),
            "Player joined session"
        );

        self.publish_snapshot(&session);
        Ok(JoinOutcome {
            session,
            role: ParticipantRole::Player,
            newly_joined,
        })
    }

    /// Leave a session.
    ///
    /// A leaving DM vacates the DM seat. A leaving creator hands the
    /// session to the first remaining player, or ends it if nobody is left.
    pub async fn leave(&self, ctx: &RequestContext, id: SessionId) -> AppResult<LeaveOutcome> {
        let (session, ()) = self
            .mutate(id, |session| {
                if !session.is_participant(ctx.user_id) {
                    return Err(AppError::not_found("You are not part of this session"));
                }

                let name = session
                    .player(ctx.user_id)
                    .map(|p| p.username.clone())
                    .unwrap_or_else(|| ctx.username.clone());
                session.remove_player(ctx.user_id);
                session.remove_initiative_for(ctx.user_id);

                let notice = if session.is_dm(ctx.user_id) {
                    session.clear_dm();
                    format!("{name} (DM) left the session")
                } else {
                    format!("{name} left the session")
                };
                session.push_message(ChatMessage::system(notice, None));

                if session.is_creator(ctx.user_id) {
                    hand_over_ownership(session);
                }
                Ok(())
            })
            .await?;

        let session_ended = !session.is_active;
        info!(session_id = %id, user_id = %ctx.user_id, session_ended, "Participant left session");

        if !session_ended {
            self.publish_snapshot(&session);
        }
        Ok(LeaveOutcome { session_ended })
    }

    /// Remove a player. Creator only.
    pub async fn kick(
        &self,
        ctx: &RequestContext,
        id: SessionId,
        target: UserId,
        reason: Option<String>,
    ) -> AppResult<Session> {
        let reason = reason
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty());

        let (session, ()) = self
            .mutate(id, |session| {
                require_creator(session, ctx, "kick players")?;
                if target == ctx.user_id {
                    return Err(AppError::validation("You cannot kick yourself"));
                }

                let player = session
                    .remove_player(target)
                    .ok_or_else(|| AppError::not_found("Player not found in session"))?;
                session.remove_initiative_for(target);
                if session.is_dm(target) {
                    session.clear_dm();
                }

                let notice = match &reason {
                    Some(reason) => {
                        format!("{} was kicked from the session: {reason}", player.username)
                    }
                    None => format!("{} was kicked from the session", player.username),
                };
                session.push_message(ChatMessage::system(notice, None));
                Ok(())
            })
            .await?;

        info!(session_id = %id, target = %target, kicked_by = %ctx.user_id, "Player kicked");

        self.publish_snapshot(&session);
        self.publish(&session, SessionEvent::user_kicked(target, reason));
        Ok(session)
    }

    /// Make `target` the DM. Creator only.
    pub async fn assign_dm(
        &self,
        ctx: &RequestContext,
        id: SessionId,
        target: UserId,
    ) -> AppResult<Session> {
        let (session, ()) = self
            .mutate(id, |session| {
                require_creator(session, ctx, "assign the DM")?;

                let name = match session.player(target) {
                    Some(player) => player.username.clone(),
                    None if session.is_creator(target) => session.creator_name.clone(),
                    None => return Err(AppError::not_found("User is not a player in this session")),
                };

                session.dm_id = Some(target);
                session.dm_name = Some(name.clone());
                session.push_message(ChatMessage::system(
                    format!("{name} is now the Dungeon Master"),
                    None,
                ));
                Ok(())
            })
            .await?;

        info!(session_id = %id, dm = %target, "DM assigned");

        self.publish_snapshot(&session);
        Ok(session)
    }
}

fn hand_over_ownership(session: &mut Session) {
    let Some(next) = session.players.first() else {
        session.is_active = false;
        return;
    };

    let (owner_id, owner_name) = (next.user_id, next.username.clone());
    session.creator_id = owner_id;
    session.creator_name = owner_name.clone();
    session.push_message(ChatMessage::system(
        format!("{owner_name} is now the session owner"),
        None,
    ));
}
