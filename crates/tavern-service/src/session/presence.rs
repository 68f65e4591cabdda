//! Player presence reports.

use tracing::debug;

use tavern_core::error::AppError;
use tavern_core::result::AppResult;
use tavern_core::types::SessionId;
use tavern_entity::SessionEvent;

use crate::context::RequestContext;

use super::service::SessionService;
use super::types::StatusChange;

impl SessionService {
    /// Record the caller's online state.
    ///
    /// `lastSeen` is refreshed on every report, but peers only hear about
    /// it when `isOnline` actually flipped.
    pub async fn update_status(
        &self,
        ctx: &RequestContext,
        id: SessionId,
        is_online: bool,
    ) -> AppResult<StatusChange> {
        let (session, change) = self
            .mutate(id, |session| {
                let player = session
                    .player_mut(ctx.user_id)
                    .ok_or_else(|| AppError::not_found("Player not found in session"))?;
                let previous_status = player.is_online;
                let changed = player.set_online(is_online);
                Ok(StatusChange {
                    changed,
                    is_online,
                    previous_status,
                })
            })
            .await?;

        if change.changed {
            self.publish(
                &session,
                SessionEvent::status_update(ctx.user_id, is_online, Some(change.previous_status)),
            );
        } else {
            debug!(session_id = %id, user_id = %ctx.user_id, is_online, "Status unchanged");
        }
        Ok(change)
    }
}
