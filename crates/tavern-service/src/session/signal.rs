//! WebRTC signaling relay.

use tracing::debug;

use tavern_core::error::AppError;
use tavern_core::result::AppResult;
use tavern_core::types::{SessionId, UserId};
use tavern_entity::SessionEvent;

use crate::context::RequestContext;

use super::service::{SessionService, require_participant};

impl SessionService {
    /// Relay an opaque signaling payload to the session. Nothing is
    /// persisted; clients filter on `targetUserId`.
    pub async fn relay_signal(
        &self,
        ctx: &RequestContext,
        id: SessionId,
        signal_type: &str,
        data: serde_json::Value,
        target: Option<UserId>,
    ) -> AppResult<()> {
        let signal_type = signal_type.trim();
        if signal_type.is_empty() {
            return Err(AppError::validation("Signal type is required"));
        }

        let session = self.load(id).await?;
        require_participant(&session, ctx)?;
        if let Some(target) = target
            && !session.is_participant(target)
        {
            return Err(AppError::not_found("Target user is not in this session"));
        }

        debug!(session_id = %id, from = %ctx.user_id, signal_type, "Relaying signal");
        self.publish(
            &session,
            SessionEvent::webrtc_signal(signal_type, data, ctx.user_id, target),
        );
        Ok(())
    }
}
