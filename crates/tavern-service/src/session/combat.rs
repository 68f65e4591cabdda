//! Initiative tracking.

use tracing::info;

use tavern_core::error::AppError;
use tavern_core::result::AppResult;
use tavern_core::types::{InitiativeId, SessionId};
use tavern_entity::{ChatMessage, InitiativeEntry, Session, SessionEvent};

use crate::context::RequestContext;
use crate::dice::{self, DiceRoll};

use super::service::{SessionService, display_name, require_participant, require_referee};

impl SessionService {
    /// Roll initiative for a character. A re-roll for the same character
    /// by the same user replaces the earlier entry.
    pub async fn add_initiative(
        &self,
        ctx: &RequestContext,
        id: SessionId,
        character_name: &str,
        expression: &str,
    ) -> AppResult<(InitiativeEntry, DiceRoll)> {
        let character_name = character_name.trim();
        if character_name.is_empty() {
            return Err(AppError::validation("Character name is required"));
        }
        let roll = dice::evaluate(expression)?;

        let (session, entry) = self
            .mutate(id, |session| {
                require_participant(session, ctx)?;
                let entry = InitiativeEntry::new(
                    character_name,
                    roll.total,
                    roll.breakdown.as_str(),
                    ctx.user_id,
                    display_name(session, ctx),
                );
                session.upsert_initiative(entry.clone());
                Ok(entry)
            })
            .await?;

        info!(
            session_id = %id,
            character = %entry.character_name,
            initiative = entry.initiative,
            "Initiative rolled"
        );

        self.publish_initiative(&session);
        Ok((entry, roll))
    }

    /// Remove an entry. Its owner, the DM and the creator may do this.
    pub async fn remove_initiative(
        &self,
        ctx: &RequestContext,
        id: SessionId,
        entry_id: InitiativeId,
    ) -> AppResult<InitiativeEntry> {
        let (session, removed) = self
            .mutate(id, |session| {
                let owner = session
                    .initiative_order
                    .iter()
                    .find(|e| e.id == entry_id)
                    .map(|e| e.user_id)
                    .ok_or_else(|| AppError::not_found("Initiative entry not found"))?;

                if owner != ctx.user_id && !session.can_referee(ctx.user_id) {
                    return Err(AppError::authorization(
                        "Only the owner, DM or session creator can remove this entry",
                    ));
                }

                session
                    .remove_initiative(entry_id)
                    .ok_or_else(|| AppError::not_found("Initiative entry not found"))
            })
            .await?;

        self.publish_initiative(&session);
        Ok(removed)
    }

    /// Flip an entry between dead and alive. DM or creator.
    pub async fn toggle_dead(
        &self,
        ctx: &RequestContext,
        id: SessionId,
        entry_id: InitiativeId,
    ) -> AppResult<InitiativeEntry> {
        let (session, (entry, notice)) = self
            .mutate(id, |session| {
                require_referee(session, ctx)?;

                let entry = session
                    .initiative_entry_mut(entry_id)
                    .ok_or_else(|| AppError::not_found("Initiative entry not found"))?;
                entry.is_dead = !entry.is_dead;
                let entry = entry.clone();

                let state = if entry.is_dead { "marked as dead" } else { "revived" };
                let notice = ChatMessage::system(
                    format!("💀 {} has been {state}", entry.character_name),
                    None,
                );
                session.push_message(notice.clone());
                Ok((entry, notice))
            })
            .await?;

        self.publish_initiative(&session);
        self.publish(&session, SessionEvent::new_message(notice));
        Ok(entry)
    }

    /// Advance to the next living combatant. DM or creator.
    pub async fn next_turn(&self, ctx: &RequestContext, id: SessionId) -> AppResult<Option<usize>> {
        let (session, turn) = self
            .mutate(id, |session| {
                require_referee(session, ctx)?;
                Ok(session.advance_turn())
            })
            .await?;

        self.publish_initiative(&session);
        Ok(turn)
    }

    fn publish_initiative(&self, session: &Session) {
        self.publish(
            session,
            SessionEvent::initiative_update(session.initiative_order.clone(), session.current_turn),
        );
    }
}
