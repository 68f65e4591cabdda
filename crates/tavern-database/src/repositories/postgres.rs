//! PostgreSQL session store.

use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::types::Json;
use uuid::Uuid;

use tavern_core::error::{AppError, ErrorKind};
use tavern_core::result::AppResult;
use tavern_core::types::SessionId;
use tavern_entity::session::Session;

use super::{SessionFilter, SessionRepository};

/// Stores each session as a JSONB document. Columns duplicated out of
/// the document (`session_key`, `dm_id`, flags) exist for indexing and
/// filtering only.
#[derive(Debug, Clone)]
pub struct PgSessionRepository {
    pool: PgPool,
}

impl PgSessionRepository {
    /// Create a new session repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn into_session((Json(mut session), version): (Json<Session>, i64)) -> Session {
    session.version = version as u64;
    session
}

fn db_error(message: &'static str) -> impl FnOnce(sqlx::Error) -> AppError {
    move |e| AppError::with_source(ErrorKind::Database, message, e)
}

#[async_trait]
impl SessionRepository for PgSessionRepository {
    async fn find_by_id(&self, id: SessionId) -> AppResult<Option<Session>> {
        let row = sqlx::query_as::<_, (Json<Session>, i64)>(
            "SELECT document, version FROM game_sessions WHERE id = $1",
        )
        .bind(id.into_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to find session"))?;

        Ok(row.map(into_session))
    }

    async fn find_by_key(&self, key: &str) -> AppResult<Option<Session>> {
        let row = sqlx::query_as::<_, (Json<Session>, i64)>(
            "SELECT document, version FROM game_sessions WHERE session_key = $1",
        )
        .bind(key.to_uppercase())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to find session by key"))?;

        Ok(row.map(into_session))
    }

    async fn list(&self, filter: &SessionFilter) -> AppResult<Vec<Session>> {
        let dm_id: Option<Uuid> = filter.dm_id.map(|d| d.into_uuid());
        let public_only = dm_id.is_none() && filter.public_only;

        let rows = sqlx::query_as::<_, (Json<Session>, i64)>(
            "SELECT document, version FROM game_sessions \
             WHERE is_active \
               AND ($1::uuid IS NULL OR dm_id = $1) \
               AND (NOT $2 OR is_public) \
             ORDER BY created_at DESC",
        )
        .bind(dm_id)
        .bind(public_only)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to list sessions"))?;

        Ok(rows.into_iter().map(into_session).collect())
    }

    async fn create(&self, session: &Session) -> AppResult<Session> {
        let result = sqlx::query(
            "INSERT INTO game_sessions \
             (id, session_key, creator_id, dm_id, is_active, is_public, version, document, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, 0, $7, $8, $9) \
             ON CONFLICT (session_key) DO NOTHING",
        )
        .bind(session.id.into_uuid())
        .bind(session.session_key.to_uppercase())
        .bind(session.creator_id.into_uuid())
        .bind(session.dm_id.map(|d| d.into_uuid()))
        .bind(session.is_active)
        .bind(session.is_public)
        .bind(Json(session))
        .bind(session.created_at)
        .bind(session.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to create session"))?;

        if result.rows_affected() == 0 {
            return Err(AppError::conflict(format!(
                "Session key {} is already in use",
                session.session_key
            )));
        }

        let mut created = session.clone();
        created.version = 0;
        Ok(created)
    }

    async fn update(&self, session: &Session) -> AppResult<Session> {
        let result = sqlx::query(
            "UPDATE game_sessions \
             SET document = $1, dm_id = $2, is_active = $3, is_public = $4, \
                 updated_at = $5, version = version + 1 \
             WHERE id = $6 AND version = $7",
        )
        .bind(Json(session))
        .bind(session.dm_id.map(|d| d.into_uuid()))
        .bind(session.is_active)
        .bind(session.is_public)
        .bind(session.updated_at)
        .bind(session.id.into_uuid())
        .bind(session.version as i64)
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to update session"))?;

        if result.rows_affected() == 0 {
            let exists: bool =
                sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM game_sessions WHERE id = $1)")
                    .bind(session.id.into_uuid())
                    .fetch_one(&self.pool)
                    .await
                    .map_err(db_error("Failed to check session"))?;

            return Err(if exists {
                AppError::conflict("Session was modified concurrently")
            } else {
                AppError::not_found("Session not found")
            });
        }

        let mut next = session.clone();
        next.version += 1;
        Ok(next)
    }

    async fn delete(&self, id: SessionId) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM game_sessions WHERE id = $1")
            .bind(id.into_uuid())
            .execute(&self.pool)
            .await
            .map_err(db_error("Failed to delete session"))?;

        Ok(result.rows_affected() > 0)
    }
}
