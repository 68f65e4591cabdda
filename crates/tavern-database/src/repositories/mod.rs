//! Session repository trait and implementations.

pub mod memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use tavern_core::config::{DatabaseConfig, DatabaseProvider};
use tavern_core::result::AppResult;
use tavern_core::types::{SessionId, UserId};
use tavern_entity::session::Session;

pub use memory::MemorySessionRepository;
pub use postgres::PgSessionRepository;

use crate::connection::DatabasePool;
use crate::migration::run_migrations;

/// Listing filter. Only active sessions are ever listed.
#[derive(Debug, Clone, Default)]
pub struct SessionFilter {
    /// Restrict to sessions refereed by this user. Takes precedence over
    /// `public_only`.
    pub dm_id: Option<UserId>,
    /// Restrict to publicly listed sessions.
    pub public_only: bool,
}

impl SessionFilter {
    /// Whether `session` passes the filter.
    pub fn matches(&self, session: &Session) -> bool {
        if !session.is_active {
            return false;
        }
        match self.dm_id {
            Some(dm) => session.dm_id == Some(dm),
            None => !self.public_only || session.is_public,
        }
    }
}

/// Document store for [`Session`] aggregates.
///
/// `update` is a compare-and-set on `version`: it fails with a conflict
/// error when the stored version differs from the one the caller loaded,
/// and returns the stored document with the bumped version on success.
#[async_trait]
pub trait SessionRepository: Send + Sync + 'static {
    /// Find a session by id.
    async fn find_by_id(&self, id: SessionId) -> AppResult<Option<Session>>;

    /// Find a session by join key (case-insensitive).
    async fn find_by_key(&self, key: &str) -> AppResult<Option<Session>>;

    /// Active sessions matching `filter`, newest first.
    async fn list(&self, filter: &SessionFilter) -> AppResult<Vec<Session>>;

    /// Insert a new session. Fails with a conflict if the key is taken.
    async fn create(&self, session: &Session) -> AppResult<Session>;

    /// Replace a session if its version still matches.
    async fn update(&self, session: &Session) -> AppResult<Session>;

    /// Delete a session. Returns `true` if it existed.
    async fn delete(&self, id: SessionId) -> AppResult<bool>;
}

/// Build the repository selected by `database.provider`.
pub async fn connect_repository(config: &DatabaseConfig) -> AppResult<Arc<dyn SessionRepository>> {
    match config.provider {
        DatabaseProvider::Memory => {
            info!("Using in-memory session store");
            Ok(Arc::new(MemorySessionRepository::new()))
        }
        DatabaseProvider::Postgres => {
            let pool = DatabasePool::connect(config).await?;
            run_migrations(pool.pool()).await?;
            Ok(Arc::new(PgSessionRepository::new(pool.pool().clone())))
        }
    }
}
