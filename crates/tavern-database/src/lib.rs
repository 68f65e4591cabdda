//! # tavern-database
//!
//! Persistence for the session aggregate. The [`SessionRepository`]
//! trait is implemented by a process-local DashMap store and by a
//! PostgreSQL store that keeps each session as one JSONB document with
//! a version column for optimistic concurrency.

pub mod connection;
pub mod migration;
pub mod repositories;

pub use connection::DatabasePool;
pub use repositories::{
    MemorySessionRepository, PgSessionRepository, SessionFilter, SessionRepository,
    connect_repository,
};
