//! Application state shared across all handlers and middleware.

use std::sync::Arc;
use std::time::Instant;

use tavern_auth::JwtDecoder;
use tavern_core::config::AppConfig;
use tavern_realtime::RealtimeEngine;
use tavern_service::SessionService;

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`.
/// All fields are `Arc`-wrapped for cheap cloning across tasks.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<AppConfig>,
    /// JWT token decoder and validator
    pub jwt_decoder: Arc<JwtDecoder>,
    /// Event stream engine
    pub realtime: Arc<RealtimeEngine>,
    /// Session operations
    pub session_service: Arc<SessionService>,
    /// Process start, for uptime reporting
    pub started_at: Instant,
}

impl AppState {
    /// Bundle the shared dependencies.
    pub fn new(
        config: Arc<AppConfig>,
        jwt_decoder: Arc<JwtDecoder>,
        realtime: Arc<RealtimeEngine>,
        session_service: Arc<SessionService>,
    ) -> Self {
        Self {
            config,
            jwt_decoder,
            realtime,
            session_service,
            started_at: Instant::now(),
        }
    }
}
