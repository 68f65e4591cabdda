//! Tavern Server: tabletop RPG sessions with live event streams.
//!
//! Main entry point that wires all crates together and starts the server.

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{EnvFilter, fmt};

use tavern_core::config::AppConfig;
use tavern_core::error::AppError;

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

/// Load `config/default.toml`, the `TAVERN_ENV` overlay and `TAVERN__*`
/// environment overrides
fn load_configuration() -> Result<AppConfig, AppError> {
    let env = std::env::var("TAVERN_ENV").unwrap_or_else(|_| "development".to_string());
    AppConfig::load(&env)
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Main server run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting Tavern v{}", env!("CARGO_PKG_VERSION"));

    // ── Step 1: Session store ────────────────────────────────────
    tracing::info!(provider = ?config.database.provider, "Opening session store...");
    let repo = tavern_database::connect_repository(&config.database).await?;

    // ── Step 2: Auth ─────────────────────────────────────────────
    let jwt_decoder = Arc::new(tavern_auth::JwtDecoder::new(&config.auth));

    // ── Step 3: Realtime engine ──────────────────────────────────
    let realtime = Arc::new(tavern_realtime::RealtimeEngine::new(
        config.realtime.clone(),
    ));

    // ── Step 4: Services ─────────────────────────────────────────
    let session_service = Arc::new(tavern_service::SessionService::new(
        repo,
        realtime.broadcaster.clone(),
        config.session.clone(),
        config.realtime.snapshot_message_limit,
    ));

    // ── Step 5: Build and start HTTP server ──────────────────────
    let app_state = tavern_api::AppState::new(
        Arc::new(config.clone()),
        jwt_decoder,
        Arc::clone(&realtime),
        session_service,
    );
    let app = tavern_api::build_app(app_state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {}: {}", addr, e)))?;

    tracing::info!("Tavern server listening on {}", addr);

    // ── Step 6: Graceful shutdown ────────────────────────────────
    // Open event streams never finish on their own; closing them is what
    // lets the server drain.
    let engine = Arc::clone(&realtime);
    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        shutdown_signal().await;
        tracing::info!(
            connections = engine.registry.all().len(),
            "Shutdown signal received, closing event streams..."
        );
        engine.shutdown();
    });

    let grace = Duration::from_secs(config.server.shutdown_grace_seconds);
    let served = tokio::spawn(async move { server.await });
    tokio::pin!(served);

    tokio::select! {
        result = &mut served => {
            result
                .map_err(|e| AppError::internal(format!("Server task failed: {}", e)))?
                .map_err(|e| AppError::internal(format!("Server error: {}", e)))?;
        }
        _ = drain_deadline(&realtime, grace) => {
            tracing::warn!("Connections still open after {:?}, exiting", grace);
        }
    }

    tracing::info!("Tavern server shut down gracefully");
    Ok(())
}

/// Resolves `grace` after shutdown begins, i.e. once the realtime engine
/// has been told to close its streams.
async fn drain_deadline(realtime: &tavern_realtime::RealtimeEngine, grace: Duration) {
    realtime.closed().await;
    tokio::time::sleep(grace).await;
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
