//! Huddle realtime server — entry point.
//!
//! Wires configuration, the database pool, the change-event listener, the
//! realtime engine, and the HTTP/WebSocket surface together, then serves
//! until a shutdown signal arrives.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tracing_subscriber::{EnvFilter, fmt};

use huddle_core::config::AppConfig;
use huddle_core::error::AppError;

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

/// Load configuration from file and environment.
fn load_configuration() -> Result<AppConfig, AppError> {
    let env = std::env::var("HUDDLE_ENV").unwrap_or_else(|_| "development".to_string());
    AppConfig::load(&env)
}

/// Initialize tracing/logging.
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
        _ => {
            fmt().pretty().with_env_filter(filter).with_target(true).init();
        }
    }
}

/// Main server run function.
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting Huddle realtime server v{}", env!("CARGO_PKG_VERSION"));

    // ── Step 1: Database connection ──────────────────────────────
    let db_pool = huddle_database::connection::create_pool(&config.database).await?;

    // ── Step 2: Auth and membership adapters ─────────────────────
    let authenticator = Arc::new(huddle_database::PgConnectionAuthenticator::new(
        db_pool.clone(),
    ));
    let membership = Arc::new(huddle_database::PgMembershipLookup::new(db_pool.clone()));

    // ── Step 3: Realtime engine + change-event listener ──────────
    let engine = Arc::new(huddle_realtime::RealtimeEngine::new(&config.realtime));

    let (event_tx, event_rx) = mpsc::channel(config.realtime.outbound_buffer_size);
    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    let listener = huddle_database::ChangeEventListener::new(
        db_pool.clone(),
        &config.realtime,
        event_tx,
    );
    let listener_shutdown = shutdown_tx.subscribe();
    let listener_handle = tokio::spawn(async move {
        listener.run(listener_shutdown).await;
    });

    engine.start(event_rx);

    // ── Step 4: Build and start the HTTP server ──────────────────
    let app_state = huddle_api::AppState {
        config: Arc::new(config.clone()),
        db_pool: db_pool.clone(),
        engine: Arc::clone(&engine),
        authenticator,
        membership,
    };

    let app = huddle_api::build_router(app_state);
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let tcp_listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {}: {}", addr, e)))?;

    tracing::info!("Huddle realtime server listening on {}", addr);

    // ── Step 5: Graceful shutdown ────────────────────────────────
    let server = axum::serve(tcp_listener, app).with_graceful_shutdown(async move {
        shutdown_signal().await;
        tracing::info!("Shutdown signal received, starting graceful shutdown...");
        let _ = shutdown_tx.send(());
    });

    server
        .await
        .map_err(|e| AppError::internal(format!("Server error: {}", e)))?;

    engine.stop();
    let _ = tokio::time::timeout(std::time::Duration::from_secs(10), listener_handle).await;
    db_pool.close().await;

    tracing::info!("Huddle realtime server shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
