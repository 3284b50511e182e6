//! Auth Service Backend
//!
//! User registration and login issuing bearer tokens.
//!
//! ## Architecture
//!
//! The backend follows a layered architecture:
//! - Routes: HTTP request handling, signup rate limiting
//! - Services: signup/login orchestration
//! - Repositories: credential store (PostgreSQL or in-memory)

use anyhow::Result;
use auth_service_backend::{
    config::{self, StoreBackend},
    db,
    repositories::{InMemoryUserRepository, PgUserRepository, UserRepository},
    routes,
    state::AppState,
    telemetry,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    let dotenv = dotenvy::dotenv();

    // Initialize tracing
    init_tracing();

    if dotenv.is_err() {
        info!("Note: .env file not found. Using process environment.");
    }

    // Load configuration
    let config = config::AppConfig::load()?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        env = if config::AppConfig::is_production() { "production" } else { "development" },
        "Starting Auth Service"
    );

    check_signing_secret(&config);

    let users = connect_store(&config).await?;

    // Create application state
    let mut state = AppState::new(users, config.clone());

    if config.metrics.enabled {
        state = state.with_metrics(telemetry::install_metrics_recorder()?);
        info!("Prometheus metrics enabled at /metrics");
    }

    // Idle buckets are dropped in the background
    state
        .rate_limiter()
        .spawn_sweeper(Duration::from_secs(config.rate_limit.sweep_interval_secs.max(1)));

    // Build application
    let app = routes::create_router(state);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!(address = %addr, "Server listening");

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    // Peer addresses feed the rate limiter when no proxy headers are present
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Open the configured credential store
async fn connect_store(config: &config::AppConfig) -> Result<Arc<dyn UserRepository>> {
    match config.database.backend {
        StoreBackend::Postgres => {
            info!("Connecting to database...");
            let pool = db::create_pool(&config.database).await?;

            // Run migrations (skip in production if using separate migration job)
            if !config::AppConfig::is_production() {
                db::run_migrations(&pool).await?;
            }

            Ok(Arc::new(PgUserRepository::new(pool)))
        }
        StoreBackend::Memory => {
            warn!("Using in-memory credential store; users are lost on restart");
            Ok(Arc::new(InMemoryUserRepository::new()))
        }
    }
}

/// Initialize tracing/logging
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if config::AppConfig::is_production() {
            "auth_service_backend=info,tower_http=info".into()
        } else {
            "auth_service_backend=debug,tower_http=debug,sqlx=warn".into()
        }
    });

    let subscriber = tracing_subscriber::registry().with(env_filter);

    if config::AppConfig::is_production() {
        // JSON logging for production (better for log aggregation)
        subscriber
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        // Pretty logging for development
        subscriber
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }
}

/// Report signing secret problems without refusing to start.
///
/// A missing secret leaves signup working and fails each login with a
/// configuration error.
fn check_signing_secret(config: &config::AppConfig) {
    match config.jwt_secret() {
        None => error!("JWT_SECRET is not set; every login will fail with a configuration error"),
        Some(secret) if config::AppConfig::is_production() && secret.len() < 32 => {
            warn!("JWT secret is shorter than 32 characters");
        }
        Some(_) => {}
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
