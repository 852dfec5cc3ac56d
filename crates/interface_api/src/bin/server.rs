//! School Fees Ledger - API Server Binary
//!
//! This binary starts the HTTP API server for the fee ledger system.
//!
//! # Usage
//!
//! ```bash
//! # Run with default configuration
//! cargo run --bin fees-api
//!
//! # Run with environment variables
//! API_HOST=0.0.0.0 API_PORT=8080 DATABASE_URL=postgres://... cargo run --bin fees-api
//! ```
//!
//! # Environment Variables
//!
//! * `API_HOST` - Server host (default: 0.0.0.0)
//! * `API_PORT` - Server port (default: 8080)
//! * `API_JWT_SECRET` - JWT signing secret (required in production)
//! * `API_JWT_EXPIRATION_SECS` - JWT token expiration in seconds (default: 3600)
//! * `API_DATABASE_URL` - PostgreSQL connection string
//! * `API_LOG_LEVEL` - Log level: trace, debug, info, warn, error (default: info)
//! * `API_CURRENCY` - ISO code of the ledger currency (default: NGN)
//! * `API_GATEWAY_SECRET_KEY` - Card gateway secret key
//! * `API_GATEWAY_BASE_URL` - Card gateway API base URL
//! * `API_GATEWAY_CALLBACK_URL` - Post-checkout redirect URL (optional)

use std::net::SocketAddr;
use std::sync::Arc;

use secrecy::Secret;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use domain_payments::adapters::{PaystackConfig, PaystackGateway};
use infra_db::{
    create_pool, run_migrations, DatabaseConfig, DatabaseHealth, PostgresCashCountStore,
    PostgresFeeCatalog, PostgresInvoiceStore, PostgresSessionStore, PostgresStatementStore,
    PostgresStudentDirectory, PostgresTransactionStore,
};
use interface_api::{config::ApiConfig, create_router, reports::LogReportChannel, AppState,
    Dependencies};

/// Main entry point for the API server.
///
/// Initializes logging, loads configuration, establishes database connection,
/// and starts the HTTP server.
///
/// # Errors
///
/// Returns an error if:
/// - Configuration cannot be loaded from environment
/// - Database connection fails
/// - Server fails to bind to the configured address
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if present (useful for local development)
    dotenvy::dotenv().ok();

    // Load configuration from environment
    let config = load_config()?;

    // Initialize tracing/logging
    init_tracing(&config.log_level);

    tracing::info!(
        host = %config.host,
        port = %config.port,
        currency = %config.currency,
        "Starting School Fees Ledger API Server"
    );

    // Create database connection pool and apply migrations
    let pool = create_pool(
        DatabaseConfig::new(&config.database_url)
            .max_connections(10)
            .min_connections(2),
    )
    .await?;
    run_migrations(&pool).await?;

    // Wire the PostgreSQL adapters and the payment gateway
    let invoices = Arc::new(PostgresInvoiceStore::new(pool.clone()));
    let transactions = Arc::new(PostgresTransactionStore::new(pool.clone()));
    let gateway = Arc::new(PaystackGateway::new(PaystackConfig::new(
        Secret::new(config.gateway_secret_key.clone()),
        &config.gateway_base_url,
    )));

    let deps = Dependencies {
        students: Arc::new(PostgresStudentDirectory::new(pool.clone())),
        catalog: Arc::new(PostgresFeeCatalog::new(pool.clone())),
        invoices,
        transactions: transactions.clone(),
        gateway,
        sessions: Arc::new(PostgresSessionStore::new(pool.clone())),
        cash_counts: Arc::new(PostgresCashCountStore::new(pool.clone())),
        statements: Arc::new(PostgresStatementStore::new(pool.clone())),
        settled: transactions,
        reports: Arc::new(LogReportChannel),
        health: Arc::new(DatabaseHealth::new(pool)),
    };

    // Create the API router
    let app = create_router(AppState::new(deps, config.clone()));

    // Parse server address
    let addr: SocketAddr = config.server_addr().parse()?;

    tracing::info!(%addr, "Server listening");

    // Create TCP listener and serve
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Loads API configuration from environment variables.
///
/// Falls back to default values if environment variables are not set.
///
/// # Errors
///
/// Returns error if required environment variables are missing or invalid
fn load_config() -> Result<ApiConfig, Box<dyn std::error::Error>> {
    // Try to load from environment with API_ prefix
    let config = ApiConfig::from_env().unwrap_or_else(|_| {
        let defaults = ApiConfig::default();
        // Fall back to individual env vars or defaults
        ApiConfig {
            host: std::env::var("API_HOST").unwrap_or(defaults.host),
            port: std::env::var("API_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            jwt_secret: std::env::var("API_JWT_SECRET").unwrap_or(defaults.jwt_secret),
            jwt_expiration_secs: std::env::var("API_JWT_EXPIRATION_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.jwt_expiration_secs),
            database_url: std::env::var("DATABASE_URL")
                .or_else(|_| std::env::var("API_DATABASE_URL"))
                .unwrap_or(defaults.database_url),
            log_level: std::env::var("API_LOG_LEVEL")
                .or_else(|_| std::env::var("RUST_LOG"))
                .unwrap_or(defaults.log_level),
            currency: std::env::var("API_CURRENCY").unwrap_or(defaults.currency),
            gateway_secret_key: std::env::var("API_GATEWAY_SECRET_KEY")
                .unwrap_or(defaults.gateway_secret_key),
            gateway_base_url: std::env::var("API_GATEWAY_BASE_URL")
                .unwrap_or(defaults.gateway_base_url),
            gateway_callback_url: std::env::var("API_GATEWAY_CALLBACK_URL").ok(),
        }
    });

    Ok(config)
}

/// Initializes the tracing subscriber for structured logging.
///
/// # Arguments
///
/// * `log_level` - The minimum log level to output (trace, debug, info, warn, error)
fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
///
/// This enables graceful shutdown of the server, allowing in-flight
/// requests to complete before the process exits.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
