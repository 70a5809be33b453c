//! Weekly Pomodoros Server - Main entry point.
//!
//! This binary starts the todo gateway with:
//! - Structured JSON logging for production
//! - Graceful shutdown handling (SIGTERM/SIGINT)
//!
//! # Configuration
//!
//! See [`pomodoros_server::config`] for environment variable configuration.
//!
//! # Example
//!
//! ```bash
//! PORT=3000 POMODOROS_ENFORCE_DATE_GUARD=true cargo run --bin pomodoros-server
//! ```

use std::net::SocketAddr;
use std::process::ExitCode;

use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use pomodoros_server::config::Config;
use pomodoros_server::routes::{create_router, AppState};

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            error!(error = %err, "Failed to load configuration");
            eprintln!("Error: {err}");
            eprintln!();
            eprintln!("Optional environment variables:");
            eprintln!("  PORT                          - HTTP server port (default: 3000)");
            eprintln!("  POMODOROS_BIND_ADDR           - Listen address (default: 0.0.0.0)");
            eprintln!("  POMODOROS_TODO_TTL_DAYS       - Cookie lifetime in days (default: 7)");
            eprintln!("  POMODOROS_ENFORCE_DATE_GUARD  - Reject past-dated mutations ('true')");
            eprintln!("  POMODOROS_MAX_BODY_BYTES      - Request body limit (default: 65536)");
            eprintln!("  RUST_LOG                      - Log level filter (default: info)");
            return ExitCode::from(1);
        }
    };

    info!(
        port = config.port,
        ttl_days = config.todo_ttl_days,
        date_guard = config.enforce_date_guard,
        "Weekly Pomodoros server starting"
    );

    let bind_addr = SocketAddr::new(config.bind_addr, config.port);
    let app = create_router(AppState::new(config));

    let listener = match TcpListener::bind(bind_addr).await {
        Ok(listener) => {
            info!(address = %bind_addr, "Server listening");
            listener
        }
        Err(err) => {
            error!(error = %err, address = %bind_addr, "Failed to bind to address");
            return ExitCode::from(1);
        }
    };

    let server = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal());

    info!("Server ready to accept connections");

    if let Err(err) = server.await {
        error!(error = %err, "Server error");
        return ExitCode::from(1);
    }

    info!("Server shutdown complete");
    ExitCode::SUCCESS
}

/// Initialize structured logging with tracing.
///
/// JSON output, filtered by `RUST_LOG` with a default of `info`.
fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug,axum::rejection=trace"));

    let json_layer = fmt::layer()
        .json()
        .with_target(true)
        .with_level(true)
        .with_file(false)
        .with_line_number(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .init();
}

/// Resolves when SIGINT or SIGTERM is received.
///
/// If a handler cannot be installed that branch never resolves, leaving the
/// other one in charge.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!(error = %err, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                error!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C), initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
