//! AI Gateway
//!
//! Entry point for the gateway service. Verifies bearer tokens, applies
//! per-identity sliding-window limits and serves the HTTP surface.

use chrono::Utc;
use common::clock::{Clock, SystemClock};
use gateway_service::config::{Config, Environment};
use gateway_service::crypto::TokenAuthority;
use gateway_service::observability::metrics::init_metrics_recorder;
use gateway_service::routes::{self, AppState};
use gateway_service::services::AdmissionController;
use gateway_service::tasks::{start_rate_window_sweeper, sweep_interval};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    info!("Starting AI Gateway");

    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(
        environment = %config.environment,
        bind_address = %config.bind_address,
        jwt_algorithm = %config.jwt_algorithm,
        access_token_expire_minutes = config.access_token_expire_minutes,
        rate_limit_enabled = config.rate_limit_enabled,
        rate_limit_requests = config.rate_limit_requests,
        rate_limit_period_seconds = config.rate_limit_period_seconds,
        rate_limit_max_keys = config.rate_limit_max_keys,
        anonymous_policy = %config.anonymous_policy,
        "Configuration loaded successfully"
    );

    if config.environment == Environment::Development && config.uses_dev_secret() {
        warn!("Using the development signing secret; set SECRET_KEY before deploying");
    }

    // Must happen before any metrics are recorded
    info!("Initializing Prometheus metrics recorder...");
    let metrics_handle = init_metrics_recorder().map_err(|e| {
        error!(error = %e, "Failed to install Prometheus metrics recorder");
        e
    })?;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let authority = Arc::new(TokenAuthority::from_config(&config, Arc::clone(&clock)));
    let controller = Arc::new(AdmissionController::from_config(&config, authority));

    let addr: SocketAddr = config.bind_address.parse().map_err(|e| {
        error!("Invalid bind address: {}", e);
        e
    })?;
    let drain = Duration::from_secs(config.shutdown_drain_seconds);
    let sweep_every = sweep_interval(config.rate_limit_period_seconds);

    let state = Arc::new(AppState {
        config,
        controller: Arc::clone(&controller),
        clock: Arc::clone(&clock),
        started_at: Utc::now(),
    });

    let shutdown_token = CancellationToken::new();
    let sweeper = tokio::spawn(start_rate_window_sweeper(
        controller,
        clock,
        sweep_every,
        shutdown_token.child_token(),
    ));

    let app = routes::build_routes(state, metrics_handle);

    // Bind before serving to fail fast on bind errors
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("AI Gateway listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(drain))
    .await?;

    shutdown_token.cancel();
    if let Err(e) = sweeper.await {
        warn!(error = %e, "Rate window sweeper did not shut down cleanly");
    }

    info!("AI Gateway shutdown complete");

    Ok(())
}

/// Install the tracing subscriber.
///
/// `RUST_LOG` controls filtering; `LOG_FORMAT=json` switches to JSON lines.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "gateway_service=debug,tower_http=debug".into());

    let json = std::env::var("LOG_FORMAT").is_ok_and(|format| format.eq_ignore_ascii_case("json"));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

/// Listens for shutdown signals (SIGTERM, SIGINT).
/// Returns when a signal is received and the drain period is complete.
async fn shutdown_signal(drain: Duration) {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received SIGINT, starting graceful shutdown..."),
            Err(e) => error!("Failed to listen for SIGINT: {}", e),
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received SIGTERM, starting graceful shutdown...");
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    if drain.is_zero() {
        info!("Skipping drain period (SHUTDOWN_DRAIN_SECONDS=0)");
    } else {
        warn!("Draining connections for {} seconds...", drain.as_secs());
        tokio::time::sleep(drain).await;
        info!("Drain period complete");
    }
}
