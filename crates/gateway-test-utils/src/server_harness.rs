//! Test server harness for E2E testing
//!
//! Provides `TestGatewayServer` for spawning real gateway instances in tests.
//! Each server runs on a manual clock so tests control token expiry and
//! window aging.

use crate::fixtures::{fixed_start, test_config_with};
use chrono::Duration;
use common::clock::{Clock, ManualClock};
use gateway_service::config::Config;
use gateway_service::crypto::TokenAuthority;
use gateway_service::observability::metrics::init_metrics_recorder;
use gateway_service::routes::{self, AppState};
use gateway_service::services::AdmissionController;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Test harness for spawning the gateway in E2E tests.
///
/// # Example
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_health() -> Result<()> {
///     let server = TestGatewayServer::spawn().await?;
///     let response = reqwest::get(format!("{}/health", server.url())).await?;
///     assert_eq!(response.status(), 200);
///     Ok(())
/// }
/// ```
pub struct TestGatewayServer {
    addr: SocketAddr,
    config: Config,
    clock: Arc<ManualClock>,
    controller: Arc<AdmissionController>,
    _handle: JoinHandle<()>,
}

impl TestGatewayServer {
    /// Spawn a server with the default test configuration.
    pub async fn spawn() -> Result<Self, anyhow::Error> {
        Self::spawn_with(&[]).await
    }

    /// Spawn a server with configuration overrides.
    ///
    /// The server will:
    /// - Bind to a random available port (127.0.0.1:0)
    /// - Start at `fixed_start` on a manual clock
    /// - Start the HTTP server in the background
    pub async fn spawn_with(overrides: &[(&str, &str)]) -> Result<Self, anyhow::Error> {
        let config = test_config_with(overrides);

        let clock = Arc::new(ManualClock::new(fixed_start()));
        let dyn_clock: Arc<dyn Clock> = clock.clone();
        let authority = Arc::new(TokenAuthority::from_config(&config, Arc::clone(&dyn_clock)));
        let controller = Arc::new(AdmissionController::from_config(&config, authority));

        let state = Arc::new(AppState {
            config: config.clone(),
            controller: Arc::clone(&controller),
            clock: dyn_clock,
            started_at: fixed_start(),
        });

        // The global recorder can only be installed once per process; later
        // servers get a standalone recorder.
        let metrics_handle = match init_metrics_recorder() {
            Ok(handle) => handle,
            Err(_) => {
                use metrics_exporter_prometheus::PrometheusBuilder;
                let recorder = PrometheusBuilder::new().build_recorder();
                recorder.handle()
            }
        };

        let app = routes::build_routes(state, metrics_handle);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        let handle = tokio::spawn(async move {
            // Admission keys anonymous callers by client address
            let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
            if let Err(e) = axum::serve(listener, make_service).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            config,
            clock,
            controller,
            _handle: handle,
        })
    }

    /// Get the base URL of the test server
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Get the socket address
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Get reference to the server configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Clock shared by the token authority and admission middleware
    pub fn clock(&self) -> &ManualClock {
        &self.clock
    }

    /// Move the server's clock forward
    pub fn advance(&self, delta: Duration) {
        self.clock.advance(delta);
    }

    /// Admission controller behind the server
    pub fn controller(&self) -> &AdmissionController {
        &self.controller
    }

    /// Issue a token with the server's own authority at the current clock.
    pub fn issue_token(
        &self,
        subject: &str,
        role: Option<&str>,
        plan: Option<&str>,
    ) -> Result<String, anyhow::Error> {
        self.controller
            .authority()
            .issue(subject, role, plan, None)
            .map_err(|e| anyhow::anyhow!("Failed to issue test token: {}", e))
    }
}

impl Drop for TestGatewayServer {
    fn drop(&mut self) {
        self._handle.abort();
    }
}
