//! Integration tests for health, metrics and response headers

use chrono::Duration;
use gateway_test_utils::TestGatewayServer;
use reqwest::StatusCode;

// ============================================================================
// Health Endpoints
// ============================================================================

#[tokio::test]
async fn test_health_endpoint_returns_ok() -> Result<(), anyhow::Error> {
    // Arrange
    let server = TestGatewayServer::spawn().await?;

    // Act
    let response = reqwest::Client::new()
        .get(format!("{}/health", server.url()))
        .send()
        .await?;

    // Assert
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await?, "OK");

    Ok(())
}

#[tokio::test]
async fn test_api_health_reports_status_and_uptime() -> Result<(), anyhow::Error> {
    // Arrange
    let server = TestGatewayServer::spawn().await?;
    server.advance(Duration::seconds(125));

    // Act
    let response = reqwest::Client::new()
        .get(format!("{}/api/health", server.url()))
        .send()
        .await?;

    // Assert
    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(body["uptime_seconds"], 125);
    assert_eq!(body["environment"], "development");
    assert_eq!(body["timestamp"], "2025-01-01T00:02:05Z");

    Ok(())
}

#[tokio::test]
async fn test_health_is_not_rate_limited() -> Result<(), anyhow::Error> {
    let server = TestGatewayServer::spawn().await?;
    let client = reqwest::Client::new();

    for _ in 0..20 {
        let response = client.get(format!("{}/health", server.url())).send().await?;
        assert_eq!(response.status(), StatusCode::OK);
    }
    assert_eq!(server.controller().limiter().tracked_keys(), 0);

    Ok(())
}

// ============================================================================
// Metrics Endpoint
// ============================================================================

#[tokio::test]
async fn test_metrics_endpoint_is_public() -> Result<(), anyhow::Error> {
    let server = TestGatewayServer::spawn().await?;

    let response = reqwest::Client::new()
        .get(format!("{}/metrics", server.url()))
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::OK);

    Ok(())
}

// ============================================================================
// Response Headers
// ============================================================================

#[tokio::test]
async fn test_every_response_carries_gateway_headers() -> Result<(), anyhow::Error> {
    let server = TestGatewayServer::spawn_with(&[("ANONYMOUS_POLICY", "reject")]).await?;
    let client = reqwest::Client::new();

    // Success, auth failure and unknown route
    for (path, expected) in [
        ("/health", StatusCode::OK),
        ("/api/v1/me", StatusCode::UNAUTHORIZED),
        ("/does-not-exist", StatusCode::NOT_FOUND),
    ] {
        let response = client.get(format!("{}{}", server.url(), path)).send().await?;
        assert_eq!(response.status(), expected, "{path}");

        let headers = response.headers();
        assert!(headers.contains_key("x-process-time"), "{path}");
        assert_eq!(
            headers.get("x-api-version").unwrap(),
            env!("CARGO_PKG_VERSION"),
            "{path}"
        );
        assert_eq!(headers.get("x-environment").unwrap(), "development", "{path}");
    }

    Ok(())
}

#[tokio::test]
async fn test_cors_preflight_for_configured_origin() -> Result<(), anyhow::Error> {
    let server = TestGatewayServer::spawn().await?;

    let response = reqwest::Client::new()
        .request(
            reqwest::Method::OPTIONS,
            format!("{}/api/v1/me", server.url()),
        )
        .header("Origin", "http://localhost:3000")
        .header("Access-Control-Request-Method", "GET")
        .header("Access-Control-Request-Headers", "authorization")
        .send()
        .await?;

    assert!(response.status().is_success());
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .unwrap(),
        "http://localhost:3000"
    );
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-credentials")
            .unwrap(),
        "true"
    );

    Ok(())
}

#[tokio::test]
async fn test_cors_ignores_unknown_origin() -> Result<(), anyhow::Error> {
    let server = TestGatewayServer::spawn().await?;

    let response = reqwest::Client::new()
        .get(format!("{}/health", server.url()))
        .header("Origin", "https://evil.example.com")
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response
        .headers()
        .get("access-control-allow-origin")
        .is_none());

    Ok(())
}
