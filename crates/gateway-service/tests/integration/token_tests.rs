//! Integration tests for token issuance and verification through HTTP

use chrono::Duration;
use gateway_test_utils::{
    fixed_start, TestGatewayServer, TestTokenBuilder, TokenAssertions, TEST_SECRET,
};
use jsonwebtoken::Algorithm;
use reqwest::StatusCode;

async fn get_me(server: &TestGatewayServer, token: &str) -> reqwest::Response {
    reqwest::Client::new()
        .get(format!("{}/api/v1/me", server.url()))
        .bearer_auth(token)
        .send()
        .await
        .expect("request should complete")
}

async fn error_code(response: reqwest::Response) -> String {
    let body: serde_json::Value = response.json().await.expect("error body is JSON");
    body["error"]["code"].as_str().unwrap_or_default().to_string()
}

// ============================================================================
// Issued Tokens
// ============================================================================

#[tokio::test]
async fn test_issued_token_shape() -> Result<(), anyhow::Error> {
    let server = TestGatewayServer::spawn().await?;

    let token = server.issue_token("alice", Some("user"), Some("pro"))?;

    token
        .assert_valid_jwt()
        .assert_for_subject("alice")
        .assert_has_role("user")
        .assert_has_plan("pro")
        // Default lifetime: 7 days
        .assert_expires_in(7 * 24 * 60 * 60);

    Ok(())
}

#[tokio::test]
async fn test_configured_algorithm_and_lifetime() -> Result<(), anyhow::Error> {
    let server = TestGatewayServer::spawn_with(&[
        ("JWT_ALGORITHM", "HS384"),
        ("ACCESS_TOKEN_EXPIRE_MINUTES", "15"),
    ])
    .await?;

    let token = server.issue_token("alice", None, None)?;
    token.assert_algorithm("HS384").assert_expires_in(15 * 60);

    let response = get_me(&server, &token).await;
    assert_eq!(response.status(), StatusCode::OK);

    Ok(())
}

#[tokio::test]
async fn test_issued_token_is_accepted() -> Result<(), anyhow::Error> {
    let server = TestGatewayServer::spawn().await?;
    let token = server.issue_token("alice", None, Some("pro"))?;

    let response = get_me(&server, &token).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["subject"], "alice");
    assert_eq!(body["authenticated"], true);

    Ok(())
}

// ============================================================================
// Expiry
// ============================================================================

#[tokio::test]
async fn test_token_expires_at_issued_at_plus_lifetime() -> Result<(), anyhow::Error> {
    let server = TestGatewayServer::spawn_with(&[("ACCESS_TOKEN_EXPIRE_MINUTES", "1")]).await?;
    let token = server.issue_token("alice", None, None)?;

    server.advance(Duration::seconds(59));
    assert_eq!(get_me(&server, &token).await.status(), StatusCode::OK);

    server.advance(Duration::seconds(1));
    let response = get_me(&server, &token).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let www_auth = response
        .headers()
        .get("www-authenticate")
        .unwrap()
        .to_str()?
        .to_string();
    assert!(www_auth.starts_with("Bearer"));
    assert!(www_auth.contains("invalid_token"));
    assert_eq!(error_code(response).await, "TOKEN_EXPIRED");

    Ok(())
}

// ============================================================================
// Malformed Credentials
// ============================================================================

#[tokio::test]
async fn test_hand_built_token_with_test_secret_is_accepted() -> Result<(), anyhow::Error> {
    let server = TestGatewayServer::spawn().await?;
    let token = TestTokenBuilder::new()
        .for_user("builder-user")
        .with_plan("enterprise")
        .sign();

    let response = get_me(&server, &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["quota"], 10_000);

    Ok(())
}

#[tokio::test]
async fn test_malformed_tokens_are_rejected() -> Result<(), anyhow::Error> {
    let server = TestGatewayServer::spawn().await?;

    let cases = [
        ("wrong secret", TestTokenBuilder::new().with_secret("not-the-secret").sign()),
        ("wrong algorithm", TestTokenBuilder::new().with_algorithm(Algorithm::HS512).sign()),
        ("missing subject", TestTokenBuilder::new().without_subject().sign()),
        ("missing expiry", TestTokenBuilder::new().without_expiry().sign()),
        ("garbage", "definitely-not-a-jwt".to_string()),
    ];

    for (name, token) in cases {
        let response = get_me(&server, &token).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{name}");
        assert!(response.headers().contains_key("www-authenticate"), "{name}");
        assert_eq!(error_code(response).await, "INVALID_TOKEN", "{name}");
    }

    Ok(())
}

#[tokio::test]
async fn test_tampered_plan_is_rejected() -> Result<(), anyhow::Error> {
    let server = TestGatewayServer::spawn().await?;
    let free = server.issue_token("alice", None, Some("free"))?;
    let enterprise = TestTokenBuilder::new()
        .for_user("alice")
        .with_plan("enterprise")
        .with_secret("attacker-secret")
        .sign();

    // Graft the enterprise payload onto the genuine signature
    let free_parts: Vec<&str> = free.split('.').collect();
    let forged_parts: Vec<&str> = enterprise.split('.').collect();
    let forged = format!("{}.{}.{}", free_parts[0], forged_parts[1], free_parts[2]);

    let response = get_me(&server, &forged).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    Ok(())
}

#[tokio::test]
async fn test_token_from_future_is_rejected() -> Result<(), anyhow::Error> {
    let server = TestGatewayServer::spawn().await?;
    let now = fixed_start().timestamp();

    let token = TestTokenBuilder::new().issued_at(now + 3_600).sign();
    let response = get_me(&server, &token).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(response).await, "INVALID_TOKEN");

    Ok(())
}

#[tokio::test]
async fn test_non_bearer_scheme_is_rejected() -> Result<(), anyhow::Error> {
    let server = TestGatewayServer::spawn().await?;

    let response = reqwest::Client::new()
        .get(format!("{}/api/v1/me", server.url()))
        .basic_auth("alice", Some(TEST_SECRET))
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(response).await, "INVALID_TOKEN");

    Ok(())
}
