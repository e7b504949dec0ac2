//! Integration tests for admission: anonymous policy, quotas and role gates

use gateway_test_utils::{TestGatewayServer, TEST_RATE_LIMIT_REQUESTS};
use reqwest::StatusCode;

async fn get(server: &TestGatewayServer, path: &str, token: Option<&str>) -> reqwest::Response {
    let mut request = reqwest::Client::new().get(format!("{}{}", server.url(), path));
    if let Some(token) = token {
        request = request.bearer_auth(token);
    }
    request.send().await.expect("request should complete")
}

// ============================================================================
// Anonymous Policy
// ============================================================================

#[tokio::test]
async fn test_anonymous_allowed_in_development() -> Result<(), anyhow::Error> {
    let server = TestGatewayServer::spawn().await?;

    let response = get(&server, "/api/v1/me", None).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["subject"], "demo_user");
    assert_eq!(body["authenticated"], false);
    assert_eq!(body["role"], "user");
    assert_eq!(body["plan"], "free");
    // Half the base limit
    assert_eq!(body["quota"], TEST_RATE_LIMIT_REQUESTS / 2);
    assert_eq!(body["rate_limit_remaining"], TEST_RATE_LIMIT_REQUESTS / 2 - 1);

    Ok(())
}

#[tokio::test]
async fn test_anonymous_rejected_when_policy_rejects() -> Result<(), anyhow::Error> {
    let server = TestGatewayServer::spawn_with(&[("ANONYMOUS_POLICY", "reject")]).await?;

    let response = get(&server, "/api/v1/me", None).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        response.headers().get("www-authenticate").unwrap(),
        "Bearer realm=\"ai-gateway\""
    );
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["error"]["code"], "MISSING_CREDENTIAL");
    assert_eq!(server.controller().limiter().tracked_keys(), 0);

    Ok(())
}

#[tokio::test]
async fn test_production_rejects_anonymous_by_default() -> Result<(), anyhow::Error> {
    let server = TestGatewayServer::spawn_with(&[("ENVIRONMENT", "production")]).await?;

    let response = get(&server, "/api/v1/me", None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.headers().get("x-environment").unwrap(), "production");

    let token = server.issue_token("alice", None, None)?;
    let response = get(&server, "/api/v1/me", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::OK);

    Ok(())
}

#[tokio::test]
async fn test_bad_credential_is_not_downgraded_to_anonymous() -> Result<(), anyhow::Error> {
    // Anonymous callers are allowed, but a bad token still fails
    let server = TestGatewayServer::spawn().await?;

    let response = get(&server, "/api/v1/me", Some("not.a.token")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    Ok(())
}

// ============================================================================
// Quotas
// ============================================================================

#[tokio::test]
async fn test_plan_quotas() -> Result<(), anyhow::Error> {
    let server = TestGatewayServer::spawn().await?;

    for (plan, quota) in [
        (Some("free"), 100),
        (Some("pro"), 1_000),
        (Some("enterprise"), 10_000),
        (Some("unknown-tier"), 100),
        (None, 100),
    ] {
        let token = server.issue_token("quota-user", None, plan)?;
        let body: serde_json::Value = get(&server, "/api/v1/me", Some(&token))
            .await
            .json()
            .await?;
        assert_eq!(body["quota"], quota, "plan {plan:?}");
    }

    Ok(())
}

// ============================================================================
// Role Gate
// ============================================================================

#[tokio::test]
async fn test_admin_ping_requires_admin_role() -> Result<(), anyhow::Error> {
    let server = TestGatewayServer::spawn().await?;

    // Anonymous
    let response = get(&server, "/api/v1/admin/ping", None).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Regular user
    let user = server.issue_token("alice", Some("user"), Some("enterprise"))?;
    let response = get(&server, "/api/v1/admin/ping", Some(&user)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["error"]["code"], "FORBIDDEN");

    // Admin
    let admin = server.issue_token("root", Some("admin"), None)?;
    let response = get(&server, "/api/v1/admin/ping", Some(&admin)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["subject"], "root");

    Ok(())
}

#[tokio::test]
async fn test_admin_ping_authenticates_before_role_check() -> Result<(), anyhow::Error> {
    let server = TestGatewayServer::spawn_with(&[("ANONYMOUS_POLICY", "reject")]).await?;

    let response = get(&server, "/api/v1/admin/ping", None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = get(&server, "/api/v1/admin/ping", Some("garbage")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    Ok(())
}

// ============================================================================
// Plan Gate
// ============================================================================

#[tokio::test]
async fn test_premium_ping_requires_premium_plan() -> Result<(), anyhow::Error> {
    let server = TestGatewayServer::spawn().await?;

    // Anonymous callers are on the free plan
    let response = get(&server, "/api/v1/premium/ping", None).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["error"]["code"], "FORBIDDEN");

    let free = server.issue_token("erin", None, Some("free"))?;
    let response = get(&server, "/api/v1/premium/ping", Some(&free)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    for plan in ["pro", "enterprise", "admin"] {
        let token = server.issue_token("frank", None, Some(plan))?;
        let response = get(&server, "/api/v1/premium/ping", Some(&token)).await;
        assert_eq!(response.status(), StatusCode::OK, "plan {plan}");
        let body: serde_json::Value = response.json().await?;
        assert_eq!(body["plan"], plan);
        assert_eq!(body["subject"], "frank");
    }

    Ok(())
}

#[tokio::test]
async fn test_premium_ping_is_rate_limited_before_plan_check() -> Result<(), anyhow::Error> {
    let server = TestGatewayServer::spawn().await?;
    let quota = server.config().anonymous_rate_limit();

    for _ in 0..quota {
        let response = get(&server, "/api/v1/premium/ping", None).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    // The window counts gated requests too
    let response = get(&server, "/api/v1/premium/ping", None).await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

    Ok(())
}
