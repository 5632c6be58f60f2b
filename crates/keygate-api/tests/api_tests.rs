//! API Integration Tests
//!
//! All tests run against in-memory collaborators. The Postgres and Redis
//! backends have their own ignored tests in their crates.
//!
//! Author: hephaex@gmail.com

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
};
use keygate_api::create_router_for_testing;
use keygate_api::testing::TestContext;
use serde_json::{json, Value};
use tower::ServiceExt;

const BOUNDARY: &str = "keygate-test-boundary";

/// Helper to create a test request
fn create_json_request(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json");

    match body {
        Some(json_body) => builder
            .body(Body::from(serde_json::to_string(&json_body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

fn credentials(name: &str, password: &str) -> Option<Value> {
    Some(json!({ "name": name, "password": password }))
}

fn multipart_request(token: &str, file_name: &str, content: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: image/jpeg\r\n\r\n");
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/users/verify")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn body_json(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

async fn register(ctx: &TestContext, name: &str, password: &str) -> String {
    let response = ctx
        .router()
        .oneshot(create_json_request(
            "POST",
            "/users/register",
            credentials(name, password),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["token"]
        .as_str()
        .unwrap()
        .to_string()
}

// =============================================================================
// Health Check Tests
// =============================================================================

#[tokio::test]
async fn test_health_check() {
    let app = create_router_for_testing();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn test_liveness_probe() {
    let app = create_router_for_testing();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/healthz/live")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_readiness_check() {
    let ctx = TestContext::new();

    let response = ctx
        .router()
        .oneshot(
            Request::builder()
                .uri("/healthz/ready")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["ready"], true);
    assert_eq!(json["directory"], "memory");
    assert_eq!(json["cache"], "memory");

    ctx.state.set_ready(false);
    let response = ctx
        .router()
        .oneshot(
            Request::builder()
                .uri("/healthz/ready")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_json(response).await["ready"], false);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let ctx = TestContext::new();
    register(&ctx, "alice", "secret").await;

    for password in ["secret", "wrong"] {
        ctx.router()
            .oneshot(create_json_request(
                "POST",
                "/users/auth",
                credentials("alice", password),
            ))
            .await
            .unwrap();
    }

    let response = ctx
        .router()
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();

    assert!(text.contains("auth_request_count"));
    assert!(text.contains("auth_request_duration"));
    assert!(text.contains("endpoint=\"/users/register\""));
    assert!(text.contains("outcome=\"success\""));
    assert!(text.contains("outcome=\"failure\""));
}

#[tokio::test]
async fn test_openapi_document() {
    let app = create_router_for_testing();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api-docs/openapi.json")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert!(json["paths"]["/users/register"].is_object());
    assert!(json["paths"]["/users/check_token/{user_id}"].is_object());
    assert!(json["components"]["securitySchemes"]["bearer_auth"].is_object());
}

// =============================================================================
// Registration Tests
// =============================================================================

#[tokio::test]
async fn test_register_returns_token() {
    let ctx = TestContext::new();
    let token = register(&ctx, "alice", "secret").await;

    assert_eq!(token.split('.').count(), 3);
    assert_eq!(ctx.directory.len().await, 1);
}

#[tokio::test]
async fn test_register_duplicate_name() {
    let ctx = TestContext::new();
    register(&ctx, "alice", "secret").await;

    let response = ctx
        .router()
        .oneshot(create_json_request(
            "POST",
            "/users/register",
            credentials("alice", "other"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let json = body_json(response).await;
    assert_eq!(json["code"], "CONFLICT");
    assert_eq!(json["message"], "Username already exists");
}

#[tokio::test]
async fn test_register_name_too_long() {
    let app = create_router_for_testing();

    let response = app
        .oneshot(create_json_request(
            "POST",
            "/users/register",
            credentials(&"a".repeat(101), "secret"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_register_empty_credentials() {
    let ctx = TestContext::new();
    register(&ctx, "", "").await;

    let response = ctx
        .router()
        .oneshot(create_json_request("POST", "/users/auth", credentials("", "")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
}

// =============================================================================
// Authentication Tests
// =============================================================================

#[tokio::test]
async fn test_auth_reuses_live_token() {
    let ctx = TestContext::new();
    let registered = register(&ctx, "alice", "secret").await;

    let response = ctx
        .router()
        .oneshot(create_json_request(
            "POST",
            "/users/auth",
            credentials("alice", "secret"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(body_json(response).await["token"], registered.as_str());
}

#[tokio::test]
async fn test_auth_reissues_expired_token() {
    let ctx = TestContext::new();
    let registered = register(&ctx, "alice", "secret").await;

    ctx.clock.advance(ctx.state.config.jwt.ttl_secs());

    let response = ctx
        .router()
        .oneshot(create_json_request(
            "POST",
            "/users/auth",
            credentials("alice", "secret"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let fresh = body_json(response).await["token"]
        .as_str()
        .unwrap()
        .to_string();
    assert_ne!(fresh, registered);

    let response = ctx
        .router()
        .oneshot(create_json_request("GET", "/users/check_token/1", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_auth_failures_are_indistinguishable() {
    let ctx = TestContext::new();
    register(&ctx, "alice", "secret").await;

    let wrong_password = ctx
        .router()
        .oneshot(create_json_request(
            "POST",
            "/users/auth",
            credentials("alice", "nope"),
        ))
        .await
        .unwrap();
    let unknown_user = ctx
        .router()
        .oneshot(create_json_request(
            "POST",
            "/users/auth",
            credentials("mallory", "secret"),
        ))
        .await
        .unwrap();

    assert_eq!(wrong_password.status(), StatusCode::FORBIDDEN);
    assert_eq!(unknown_user.status(), StatusCode::FORBIDDEN);

    let wrong_password = body_json(wrong_password).await;
    let unknown_user = body_json(unknown_user).await;
    assert_eq!(wrong_password, unknown_user);
    assert_eq!(wrong_password["message"], "Invalid username or password");
}

// =============================================================================
// Token Check Tests
// =============================================================================

#[tokio::test]
async fn test_check_token_by_user_id() {
    let ctx = TestContext::new();
    register(&ctx, "alice", "secret").await;

    let response = ctx
        .router()
        .oneshot(create_json_request("GET", "/users/check_token/1", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["name"], "alice");
    assert_eq!(
        json["expires_at"].as_u64().unwrap() - json["issued_at"].as_u64().unwrap(),
        ctx.state.config.jwt.ttl_secs()
    );
}

#[tokio::test]
async fn test_check_token_unknown_user() {
    let app = create_router_for_testing();

    let response = app
        .oneshot(create_json_request("GET", "/users/check_token/42", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(json["code"], "NOT_FOUND");
    assert_eq!(json["message"], "Token not found");
}

#[tokio::test]
async fn test_check_token_non_numeric_id() {
    let app = create_router_for_testing();

    let response = app
        .oneshot(create_json_request("GET", "/users/check_token/abc", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/json"
    );
    let json = body_json(response).await;
    assert_eq!(json["code"], "BAD_REQUEST");
    assert!(json["details"].is_string());
}

#[tokio::test]
async fn test_check_token_expired_is_not_reissued() {
    let ctx = TestContext::new();
    register(&ctx, "alice", "secret").await;
    ctx.clock.advance(ctx.state.config.jwt.ttl_secs());

    for _ in 0..2 {
        let response = ctx
            .router()
            .oneshot(create_json_request("GET", "/users/check_token/1", None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["code"], "TOKEN_EXPIRED");
    }
}

// =============================================================================
// Protected Route Tests
// =============================================================================

#[tokio::test]
async fn test_me_requires_bearer_token() {
    let app = create_router_for_testing();

    let response = app
        .oneshot(create_json_request("GET", "/users/me", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_me_with_valid_token() {
    let ctx = TestContext::new();
    let token = register(&ctx, "alice", "secret").await;

    let response = ctx
        .router()
        .oneshot(
            Request::builder()
                .uri("/users/me")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["name"], "alice");
}

#[tokio::test]
async fn test_me_with_garbage_token() {
    let app = create_router_for_testing();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/users/me")
                .header(header::AUTHORIZATION, "Bearer not.a.token")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["code"], "INVALID_TOKEN");
}

// =============================================================================
// Photo Verification Tests
// =============================================================================

#[tokio::test]
async fn test_verify_photo_saved_and_published() {
    let ctx = TestContext::new();
    let token = register(&ctx, "alice", "secret").await;

    let response = ctx
        .router()
        .oneshot(multipart_request(&token, "face.jpg", b"\xff\xd8\xff\xe0jpeg"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await["message"],
        "File saved successfully"
    );

    let stored = ctx.photo_dir.path().join("face.jpg");
    assert_eq!(std::fs::read(&stored).unwrap(), b"\xff\xd8\xff\xe0jpeg");

    let messages = ctx.publisher.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].topic, "faces");
    assert_eq!(messages[0].key, "alice");
    assert!(!messages[0].payload.is_empty());
}

#[tokio::test]
async fn test_verify_photo_requires_token() {
    let ctx = TestContext::new();

    let response = ctx
        .router()
        .oneshot(multipart_request("bogus", "face.jpg", b"data"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(ctx.publisher.messages().is_empty());
}

#[tokio::test]
async fn test_verify_photo_publish_failure() {
    let ctx = TestContext::new();
    let token = register(&ctx, "alice", "secret").await;
    ctx.publisher.set_failing(true);

    let response = ctx
        .router()
        .oneshot(multipart_request(&token, "face.jpg", b"data"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await["code"], "INTERNAL_ERROR");
}

#[tokio::test]
async fn test_verify_photo_rejects_path_traversal() {
    let ctx = TestContext::new();
    let token = register(&ctx, "alice", "secret").await;

    let response = ctx
        .router()
        .oneshot(multipart_request(&token, "..", b"data"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(ctx.publisher.messages().is_empty());
}

// =============================================================================
// Span Export Tests
// =============================================================================

#[tokio::test]
async fn test_auth_unaffected_by_unreachable_collector() {
    use keygate_api::telemetry;
    use keygate_core::config::{LoggingConfig, TracingConfig};

    // Nothing listens on the discard port
    let config = TracingConfig {
        endpoint: Some("http://127.0.0.1:9/v1/traces".to_string()),
        service_name: "keygate-test".to_string(),
    };
    let (subscriber, telemetry) = telemetry::subscriber(&LoggingConfig::default(), &config);
    assert_eq!(telemetry.is_exporting(), cfg!(feature = "otel"));
    let guard = tracing::subscriber::set_default(subscriber);

    let ctx = TestContext::new();
    let registered = register(&ctx, "alice", "secret").await;

    let response = ctx
        .router()
        .oneshot(create_json_request(
            "POST",
            "/users/auth",
            credentials("alice", "secret"),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(body_json(response).await["token"], registered.as_str());

    drop(guard);
    tokio::task::spawn_blocking(move || telemetry.shutdown())
        .await
        .unwrap();
}
