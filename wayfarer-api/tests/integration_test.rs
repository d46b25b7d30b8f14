/// Integration tests for the Wayfarer API
///
/// End-to-end over the router with the in-memory store and a live worker
/// pool:
/// - signup / signin / signout and token rotation
/// - bearer rejection paths
/// - task trigger, conflict, completion, and re-trigger
/// - concurrent triggers admit exactly one run
mod common;

use axum::http::StatusCode;
use common::{authed_request, json_request, TestContext};
use serde_json::json;

#[tokio::test]
async fn test_signup_returns_token() {
    let ctx = TestContext::new();

    let (status, body) = ctx
        .send(json_request(
            "POST",
            "/signup",
            json!({
                "email": "  Traveler@Example.COM ",
                "password": "wanderlust",
                "passwordConfirmation": "wanderlust",
            }),
        ))
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["email"], "traveler@example.com");
    assert_eq!(body["token"].as_str().unwrap().len(), 64);
}

#[tokio::test]
async fn test_signup_validation_errors() {
    let ctx = TestContext::new();

    let (status, body) = ctx
        .send(json_request(
            "POST",
            "/signup",
            json!({
                "email": "not-an-email",
                "password": "short",
                "passwordConfirmation": "different",
            }),
        ))
        .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let errors: Vec<&str> = body["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e.as_str().unwrap())
        .collect();
    assert!(errors.contains(&"Email is invalid"));
    assert!(errors.contains(&"Password is too short (minimum is 8 characters)"));
    assert!(errors.contains(&"Password confirmation doesn't match Password"));
}

#[tokio::test]
async fn test_signup_duplicate_email() {
    let ctx = TestContext::new();
    ctx.signup("traveler@example.com", "wanderlust").await;

    // Same account after normalization.
    let (status, body) = ctx
        .send(json_request(
            "POST",
            "/signup",
            json!({
                "email": "TRAVELER@example.com",
                "password": "different-password",
                "passwordConfirmation": "different-password",
            }),
        ))
        .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["errors"], json!(["Email has already been taken"]));
}

#[tokio::test]
async fn test_signin_returns_current_token() {
    let ctx = TestContext::new();
    let token = ctx.signup("traveler@example.com", "wanderlust").await;

    let (status, body) = ctx
        .send(json_request(
            "POST",
            "/signin",
            json!({ "email": "Traveler@Example.com", "password": "wanderlust" }),
        ))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["token"], json!(token));
    assert_eq!(body["email"], "traveler@example.com");
}

#[tokio::test]
async fn test_signin_wrong_password() {
    let ctx = TestContext::new();
    ctx.signup("traveler@example.com", "wanderlust").await;

    let (status, body) = ctx
        .send(json_request(
            "POST",
            "/signin",
            json!({ "email": "traveler@example.com", "password": "wrong-password" }),
        ))
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["errors"], json!(["Invalid email or password"]));
}

#[tokio::test]
async fn test_signin_unknown_email_same_response() {
    let ctx = TestContext::new();

    let (status, body) = ctx
        .send(json_request(
            "POST",
            "/signin",
            json!({ "email": "nobody@example.com", "password": "whatever1" }),
        ))
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["errors"], json!(["Invalid email or password"]));
}

#[tokio::test]
async fn test_signout_rotates_token() {
    let ctx = TestContext::new();
    let token = ctx.signup("traveler@example.com", "wanderlust").await;

    let (status, _) = ctx.send(authed_request("DELETE", "/signout", &token)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    // The old token stops matching immediately.
    let (status, body) = ctx
        .send(authed_request("GET", "/task/status", &token))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["errors"], json!(["Unauthorized"]));

    // Signing in again hands out the rotated token and restores access.
    let (status, body) = ctx
        .send(json_request(
            "POST",
            "/signin",
            json!({ "email": "traveler@example.com", "password": "wanderlust" }),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    let new_token = body["token"].as_str().unwrap();
    assert_ne!(new_token, token);

    let (status, _) = ctx
        .send(authed_request("GET", "/task/status", new_token))
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_protected_routes_require_bearer() {
    let ctx = TestContext::new();

    for (method, uri) in [
        ("DELETE", "/signout"),
        ("POST", "/task/generate"),
        ("GET", "/task/status"),
    ] {
        let request = axum::http::Request::builder()
            .method(method)
            .uri(uri)
            .body(axum::body::Body::empty())
            .unwrap();
        let (status, body) = ctx.send(request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{method} {uri}");
        assert_eq!(body["errors"], json!(["Unauthorized"]));
    }

    let (status, _) = ctx
        .send(authed_request("GET", "/task/status", "bogus-token"))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_task_lifecycle() {
    let ctx = TestContext::with_profile("explorer");
    let token = ctx.signup("traveler@example.com", "wanderlust").await;

    // Fresh accounts are idle.
    let (status, body) = ctx
        .send(authed_request("GET", "/task/status", &token))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "idle");

    // Trigger a run.
    let (status, body) = ctx
        .send(authed_request("POST", "/task/generate", &token))
        .await;
    assert_eq!(status, StatusCode::ACCEPTED, "{body}");

    // The worker completes it.
    let body = ctx.wait_for_terminal_status(&token).await;
    assert_eq!(body["status"], "complete");
    assert_eq!(body["result"], "explorer");
    assert!(body.get("completedAt").is_some());

    // Completion is stable across repeated polls.
    let (_, again) = ctx
        .send(authed_request("GET", "/task/status", &token))
        .await;
    assert_eq!(again["status"], "complete");

    // And the account can be re-triggered.
    let (status, _) = ctx
        .send(authed_request("POST", "/task/generate", &token))
        .await;
    assert_eq!(status, StatusCode::ACCEPTED);
}

#[tokio::test]
async fn test_generate_conflict_while_running() {
    // No worker: the first run stays in flight.
    let ctx = TestContext::without_worker();
    let token = ctx.signup("traveler@example.com", "wanderlust").await;

    let (status, _) = ctx
        .send(authed_request("POST", "/task/generate", &token))
        .await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let (status, body) = ctx
        .send(authed_request("POST", "/task/generate", &token))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(
        body["errors"],
        json!(["Profile generation already in progress"])
    );

    let (status, body) = ctx
        .send(authed_request("GET", "/task/status", &token))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "running");
}

#[tokio::test]
async fn test_concurrent_generate_admits_exactly_one() {
    let ctx = TestContext::without_worker();
    let token = ctx.signup("traveler@example.com", "wanderlust").await;

    let mut handles = Vec::new();
    for _ in 0..20 {
        let app = ctx.app.clone();
        let token = token.clone();
        handles.push(tokio::spawn(async move {
            use tower::ServiceExt as _;
            let response = app
                .oneshot(authed_request("POST", "/task/generate", &token))
                .await
                .unwrap();
            response.status()
        }));
    }

    let mut accepted = 0;
    let mut conflicts = 0;
    for handle in handles {
        match handle.await.unwrap() {
            StatusCode::ACCEPTED => accepted += 1,
            StatusCode::CONFLICT => conflicts += 1,
            other => panic!("unexpected status {other}"),
        }
    }

    assert_eq!(accepted, 1);
    assert_eq!(conflicts, 19);
}
