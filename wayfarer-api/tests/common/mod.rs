/// Common test utilities for integration tests
///
/// Builds the full router over the in-memory account store with a real
/// worker pool running behind it, so the tests exercise the same
/// trigger/queue/complete path production uses without needing Postgres.
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt as _;

use wayfarer_api::app::{build_router, AppState};
use wayfarer_shared::store::InMemoryAccountStore;
use wayfarer_worker::generator::FixedProfile;
use wayfarer_worker::queue::job_channel;
use wayfarer_worker::worker::{ProfileWorker, WorkerConfig};

/// Test context containing the app and its backing pieces
pub struct TestContext {
    pub app: Router,
    pub shutdown: CancellationToken,
}

impl TestContext {
    /// Creates a context whose worker completes instantly with `profile`.
    pub fn with_profile(profile: &str) -> Self {
        let store = Arc::new(InMemoryAccountStore::new());
        let (jobs, job_rx) = job_channel(64);
        let state = AppState::new(store, jobs);

        let shutdown = CancellationToken::new();
        let worker = ProfileWorker::new(
            state.machine.clone(),
            Arc::new(FixedProfile::new(profile)),
            WorkerConfig {
                concurrency: 2,
                max_attempts: 1,
                attempt_timeout: Duration::from_secs(5),
                retry_delay: Duration::from_millis(1),
            },
        );
        tokio::spawn(worker.run(job_rx, shutdown.clone()));

        TestContext {
            app: build_router(state),
            shutdown,
        }
    }

    pub fn new() -> Self {
        Self::with_profile("voyager")
    }

    /// Creates a context with no worker consuming the queue, so accepted
    /// runs stay in flight for the whole test.
    pub fn without_worker() -> Self {
        let store = Arc::new(InMemoryAccountStore::new());
        let (jobs, _job_rx) = job_channel(64);
        let state = AppState::new(store, jobs);

        TestContext {
            app: build_router(state),
            shutdown: CancellationToken::new(),
        }
    }

    /// Sends a request and returns status plus parsed JSON body (Null for
    /// empty bodies).
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    /// Signs up an account and returns its session token.
    pub async fn signup(&self, email: &str, password: &str) -> String {
        let (status, body) = self
            .send(json_request(
                "POST",
                "/signup",
                json!({
                    "email": email,
                    "password": password,
                    "passwordConfirmation": password,
                }),
            ))
            .await;
        assert_eq!(status, StatusCode::CREATED, "signup failed: {body}");
        body["token"].as_str().unwrap().to_string()
    }

    /// Polls `/task/status` until it leaves `running`, then returns the body.
    pub async fn wait_for_terminal_status(&self, token: &str) -> Value {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let (status, body) = self
                    .send(authed_request("GET", "/task/status", token))
                    .await;
                assert_eq!(status, StatusCode::OK);
                if body["status"] != "running" {
                    return body;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("task never reached a terminal status")
    }
}

impl Drop for TestContext {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Builds a JSON request with no auth header.
pub fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Builds a bodyless request carrying a bearer token.
pub fn authed_request(method: &str, uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}
