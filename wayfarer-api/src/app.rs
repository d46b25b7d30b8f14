/// Application state and router builder
///
/// Defines the shared application state and assembles the Axum router with
/// all routes and middleware.
use axum::{
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use wayfarer_shared::auth::middleware::session_auth_middleware;
use wayfarer_shared::profile::ProfileMachine;
use wayfarer_shared::store::AccountStore;
use wayfarer_worker::queue::JobSender;

use crate::routes;

/// Shared application state
///
/// Cloned for each request handler via Axum's `State` extractor; every field
/// is cheap to clone.
#[derive(Clone)]
pub struct AppState {
    /// Account store (session lookups and account writes)
    pub store: Arc<dyn AccountStore>,

    /// Profile-generation state machine over the same store
    pub machine: ProfileMachine,

    /// Sender half of the profile job queue
    pub jobs: JobSender,
}

impl AppState {
    /// Creates application state over a store and job queue.
    pub fn new(store: Arc<dyn AccountStore>, jobs: JobSender) -> Self {
        let machine = ProfileMachine::new(Arc::clone(&store));
        Self {
            store,
            machine,
            jobs,
        }
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── GET    /health          # Health check (public)
/// ├── POST   /signup          # Create account (public)
/// ├── POST   /signin          # Exchange credentials for token (public)
/// ├── DELETE /signout         # Rotate session token (bearer auth)
/// ├── POST   /task/generate   # Trigger profile generation (bearer auth)
/// └── GET    /task/status     # Poll generation status (bearer auth)
/// ```
pub fn build_router(state: AppState) -> Router {
    // Public routes (no auth)
    let public_routes = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/signup", post(routes::auth::signup))
        .route("/signin", post(routes::auth::signin));

    // Session-protected routes; rejections carry the same
    // `{"errors":["Unauthorized"]}` envelope as handler errors
    let auth_store = Arc::clone(&state.store);
    let protected_routes = Router::new()
        .route("/signout", delete(routes::auth::signout))
        .route("/task/generate", post(routes::profile::generate))
        .route("/task/status", get(routes::profile::status))
        .layer(axum::middleware::from_fn(move |req, next| {
            session_auth_middleware(Arc::clone(&auth_store), req, next)
        }));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}
