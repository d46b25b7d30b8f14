/// Bearer session authentication for Axum
///
/// Validates the `Authorization: Bearer <token>` header against the account
/// store (exact token match) and injects an [`AuthSession`] into request
/// extensions for downstream handlers.
///
/// Authentication is checked synchronously per request and fails closed: a
/// missing header, a non-Bearer scheme, or an unknown token all yield the
/// same terminal 401; the server never retries on the caller's behalf.
///
/// # Example
///
/// ```no_run
/// use axum::{Extension, Router, routing::get};
/// use wayfarer_shared::auth::middleware::AuthSession;
///
/// async fn whoami(Extension(session): Extension<AuthSession>) -> String {
///     session.email
/// }
/// ```
use axum::{
    extract::Request,
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use crate::store::AccountStore;

/// Authenticated caller, added to request extensions after a successful
/// bearer check.
///
/// The account id is threaded explicitly through every subsequent operation;
/// there is no implicit per-request "current account" global.
#[derive(Debug, Clone)]
pub struct AuthSession {
    /// Authenticated account ID
    pub account_id: Uuid,

    /// Account email (handy for logging and responses)
    pub email: String,
}

/// Error type for bearer authentication
#[derive(Debug)]
pub enum AuthError {
    /// Missing header, wrong scheme, or no account with that token
    Unauthenticated,

    /// Store lookup failed
    StoreFailure(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            AuthError::Unauthenticated => (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "errors": ["Unauthorized"] })),
            )
                .into_response(),
            AuthError::StoreFailure(msg) => {
                tracing::error!(error = %msg, "Session lookup failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "errors": ["Internal server error"] })),
                )
                    .into_response()
            }
        }
    }
}

/// Resolves the `Authorization` header value to an [`AuthSession`].
///
/// Exact-match lookup: the presented token must equal the account's current
/// session token byte for byte. A token rotated out by signout matches
/// nothing from that instant onward, even for requests already in flight.
pub async fn authenticate_bearer(
    store: &dyn AccountStore,
    auth_header: Option<&str>,
) -> Result<AuthSession, AuthError> {
    let header = auth_header.ok_or(AuthError::Unauthenticated)?;
    let token = header
        .strip_prefix("Bearer ")
        .ok_or(AuthError::Unauthenticated)?;

    if token.is_empty() {
        return Err(AuthError::Unauthenticated);
    }

    let account = store
        .find_by_session_token(token)
        .await
        .map_err(|e| AuthError::StoreFailure(e.to_string()))?
        .ok_or(AuthError::Unauthenticated)?;

    Ok(AuthSession {
        account_id: account.id,
        email: account.email,
    })
}

/// Session authentication middleware.
///
/// On success the request proceeds with an [`AuthSession`] extension; on
/// failure the request is rejected with `401 {"errors":["Unauthorized"]}`.
pub async fn session_auth_middleware(
    store: Arc<dyn AccountStore>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    let session = authenticate_bearer(store.as_ref(), auth_header).await?;
    req.extensions_mut().insert(session);

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewAccount;
    use crate::store::InMemoryAccountStore;

    async fn store_with_account(token: &str) -> (InMemoryAccountStore, Uuid) {
        let store = InMemoryAccountStore::new();
        let account = store
            .create_account(NewAccount {
                email: "traveler@example.com".to_string(),
                password_hash: "$argon2id$test".to_string(),
                session_token: token.to_string(),
            })
            .await
            .unwrap();
        (store, account.id)
    }

    #[tokio::test]
    async fn test_authenticate_bearer_success() {
        let (store, account_id) = store_with_account("abc123").await;

        let session = authenticate_bearer(&store, Some("Bearer abc123"))
            .await
            .unwrap();
        assert_eq!(session.account_id, account_id);
        assert_eq!(session.email, "traveler@example.com");
    }

    #[tokio::test]
    async fn test_authenticate_bearer_missing_header() {
        let (store, _) = store_with_account("abc123").await;
        assert!(matches!(
            authenticate_bearer(&store, None).await,
            Err(AuthError::Unauthenticated)
        ));
    }

    #[tokio::test]
    async fn test_authenticate_bearer_wrong_scheme() {
        let (store, _) = store_with_account("abc123").await;
        assert!(matches!(
            authenticate_bearer(&store, Some("Basic abc123")).await,
            Err(AuthError::Unauthenticated)
        ));
    }

    #[tokio::test]
    async fn test_authenticate_bearer_no_partial_match() {
        let (store, _) = store_with_account("abc123").await;
        assert!(matches!(
            authenticate_bearer(&store, Some("Bearer abc")).await,
            Err(AuthError::Unauthenticated)
        ));
        assert!(matches!(
            authenticate_bearer(&store, Some("Bearer abc1234")).await,
            Err(AuthError::Unauthenticated)
        ));
    }

    #[tokio::test]
    async fn test_rotated_token_stops_matching() {
        let (store, account_id) = store_with_account("old-token").await;
        store
            .replace_session_token(account_id, "new-token")
            .await
            .unwrap();

        assert!(matches!(
            authenticate_bearer(&store, Some("Bearer old-token")).await,
            Err(AuthError::Unauthenticated)
        ));
        assert!(authenticate_bearer(&store, Some("Bearer new-token"))
            .await
            .is_ok());
    }
}
