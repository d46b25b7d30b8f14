/// Account and session endpoints
///
/// # Endpoints
///
/// - `POST /signup` - Create an account, returns its first session token
/// - `POST /signin` - Exchange credentials for the current session token
/// - `DELETE /signout` - Rotate the session token, ending the session
///
/// Tokens are opaque random strings, not self-validating claims; every
/// request is checked against the store, so signout takes effect instantly.
use axum::{extract::State, http::StatusCode, Extension, Json};
use serde::{Deserialize, Serialize};
use validator::Validate;

use wayfarer_shared::auth::middleware::AuthSession;
use wayfarer_shared::auth::password::{hash_password, verify_password};
use wayfarer_shared::auth::token::generate_session_token;
use wayfarer_shared::models::{normalize_email, NewAccount};

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};

/// Signup request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    /// Email address (normalized before validation and storage)
    #[validate(email(message = "Email is invalid"))]
    pub email: String,

    /// Password
    #[validate(length(min = 8, message = "Password is too short (minimum is 8 characters)"))]
    pub password: String,

    /// Must match `password` exactly
    pub password_confirmation: String,
}

/// Signin request
#[derive(Debug, Deserialize)]
pub struct SigninRequest {
    /// Email address
    pub email: String,

    /// Password
    pub password: String,
}

/// Session response, shared by signup and signin
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    /// Bearer token for subsequent requests
    pub token: String,

    /// Normalized account email
    pub email: String,
}

fn validation_messages(errors: &validator::ValidationErrors) -> Vec<String> {
    let mut messages: Vec<String> = errors
        .field_errors()
        .values()
        .flat_map(|field| field.iter())
        .filter_map(|error| error.message.as_ref().map(|m| m.to_string()))
        .collect();
    messages.sort();
    messages
}

/// Create an account
///
/// # Endpoint
///
/// ```text
/// POST /signup
/// Content-Type: application/json
///
/// {
///   "email": "traveler@example.com",
///   "password": "wanderlust",
///   "passwordConfirmation": "wanderlust"
/// }
/// ```
///
/// # Errors
///
/// - `422 Unprocessable Entity`: invalid email, short password, mismatched
///   confirmation, or the email is already taken
pub async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> ApiResult<(StatusCode, Json<SessionResponse>)> {
    // Normalize before validating so "  User@X.COM " and "user@x.com" are
    // the same account.
    let req = SignupRequest {
        email: normalize_email(&req.email),
        ..req
    };

    let mut errors = req
        .validate()
        .map(|()| Vec::new())
        .unwrap_or_else(|e| validation_messages(&e));
    if req.password != req.password_confirmation {
        errors.push("Password confirmation doesn't match Password".to_string());
    }
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    let password_hash = hash_password(&req.password)?;
    let token = generate_session_token();

    let account = state
        .store
        .create_account(NewAccount {
            email: req.email,
            password_hash,
            session_token: token.clone(),
        })
        .await?;

    tracing::info!(account_id = %account.id, "Account created");

    Ok((
        StatusCode::CREATED,
        Json(SessionResponse {
            token,
            email: account.email,
        }),
    ))
}

/// Exchange credentials for the current session token
///
/// Failed lookups and failed password checks produce the same 401 body, so
/// the response does not reveal which emails exist.
///
/// # Errors
///
/// - `401 Unauthorized`: unknown email or wrong password
pub async fn signin(
    State(state): State<AppState>,
    Json(req): Json<SigninRequest>,
) -> ApiResult<Json<SessionResponse>> {
    let email = normalize_email(&req.email);
    let invalid = || ApiError::Unauthorized("Invalid email or password".to_string());

    let account = state
        .store
        .find_by_email(&email)
        .await?
        .ok_or_else(invalid)?;

    if !verify_password(&req.password, &account.password_hash)? {
        return Err(invalid());
    }

    Ok(Json(SessionResponse {
        token: account.session_token,
        email: account.email,
    }))
}

/// Rotate the session token, ending the session
///
/// The stored token is replaced with a fresh one that is never revealed, so
/// the presented token (and any copies of it) stop matching immediately.
/// Always `204 No Content` for an authenticated caller.
pub async fn signout(
    State(state): State<AppState>,
    Extension(session): Extension<AuthSession>,
) -> ApiResult<StatusCode> {
    let replaced = state
        .store
        .replace_session_token(session.account_id, &generate_session_token())
        .await?;

    if !replaced {
        // Authenticated a moment ago but gone now; nothing left to revoke.
        tracing::warn!(account_id = %session.account_id, "Signout for deleted account");
    }

    Ok(StatusCode::NO_CONTENT)
}
