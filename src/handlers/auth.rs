use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    error::Result,
    jobs::blocking,
    models::account::AccountProfile,
    services::auth::AuthContext,
    state::AppState,
    validation::auth::{EmailAddress, SignupRequest, ValidationError},
};

/// The request payload for login.
#[derive(Deserialize)]
pub struct LoginRequest {
    /// Username or email.
    #[serde(alias = "username")]
    pub identifier: String,
    pub password: String,
}

/// The request payload for changing a user's password.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

/// The response payload for authentication-related requests.
#[derive(Serialize)]
pub struct AuthResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account: Option<AccountProfile>,
}

impl AuthResponse {
    fn ok(message: &str, account: Option<AccountProfile>) -> Self {
        Self {
            success: true,
            message: message.to_string(),
            account,
        }
    }
}

/// The response payload for the session query.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account: Option<AccountProfile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Handles login.
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Response> {
    if payload.identifier.trim().is_empty() || payload.password.is_empty() {
        return Err(ValidationError::MissingField("all fields".to_string()).into());
    }

    let auth = state.auth.clone();
    let ctx = blocking(move || auth.login(&payload.identifier, &payload.password)).await?;

    let response = AuthResponse::ok("Login successful!", Some(AccountProfile::from(&ctx.account)));
    Ok((StatusCode::OK, Json(response)).into_response())
}

/// Handles signup. A successful signup is also logged in.
pub async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<SignupRequest>,
) -> Result<Response> {
    let auth = state.auth.clone();
    let ctx = blocking(move || auth.signup(payload)).await?;

    let response = AuthResponse::ok(
        "Account created successfully!",
        Some(AccountProfile::from(&ctx.account)),
    );
    Ok((StatusCode::CREATED, Json(response)).into_response())
}

/// Handles logout. Succeeds whether or not anyone was logged in.
pub async fn logout(State(state): State<AppState>) -> Result<Response> {
    let auth = state.auth.clone();
    blocking(move || auth.logout()).await?;

    let response = AuthResponse::ok("Logged out successfully", None);
    Ok((StatusCode::OK, Json(response)).into_response())
}

/// Reports whether this browser context is logged in.
pub async fn session(State(state): State<AppState>) -> Result<Json<SessionResponse>> {
    let auth = state.auth.clone();
    let response = match blocking(move || auth.current()).await? {
        Some(ctx) => SessionResponse {
            authenticated: true,
            account: Some(AccountProfile::from(&ctx.account)),
            expires_at: Some(ctx.session.expires_at),
        },
        None => SessionResponse {
            authenticated: false,
            account: None,
            expires_at: None,
        },
    };

    Ok(Json(response))
}

/// Accepts a password reset request.
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(payload): Json<EmailAddress>,
) -> Result<Json<AuthResponse>> {
    let auth = state.auth.clone();
    blocking(move || auth.request_password_reset(&payload.email)).await?;

    Ok(Json(AuthResponse::ok(
        "Password reset instructions sent to your email",
        None,
    )))
}

/// Handles changing the logged-in user's password.
pub async fn change_password(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<Json<AuthResponse>> {
    let auth = state.auth.clone();
    let account = blocking(move || {
        auth.change_password(&ctx, &payload.old_password, &payload.new_password)
    })
    .await?;

    Ok(Json(AuthResponse::ok(
        "Password changed successfully",
        Some(AccountProfile::from(&account)),
    )))
}
