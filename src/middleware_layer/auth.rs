use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};

use crate::{error::AppError, jobs::blocking, state::AppState};

/// A middleware that requires a valid current session.
///
/// The resolved `AuthContext` is placed in the request extensions for the
/// handler.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    tracing::debug!("🔐 Checking authentication...");

    let auth = state.auth.clone();
    let ctx = blocking(move || auth.require_current()).await?;

    tracing::debug!("✅ User authenticated: {}", ctx.account.id);

    request.extensions_mut().insert(ctx);

    Ok(next.run(request).await)
}
