use axum::{
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::{error::AppError, state::AppState};

/// A middleware that requires a valid bearer credential.
///
/// On success the recovered `SessionClaims` are inserted into the request
/// extensions; on any failure the request is answered with 401 and never
/// reaches the handler.
///
/// # Arguments
///
/// * `state` - The application state.
/// * `request` - The incoming request.
/// * `next` - The next middleware in the chain.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    tracing::debug!("🔐 Checking authentication...");

    let header_value = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    match state.authenticator.authenticate(header_value) {
        Ok(claims) => {
            tracing::debug!("✅ User authenticated: {}", claims.user_id);
            request.extensions_mut().insert(claims);
            next.run(request).await
        }
        Err(kind) => AppError::Auth(kind).into_response(),
    }
}
