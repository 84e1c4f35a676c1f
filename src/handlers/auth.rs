use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use garde::Validate;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::{
    error::{AppError, Result},
    handlers::response::ApiResponse,
    models::{session::SessionClaims, user::PublicUser},
    services::auth::{self as auth_service, AuthOutcome},
    state::AppState,
    validation::json::ValidatedJson,
};

/// The request payload for user registration.
#[derive(Deserialize, Validate)]
pub struct RegisterRequest {
    #[garde(length(min = 1, max = 50))]
    pub username: String,
    #[garde(email)]
    pub email: String,
    #[garde(length(min = 1, max = 128))]
    pub password: String,
}

/// The request payload for user login.
#[derive(Deserialize, Validate)]
pub struct LoginRequest {
    #[garde(email)]
    pub email: String,
    #[garde(length(min = 1, max = 128))]
    pub password: String,
}

/// The `data` of a register/login response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthData {
    pub user: PublicUser,
    pub token: String,
    pub token_type: &'static str,
}

impl From<AuthOutcome> for AuthData {
    fn from(outcome: AuthOutcome) -> Self {
        Self {
            user: PublicUser::from(&outcome.user),
            token: outcome.token,
            token_type: "Bearer",
        }
    }
}

#[derive(Serialize)]
pub struct UserData<T: Serialize> {
    pub user: T,
}

/// Handles user registration.
#[axum::debug_handler]
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<RegisterRequest>,
) -> Result<Response> {
    tracing::info!("📝 Register attempt for: {}", payload.username);

    let outcome = auth_service::register(
        &state,
        payload.username,
        payload.email,
        Zeroizing::new(payload.password),
    )
    .await?;

    tracing::info!("✅ User registered: {}", outcome.user.id);

    let response = ApiResponse::data(AuthData::from(outcome)).with_message("User registered successfully");
    Ok((StatusCode::CREATED, Json(response)).into_response())
}

/// Handles user login.
#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<LoginRequest>,
) -> Result<Response> {
    tracing::info!("🔐 Login attempt");

    let outcome = auth_service::login(&state, payload.email, Zeroizing::new(payload.password)).await?;

    tracing::info!("✅ User logged in: {}", outcome.user.id);

    let response = ApiResponse::data(AuthData::from(outcome)).with_message("Login successful");
    Ok((StatusCode::OK, Json(response)).into_response())
}

/// Returns the stored profile of the authenticated user.
#[axum::debug_handler]
pub async fn profile(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
) -> Result<Response> {
    let user = state
        .users
        .find_by_id(claims.user_id)
        .await?
        .ok_or(AppError::NotFound("User"))?;

    let response = ApiResponse::data(UserData {
        user: PublicUser::from(&user),
    });
    Ok(Json(response).into_response())
}

/// Echoes the verified claims of the presented credential.
#[axum::debug_handler]
pub async fn verify(Extension(claims): Extension<SessionClaims>) -> Response {
    let response = ApiResponse::data(UserData { user: claims }).with_message("Token is valid");
    Json(response).into_response()
}
