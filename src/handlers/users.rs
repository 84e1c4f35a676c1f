use axum::{
    Extension, Json,
    extract::State,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    error::Result,
    handlers::response::ApiResponse,
    models::{
        session::SessionClaims,
        task::Task,
        user::{PublicUser, UserSummary},
    },
    services::users as user_service,
    state::AppState,
    validation::path::ValidatedPath,
};

/// A user's tasks together with a summary of the user.
#[derive(Serialize)]
pub struct UserTasksResponse {
    pub success: bool,
    pub count: usize,
    pub user: UserSummary,
    pub data: Vec<Task>,
}

/// Lists all users. Admin only.
#[axum::debug_handler]
pub async fn list_users(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
) -> Result<Response> {
    let users: Vec<PublicUser> = user_service::list_users(&state, &claims)
        .await?
        .iter()
        .map(PublicUser::from)
        .collect();
    let count = users.len();
    Ok(Json(ApiResponse::data(users).with_count(count)).into_response())
}

/// Returns a single user.
#[axum::debug_handler]
pub async fn get_user(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
    ValidatedPath(user_id): ValidatedPath<Uuid>,
) -> Result<Response> {
    let user = user_service::get_user(&state, &claims, user_id).await?;
    Ok(Json(ApiResponse::data(PublicUser::from(&user))).into_response())
}

/// Returns a user's tasks, newest first.
#[axum::debug_handler]
pub async fn get_user_tasks(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
    ValidatedPath(user_id): ValidatedPath<Uuid>,
) -> Result<Response> {
    let (user, tasks) = user_service::get_user_tasks(&state, &claims, user_id).await?;
    let response = UserTasksResponse {
        success: true,
        count: tasks.len(),
        user: UserSummary::from(&user),
        data: tasks,
    };
    Ok(Json(response).into_response())
}
