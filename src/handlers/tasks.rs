use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use garde::Validate;
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    error::Result,
    handlers::response::ApiResponse,
    models::{
        session::SessionClaims,
        task::{NewTask, TaskChanges},
    },
    services::tasks as task_service,
    state::AppState,
    validation::{json::ValidatedJson, path::ValidatedPath},
};

/// The request payload for creating a task.
#[derive(Deserialize, Validate)]
pub struct CreateTaskRequest {
    #[garde(length(min = 1, max = 200))]
    pub title: String,
    #[garde(length(max = 1000))]
    pub description: Option<String>,
    #[garde(skip)]
    pub completed: Option<bool>,
}

/// The request payload for updating a task. Absent fields are left unchanged.
#[derive(Deserialize, Validate)]
pub struct UpdateTaskRequest {
    #[garde(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[garde(length(max = 1000))]
    pub description: Option<String>,
    #[garde(skip)]
    pub completed: Option<bool>,
}

impl From<UpdateTaskRequest> for TaskChanges {
    fn from(request: UpdateTaskRequest) -> Self {
        Self {
            title: request.title,
            description: request.description,
            completed: request.completed,
        }
    }
}

/// Lists the caller's tasks.
#[axum::debug_handler]
pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
) -> Result<Response> {
    let tasks = task_service::list_tasks(&state, claims.user_id).await?;
    let count = tasks.len();
    Ok(Json(ApiResponse::data(tasks).with_count(count)).into_response())
}

/// Returns one of the caller's tasks.
#[axum::debug_handler]
pub async fn get_task(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
    ValidatedPath(task_id): ValidatedPath<Uuid>,
) -> Result<Response> {
    let task = task_service::get_task(&state, task_id, claims.user_id).await?;
    Ok(Json(ApiResponse::data(task)).into_response())
}

/// Creates a task owned by the caller.
#[axum::debug_handler]
pub async fn create_task(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
    ValidatedJson(payload): ValidatedJson<CreateTaskRequest>,
) -> Result<Response> {
    let task = task_service::create_task(
        &state,
        NewTask {
            user_id: claims.user_id,
            title: payload.title,
            description: payload.description,
            completed: payload.completed.unwrap_or(false),
        },
    )
    .await?;

    let response = ApiResponse::data(task).with_message("Task created successfully");
    Ok((StatusCode::CREATED, Json(response)).into_response())
}

/// Updates one of the caller's tasks.
#[axum::debug_handler]
pub async fn update_task(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
    ValidatedPath(task_id): ValidatedPath<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateTaskRequest>,
) -> Result<Response> {
    let task = task_service::update_task(&state, task_id, claims.user_id, payload.into()).await?;
    let response = ApiResponse::data(task).with_message("Task updated successfully");
    Ok(Json(response).into_response())
}

/// Deletes one of the caller's tasks and returns it.
#[axum::debug_handler]
pub async fn delete_task(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
    ValidatedPath(task_id): ValidatedPath<Uuid>,
) -> Result<Response> {
    let task = task_service::delete_task(&state, task_id, claims.user_id).await?;
    let response = ApiResponse::data(task).with_message("Task deleted successfully");
    Ok(Json(response).into_response())
}
