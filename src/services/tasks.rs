use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::task::{NewTask, Task, TaskChanges};
use crate::state::AppState;

pub async fn list_tasks(state: &AppState, user_id: Uuid) -> Result<Vec<Task>> {
    state.tasks.list_by_user(user_id).await
}

pub async fn get_task(state: &AppState, task_id: Uuid, user_id: Uuid) -> Result<Task> {
    state
        .tasks
        .find_for_user(task_id, user_id)
        .await?
        .ok_or(AppError::NotFound("Task"))
}

pub async fn create_task(state: &AppState, new_task: NewTask) -> Result<Task> {
    let task = state.tasks.create(new_task).await?;
    tracing::info!("✅ Task created: {} (user {})", task.id, task.user_id);
    Ok(task)
}

pub async fn update_task(
    state: &AppState,
    task_id: Uuid,
    user_id: Uuid,
    changes: TaskChanges,
) -> Result<Task> {
    let task = state
        .tasks
        .update_for_user(task_id, user_id, changes)
        .await?
        .ok_or(AppError::NotFound("Task"))?;
    tracing::info!("✅ Task updated: {}", task.id);
    Ok(task)
}

pub async fn delete_task(state: &AppState, task_id: Uuid, user_id: Uuid) -> Result<Task> {
    let task = state
        .tasks
        .delete_for_user(task_id, user_id)
        .await?
        .ok_or(AppError::NotFound("Task"))?;
    tracing::info!("🗑️ Task deleted: {}", task.id);
    Ok(task)
}
