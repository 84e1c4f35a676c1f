use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::{
    session::SessionClaims,
    task::Task,
    user::{Role, User},
};
use crate::state::AppState;

/// Lists every user. Admin only.
pub async fn list_users(state: &AppState, caller: &SessionClaims) -> Result<Vec<User>> {
    if caller.role != Role::Admin {
        return Err(AppError::Forbidden);
    }
    state.users.list().await
}

/// Loads a user the caller is allowed to see: themselves, or anyone for admins.
pub async fn get_user(state: &AppState, caller: &SessionClaims, user_id: Uuid) -> Result<User> {
    if !caller.can_access(user_id) {
        return Err(AppError::Forbidden);
    }
    state
        .users
        .find_by_id(user_id)
        .await?
        .ok_or(AppError::NotFound("User"))
}

/// Loads a user and their tasks, newest first.
pub async fn get_user_tasks(
    state: &AppState,
    caller: &SessionClaims,
    user_id: Uuid,
) -> Result<(User, Vec<Task>)> {
    let user = get_user(state, caller, user_id).await?;
    let tasks = state.tasks.list_by_user(user.id).await?;
    Ok((user, tasks))
}
