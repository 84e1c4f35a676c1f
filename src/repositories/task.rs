use async_trait::async_trait;
use deadpool_postgres::Pool;
use tokio_postgres::Row;
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    models::task::{NewTask, Task, TaskChanges},
};

/// Storage for task records. Every lookup is scoped to the owning user.
#[async_trait]
pub trait TaskRepository: Send + Sync {
    async fn create(&self, new_task: NewTask) -> Result<Task>;
    /// Lists a user's tasks, newest first.
    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Task>>;
    async fn find_for_user(&self, id: Uuid, user_id: Uuid) -> Result<Option<Task>>;
    /// Applies `changes` and returns the updated task, or `None` if the user has no such task.
    async fn update_for_user(&self, id: Uuid, user_id: Uuid, changes: TaskChanges) -> Result<Option<Task>>;
    /// Deletes and returns the task, or `None` if the user has no such task.
    async fn delete_for_user(&self, id: Uuid, user_id: Uuid) -> Result<Option<Task>>;
}

fn row_to_task(row: &Row) -> Result<Task> {
    Ok(Task {
        id: row.try_get("id").map_err(|_| AppError::MissingData("id".to_string()))?,
        user_id: row.try_get("user_id").map_err(|_| AppError::MissingData("user_id".to_string()))?,
        title: row.try_get("title").map_err(|_| AppError::MissingData("title".to_string()))?,
        description: row.try_get("description").map_err(|_| AppError::MissingData("description".to_string()))?,
        completed: row.try_get("completed").map_err(|_| AppError::MissingData("completed".to_string()))?,
        created_at: row.try_get("created_at").map_err(|_| AppError::MissingData("created_at".to_string()))?,
        updated_at: row.try_get("updated_at").map_err(|_| AppError::MissingData("updated_at".to_string()))?,
    })
}

/// PostgreSQL-backed task storage.
#[derive(Clone)]
pub struct PgTaskRepository {
    pool: Pool,
}

impl PgTaskRepository {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TaskRepository for PgTaskRepository {
    async fn create(&self, new_task: NewTask) -> Result<Task> {
        let client = self.pool.get().await?;
        let id = Uuid::new_v4();
        let row = client
            .query_one(
                r#"
                INSERT INTO tasks (id, user_id, title, description, completed)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING id, user_id, title, description, completed, created_at, updated_at
                "#,
                &[
                    &id,
                    &new_task.user_id,
                    &new_task.title,
                    &new_task.description,
                    &new_task.completed,
                ],
            )
            .await?;
        row_to_task(&row)
    }

    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Task>> {
        let client = self.pool.get().await?;
        let rows = client
            .query(
                r#"
                SELECT id, user_id, title, description, completed, created_at, updated_at
                FROM tasks
                WHERE user_id = $1
                ORDER BY created_at DESC
                "#,
                &[&user_id],
            )
            .await?;
        rows.iter().map(row_to_task).collect()
    }

    async fn find_for_user(&self, id: Uuid, user_id: Uuid) -> Result<Option<Task>> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                r#"
                SELECT id, user_id, title, description, completed, created_at, updated_at
                FROM tasks
                WHERE id = $1 AND user_id = $2
                "#,
                &[&id, &user_id],
            )
            .await?;
        row.map(|r| row_to_task(&r)).transpose()
    }

    async fn update_for_user(&self, id: Uuid, user_id: Uuid, changes: TaskChanges) -> Result<Option<Task>> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                r#"
                UPDATE tasks
                SET
                    title = COALESCE($3, title),
                    description = COALESCE($4, description),
                    completed = COALESCE($5, completed),
                    updated_at = NOW()
                WHERE id = $1 AND user_id = $2
                RETURNING id, user_id, title, description, completed, created_at, updated_at
                "#,
                &[&id, &user_id, &changes.title, &changes.description, &changes.completed],
            )
            .await?;
        row.map(|r| row_to_task(&r)).transpose()
    }

    async fn delete_for_user(&self, id: Uuid, user_id: Uuid) -> Result<Option<Task>> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                r#"
                DELETE FROM tasks
                WHERE id = $1 AND user_id = $2
                RETURNING id, user_id, title, description, completed, created_at, updated_at
                "#,
                &[&id, &user_id],
            )
            .await?;
        row.map(|r| row_to_task(&r)).transpose()
    }
}
