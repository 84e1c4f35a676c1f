use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Represents a task owned by a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// The unique identifier for the task.
    pub id: Uuid,
    /// The ID of the user who owns the task.
    pub user_id: Uuid,
    /// The task title.
    pub title: String,
    /// An optional free-form description.
    pub description: Option<String>,
    /// Whether the task is done.
    pub completed: bool,
    /// The timestamp when the task was created.
    pub created_at: DateTime<Utc>,
    /// The timestamp when the task was last updated.
    pub updated_at: DateTime<Utc>,
}

/// The fields needed to insert a task.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub user_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub completed: bool,
}

/// A partial update. `None` leaves the stored value unchanged.
#[derive(Debug, Clone, Default)]
pub struct TaskChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub completed: Option<bool>,
}

impl TaskChanges {
    /// Applies the provided fields to `task` and bumps `updated_at`.
    pub fn apply(&self, task: &mut Task, now: DateTime<Utc>) {
        if let Some(title) = &self.title {
            task.title = title.clone();
        }
        if let Some(description) = &self.description {
            task.description = Some(description.clone());
        }
        if let Some(completed) = self.completed {
            task.completed = completed;
        }
        task.updated_at = now;
    }
}
