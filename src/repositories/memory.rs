use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    models::{
        task::{NewTask, Task, TaskChanges},
        user::{NewUser, User},
    },
    repositories::{task::TaskRepository, user::UserRepository},
};

/// Process-local storage for users and tasks.
///
/// Used by the test suite and when no `DATABASE_URL` is configured. Contents
/// are lost on restart.
#[derive(Clone, Default)]
pub struct MemoryStore {
    users: Arc<RwLock<HashMap<Uuid, User>>>,
    tasks: Arc<RwLock<HashMap<Uuid, Task>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create(&self, new_user: NewUser) -> Result<User> {
        let mut users = self.users.write().await;
        let taken = users
            .values()
            .any(|u| u.email == new_user.email || u.username == new_user.username);
        if taken {
            return Err(AppError::Conflict(
                "User with this email or username already exists".to_string(),
            ));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            username: new_user.username,
            email: new_user.email,
            password_hash: new_user.password_hash,
            role: new_user.role,
            created_at: now,
            updated_at: now,
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn exists_by_email_or_username(&self, email: &str, username: &str) -> Result<bool> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .any(|u| u.email == email || u.username == username))
    }

    async fn list(&self) -> Result<Vec<User>> {
        let mut users: Vec<User> = self.users.read().await.values().cloned().collect();
        users.sort_by_key(|u| u.created_at);
        Ok(users)
    }
}

#[async_trait]
impl TaskRepository for MemoryStore {
    async fn create(&self, new_task: NewTask) -> Result<Task> {
        let now = Utc::now();
        let task = Task {
            id: Uuid::new_v4(),
            user_id: new_task.user_id,
            title: new_task.title,
            description: new_task.description,
            completed: new_task.completed,
            created_at: now,
            updated_at: now,
        };
        self.tasks.write().await.insert(task.id, task.clone());
        Ok(task)
    }

    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Task>> {
        let mut tasks: Vec<Task> = self
            .tasks
            .read()
            .await
            .values()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect();
        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(tasks)
    }

    async fn find_for_user(&self, id: Uuid, user_id: Uuid) -> Result<Option<Task>> {
        Ok(self
            .tasks
            .read()
            .await
            .get(&id)
            .filter(|t| t.user_id == user_id)
            .cloned())
    }

    async fn update_for_user(&self, id: Uuid, user_id: Uuid, changes: TaskChanges) -> Result<Option<Task>> {
        let mut tasks = self.tasks.write().await;
        match tasks.get_mut(&id) {
            Some(task) if task.user_id == user_id => {
                changes.apply(task, Utc::now());
                Ok(Some(task.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn delete_for_user(&self, id: Uuid, user_id: Uuid) -> Result<Option<Task>> {
        let mut tasks = self.tasks.write().await;
        let owned = tasks.get(&id).is_some_and(|t| t.user_id == user_id);
        Ok(if owned { tasks.remove(&id) } else { None })
    }
}
