use async_trait::async_trait;
use deadpool_postgres::Pool;
use tokio_postgres::{Row, error::SqlState};
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    models::user::{NewUser, Role, User},
};

/// Storage for user records.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Inserts a user. Duplicate email or username yields `AppError::Conflict`.
    async fn create(&self, new_user: NewUser) -> Result<User>;
    /// Finds a user by their ID.
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>>;
    /// Finds a user by their email address.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;
    /// Returns `true` if any user already has this email or username.
    async fn exists_by_email_or_username(&self, email: &str, username: &str) -> Result<bool>;
    /// Lists all users, oldest first.
    async fn list(&self) -> Result<Vec<User>>;
}

/// A helper function to map a `tokio_postgres::Row` to a `User`.
fn row_to_user(row: &Row) -> Result<User> {
    let role: String = row.try_get("role").map_err(|_| AppError::MissingData("role".to_string()))?;
    Ok(User {
        id: row.try_get("id").map_err(|_| AppError::MissingData("id".to_string()))?,
        username: row.try_get("username").map_err(|_| AppError::MissingData("username".to_string()))?,
        email: row.try_get("email").map_err(|_| AppError::MissingData("email".to_string()))?,
        password_hash: row.try_get("password").map_err(|_| AppError::MissingData("password".to_string()))?,
        role: role.parse::<Role>().map_err(AppError::MissingData)?,
        created_at: row.try_get("created_at").map_err(|_| AppError::MissingData("created_at".to_string()))?,
        updated_at: row.try_get("updated_at").map_err(|_| AppError::MissingData("updated_at".to_string()))?,
    })
}

/// PostgreSQL-backed user storage.
#[derive(Clone)]
pub struct PgUserRepository {
    pool: Pool,
}

impl PgUserRepository {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create(&self, new_user: NewUser) -> Result<User> {
        let client = self.pool.get().await?;
        let id = Uuid::new_v4();
        let role = new_user.role.as_str();
        let row = client
            .query_one(
                r#"
                INSERT INTO users (id, username, email, password, role)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING id, username, email, password, role, created_at, updated_at
                "#,
                &[&id, &new_user.username, &new_user.email, &new_user.password_hash, &role],
            )
            .await
            .map_err(|e| {
                if e.code() == Some(&SqlState::UNIQUE_VIOLATION) {
                    AppError::Conflict("User with this email or username already exists".to_string())
                } else {
                    AppError::from(e)
                }
            })?;
        row_to_user(&row)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                r#"
                SELECT id, username, email, password, role, created_at, updated_at
                FROM users
                WHERE id = $1
                "#,
                &[&id],
            )
            .await?;
        row.map(|r| row_to_user(&r)).transpose()
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                r#"
                SELECT id, username, email, password, role, created_at, updated_at
                FROM users
                WHERE email = $1
                "#,
                &[&email],
            )
            .await?;
        row.map(|r| row_to_user(&r)).transpose()
    }

    async fn exists_by_email_or_username(&self, email: &str, username: &str) -> Result<bool> {
        let client = self.pool.get().await?;
        let row = client
            .query_one(
                "SELECT EXISTS(SELECT 1 FROM users WHERE email = $1 OR username = $2) AS taken",
                &[&email, &username],
            )
            .await?;
        row.try_get("taken")
            .map_err(|_| AppError::MissingData("taken".to_string()))
    }

    async fn list(&self) -> Result<Vec<User>> {
        let client = self.pool.get().await?;
        let rows = client
            .query(
                r#"
                SELECT id, username, email, password, role, created_at, updated_at
                FROM users
                ORDER BY created_at ASC
                "#,
                &[],
            )
            .await?;
        rows.iter().map(row_to_user).collect()
    }
}
