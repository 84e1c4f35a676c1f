use std::sync::Arc;

use crate::config::Config;
use crate::crypto::envelope::CipherEnvelope;
use crate::error::{AppError, Result};
use crate::repositories::{
    memory::MemoryStore,
    task::{PgTaskRepository, TaskRepository},
    user::{PgUserRepository, UserRepository},
};
use crate::services::token::{TokenAuthenticator, TokenIssuer};

/// The application's state.
///
/// Everything here is immutable after startup and shared by reference, so
/// request handlers read it concurrently without locking.
#[derive(Clone)]
pub struct AppState {
    /// The application's configuration.
    pub config: Arc<Config>,
    /// The cipher envelope shared by the token layer and the transport codec.
    pub cipher: Arc<CipherEnvelope>,
    /// Issues credentials on register/login.
    pub issuer: Arc<TokenIssuer>,
    /// Verifies credentials on protected routes.
    pub authenticator: Arc<TokenAuthenticator>,
    /// User storage.
    pub users: Arc<dyn UserRepository>,
    /// Task storage.
    pub tasks: Arc<dyn TaskRepository>,
}

impl AppState {
    /// Creates a new `AppState`, connecting to PostgreSQL when configured.
    ///
    /// # Arguments
    ///
    /// * `config` - The application's configuration.
    pub async fn new(config: &Config) -> Result<Self> {
        let (users, tasks): (Arc<dyn UserRepository>, Arc<dyn TaskRepository>) =
            match &config.database_url {
                Some(url) => {
                    let pool = crate::db::create_pool(url)?;
                    crate::db::run_migrations(&pool).await?;
                    tracing::info!("✅ PostgreSQL pool initialized");
                    (
                        Arc::new(PgUserRepository::new(pool.clone())),
                        Arc::new(PgTaskRepository::new(pool)),
                    )
                }
                None => {
                    tracing::warn!("⚠️ DATABASE_URL not set, using the in-memory store (data is lost on restart)");
                    let store = MemoryStore::new();
                    (Arc::new(store.clone()), Arc::new(store))
                }
            };

        Self::with_repositories(config, users, tasks)
    }

    /// Creates a new `AppState` over the given repositories.
    pub fn with_repositories(
        config: &Config,
        users: Arc<dyn UserRepository>,
        tasks: Arc<dyn TaskRepository>,
    ) -> Result<Self> {
        let cipher = Arc::new(CipherEnvelope::from_config(config)?);
        if cipher.is_deterministic() {
            tracing::warn!("⚠️ Static IV mode: identical plaintexts produce identical envelopes");
        }
        tracing::info!("✅ Cipher envelope initialized");

        let ttl = chrono::Duration::try_hours(config.token_ttl_hours).ok_or_else(|| {
            AppError::Internal(format!("token TTL of {} hours is out of range", config.token_ttl_hours))
        })?;
        let issuer = Arc::new(TokenIssuer::new(config.jwt_secret.as_bytes(), ttl, cipher.clone()));
        let authenticator = Arc::new(TokenAuthenticator::new(config.jwt_secret.as_bytes(), cipher.clone()));
        tracing::info!("✅ Token issuer and authenticator initialized");

        Ok(AppState {
            config: Arc::new(config.clone()),
            cipher,
            issuer,
            authenticator,
            users,
            tasks,
        })
    }
}
