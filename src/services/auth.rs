use zeroize::Zeroizing;

use crate::crypto::password::{hash_password, verify_password};
use crate::error::{AppError, Result};
use crate::models::user::{NewUser, Role, User};
use crate::state::AppState;

/// A user together with the credential just issued for them.
pub struct AuthOutcome {
    pub user: User,
    pub token: String,
}

/// Lowercases and trims an email so lookups are case-insensitive.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Creates a new user and issues their first credential.
///
/// New accounts always get `Role::User`.
pub async fn register(
    state: &AppState,
    username: String,
    email: String,
    password: Zeroizing<String>,
) -> Result<AuthOutcome> {
    let username = username.trim().to_string();
    let email = normalize_email(&email);
    tracing::debug!("🔐 Creating user: {}", username);

    if state.users.exists_by_email_or_username(&email, &username).await? {
        return Err(AppError::Conflict(
            "User with this email or username already exists".to_string(),
        ));
    }

    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| AppError::Internal(format!("Hashing task failed: {}", e)))??;

    let user = state
        .users
        .create(NewUser {
            username,
            email,
            password_hash,
            role: Role::User,
        })
        .await?;
    tracing::info!("✅ User created with ID: {}", user.id);

    let token = state.issuer.issue(&user)?;
    Ok(AuthOutcome { user, token })
}

/// Checks an email/password pair and issues a credential.
///
/// Unknown email and wrong password are indistinguishable to the caller.
pub async fn login(state: &AppState, email: String, password: Zeroizing<String>) -> Result<AuthOutcome> {
    let email = normalize_email(&email);

    let user = state
        .users
        .find_by_email(&email)
        .await?
        .ok_or(AppError::InvalidLogin)?;

    let hash = user.password_hash.clone();
    let valid = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| AppError::Internal(format!("Verification task failed: {}", e)))??;

    if !valid {
        return Err(AppError::InvalidLogin);
    }

    tracing::info!("✅ User authenticated: {}", user.id);
    let token = state.issuer.issue(&user)?;
    Ok(AuthOutcome { user, token })
}
