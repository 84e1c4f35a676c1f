use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};

use crate::{
    crypto::envelope::CipherEnvelope,
    error::{AppError, AuthError, Result},
    models::{session::SessionClaims, user::User},
};

/// The scheme prefix expected in the `Authorization` header.
pub const BEARER_PREFIX: &str = "Bearer ";

/// Signs session claims and seals the resulting JWT in the cipher envelope.
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    ttl: Duration,
    cipher: Arc<CipherEnvelope>,
}

impl TokenIssuer {
    pub fn new(secret: &[u8], ttl: Duration, cipher: Arc<CipherEnvelope>) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            ttl,
            cipher,
        }
    }

    /// Issues a credential for `user`, valid from now.
    pub fn issue(&self, user: &User) -> Result<String> {
        self.issue_at(user, Utc::now())
    }

    /// Issues a credential for `user` as if the current time were `now`.
    pub fn issue_at(&self, user: &User, now: DateTime<Utc>) -> Result<String> {
        let expires_at = now
            .checked_add_signed(self.ttl)
            .ok_or_else(|| AppError::Internal("token expiry is out of range".to_string()))?;

        let claims = SessionClaims {
            user_id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            role: user.role,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        let jwt = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("JWT signing failed: {}", e)))?;

        let credential = self.cipher.encrypt(&jwt)?;
        tracing::debug!("🔑 Credential issued for user: {}", user.id);
        Ok(credential)
    }
}

/// Reverses [`TokenIssuer`]: opens the envelope, then verifies the JWT.
pub struct TokenAuthenticator {
    decoding_key: DecodingKey,
    validation: Validation,
    cipher: Arc<CipherEnvelope>,
}

impl TokenAuthenticator {
    pub fn new(secret: &[u8], cipher: Arc<CipherEnvelope>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is compared against an explicit clock in `authenticate_at`.
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        Self {
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            cipher,
        }
    }

    /// Authenticates the raw `Authorization` header value against the current time.
    pub fn authenticate(&self, header: Option<&str>) -> std::result::Result<SessionClaims, AuthError> {
        self.authenticate_at(header, Utc::now())
    }

    /// Authenticates the raw `Authorization` header value as if the current time were `now`.
    pub fn authenticate_at(
        &self,
        header: Option<&str>,
        now: DateTime<Utc>,
    ) -> std::result::Result<SessionClaims, AuthError> {
        let credential = header
            .and_then(|value| value.strip_prefix(BEARER_PREFIX))
            .ok_or(AuthError::MissingCredential)?
            .trim();

        let jwt = self.cipher.decrypt(credential).map_err(|e| {
            tracing::warn!("❌ Credential decryption failed: {}", e);
            AuthError::InvalidCredential
        })?;

        if jwt.trim().is_empty() {
            tracing::warn!("❌ Credential decrypted to an empty token");
            return Err(AuthError::InvalidCredential);
        }

        let claims = decode::<SessionClaims>(&jwt, &self.decoding_key, &self.validation)
            .map_err(|e| {
                tracing::warn!("❌ Token verification failed: {}", e);
                AuthError::InvalidSignature
            })?
            .claims;

        if now.timestamp() > claims.exp {
            tracing::warn!("❌ Token expired for user: {}", claims.user_id);
            return Err(AuthError::ExpiredCredential);
        }

        Ok(claims)
    }
}
