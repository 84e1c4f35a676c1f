use axum::{
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::crypto::envelope::CipherError;

/// Why a bearer credential was refused.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    /// No `Authorization` header, or not a `Bearer` one.
    #[error("missing credential")]
    MissingCredential,
    /// The envelope could not be opened, or opened into nothing usable.
    #[error("invalid credential")]
    InvalidCredential,
    /// The decrypted token failed signature verification.
    #[error("invalid signature")]
    InvalidSignature,
    /// The token verified but its `exp` is in the past.
    #[error("expired credential")]
    ExpiredCredential,
}

impl AuthError {
    /// The message shown to clients. Detail stays in the server log.
    pub fn public_message(&self) -> &'static str {
        match self {
            AuthError::MissingCredential => "Access denied. No token provided.",
            AuthError::InvalidCredential => "Invalid encrypted token",
            AuthError::InvalidSignature | AuthError::ExpiredCredential => "Invalid token",
        }
    }
}

/// The application's error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// A database error.
    #[error("Database error: {0}")]
    Database(#[from] tokio_postgres::Error),

    /// A connection pool error.
    #[error("Pool error: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),

    /// A row was missing an expected column.
    #[error("Missing data: {0}")]
    MissingData(String),

    /// A bearer credential was refused.
    #[error("Authentication failed: {0}")]
    Auth(#[from] AuthError),

    /// Login with an unknown email or a wrong password.
    #[error("Invalid email or password")]
    InvalidLogin,

    /// The caller is authenticated but may not touch the resource.
    #[error("Forbidden")]
    Forbidden,

    /// A resource not found error.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// A validation error.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A uniqueness constraint was violated.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// An `encryptedData` body that could not be opened or parsed.
    #[error("Malformed encrypted body: {0}")]
    MalformedEncryptedBody(String),

    /// The request body exceeded the configured limit or could not be read.
    #[error("Payload too large")]
    PayloadTooLarge,

    /// A cipher envelope error.
    #[error("Cipher error: {0}")]
    Cipher(#[from] CipherError),

    /// An internal server error.
    #[error("Internal server error: {0}")]
    Internal(String),
}

/// A `Result` type that uses `AppError` as the error type.
pub type Result<T> = std::result::Result<T, AppError>;

/// Builds the `{"success": false, "message": ...}` body every failure uses.
pub fn failure_response(status: StatusCode, message: &str) -> Response {
    let body = sonic_rs::to_string(&sonic_rs::json!({
        "success": false,
        "message": message
    }))
    .unwrap_or_else(|_| r#"{"success":false,"message":"Internal server error"}"#.to_string());

    (status, [(header::CONTENT_TYPE, "application/json")], body).into_response()
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Database(ref e) => {
                tracing::error!("Database error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Database error".to_string())
            }

            AppError::Pool(ref e) => {
                tracing::error!("Pool error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Database error".to_string())
            }

            AppError::MissingData(ref column) => {
                tracing::error!("Missing column in row: {}", column);
                (StatusCode::INTERNAL_SERVER_ERROR, "Database error".to_string())
            }

            AppError::Auth(kind) => {
                tracing::warn!(kind = ?kind, "Authentication failed");
                (StatusCode::UNAUTHORIZED, kind.public_message().to_string())
            }

            AppError::InvalidLogin => {
                tracing::warn!("Login rejected");
                (StatusCode::UNAUTHORIZED, "Invalid email or password".to_string())
            }

            AppError::Forbidden => {
                tracing::warn!("Authorization failed");
                (StatusCode::FORBIDDEN, "Forbidden".to_string())
            }

            AppError::NotFound(what) => {
                tracing::debug!("{} not found", what);
                (StatusCode::NOT_FOUND, format!("{} not found", what))
            }

            AppError::Validation(ref msg) => {
                tracing::debug!("Validation error: {}", msg);
                (StatusCode::BAD_REQUEST, msg.clone())
            }

            AppError::Conflict(ref msg) => {
                tracing::debug!("Conflict: {}", msg);
                (StatusCode::BAD_REQUEST, msg.clone())
            }

            AppError::MalformedEncryptedBody(ref msg) => {
                tracing::warn!("Request decryption error: {}", msg);
                (StatusCode::BAD_REQUEST, "Invalid encrypted request data".to_string())
            }

            AppError::PayloadTooLarge => {
                tracing::warn!("Request body rejected: too large");
                (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large".to_string())
            }

            AppError::Cipher(ref e) => {
                tracing::error!("Cipher error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Encryption error".to_string())
            }

            AppError::Internal(ref msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        failure_response(status, &message)
    }
}
