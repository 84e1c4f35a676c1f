use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::user::Role;

/// The verified identity recovered from a bearer credential.
///
/// Signed once by the token issuer and never mutated afterwards. The
/// authenticator places it in request extensions for the rest of the request;
/// nothing is persisted server-side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionClaims {
    /// The subject: the user's ID.
    pub user_id: Uuid,
    pub username: String,
    pub email: String,
    pub role: Role,
    /// Issued-at, seconds since the Unix epoch.
    pub iat: i64,
    /// Expiry, seconds since the Unix epoch.
    pub exp: i64,
}

impl SessionClaims {
    /// Returns `true` if the claims may act on resources owned by `user_id`.
    pub fn can_access(&self, user_id: Uuid) -> bool {
        self.user_id == user_id || self.role == Role::Admin
    }
}
