/// JWT Claims structure
///
/// Payload of a session token: the username as subject, the role claim with
/// its `ROLE_` prefix, and the standard RFC 7519 timing claims.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::users::Role;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (username)
    pub sub: String,
    /// Role claim, e.g. `ROLE_TENANT`
    pub role: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Issuer
    pub iss: String,
    /// Token id; keeps two tokens issued in the same second distinct
    pub jti: String,
}

impl Claims {
    pub fn new(username: &str, role: Role, expiry_seconds: i64, issuer: String) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            sub: username.to_string(),
            role: role.authority(),
            exp: now + expiry_seconds,
            iat: now,
            iss: issuer,
            jti: Uuid::new_v4().to_string(),
        }
    }

    /// Role named by the claim, if it carries a known authority
    pub fn role(&self) -> Option<Role> {
        Role::from_authority(&self.role)
    }
}
