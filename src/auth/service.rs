/// Login and logout.
///
/// Login checks credentials against the credential store, issues a token and
/// records it in the session registry. Logout revokes the user's most recent
/// session.

use std::sync::Arc;

use serde::Serialize;

use crate::auth::jwt::TokenService;
use crate::auth::password::verify_password;
use crate::error::{AppError, AuthError};
use crate::session::SessionRegistry;
use crate::users::CredentialStore;

#[derive(Debug, Serialize)]
pub struct UserDto {
    pub username: String,
    pub role: String,
}

/// Response body of a successful login
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserDto,
}

pub struct AuthService {
    users: Arc<dyn CredentialStore>,
    tokens: TokenService,
    sessions: SessionRegistry,
}

impl AuthService {
    pub fn new(users: Arc<dyn CredentialStore>, tokens: TokenService, sessions: SessionRegistry) -> Self {
        Self {
            users,
            tokens,
            sessions,
        }
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    /// # Errors
    /// `InvalidCredentials` for an unknown user or a wrong password; no token
    /// is issued in either case.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<AuthResponse, AppError> {
        tracing::debug!(username = %username, "Attempting to authenticate user");

        let user = self.users.find_by_username(username).await?.ok_or_else(|| {
            tracing::warn!(username = %username, "User not found");
            AppError::Auth(AuthError::InvalidCredentials)
        })?;

        if !verify_password(password, &user.password_hash)? {
            tracing::warn!(username = %username, "Invalid password for user");
            return Err(AppError::Auth(AuthError::InvalidCredentials));
        }

        let token = self.tokens.issue(&user.username, user.role)?;
        self.sessions.store(&user.username, &token).await?;

        tracing::info!(username = %user.username, "User authenticated successfully");
        Ok(AuthResponse {
            token,
            user: UserDto {
                username: user.username,
                role: user.role.as_str().to_string(),
            },
        })
    }

    pub async fn logout(&self, username: &str) -> Result<(), AppError> {
        self.sessions.invalidate(username).await?;
        tracing::info!(username = %username, "User logged out successfully");
        Ok(())
    }
}
