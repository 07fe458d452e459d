/// Authentication Gate
///
/// Turns an optional bearer token into a [`RequestIdentity`]. Every token
/// problem degrades to anonymous; only an unreachable session store is an
/// error, since liveness cannot be decided without it.

use crate::auth::identity::{Principal, RequestIdentity};
use crate::auth::jwt::TokenService;
use crate::error::SessionError;
use crate::session::SessionRegistry;

const BEARER_PREFIX: &str = "Bearer ";

/// Token part of an `Authorization: Bearer <token>` header value
pub fn bearer_token(header: &str) -> Option<&str> {
    header
        .strip_prefix(BEARER_PREFIX)
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

#[derive(Clone)]
pub struct AuthenticationGate {
    tokens: TokenService,
    sessions: SessionRegistry,
}

impl AuthenticationGate {
    pub fn new(tokens: TokenService, sessions: SessionRegistry) -> Self {
        Self { tokens, sessions }
    }

    pub async fn authenticate(&self, token: Option<&str>) -> Result<RequestIdentity, SessionError> {
        let Some(token) = token else {
            return Ok(RequestIdentity::Anonymous);
        };

        if !self.sessions.is_live(token).await? {
            tracing::warn!("Token not found in session registry or has been invalidated");
            return Ok(RequestIdentity::Anonymous);
        }

        let verified = match self.tokens.verify(token) {
            Ok(verified) => verified,
            Err(e) => {
                tracing::error!(error = %e, "Could not set user authentication");
                return Ok(RequestIdentity::Anonymous);
            }
        };

        self.sessions.extend(token).await?;

        tracing::debug!(
            username = %verified.username,
            role = %verified.role,
            "Set authentication for user"
        );
        Ok(RequestIdentity::Authenticated(Principal {
            username: verified.username,
            role: verified.role,
        }))
    }
}
