/// Request identity
///
/// The gate inserts exactly one [`RequestIdentity`] into each request's
/// extensions before any handler runs. Handlers never mutate it; they read it
/// through the [`Authenticated`] and [`AdminPrincipal`] extractors, which are
/// the only place unauthenticated or under-privileged requests are rejected.

use actix_web::dev::Payload;
use actix_web::{FromRequest, HttpMessage, HttpRequest};
use std::future::{ready, Ready};

use crate::error::{AppError, AuthError};
use crate::users::Role;

/// Authenticated caller: principal name plus the authority from the role claim
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub username: String,
    pub role: Role,
}

impl Principal {
    pub fn authorities(&self) -> Vec<String> {
        vec![self.role.authority()]
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.role == role
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestIdentity {
    Anonymous,
    Authenticated(Principal),
}

impl RequestIdentity {
    pub fn principal(&self) -> Option<&Principal> {
        match self {
            RequestIdentity::Anonymous => None,
            RequestIdentity::Authenticated(principal) => Some(principal),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.principal().is_some()
    }
}

fn identity_of(req: &HttpRequest) -> RequestIdentity {
    req.extensions()
        .get::<RequestIdentity>()
        .cloned()
        .unwrap_or(RequestIdentity::Anonymous)
}

/// Extractor for any authenticated caller; anonymous requests get 401
#[derive(Debug, Clone)]
pub struct Authenticated(pub Principal);

impl FromRequest for Authenticated {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(match identity_of(req) {
            RequestIdentity::Authenticated(principal) => Ok(Authenticated(principal)),
            RequestIdentity::Anonymous => Err(AppError::Auth(AuthError::MissingToken)),
        })
    }
}

/// Extractor for `ROLE_ADMIN` callers; anonymous gets 401, other roles 403
#[derive(Debug, Clone)]
pub struct AdminPrincipal(pub Principal);

impl FromRequest for AdminPrincipal {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(match identity_of(req) {
            RequestIdentity::Authenticated(principal) if principal.has_role(Role::Admin) => {
                Ok(AdminPrincipal(principal))
            }
            RequestIdentity::Authenticated(principal) => {
                tracing::warn!(username = %principal.username, "Admin route denied");
                Err(AppError::Auth(AuthError::InsufficientRole(Role::Admin.authority())))
            }
            RequestIdentity::Anonymous => Err(AppError::Auth(AuthError::MissingToken)),
        })
    }
}
