/// Authentication Routes
///
/// Sign-in, sign-out and an identity echo for the current caller.

use actix_web::{http::header::AUTHORIZATION, web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::auth::{bearer_token, AuthService, Authenticated};
use crate::error::{AppError, ErrorContext, ValidationError};

/// Credentials submitted at sign-in
#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Current caller as seen by the session gate
#[derive(Serialize)]
pub struct IdentityResponse {
    pub username: String,
    pub role: String,
    pub authorities: Vec<String>,
}

/// POST /api/auth/signin
///
/// # Errors
/// - 401: Unknown user or wrong password (indistinguishable)
/// - 503: Session store unavailable
pub async fn signin(
    form: web::Json<LoginRequest>,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("signin").with_username(form.username.as_str());

    let response = match auth.authenticate(&form.username, &form.password).await {
        Ok(response) => response,
        Err(e) => {
            context.log_error(&e);
            return Err(e);
        }
    };

    tracing::info!(
        request_id = %context.request_id,
        username = %response.user.username,
        "User signed in"
    );
    Ok(HttpResponse::Ok().json(response))
}

/// POST /api/auth/logout
///
/// Revokes the session of the user named in the bearer token.
///
/// The username comes from the token's signature alone, not from the
/// registry: a token that was already revoked but has not expired still
/// identifies its user, so presenting it revokes that user's latest session.
///
/// # Errors
/// - 400: Missing or malformed `Authorization` header
/// - 401: Token fails verification
/// - 503: Session store unavailable
pub async fn logout(req: HttpRequest, auth: web::Data<AuthService>) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("logout");

    let token = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(bearer_token)
        .ok_or_else(|| {
            AppError::Validation(ValidationError::InvalidFormat(
                "Authorization header".to_string(),
            ))
        })?;

    let verified = auth.tokens().verify(token).map_err(|e| {
        let e = AppError::from(e);
        context.log_error(&e);
        e
    })?;

    auth.logout(&verified.username).await?;

    tracing::info!(
        request_id = %context.request_id,
        username = %verified.username,
        "User logged out"
    );
    Ok(HttpResponse::Ok().json(MessageResponse {
        message: "Logged out successfully".to_string(),
    }))
}

/// GET /api/auth/me
pub async fn current_user(caller: Authenticated) -> HttpResponse {
    let Authenticated(principal) = caller;
    HttpResponse::Ok().json(IdentityResponse {
        role: principal.role.as_str().to_string(),
        authorities: principal.authorities(),
        username: principal.username,
    })
}
