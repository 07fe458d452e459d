/// Token Service
///
/// Issues and verifies HS256-signed session tokens. Verification is
/// stateless; liveness is decided by the session registry.

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use crate::auth::claims::Claims;
use crate::configuration::JwtSettings;
use crate::error::{ConfigError, TokenError};
use crate::users::Role;

/// HS256 needs at least 256 bits of key material
const MIN_SECRET_BYTES: usize = 32;

/// Identity recovered from a verified token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedToken {
    pub username: String,
    pub role: Role,
}

#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiration_seconds: i64,
    issuer: String,
}

impl TokenService {
    /// Builds the signing keys from configuration.
    ///
    /// # Errors
    /// Returns a configuration error when the secret is missing or shorter
    /// than 32 bytes, or when the expiration window is not positive.
    pub fn new(config: &JwtSettings) -> Result<Self, ConfigError> {
        if config.secret.is_empty() {
            return Err(ConfigError::MissingRequired("jwt.secret".to_string()));
        }
        if config.secret.len() < MIN_SECRET_BYTES {
            return Err(ConfigError::InvalidValue(format!(
                "jwt.secret must be at least {} bytes",
                MIN_SECRET_BYTES
            )));
        }
        if config.expiration_seconds <= 0 {
            return Err(ConfigError::InvalidValue(
                "jwt.expiration_seconds must be positive".to_string(),
            ));
        }

        Ok(Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            expiration_seconds: config.expiration_seconds,
            issuer: config.issuer.clone(),
        })
    }

    /// Generate a signed token for `username` carrying `ROLE_<role>`
    pub fn issue(&self, username: &str, role: Role) -> Result<String, TokenError> {
        tracing::debug!(username = %username, role = %role, "Generating token");
        let claims = Claims::new(username, role, self.expiration_seconds, self.issuer.clone());

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Check signature, expiry and issuer, then extract username and role.
    pub fn verify(&self, token: &str) -> Result<VerifiedToken, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_issuer(&[&self.issuer]);

        let claims = decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(classify)?;

        let role = claims
            .role()
            .ok_or_else(|| TokenError::Malformed(format!("unknown role claim {:?}", claims.role)))?;

        Ok(VerifiedToken {
            username: claims.sub,
            role,
        })
    }
}

fn classify(err: jsonwebtoken::errors::Error) -> TokenError {
    match err.kind() {
        ErrorKind::InvalidSignature => TokenError::InvalidSignature,
        ErrorKind::ExpiredSignature => TokenError::Expired,
        ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName | ErrorKind::InvalidKeyFormat => {
            TokenError::Unsupported(err.to_string())
        }
        _ => TokenError::Malformed(err.to_string()),
    }
}
