/// Password hashing
///
/// bcrypt everywhere. Accounts provisioned from configuration go through the
/// strength policy; sign-in only ever verifies.

use bcrypt::{hash, verify, BcryptError, DEFAULT_COST};

use crate::error::{AppError, ValidationError};

const MIN_PASSWORD_LENGTH: usize = 8;
// bcrypt ignores input past 72 bytes
const MAX_PASSWORD_LENGTH: usize = 72;

fn hashing_failed(e: BcryptError) -> AppError {
    AppError::Internal(format!("Password hashing failed: {}", e))
}

/// Hash a password that satisfies [`check_strength`], at bcrypt's default cost
pub fn hash_password(password: &str) -> Result<String, AppError> {
    check_strength(password)?;
    hash(password, DEFAULT_COST).map_err(hashing_failed)
}

/// Hash without the strength policy, at an explicit cost (4..=31)
pub fn hash_password_with_cost(password: &str, cost: u32) -> Result<String, AppError> {
    hash(password, cost).map_err(hashing_failed)
}

/// `Ok(false)` on a mismatch; an unreadable stored hash is an internal error,
/// never a successful match.
pub fn verify_password(password: &str, password_hash: &str) -> Result<bool, AppError> {
    verify(password, password_hash)
        .map_err(|e| AppError::Internal(format!("Stored password hash unreadable: {}", e)))
}

/// Length 8..=72 bytes with at least one digit, one lowercase and one
/// uppercase letter.
pub fn check_strength(password: &str) -> Result<(), ValidationError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(ValidationError::TooShort("password".to_string(), MIN_PASSWORD_LENGTH));
    }
    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(ValidationError::TooLong("password".to_string(), MAX_PASSWORD_LENGTH));
    }

    let missing: Vec<&str> = [
        (password.chars().any(|c| c.is_ascii_digit()), "a digit"),
        (password.chars().any(char::is_lowercase), "a lowercase letter"),
        (password.chars().any(char::is_uppercase), "an uppercase letter"),
    ]
    .into_iter()
    .filter(|(present, _)| !present)
    .map(|(_, what)| what)
    .collect();

    if !missing.is_empty() {
        return Err(ValidationError::InvalidFormat(format!(
            "password needs {}",
            missing.join(", ")
        )));
    }
    Ok(())
}
