/// Input validators module - screens user-supplied fields before they are stored
/// Features:
/// 1. DoS Protection: Input length limits
/// 2. Data Theft Protection: Control character rejection
/// 3. SQL Injection Prevention: Pattern screening on identifier-like fields

use regex::Regex;
use lazy_static::lazy_static;

use crate::error::ValidationError;
use crate::maintenance::MAX_DESCRIPTION_LENGTH;

const MIN_USERNAME_LENGTH: usize = 3;
const MAX_USERNAME_LENGTH: usize = 50;
const MAX_UNIT_NUMBER_LENGTH: usize = 20;

lazy_static! {
    static ref USERNAME_REGEX: Regex = Regex::new(r"^[A-Za-z0-9._-]+$").unwrap();

    // Apartment identifiers: "101", "B-12", "4/2", "Suite 300", "#7"
    static ref UNIT_NUMBER_REGEX: Regex = Regex::new(r"^[A-Za-z0-9#/ -]+$").unwrap();

    // Regex to detect potentially malicious SQL patterns
    static ref SQL_INJECTION_PATTERNS: [Regex; 4] = [
        // Union-based SQL injection
        Regex::new(r"(?i)\s+UNION\s+").unwrap(),
        // Comment-based injection
        Regex::new(r"(--|;|/\*|\*/)").unwrap(),
        // Time-based blind injection
        Regex::new(r"(?i)(SLEEP|WAITFOR|BENCHMARK|DBMS_LOCK)").unwrap(),
        // Boolean-based injection
        Regex::new(r#"(?i)(\bOR\b|\bAND\b)\s*(['"][0-9]*['"]|[0-9]*)\s*=\s*(['"][0-9]*['"]|[0-9]*|True|False)"#).unwrap(),
    ];
}

/// Validates a login name
pub fn is_valid_username(username: &str) -> Result<String, ValidationError> {
    let trimmed = username.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField("username".to_string()));
    }

    if trimmed.len() < MIN_USERNAME_LENGTH {
        return Err(ValidationError::TooShort("username".to_string(), MIN_USERNAME_LENGTH));
    }

    if trimmed.len() > MAX_USERNAME_LENGTH {
        return Err(ValidationError::TooLong("username".to_string(), MAX_USERNAME_LENGTH));
    }

    if contains_sql_injection_patterns(trimmed) {
        return Err(ValidationError::PossibleSQLInjection);
    }

    if !USERNAME_REGEX.is_match(trimmed) {
        return Err(ValidationError::InvalidFormat("username".to_string()));
    }

    Ok(trimmed.to_string())
}

/// Validates an apartment/unit identifier
pub fn is_valid_unit_number(unit_number: &str) -> Result<String, ValidationError> {
    let trimmed = unit_number.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField("unitNumber".to_string()));
    }

    if trimmed.len() > MAX_UNIT_NUMBER_LENGTH {
        return Err(ValidationError::TooLong("unitNumber".to_string(), MAX_UNIT_NUMBER_LENGTH));
    }

    if contains_sql_injection_patterns(trimmed) {
        return Err(ValidationError::PossibleSQLInjection);
    }

    if !UNIT_NUMBER_REGEX.is_match(trimmed) {
        return Err(ValidationError::InvalidFormat("unitNumber".to_string()));
    }

    Ok(trimmed.to_string())
}

/// Validates free-text request descriptions
/// - Length is counted in characters, not bytes
/// - Line breaks and tabs are allowed; other control characters are not
///
/// Descriptions are always bound as query parameters, so prose such as
/// "drain and sink -- both blocked" is accepted as written.
pub fn is_valid_description(description: &str) -> Result<String, ValidationError> {
    let trimmed = description.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField("description".to_string()));
    }

    if trimmed.chars().count() > MAX_DESCRIPTION_LENGTH {
        return Err(ValidationError::TooLong("description".to_string(), MAX_DESCRIPTION_LENGTH));
    }

    if trimmed
        .chars()
        .any(|c| c.is_control() && !matches!(c, '\n' | '\r' | '\t'))
    {
        return Err(ValidationError::SuspiciousContent("description".to_string()));
    }

    Ok(trimmed.to_string())
}

/// Checks if input contains SQL injection patterns
fn contains_sql_injection_patterns(input: &str) -> bool {
    SQL_INJECTION_PATTERNS.iter().any(|pattern| pattern.is_match(input))
}
