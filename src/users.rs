/// Credential Store
///
/// Persists user identity, bcrypt password hash and role. Postgres backs the
/// running service; the in-memory store serves tests and local development.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::auth::hash_password;
use crate::configuration::SeedUser;
use crate::error::{AppError, DatabaseError, ValidationError};
use crate::validators::is_valid_username;

/// Prefix carried by role claims and authorities
pub const AUTHORITY_PREFIX: &str = "ROLE_";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Admin,
    Tenant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Tenant => "TENANT",
        }
    }

    /// Authority string as carried in the token's role claim, e.g. `ROLE_ADMIN`
    pub fn authority(&self) -> String {
        format!("{}{}", AUTHORITY_PREFIX, self.as_str())
    }

    /// Inverse of [`Role::authority`]
    pub fn from_authority(authority: &str) -> Option<Self> {
        authority
            .strip_prefix(AUTHORITY_PREFIX)
            .and_then(|name| name.parse().ok())
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ADMIN" => Ok(Role::Admin),
            "TENANT" => Ok(Role::Tenant),
            _ => Err(ValidationError::InvalidFormat("role".to_string())),
        }
    }
}

/// Stored identity
#[derive(Debug, Clone)]
pub struct User {
    pub username: String,
    pub password_hash: String,
    pub role: Role,
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError>;

    /// Fails with a unique-constraint error when the username is taken.
    async fn insert_user(&self, user: &User) -> Result<(), AppError>;
}

/// Postgres-backed credential store over the `users` table
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CredentialStore for PgUserStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let row = sqlx::query_as::<_, (String, String, String)>(
            "SELECT username, password_hash, role FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|(username, password_hash, role)| {
            let role = role.parse::<Role>().map_err(|_| {
                AppError::Database(DatabaseError::QueryExecution(format!(
                    "unknown role {:?} for user {}",
                    role, username
                )))
            })?;
            Ok(User {
                username,
                password_hash,
                role,
            })
        })
        .transpose()
    }

    async fn insert_user(&self, user: &User) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO users (username, password_hash, role, created_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(chrono::Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// In-memory credential store
#[derive(Default)]
pub struct InMemoryUserStore {
    users: RwLock<HashMap<String, User>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for InMemoryUserStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        Ok(self.users.read().get(username).cloned())
    }

    async fn insert_user(&self, user: &User) -> Result<(), AppError> {
        let mut users = self.users.write();
        if users.contains_key(&user.username) {
            return Err(AppError::Database(DatabaseError::UniqueConstraintViolation(
                format!("username {}", user.username),
            )));
        }
        users.insert(user.username.clone(), user.clone());
        Ok(())
    }
}

/// Create configured accounts that do not exist yet; returns how many were added.
pub async fn seed_users(store: &dyn CredentialStore, seeds: &[SeedUser]) -> Result<usize, AppError> {
    let mut created = 0;
    for seed in seeds {
        let username = is_valid_username(&seed.username)?;
        if store.find_by_username(&username).await?.is_some() {
            tracing::debug!(username = %username, "Seed user already present");
            continue;
        }

        store
            .insert_user(&User {
                password_hash: hash_password(&seed.password)?,
                username: username.clone(),
                role: seed.role,
            })
            .await?;
        tracing::info!(username = %username, role = %seed.role, "Seed user created");
        created += 1;
    }
    Ok(created)
}
