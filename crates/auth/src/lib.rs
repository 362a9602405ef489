use argon2::password_hash::{
    rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
};
use argon2::Argon2;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use dreamink_config::AuthConfig;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Clone)]
pub struct Authenticator {
    pool: SqlitePool,
    min_password_length: usize,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing required fields")]
    MissingFields,
    #[error("missing credentials")]
    MissingCredentials,
    #[error("password must be at least {0} characters")]
    PasswordTooShort(usize),
    #[error("account already exists")]
    UserExists,
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("password hashing failed: {0}")]
    PasswordHash(#[from] argon2::password_hash::Error),
    #[error("invalid timestamp stored for user {0}")]
    InvalidTimestamp(i64),
}

/// Fields submitted when creating an account. Absent and empty values are
/// treated alike.
#[derive(Debug, Clone, Default)]
pub struct SignUpRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone)]
pub struct UserProfile {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl Authenticator {
    pub fn new(pool: SqlitePool, config: AuthConfig) -> Self {
        Self {
            pool,
            min_password_length: config.min_password_length.max(1),
        }
    }

    pub fn pool(&self) -> SqlitePool {
        self.pool.clone()
    }

    pub async fn sign_up(&self, request: SignUpRequest) -> Result<UserProfile, AuthError> {
        let (Some(first_name), Some(last_name), Some(email), Some(password)) = (
            present(request.first_name),
            present(request.last_name),
            request.email.as_deref().map(normalize_email).filter(|email| !email.is_empty()),
            present(request.password),
        ) else {
            return Err(AuthError::MissingFields);
        };

        if password.chars().count() < self.min_password_length {
            return Err(AuthError::PasswordTooShort(self.min_password_length));
        }

        let existing = sqlx::query("SELECT id FROM users WHERE email = ?")
            .bind(&email)
            .fetch_optional(&self.pool)
            .await?;

        if existing.is_some() {
            debug!(%email, "signup rejected, email already registered");
            return Err(AuthError::UserExists);
        }

        let password_hash = hash_password(&password)?;
        let created_at = Utc::now();

        // A concurrent signup for the same email can slip past the lookup above;
        // the unique index decides and the loser gets `UserExists`.
        let result = sqlx::query(
            "INSERT INTO users (first_name, last_name, email, password_hash, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&first_name)
        .bind(&last_name)
        .bind(&email)
        .bind(&password_hash)
        .bind(created_at.to_rfc3339_opts(SecondsFormat::Millis, true))
        .execute(&self.pool)
        .await
        .map_err(|error| match &error {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                debug!(%email, "signup lost race for email");
                AuthError::UserExists
            }
            _ => AuthError::Database(error),
        })?;

        let id = result.last_insert_rowid();
        info!(user_id = id, %email, "registered user");

        Ok(UserProfile {
            id,
            first_name,
            last_name,
            email,
            created_at,
        })
    }

    pub async fn sign_in(
        &self,
        email: Option<&str>,
        password: Option<&str>,
    ) -> Result<UserProfile, AuthError> {
        let (Some(email), Some(password)) = (
            email.map(normalize_email).filter(|email| !email.is_empty()),
            password.filter(|value| !value.is_empty()),
        ) else {
            return Err(AuthError::MissingCredentials);
        };

        let row = sqlx::query(
            "SELECT id, first_name, last_name, email, password_hash, created_at FROM users WHERE email = ?",
        )
        .bind(&email)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            debug!(%email, "signin rejected, unknown email");
            return Err(AuthError::InvalidCredentials);
        };

        let secret: String = row.try_get("password_hash")?;
        if !verify_password(password, &secret)? {
            debug!(%email, "signin rejected, password mismatch");
            return Err(AuthError::InvalidCredentials);
        }

        let profile = profile_from_row(&row)?;
        info!(user_id = profile.id, "user signed in");
        Ok(profile)
    }

    pub async fn list_users(&self) -> Result<Vec<UserProfile>, AuthError> {
        let rows = sqlx::query(
            "SELECT id, first_name, last_name, email, created_at FROM users ORDER BY created_at ASC, id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(profile_from_row).collect()
    }
}

fn present(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.is_empty())
}

/// Emails are matched case-insensitively by storing them lowercased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

fn verify_password(password: &str, secret: &str) -> Result<bool, AuthError> {
    let stored_hash = PasswordHash::new(secret)?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &stored_hash)
        .is_ok())
}

fn profile_from_row(row: &SqliteRow) -> Result<UserProfile, AuthError> {
    let id: i64 = row.try_get("id")?;
    let created_at: String = row.try_get("created_at")?;
    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .map_err(|_| AuthError::InvalidTimestamp(id))?
        .with_timezone(&Utc);

    Ok(UserProfile {
        id,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        email: row.try_get("email")?,
        created_at,
    })
}
