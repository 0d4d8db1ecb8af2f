use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::timestamp;
use crate::errors::CoreError;
use crate::storage::password;

/// Minimum accepted password length, in characters.
pub const MIN_PASSWORD_LEN: usize = 4;

/// A registered account (`users.json`).
///
/// The password is never stored: only an Argon2id hash and the random salt
/// it was derived with, both hex-encoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub user_id: u64,
    pub username: String,
    hashed_password: String,
    salt: String,
    #[serde(with = "timestamp")]
    pub registration_date: DateTime<Utc>,
}

impl User {
    /// Create a user, hashing `password` with a fresh salt.
    pub fn new(user_id: u64, username: &str, password: &str) -> Result<Self, CoreError> {
        let username = validate_username(username)?;
        validate_password(password)?;
        let salt = password::generate_salt()?;
        let hash = password::hash_password(password, &salt)?;
        Ok(Self {
            user_id,
            username,
            hashed_password: hex::encode(hash),
            salt: hex::encode(salt),
            registration_date: timestamp::now(),
        })
    }

    /// Check a candidate password against the stored hash.
    pub fn verify_password(&self, candidate: &str) -> Result<bool, CoreError> {
        let salt = hex::decode(&self.salt)
            .map_err(|e| CoreError::PasswordHash(format!("Stored salt is not hex: {e}")))?;
        let hash = password::hash_password(candidate, &salt)?;
        Ok(password::constant_time_eq(
            hex::encode(hash).as_bytes(),
            self.hashed_password.as_bytes(),
        ))
    }

    /// Replace the password. A new salt is generated every time.
    pub fn change_password(&mut self, new_password: &str) -> Result<(), CoreError> {
        validate_password(new_password)?;
        let salt = password::generate_salt()?;
        let hash = password::hash_password(new_password, &salt)?;
        self.salt = hex::encode(salt);
        self.hashed_password = hex::encode(hash);
        Ok(())
    }

    /// Public profile line, without any credential material.
    pub fn info(&self) -> String {
        format!(
            "User #{} '{}' (registered {})",
            self.user_id,
            self.username,
            timestamp::format(&self.registration_date)
        )
    }
}

pub fn validate_username(raw: &str) -> Result<String, CoreError> {
    let username = raw.trim();
    if username.is_empty() {
        return Err(CoreError::ValidationError(
            "Username must not be empty".into(),
        ));
    }
    Ok(username.to_string())
}

pub fn validate_password(password: &str) -> Result<(), CoreError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(CoreError::ValidationError(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

/// The logged-in user, shared between CLI invocations via `session.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub session_id: Uuid,
    pub user_id: u64,
    pub username: String,
    #[serde(with = "timestamp")]
    pub logged_in_at: DateTime<Utc>,
}

impl Session {
    pub fn start(user: &User) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            user_id: user.user_id,
            username: user.username.clone(),
            logged_in_at: timestamp::now(),
        }
    }
}
