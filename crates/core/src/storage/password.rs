use argon2::{Algorithm, Argon2, Params, Version};

use crate::errors::CoreError;

/// Length of the random per-user salt, in bytes.
pub const SALT_LEN: usize = 16;
/// Length of the derived password hash, in bytes.
pub const HASH_LEN: usize = 32;

/// Argon2id cost parameters for password hashing.
#[derive(Debug, Clone, Copy)]
pub struct HashParams {
    /// Memory cost in KiB (default: 19456 = 19 MB)
    pub memory_cost: u32,
    /// Number of iterations (default: 2)
    pub time_cost: u32,
    /// Degree of parallelism (default: 1)
    pub parallelism: u32,
}

impl Default for HashParams {
    fn default() -> Self {
        Self {
            memory_cost: 19_456,
            time_cost: 2,
            parallelism: 1,
        }
    }
}

/// Hash a password with Argon2id and the given salt.
pub fn hash_password(password: &str, salt: &[u8]) -> Result<[u8; HASH_LEN], CoreError> {
    hash_password_with(password, salt, &HashParams::default())
}

pub fn hash_password_with(
    password: &str,
    salt: &[u8],
    params: &HashParams,
) -> Result<[u8; HASH_LEN], CoreError> {
    let argon2_params = Params::new(
        params.memory_cost,
        params.time_cost,
        params.parallelism,
        Some(HASH_LEN),
    )
    .map_err(|e| CoreError::PasswordHash(format!("Invalid Argon2 params: {e}")))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon2_params);

    let mut hash = [0u8; HASH_LEN];
    argon2
        .hash_password_into(password.as_bytes(), salt, &mut hash)
        .map_err(|e| CoreError::PasswordHash(format!("Argon2 hashing failed: {e}")))?;

    Ok(hash)
}

/// Generate a cryptographically secure random salt.
pub fn generate_salt() -> Result<[u8; SALT_LEN], CoreError> {
    let mut salt = [0u8; SALT_LEN];
    getrandom::getrandom(&mut salt)
        .map_err(|e| CoreError::PasswordHash(format!("Failed to generate random salt: {e}")))?;
    Ok(salt)
}

/// Compare two byte strings without short-circuiting on the first mismatch.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
