//! Salted one-way hashing for teacher and student secrets.

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use rand::rngs::OsRng;

use crate::error::{StoreError, StoreResult};

/// Hash a secret with Argon2id and a random salt, returning the PHC string.
pub fn hash_secret(secret: &str) -> StoreResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(secret.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| StoreError::Hash(e.to_string()))
}

/// Constant-time check of `secret` against a stored PHC hash.
pub fn verify_secret(secret: &str, stored_hash: &str) -> StoreResult<bool> {
    let parsed = PasswordHash::new(stored_hash).map_err(|e| StoreError::Hash(e.to_string()))?;
    match Argon2::default().verify_password(secret.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(StoreError::Hash(e.to_string())),
    }
}
