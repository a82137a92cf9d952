//! Password hashing
//!
//! The user service only depends on the [`PasswordHasher`] trait. The default
//! implementation is Argon2id with a random per-record salt, stored as a PHC
//! string (e.g. `$argon2id$v=19$m=19456,t=2,p=1$...`).

use crate::error::AppError;
use argon2::{
    password_hash::{
        rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString,
    },
    Argon2,
};

/// One-way password hashing used when storing user credentials
pub trait PasswordHasher: Send + Sync {
    /// Hash a plaintext password
    fn hash(&self, password: &str) -> Result<String, AppError>;

    /// Check a plaintext password against a stored hash
    ///
    /// Nothing in this crate logs users in; this is for the authentication
    /// layer in front of the API.
    fn verify(&self, password: &str, hash: &str) -> Result<bool, AppError>;
}

/// Argon2id hasher with default (memory-hard) parameters
#[derive(Debug, Clone, Copy, Default)]
pub struct Argon2Hasher;

impl PasswordHasher for Argon2Hasher {
    fn hash(&self, password: &str) -> Result<String, AppError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to hash password: {}", e)))?;
        Ok(hash.to_string())
    }

    fn verify(&self, password: &str, hash: &str) -> Result<bool, AppError> {
        let parsed_hash = PasswordHash::new(hash)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Invalid password hash: {}", e)))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }
}
