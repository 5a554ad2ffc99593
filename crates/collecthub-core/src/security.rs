use argon2::{
    password_hash::{rand_core::OsRng, SaltString},
    Argon2, PasswordHash, PasswordHasher as _, PasswordVerifier,
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SecurityError {
    #[error("Password must not be empty")]
    EmptyPassword,
    #[error("Cryptographic operation failed: {0}")]
    CryptographicFailure(String),
}

/// Salted Argon2 password hashing.
///
/// Hashing is deliberately slow; async callers should run it on the blocking pool.
#[derive(Clone, Default)]
pub struct PasswordHasher {
    argon2: Argon2<'static>,
}

impl PasswordHasher {
    pub fn new() -> Self {
        Self::default()
    }

    /// PHC-format hash of `password` with a fresh random salt.
    pub fn hash(&self, password: &str) -> Result<String, SecurityError> {
        if password.is_empty() {
            return Err(SecurityError::EmptyPassword);
        }
        let salt = SaltString::generate(&mut OsRng);
        let password_hash = self
            .argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| SecurityError::CryptographicFailure(e.to_string()))?;

        Ok(password_hash.to_string())
    }

    /// `Ok(true)` when `password` matches `hash`. A malformed hash is an error.
    pub fn verify(&self, password: &str, hash: &str) -> Result<bool, SecurityError> {
        let parsed_hash = PasswordHash::new(hash)
            .map_err(|e| SecurityError::CryptographicFailure(e.to_string()))?;

        match self.argon2.verify_password(password.as_bytes(), &parsed_hash) {
            Ok(()) => Ok(true),
            Err(_) => Ok(false),
        }
    }
}
