//! Credential handling
//!
//! Salted one-way password digests (Argon2id, PHC string format) and the
//! verification used by the authentication entry point.

use std::fmt;

use argon2::password_hash::{self, SaltString};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use rand::rngs::OsRng;
use serde::Deserialize;

/// Errors raised by the hashing primitive itself.
///
/// A password that simply does not match is not an error; see
/// [`PasswordDigest::verify`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CredentialError {
    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error("Credential validation failed: {0}")]
    Validation(String),
}

/// A plaintext password as received from a client.
#[derive(Clone, Deserialize)]
#[serde(transparent)]
pub struct Password(String);

impl Password {
    pub fn new(password: impl Into<String>) -> Self {
        Self(password.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Length in characters, not bytes.
    pub fn char_count(&self) -> usize {
        self.0.chars().count()
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print the raw value.
        f.debug_tuple("Password").field(&"*".repeat(8)).finish()
    }
}

/// The stored digest of a user's password.
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordDigest(String);

impl PasswordDigest {
    /// Hash a plaintext password with a fresh random salt.
    pub fn hash(password: &Password) -> Result<Self, CredentialError> {
        let salt = SaltString::generate(&mut OsRng);

        let digest = Argon2::default()
            .hash_password(password.as_str().as_bytes(), &salt)
            .map_err(|e| CredentialError::Hashing(e.to_string()))?
            .to_string();

        Ok(Self(digest))
    }

    /// Wrap a digest read back from storage. Its format is only checked when
    /// it is used for verification.
    pub fn from_stored(digest: String) -> Self {
        Self(digest)
    }

    /// Compare a plaintext password against this digest.
    ///
    /// Returns `Ok(false)` on a mismatch and `Err` only when the digest cannot
    /// be parsed or the primitive itself fails.
    pub fn verify(&self, plaintext: &str) -> Result<bool, CredentialError> {
        let parsed = PasswordHash::new(&self.0)
            .map_err(|e| CredentialError::Validation(e.to_string()))?;

        match Argon2::default().verify_password(plaintext.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(password_hash::Error::Password) => Ok(false),
            Err(other) => Err(CredentialError::Validation(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for PasswordDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PasswordDigest(..)")
    }
}

/// Hash on the blocking pool; Argon2 is deliberately slow.
pub async fn hash_password(password: Password) -> Result<PasswordDigest, CredentialError> {
    tokio::task::spawn_blocking(move || PasswordDigest::hash(&password))
        .await
        .map_err(|e| CredentialError::Hashing(e.to_string()))?
}

/// Verify on the blocking pool.
pub async fn verify_password(
    password: Password,
    digest: PasswordDigest,
) -> Result<bool, CredentialError> {
    tokio::task::spawn_blocking(move || digest.verify(password.as_str()))
        .await
        .map_err(|e| CredentialError::Validation(e.to_string()))?
}
