use std::fmt;

use argon2::{
    password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Version,
};
use rand::rngs::OsRng;
use tracing::error;

use crate::config::PasswordConfig;
use crate::validator::Validator;

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("password hashing failed: {0}")]
    Hashing(String),
    #[error("missing password hash")]
    MissingHash,
    #[error("corrupt password hash: {0}")]
    Corrupt(String),
}

/// Plaintext password as received from a client. Only ever validated and
/// hashed; it has no `Serialize` impl and its `Debug` output is redacted.
pub struct PlaintextPassword(String);

impl PlaintextPassword {
    pub fn new(plain: impl Into<String>) -> Self {
        Self(plain.into())
    }

    pub fn validate(&self, v: &mut Validator) {
        validate_plaintext(v, &self.0);
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for PlaintextPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PlaintextPassword(..)")
    }
}

pub fn validate_plaintext(v: &mut Validator, password: &str) {
    v.check(!password.is_empty(), "password", "must be provided");
    v.check(password.len() >= 8, "password", "must be at least 8 bytes long");
    v.check(password.len() <= 72, "password", "must not be more than 72 bytes long");
}

/// Argon2id hash in PHC string form. The only password form that is persisted.
#[derive(Clone, PartialEq, Eq)]
pub struct HashedPassword(String);

impl HashedPassword {
    pub fn set(plain: &PlaintextPassword, cost: &PasswordConfig) -> Result<Self, PasswordError> {
        let params = cost.params()?;
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
        let salt = SaltString::generate(&mut OsRng);
        let hash = argon2
            .hash_password(plain.as_str().as_bytes(), &salt)
            .map_err(|e| {
                error!(error = %e, "argon2 hash_password error");
                PasswordError::Hashing(e.to_string())
            })?
            .to_string();
        Ok(Self(hash))
    }

    /// Wraps a stored hash, refusing empty or unparsable values.
    pub fn from_phc(stored: String) -> Result<Self, PasswordError> {
        if stored.is_empty() {
            return Err(PasswordError::MissingHash);
        }
        PasswordHash::new(&stored).map_err(|e| PasswordError::Corrupt(e.to_string()))?;
        Ok(Self(stored))
    }

    /// `Ok(false)` means the password was proven wrong; `Err` means the
    /// comparison could not be carried out.
    pub fn matches(&self, plain: &str) -> Result<bool, PasswordError> {
        let parsed = PasswordHash::new(&self.0).map_err(|e| {
            error!(error = %e, "argon2 parse hash error");
            PasswordError::Corrupt(e.to_string())
        })?;
        match Argon2::default().verify_password(plain.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(password_hash::Error::Password) => Ok(false),
            Err(e) => {
                error!(error = %e, "argon2 verify_password error");
                Err(PasswordError::Hashing(e.to_string()))
            }
        }
    }

    /// [`HashedPassword::set`] on the blocking pool.
    pub async fn set_blocking(
        plain: PlaintextPassword,
        cost: PasswordConfig,
    ) -> Result<Self, PasswordError> {
        tokio::task::spawn_blocking(move || Self::set(&plain, &cost))
            .await
            .map_err(|e| PasswordError::Hashing(e.to_string()))?
    }

    /// [`HashedPassword::matches`] on the blocking pool.
    pub async fn matches_blocking(&self, plain: String) -> Result<bool, PasswordError> {
        let hash = self.clone();
        tokio::task::spawn_blocking(move || hash.matches(&plain))
            .await
            .map_err(|e| PasswordError::Hashing(e.to_string()))?
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for HashedPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("HashedPassword(..)")
    }
}

#[cfg(test)]
pub(crate) fn test_cost() -> PasswordConfig {
    PasswordConfig {
        memory_kib: 8,
        iterations: 1,
        parallelism: 1,
    }
}
