//! Password hashing and validation.
//!
//! Credentials are stored as Argon2id PHC strings. Each hash carries its own
//! salt and parameters, so hashes produced under older settings keep
//! verifying and can be upgraded on the next successful login.
//!
//! # Example
//!
//! ```rust,ignore
//! use ranker_accounts::auth::{CredentialHasher, PasswordPolicy};
//!
//! let hasher = CredentialHasher::default();
//! let hash = hasher.hash("correct horse battery")?;
//! assert!(hasher.verify("correct horse battery", &hash)?);
//!
//! PasswordPolicy::default().check("short")?; // Err(WeakPassword)
//! ```

use crate::error::{AccountError, Result};
use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{
        PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString, rand_core::OsRng,
    },
};
use std::sync::{Arc, OnceLock};

/// Argon2id cost parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PasswordConfig {
    /// Memory cost in KiB (default: 19456 = 19MB)
    pub memory_cost: u32,
    /// Time cost / iterations (default: 2)
    pub time_cost: u32,
    pub parallelism: u32,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        // OWASP recommended minimum for Argon2id
        Self {
            memory_cost: 19 * 1024,
            time_cost: 2,
            parallelism: 1,
        }
    }
}

impl PasswordConfig {
    pub fn new(memory_cost: u32, time_cost: u32, parallelism: u32) -> Self {
        Self {
            memory_cost,
            time_cost,
            parallelism,
        }
    }

    /// Faster settings for development/testing (NOT for production).
    pub fn fast() -> Self {
        Self {
            memory_cost: 1024,
            time_cost: 1,
            parallelism: 1,
        }
    }
}

/// Hashes and verifies account passwords with Argon2id.
///
/// Clones share the lazily computed dummy hash used by
/// [`verify_dummy`](Self::verify_dummy).
#[derive(Clone)]
pub struct CredentialHasher {
    config: PasswordConfig,
    dummy_hash: Arc<OnceLock<Option<String>>>,
}

impl Default for CredentialHasher {
    fn default() -> Self {
        Self::new(PasswordConfig::default())
    }
}

impl std::fmt::Debug for CredentialHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialHasher")
            .field("config", &self.config)
            .finish()
    }
}

impl CredentialHasher {
    pub fn new(config: PasswordConfig) -> Self {
        Self {
            config,
            dummy_hash: Arc::new(OnceLock::new()),
        }
    }

    pub fn config(&self) -> &PasswordConfig {
        &self.config
    }

    /// Hash a password, returning the PHC-formatted string.
    pub fn hash(&self, password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = self.build_argon2()?;

        argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AccountError::internal(format!("Password hashing failed: {}", e)))
    }

    /// Verify a password against a stored hash.
    ///
    /// An unparseable hash is an internal error, not a mismatch.
    pub fn verify(&self, password: &str, hash: &str) -> Result<bool> {
        let parsed_hash = PasswordHash::new(hash)
            .map_err(|e| AccountError::internal(format!("Invalid password hash format: {}", e)))?;

        // Parameters come from the PHC string, so older hashes still verify.
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }

    /// Run a full verification against a throwaway hash.
    ///
    /// Called when no account matches so that "unknown email" costs the same
    /// as "wrong password".
    pub fn verify_dummy(&self, password: &str) {
        let dummy = self
            .dummy_hash
            .get_or_init(|| self.hash("ranker-dummy-credential").ok());
        if let Some(hash) = dummy {
            let _ = self.verify(password, hash);
        }
    }

    /// Whether `hash` was produced with different parameters than ours.
    pub fn needs_rehash(&self, hash: &str) -> Result<bool> {
        let parsed = PasswordHash::new(hash)
            .map_err(|e| AccountError::internal(format!("Invalid hash format: {}", e)))?;

        if parsed.algorithm != argon2::ARGON2ID_IDENT {
            return Ok(true);
        }

        if let (Some(m), Some(t), Some(p)) = (
            parsed.params.get("m"),
            parsed.params.get("t"),
            parsed.params.get("p"),
        ) {
            let m: u32 = m.decimal().unwrap_or(0);
            let t: u32 = t.decimal().unwrap_or(0);
            let p: u32 = p.decimal().unwrap_or(0);

            Ok(m != self.config.memory_cost
                || t != self.config.time_cost
                || p != self.config.parallelism)
        } else {
            Ok(true)
        }
    }

    fn build_argon2(&self) -> Result<Argon2<'static>> {
        let params = Params::new(
            self.config.memory_cost,
            self.config.time_cost,
            self.config.parallelism,
            None,
        )
        .map_err(|e| AccountError::internal(format!("Invalid Argon2 params: {}", e)))?;

        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }
}

/// Length-only password policy.
///
/// Lengths are counted in characters, not bytes. The upper bound keeps a
/// single request from feeding megabytes into the hasher.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PasswordPolicy {
    /// Default: 8
    pub min_length: usize,
    /// Default: 128
    pub max_length: usize,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: 8,
            max_length: 128,
        }
    }
}

impl PasswordPolicy {
    pub fn min_length(mut self, len: usize) -> Self {
        self.min_length = len;
        self
    }

    pub fn max_length(mut self, len: usize) -> Self {
        self.max_length = len;
        self
    }

    /// Returns every rule the password breaks (empty if valid).
    pub fn validate(&self, password: &str) -> Vec<PasswordError> {
        let len = password.chars().count();
        let mut errors = Vec::new();

        if len < self.min_length {
            errors.push(PasswordError::TooShort {
                min: self.min_length,
            });
        }
        if len > self.max_length {
            errors.push(PasswordError::TooLong {
                max: self.max_length,
            });
        }

        errors
    }

    pub fn is_valid(&self, password: &str) -> bool {
        self.validate(password).is_empty()
    }

    /// Validate, mapping violations to [`AccountError::WeakPassword`].
    pub fn check(&self, password: &str) -> Result<()> {
        let errors = self.validate(password);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(AccountError::WeakPassword(
                errors
                    .iter()
                    .map(|e| e.to_string())
                    .collect::<Vec<_>>()
                    .join(", "),
            ))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PasswordError {
    #[error("must be at least {min} characters")]
    TooShort { min: usize },
    #[error("must be at most {max} characters")]
    TooLong { max: usize },
}
