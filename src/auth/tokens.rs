//! Single-use confirmation and reset tokens.
//!
//! A token is 32 bytes from the OS RNG, base64url encoded. Only its SHA-256
//! digest is stored; the raw value travels in the outbound message and is
//! looked up by hashing whatever the client presents.

use crate::account::{PendingToken, TokenPurpose};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Utc};
use rand::{RngCore, rngs::OsRng};
use sha2::{Digest, Sha256};

const TOKEN_BYTES: usize = 32;

/// A freshly generated token: the raw value for the message and the record
/// to persist.
#[derive(Clone)]
pub struct IssuedToken {
    pub raw: String,
    pub pending: PendingToken,
}

impl IssuedToken {
    pub fn generate(purpose: TokenPurpose, expires_at: DateTime<Utc>) -> Self {
        let mut bytes = [0u8; TOKEN_BYTES];
        OsRng.fill_bytes(&mut bytes);
        let raw = URL_SAFE_NO_PAD.encode(bytes);

        Self {
            pending: PendingToken {
                token_hash: hash_token(&raw),
                purpose,
                expires_at,
            },
            raw,
        }
    }
}

// Raw value stays out of logs.
impl std::fmt::Debug for IssuedToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssuedToken")
            .field("raw", &"[REDACTED]")
            .field("pending", &self.pending)
            .finish()
    }
}

/// Digest a raw token for storage or lookup.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    URL_SAFE_NO_PAD.encode(hasher.finalize())
}
