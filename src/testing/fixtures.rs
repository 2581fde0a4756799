//! Test fixtures for seeding account documents
//!
//! This module provides helpers for creating accounts in each lifecycle state
//! without going through the flows.

use crate::account::{Account, PendingToken, TokenPurpose};
use crate::auth::{CredentialHasher, PasswordConfig, hash_token};
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

/// Helper functions for generating fake test data
pub mod fake {
    use super::*;

    /// Generate a fake email address
    pub fn email() -> String {
        format!("test-{}@example.com", Uuid::new_v4().simple())
    }

    /// Generate a fake UUID as a string
    pub fn uuid() -> String {
        Uuid::new_v4().to_string()
    }

    /// Generate a password that satisfies the default policy
    pub fn password() -> String {
        format!("pw-{}", &Uuid::new_v4().simple().to_string()[..12])
    }
}

/// Builder for seeded [`Account`] documents
///
/// Defaults to an unconfirmed account with no password and no token,
/// created now.
///
/// # Example
///
/// ```rust,ignore
/// let account = TestAccount::builder()
///     .email("a@x.com")
///     .password("pw123456")
///     .confirmed()
///     .build();
/// store.insert(account).await;
/// ```
#[derive(Debug, Clone)]
pub struct TestAccount {
    account: Account,
}

impl TestAccount {
    pub fn builder() -> Self {
        Self {
            account: Account {
                id: fake::uuid(),
                email: fake::email(),
                password_hash: String::new(),
                confirmed: false,
                pending_token: None,
                created_at: Utc::now(),
            },
        }
    }

    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.account.email = email.into();
        self
    }

    /// Hash `password` with fast Argon2 parameters.
    pub fn password(mut self, password: &str) -> Self {
        self.account.password_hash = CredentialHasher::new(PasswordConfig::fast())
            .hash(password)
            .unwrap();
        self
    }

    pub fn password_hash(mut self, hash: impl Into<String>) -> Self {
        self.account.password_hash = hash.into();
        self
    }

    pub fn confirmed(mut self) -> Self {
        self.account.confirmed = true;
        self
    }

    pub fn created_at(mut self, at: DateTime<Utc>) -> Self {
        self.account.created_at = at;
        self
    }

    /// Attach a pending token for the raw value `raw`, expiring after `ttl`
    /// from the account's creation time.
    pub fn token(mut self, raw: &str, purpose: TokenPurpose, ttl: Duration) -> Self {
        self.account.pending_token = Some(PendingToken {
            token_hash: hash_token(raw),
            purpose,
            expires_at: self.account.created_at + ttl,
        });
        self
    }

    pub fn build(self) -> Account {
        self.account
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::AccountState;

    #[test]
    fn test_fake_emails_are_unique_and_valid() {
        let a = fake::email();
        assert_ne!(a, fake::email());
        assert!(crate::account::is_valid_email(&a));
    }

    #[test]
    fn test_builder_states() {
        let pending = TestAccount::builder()
            .token("raw", TokenPurpose::Confirmation, Duration::hours(1))
            .build();
        assert_eq!(pending.state(), AccountState::PendingConfirmation);

        let active = TestAccount::builder().password("pw123456").confirmed().build();
        assert_eq!(active.state(), AccountState::Active);
        assert!(active.password_hash.starts_with("$argon2id$"));
    }
}
