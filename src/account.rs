//! The account document and its pending-token slot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What a pending token may be used for.
///
/// Confirmation and reset share one slot on the account, so every token is
/// tagged and only accepted by the flow it was issued for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenPurpose {
    Confirmation,
    PasswordReset,
}

/// A single-use secret waiting to be consumed.
///
/// Only the SHA-256 digest of the token is stored; the raw value is sent to
/// the account holder and never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingToken {
    pub token_hash: String,
    pub purpose: TokenPurpose,
    pub expires_at: DateTime<Utc>,
}

impl PendingToken {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// Lifecycle state derived from the stored fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountState {
    Unregistered,
    PendingConfirmation,
    Active,
}

/// A registered (or registering) account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub email: String,
    /// Empty until registration is completed.
    #[serde(default)]
    pub password_hash: String,
    pub confirmed: bool,
    /// Token and expiry travel together.
    #[serde(default)]
    pub pending_token: Option<PendingToken>,
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// A freshly initiated, unconfirmed account holding a confirmation token.
    pub fn pending(email: impl Into<String>, token: PendingToken, created_at: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            email: email.into(),
            password_hash: String::new(),
            confirmed: false,
            pending_token: Some(token),
            created_at,
        }
    }

    pub fn state(&self) -> AccountState {
        if self.confirmed {
            return AccountState::Active;
        }
        match &self.pending_token {
            Some(token) if token.purpose == TokenPurpose::Confirmation => {
                AccountState::PendingConfirmation
            }
            _ => AccountState::Unregistered,
        }
    }

    pub fn has_password(&self) -> bool {
        !self.password_hash.is_empty()
    }
}

/// Normalize an email address for storage and lookup.
///
/// Emails are case-insensitive throughout: every entry point trims and
/// lower-cases before validating or querying.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Basic email validation: one `@`, non-empty local part, dotted domain.
pub fn is_valid_email(email: &str) -> bool {
    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 {
        return false;
    }

    let local = parts[0];
    let domain = parts[1];

    !local.is_empty()
        && !domain.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !domain.contains("..")
        && !email.chars().any(|c| c.is_whitespace() || c.is_control())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn token(purpose: TokenPurpose, expires_at: DateTime<Utc>) -> PendingToken {
        PendingToken {
            token_hash: "hash".to_string(),
            purpose,
            expires_at,
        }
    }

    #[test]
    fn test_valid_emails() {
        assert!(is_valid_email("user@example.com"));
        assert!(is_valid_email("user.name@example.com"));
        assert!(is_valid_email("user+tag@example.co.uk"));
    }

    #[test]
    fn test_invalid_emails() {
        assert!(!is_valid_email("userexample.com"));
        assert!(!is_valid_email("user@"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("user@.com"));
        assert!(!is_valid_email("user@example."));
        assert!(!is_valid_email("user@@example.com"));
        assert!(!is_valid_email("user@exa..mple.com"));
        assert!(!is_valid_email("us er@example.com"));
        assert!(!is_valid_email(""));
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  A@X.Com "), "a@x.com");
    }

    #[test]
    fn test_token_expiry_boundary() {
        let now = Utc::now();
        let t = token(TokenPurpose::Confirmation, now);
        assert!(!t.is_expired(now));
        assert!(t.is_expired(now + Duration::seconds(1)));
    }

    #[test]
    fn test_state() {
        let now = Utc::now();
        let mut account = Account::pending(
            "a@x.com",
            token(TokenPurpose::Confirmation, now + Duration::hours(24)),
            now,
        );
        assert_eq!(account.state(), AccountState::PendingConfirmation);
        assert!(!account.has_password());

        account.pending_token = None;
        assert_eq!(account.state(), AccountState::Unregistered);

        account.password_hash = "$argon2id$...".to_string();
        account.confirmed = true;
        assert_eq!(account.state(), AccountState::Active);
    }
}
