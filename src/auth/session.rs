//! Session token issuance and verification.
//!
//! Sessions are HS256 JWTs. `iat` and `exp` come from the injected
//! [`Clock`], and expiry is checked against the same clock on
//! verification, so tests can move time without sleeping.
//!
//! # Example
//!
//! ```rust,ignore
//! use ranker_accounts::auth::TokenIssuer;
//! use secrecy::SecretString;
//!
//! let issuer = TokenIssuer::new(SecretString::new(secret), Arc::new(SystemClock))?
//!     .with_issuer("ranker");
//!
//! let token = issuer.issue(&account)?;
//! let claims = issuer.verify(&token)?;
//! ```

use crate::account::Account;
use crate::clock::Clock;
use crate::error::{AccountError, Result};
use chrono::Duration;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Role claim given to every self-registered account.
pub const DEFAULT_ROLE: &str = "user";

/// Claims carried by a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub user_id: String,
    pub email: String,
    pub role: String,
    /// Issued at (unix seconds)
    pub iat: i64,
    /// Expiry (unix seconds)
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
}

/// Signs and verifies session tokens.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    issuer: Option<String>,
    role: String,
}

impl TokenIssuer {
    /// Fails with a configuration error if the secret is empty.
    pub fn new(secret: SecretString, clock: Arc<dyn Clock>) -> Result<Self> {
        let bytes = secret.expose_secret().as_bytes();
        if bytes.is_empty() {
            return Err(AccountError::configuration("JWT secret must not be empty"));
        }

        Ok(Self {
            encoding_key: EncodingKey::from_secret(bytes),
            decoding_key: DecodingKey::from_secret(bytes),
            clock,
            ttl: Duration::hours(24),
            issuer: None,
            role: DEFAULT_ROLE.to_string(),
        })
    }

    /// Session lifetime (default: 24 hours).
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Stamp and require an `iss` claim.
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = role.into();
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issue(&self, account: &Account) -> Result<String> {
        let now = self.clock.now();
        let claims = SessionClaims {
            user_id: account.id.clone(),
            email: account.email.clone(),
            role: self.role.clone(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
            iss: self.issuer.clone(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AccountError::internal(format!("Failed to sign session token: {}", e)))
    }

    /// Verify signature, issuer and expiry.
    pub fn verify(&self, token: &str) -> Result<SessionClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        // exp is checked against our clock below
        validation.validate_exp = false;
        match &self.issuer {
            Some(iss) => {
                validation.set_required_spec_claims(&["exp", "iss"]);
                validation.set_issuer(&[iss]);
            }
            None => validation.set_required_spec_claims(&["exp"]),
        }

        let data = decode::<SessionClaims>(token, &self.decoding_key, &validation)
            .map_err(|e| AccountError::InvalidSession(e.to_string()))?;

        if data.claims.exp <= self.clock.now().timestamp() {
            return Err(AccountError::InvalidSession("token expired".into()));
        }

        Ok(data.claims)
    }
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("ttl", &self.ttl)
            .field("issuer", &self.issuer)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::{PendingToken, TokenPurpose};
    use crate::clock::ManualClock;

    fn account() -> Account {
        let now = chrono::Utc::now();
        let mut account = Account::pending(
            "a@x.com",
            PendingToken {
                token_hash: "h".into(),
                purpose: TokenPurpose::Confirmation,
                expires_at: now,
            },
            now,
        );
        account.confirmed = true;
        account.pending_token = None;
        account
    }

    fn issuer(secret: &str, clock: &ManualClock) -> TokenIssuer {
        TokenIssuer::new(SecretString::new(secret.to_string()), Arc::new(clock.clone())).unwrap()
    }

    #[test]
    fn test_issue_and_verify() {
        let clock = ManualClock::starting_now();
        let issuer = issuer("test-secret", &clock);
        let account = account();

        let claims = issuer.verify(&issuer.issue(&account).unwrap()).unwrap();

        assert_eq!(claims.user_id, account.id);
        assert_eq!(claims.email, "a@x.com");
        assert_eq!(claims.role, "user");
        assert_eq!(claims.iat, clock.now().timestamp());
        assert_eq!(claims.exp, claims.iat + 24 * 3600);
    }

    #[test]
    fn test_rejects_foreign_secret() {
        let clock = ManualClock::starting_now();
        let token = issuer("secret-a", &clock).issue(&account()).unwrap();

        let err = issuer("secret-b", &clock).verify(&token).unwrap_err();
        assert!(matches!(err, AccountError::InvalidSession(_)));
    }

    #[test]
    fn test_rejects_expired() {
        let clock = ManualClock::starting_now();
        let issuer = issuer("test-secret", &clock);
        let token = issuer.issue(&account()).unwrap();

        clock.advance(Duration::hours(24));
        assert!(issuer.verify(&token).is_err());
    }

    #[test]
    fn test_issuer_claim_enforced() {
        let clock = ManualClock::starting_now();
        let plain = issuer("test-secret", &clock);
        let named = issuer("test-secret", &clock).with_issuer("ranker");

        let token = named.issue(&account()).unwrap();
        assert_eq!(named.verify(&token).unwrap().iss.as_deref(), Some("ranker"));

        let untagged = plain.issue(&account()).unwrap();
        assert!(matches!(
            named.verify(&untagged),
            Err(AccountError::InvalidSession(_))
        ));

        let foreign = issuer("test-secret", &clock)
            .with_issuer("elsewhere")
            .issue(&account())
            .unwrap();
        assert!(named.verify(&foreign).is_err());

        // No configured issuer accepts either form.
        assert!(plain.verify(&token).is_ok());
        assert!(plain.verify(&untagged).is_ok());
    }

    #[test]
    fn test_empty_secret_rejected() {
        let clock = ManualClock::starting_now();
        let err = TokenIssuer::new(SecretString::new(String::new()), Arc::new(clock)).unwrap_err();
        assert!(matches!(err, AccountError::Configuration(_)));
    }

    #[test]
    fn test_garbage_token() {
        let clock = ManualClock::starting_now();
        assert!(issuer("test-secret", &clock).verify("not.a.jwt").is_err());
    }
}
