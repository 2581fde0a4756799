//! Account lifecycle flows.
//!
//! Each flow is a small state machine over one [`Account`] document:
//! registration (initiate, complete), password reset (initiate, complete)
//! and login. They share a [`FlowContext`] holding the store, notifier,
//! clock and hashing settings.

mod login;
mod register;
mod reset;
mod types;

pub use login::{LoginFlow, LoginFlowConfig};
pub use register::RegistrationFlow;
pub use reset::PasswordResetFlow;
pub use types::*;

use crate::account::{Account, TokenPurpose};
use crate::auth::password::{CredentialHasher, PasswordPolicy};
use crate::auth::tokens::hash_token;
use crate::clock::{Clock, SystemClock};
use crate::error::{AccountError, Result};
use crate::notify::{MessageTemplates, Notifier};
use crate::store::AccountStore;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

/// Collaborators and settings shared by every flow.
#[derive(Clone)]
pub struct FlowContext {
    pub(crate) store: Arc<dyn AccountStore>,
    pub(crate) notifier: Arc<dyn Notifier>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) hasher: CredentialHasher,
    pub(crate) policy: PasswordPolicy,
    pub(crate) templates: MessageTemplates,
    pub(crate) token_ttl: Duration,
}

impl FlowContext {
    pub fn new(
        store: Arc<dyn AccountStore>,
        notifier: Arc<dyn Notifier>,
        templates: MessageTemplates,
    ) -> Self {
        Self {
            store,
            notifier,
            clock: Arc::new(SystemClock),
            hasher: CredentialHasher::default(),
            policy: PasswordPolicy::default(),
            templates,
            token_ttl: Duration::hours(24),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_hasher(mut self, hasher: CredentialHasher) -> Self {
        self.hasher = hasher;
        self
    }

    pub fn with_policy(mut self, policy: PasswordPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Lifetime of confirmation and reset tokens (default: 24 hours).
    pub fn with_token_ttl(mut self, ttl: Duration) -> Self {
        self.token_ttl = ttl;
        self
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        self.clock.clone()
    }

    pub fn store(&self) -> Arc<dyn AccountStore> {
        self.store.clone()
    }

    /// Resolve a presented raw token to the account holding it.
    ///
    /// Fails `InvalidToken` if no account holds it or it was issued for a
    /// different purpose, and `ExpiredToken` once `now` is past its expiry.
    /// Returns the account and the token hash for the conditional update.
    pub(crate) async fn redeemable(
        &self,
        raw_token: &str,
        purpose: TokenPurpose,
        now: DateTime<Utc>,
    ) -> Result<(Account, String)> {
        let token_hash = hash_token(raw_token);

        let account = self
            .store
            .find_by_token(&token_hash)
            .await?
            .ok_or(AccountError::InvalidToken)?;

        let pending = account
            .pending_token
            .as_ref()
            .filter(|t| t.purpose == purpose)
            .ok_or(AccountError::InvalidToken)?;

        if pending.is_expired(now) {
            return Err(AccountError::ExpiredToken);
        }

        Ok((account, token_hash))
    }
}

impl std::fmt::Debug for FlowContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlowContext")
            .field("hasher", &self.hasher)
            .field("policy", &self.policy)
            .field("templates", &self.templates)
            .field("token_ttl", &self.token_ttl)
            .finish_non_exhaustive()
    }
}

/// Short reason code for failure logs.
pub(crate) fn failure_reason(err: &AccountError) -> &'static str {
    match err {
        AccountError::InvalidEmail => "invalid_email",
        AccountError::WeakPassword(_) => "weak_password",
        AccountError::Conflict => "conflict",
        AccountError::InvalidToken => "invalid_token",
        AccountError::ExpiredToken => "expired_token",
        AccountError::InvalidCredentials => "invalid_credentials",
        AccountError::UnconfirmedEmail => "unconfirmed_email",
        AccountError::RegistrationIncomplete => "registration_incomplete",
        _ => "internal",
    }
}
