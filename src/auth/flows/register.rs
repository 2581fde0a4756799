//! Registration flow.
//!
//! Registration happens in two steps: the email is claimed and a
//! confirmation link is sent, then the link's token is redeemed together
//! with the chosen password.
//!
//! # Tracing Events
//!
//! - `auth.register.initiated` - Account created and confirmation sent
//! - `auth.register.completed` - Password set and account confirmed
//! - `auth.register.failed` - Either step rejected (reason field)

use super::{FlowContext, failure_reason};
use crate::account::{Account, TokenPurpose, is_valid_email, normalize_email};
use crate::auth::tokens::IssuedToken;
use crate::error::{AccountError, Result};
use crate::store::{AccountFilter, AccountUpdate};

/// Drives an account from unregistered to active.
#[derive(Debug, Clone)]
pub struct RegistrationFlow {
    ctx: FlowContext,
}

impl RegistrationFlow {
    pub fn new(ctx: FlowContext) -> Self {
        Self { ctx }
    }

    /// Claim an email and send its confirmation link.
    ///
    /// If the message cannot be sent the new account is removed again, so
    /// the caller can simply retry.
    pub async fn initiate(&self, email: &str) -> Result<()> {
        let result = self.try_initiate(email).await;
        if let Err(err) = &result {
            if !err.is_internal() {
                tracing::info!(
                    target: "auth.register.failed",
                    step = "initiate",
                    reason = failure_reason(err),
                    "Registration rejected"
                );
            }
        }
        result
    }

    async fn try_initiate(&self, email: &str) -> Result<()> {
        let email = normalize_email(email);
        if !is_valid_email(&email) {
            return Err(AccountError::InvalidEmail);
        }

        if self.ctx.store.find_by_email(&email).await?.is_some() {
            return Err(AccountError::Conflict);
        }

        let now = self.ctx.clock.now();
        let token = IssuedToken::generate(TokenPurpose::Confirmation, now + self.ctx.token_ttl);
        let account = Account::pending(&email, token.pending.clone(), now);

        // The store's uniqueness check decides concurrent initiations.
        self.ctx.store.create(&account).await?;

        let message = self
            .ctx
            .templates
            .verification(&email, &token.raw, self.ctx.token_ttl);

        if let Err(err) = self.ctx.notifier.send(&message).await {
            tracing::error!(
                target: "auth.register.failed",
                step = "initiate",
                reason = "notify_failed",
                user_id = %account.id,
                error = %err,
                "Confirmation message not sent, removing account"
            );
            self.rollback(&email).await;
            return Err(AccountError::internal("confirmation message could not be sent"));
        }

        tracing::info!(
            target: "auth.register.initiated",
            user_id = %account.id,
            expires_in_secs = self.ctx.token_ttl.num_seconds(),
            "Registration initiated"
        );

        Ok(())
    }

    async fn rollback(&self, email: &str) {
        match self
            .ctx
            .store
            .delete_where(&AccountFilter::unconfirmed_email(email))
            .await
        {
            Ok(deleted) => tracing::debug!(deleted, "Removed unconfirmed account after failed send"),
            // Left for the cleanup sweeper.
            Err(err) => tracing::error!(error = %err, "Failed to remove unconfirmed account"),
        }
    }

    /// Redeem a confirmation token and set the account's password.
    pub async fn complete(&self, token: &str, password: &str) -> Result<()> {
        let result = self.try_complete(token, password).await;
        match &result {
            Ok(user_id) => tracing::info!(
                target: "auth.register.completed",
                user_id = %user_id,
                "Registration completed"
            ),
            Err(err) if !err.is_internal() => tracing::info!(
                target: "auth.register.failed",
                step = "complete",
                reason = failure_reason(err),
                "Registration completion rejected"
            ),
            Err(_) => {}
        }
        result.map(|_| ())
    }

    async fn try_complete(&self, token: &str, password: &str) -> Result<String> {
        let now = self.ctx.clock.now();
        let (account, token_hash) = self
            .ctx
            .redeemable(token, TokenPurpose::Confirmation, now)
            .await?;

        self.ctx.policy.check(password)?;
        let password_hash = self.ctx.hasher.hash(password)?;

        let update = AccountUpdate::new()
            .password_hash(password_hash)
            .confirmed(true)
            .clear_token()
            .when_token(token_hash);

        // 0 means a concurrent request redeemed the token first.
        if self.ctx.store.update_fields(&account.email, &update).await? == 0 {
            return Err(AccountError::InvalidToken);
        }

        Ok(account.id)
    }
}
