//! Password reset flow.
//!
//! Requesting a reset never tells the caller whether the email is known.
//!
//! # Tracing Events
//!
//! - `auth.password.reset_requested` - Reset requested (`account_found` field)
//! - `auth.password.reset_completed` - Password replaced
//! - `auth.password.reset_failed` - Completion rejected, or message not sent

use super::{FlowContext, failure_reason};
use crate::account::{TokenPurpose, is_valid_email, normalize_email};
use crate::auth::tokens::IssuedToken;
use crate::error::{AccountError, Result};
use crate::store::AccountUpdate;

#[derive(Debug, Clone)]
pub struct PasswordResetFlow {
    ctx: FlowContext,
}

impl PasswordResetFlow {
    pub fn new(ctx: FlowContext) -> Self {
        Self { ctx }
    }

    /// Issue a reset link for `email` if it belongs to an account.
    ///
    /// Returns `Ok(())` for unknown and malformed addresses too. An account
    /// that never finished registering gets a fresh confirmation link
    /// instead, since it has no password to reset.
    pub async fn initiate_reset(&self, email: &str) -> Result<()> {
        let email = normalize_email(email);
        if !is_valid_email(&email) {
            tracing::info!(
                target: "auth.password.reset_requested",
                account_found = false,
                "Password reset requested for malformed email"
            );
            return Ok(());
        }

        let Some(account) = self.ctx.store.find_by_email(&email).await? else {
            tracing::info!(
                target: "auth.password.reset_requested",
                account_found = false,
                "Password reset requested for unknown email"
            );
            return Ok(());
        };

        let purpose = if account.confirmed {
            TokenPurpose::PasswordReset
        } else {
            TokenPurpose::Confirmation
        };
        let ttl = self.ctx.token_ttl;
        let token = IssuedToken::generate(purpose, self.ctx.clock.now() + ttl);

        // Overwriting the slot invalidates any token sent earlier.
        let update = AccountUpdate::new().set_token(token.pending.clone());
        match self.ctx.store.update_fields(&email, &update).await {
            Ok(1) => {}
            Ok(_) => {
                tracing::info!(
                    target: "auth.password.reset_requested",
                    account_found = false,
                    "Account removed before reset token was stored"
                );
                return Ok(());
            }
            Err(err) => {
                tracing::error!(
                    target: "auth.password.reset_failed",
                    user_id = %account.id,
                    error = %err,
                    "Failed to store reset token"
                );
                return Ok(());
            }
        }

        let message = match purpose {
            TokenPurpose::PasswordReset => self.ctx.templates.password_reset(&email, &token.raw, ttl),
            TokenPurpose::Confirmation => self.ctx.templates.verification(&email, &token.raw, ttl),
        };

        if let Err(err) = self.ctx.notifier.send(&message).await {
            tracing::error!(
                target: "auth.password.reset_failed",
                user_id = %account.id,
                reason = "notify_failed",
                error = %err,
                "Reset message not sent"
            );
            return Ok(());
        }

        tracing::info!(
            target: "auth.password.reset_requested",
            account_found = true,
            user_id = %account.id,
            confirmed = account.confirmed,
            expires_in_secs = ttl.num_seconds(),
            "Password reset message sent"
        );

        Ok(())
    }

    /// Redeem a reset token and replace the password.
    ///
    /// Leaves `confirmed` untouched.
    pub async fn complete_reset(&self, token: &str, new_password: &str) -> Result<()> {
        let result = self.try_complete(token, new_password).await;
        match &result {
            Ok(user_id) => tracing::info!(
                target: "auth.password.reset_completed",
                user_id = %user_id,
                "Password reset completed"
            ),
            Err(err) if !err.is_internal() => tracing::info!(
                target: "auth.password.reset_failed",
                reason = failure_reason(err),
                "Password reset rejected"
            ),
            Err(_) => {}
        }
        result.map(|_| ())
    }

    async fn try_complete(&self, token: &str, new_password: &str) -> Result<String> {
        let now = self.ctx.clock.now();
        let (account, token_hash) = self
            .ctx
            .redeemable(token, TokenPurpose::PasswordReset, now)
            .await?;

        self.ctx.policy.check(new_password)?;
        let password_hash = self.ctx.hasher.hash(new_password)?;

        let update = AccountUpdate::new()
            .password_hash(password_hash)
            .clear_token()
            .when_token(token_hash);

        if self.ctx.store.update_fields(&account.email, &update).await? == 0 {
            return Err(AccountError::InvalidToken);
        }

        Ok(account.id)
    }
}
