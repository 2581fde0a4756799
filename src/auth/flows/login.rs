//! Login flow.
//!
//! # Tracing Events
//!
//! - `auth.login.succeeded` - Session issued
//! - `auth.login.failed` - Credentials rejected (reason field)

use super::{FlowContext, failure_reason};
use crate::account::{Account, normalize_email};
use crate::auth::session::TokenIssuer;
use crate::error::{AccountError, Result};
use crate::store::AccountUpdate;

/// Configuration for the login flow.
#[derive(Clone, Debug, Default)]
pub struct LoginFlowConfig {
    /// Report unconfirmed and half-registered accounts as plain
    /// `InvalidCredentials` (default: false).
    ///
    /// When enabled, those accounts cost a dummy password verification and
    /// are indistinguishable from a wrong password, at the price of users
    /// not being told to finish confirming their email.
    pub conceal_account_state: bool,
}

impl LoginFlowConfig {
    pub fn conceal_account_state(mut self, conceal: bool) -> Self {
        self.conceal_account_state = conceal;
        self
    }
}

/// Verifies credentials and issues session tokens.
#[derive(Debug, Clone)]
pub struct LoginFlow {
    ctx: FlowContext,
    issuer: TokenIssuer,
    config: LoginFlowConfig,
}

impl LoginFlow {
    pub fn new(ctx: FlowContext, issuer: TokenIssuer, config: LoginFlowConfig) -> Self {
        Self {
            ctx,
            issuer,
            config,
        }
    }

    pub fn issuer(&self) -> &TokenIssuer {
        &self.issuer
    }

    /// Check credentials and return a signed session token.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<String> {
        let email = normalize_email(email);
        match self.try_authenticate(&email, password).await {
            Ok((account, token)) => {
                tracing::info!(
                    target: "auth.login.succeeded",
                    user_id = %account.id,
                    "Login succeeded"
                );
                Ok(token)
            }
            Err(err) => {
                if !err.is_internal() {
                    tracing::info!(
                        target: "auth.login.failed",
                        reason = failure_reason(&err),
                        "Login rejected"
                    );
                }
                Err(err)
            }
        }
    }

    async fn try_authenticate(&self, email: &str, password: &str) -> Result<(Account, String)> {
        let Some(account) = self.ctx.store.find_by_email(email).await? else {
            self.ctx.hasher.verify_dummy(password);
            return Err(AccountError::InvalidCredentials);
        };

        if !account.confirmed {
            return Err(self.state_error(password, AccountError::UnconfirmedEmail));
        }
        if !account.has_password() {
            return Err(self.state_error(password, AccountError::RegistrationIncomplete));
        }

        if !self.ctx.hasher.verify(password, &account.password_hash)? {
            return Err(AccountError::InvalidCredentials);
        }

        self.upgrade_hash(&account, password).await;

        let token = self.issuer.issue(&account)?;
        Ok((account, token))
    }

    fn state_error(&self, password: &str, err: AccountError) -> AccountError {
        if self.config.conceal_account_state {
            self.ctx.hasher.verify_dummy(password);
            AccountError::InvalidCredentials
        } else {
            err
        }
    }

    /// Rehash with current parameters if the stored hash is older.
    /// Failures are logged; the login itself already succeeded.
    async fn upgrade_hash(&self, account: &Account, password: &str) {
        match self.ctx.hasher.needs_rehash(&account.password_hash) {
            Ok(false) => return,
            Ok(true) => {}
            Err(err) => {
                tracing::warn!(user_id = %account.id, error = %err, "Could not inspect password hash");
                return;
            }
        }

        let upgraded = match self.ctx.hasher.hash(password) {
            Ok(hash) => hash,
            Err(err) => {
                tracing::warn!(user_id = %account.id, error = %err, "Password rehash failed");
                return;
            }
        };

        // A reset that lands between our read and this write wins.
        let update = AccountUpdate::new()
            .password_hash(upgraded)
            .when_password_hash(account.password_hash.clone());
        match self.ctx.store.update_fields(&account.email, &update).await {
            Ok(0) => {
                tracing::debug!(user_id = %account.id, "Password changed concurrently, skipping rehash");
            }
            Ok(_) => tracing::debug!(user_id = %account.id, "Password hash upgraded"),
            Err(err) => {
                tracing::warn!(user_id = %account.id, error = %err, "Failed to store rehashed password");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::{PendingToken, TokenPurpose};
    use crate::auth::password::{CredentialHasher, PasswordConfig};
    use crate::clock::{Clock, ManualClock};
    use crate::notify::MessageTemplates;
    use crate::store::{AccountFilter, AccountStore, InMemoryAccountStore};
    use async_trait::async_trait;
    use crate::testing::RecordingNotifier;
    use chrono::Duration;
    use secrecy::SecretString;
    use std::sync::Arc;

    struct Harness {
        store: InMemoryAccountStore,
        clock: ManualClock,
        hasher: CredentialHasher,
        issuer: TokenIssuer,
        ctx: FlowContext,
    }

    impl Harness {
        fn new() -> Self {
            let store = InMemoryAccountStore::new();
            let clock = ManualClock::starting_now();
            let hasher = CredentialHasher::new(PasswordConfig::fast());
            let ctx = FlowContext::new(
                Arc::new(store.clone()),
                Arc::new(RecordingNotifier::new()),
                MessageTemplates::new("https://ranker.app"),
            )
            .with_clock(Arc::new(clock.clone()))
            .with_hasher(hasher.clone());
            let issuer =
                TokenIssuer::new(SecretString::new("test-secret".into()), Arc::new(clock.clone()))
                    .unwrap();
            Self {
                store,
                clock,
                hasher,
                issuer,
                ctx,
            }
        }

        fn flow(&self, config: LoginFlowConfig) -> LoginFlow {
            LoginFlow::new(self.ctx.clone(), self.issuer.clone(), config)
        }

        async fn seed(&self, email: &str, password_hash: String, confirmed: bool) -> Account {
            let now = self.clock.now();
            let account = Account {
                id: uuid::Uuid::new_v4().to_string(),
                email: email.to_string(),
                password_hash,
                confirmed,
                pending_token: (!confirmed).then(|| PendingToken {
                    token_hash: "h".into(),
                    purpose: TokenPurpose::Confirmation,
                    expires_at: now + Duration::hours(24),
                }),
                created_at: now,
            };
            self.store.insert(account.clone()).await;
            account
        }
    }

    #[tokio::test]
    async fn test_login_issues_session() {
        let h = Harness::new();
        let account = h.seed("a@x.com", h.hasher.hash("pw123456").unwrap(), true).await;

        let token = h.flow(LoginFlowConfig::default())
            .authenticate(" A@X.COM", "pw123456")
            .await
            .unwrap();

        let claims = h.issuer.verify(&token).unwrap();
        assert_eq!(claims.user_id, account.id);
        assert_eq!(claims.exp, claims.iat + 24 * 3600);
    }

    #[tokio::test]
    async fn test_unknown_and_wrong_password_look_identical() {
        let h = Harness::new();
        h.seed("a@x.com", h.hasher.hash("pw123456").unwrap(), true).await;
        let flow = h.flow(LoginFlowConfig::default());

        let unknown = flow.authenticate("ghost@x.com", "pw123456").await.unwrap_err();
        let wrong = flow.authenticate("a@x.com", "wrong-password").await.unwrap_err();

        assert!(matches!(unknown, AccountError::InvalidCredentials));
        assert!(matches!(wrong, AccountError::InvalidCredentials));
        assert_eq!(unknown.safe_message(), wrong.safe_message());
        assert_eq!(unknown.status_code(), wrong.status_code());
    }

    #[tokio::test]
    async fn test_unconfirmed_account() {
        let h = Harness::new();
        h.seed("a@x.com", String::new(), false).await;

        let err = h.flow(LoginFlowConfig::default())
            .authenticate("a@x.com", "pw123456")
            .await
            .unwrap_err();
        assert!(matches!(err, AccountError::UnconfirmedEmail));

        let err = h.flow(LoginFlowConfig::default().conceal_account_state(true))
            .authenticate("a@x.com", "pw123456")
            .await
            .unwrap_err();
        assert!(matches!(err, AccountError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_confirmed_without_password() {
        let h = Harness::new();
        h.seed("a@x.com", String::new(), true).await;

        let err = h.flow(LoginFlowConfig::default())
            .authenticate("a@x.com", "pw123456")
            .await
            .unwrap_err();
        assert!(matches!(err, AccountError::RegistrationIncomplete));
    }

    #[tokio::test]
    async fn test_old_hash_is_upgraded() {
        let h = Harness::new();
        let legacy = CredentialHasher::new(PasswordConfig::new(2048, 1, 1));
        h.seed("a@x.com", legacy.hash("pw123456").unwrap(), true).await;

        h.flow(LoginFlowConfig::default())
            .authenticate("a@x.com", "pw123456")
            .await
            .unwrap();

        let stored = h.store.find_by_email("a@x.com").await.unwrap().unwrap();
        assert!(!h.hasher.needs_rehash(&stored.password_hash).unwrap());
        assert!(h.hasher.verify("pw123456", &stored.password_hash).unwrap());
    }

    /// Applies a password reset right after the login flow reads the account.
    struct ResetAfterRead {
        inner: InMemoryAccountStore,
        reset_hash: String,
    }

    #[async_trait]
    impl AccountStore for ResetAfterRead {
        async fn create(&self, account: &Account) -> Result<()> {
            self.inner.create(account).await
        }

        async fn find_by_email(&self, email: &str) -> Result<Option<Account>> {
            let found = self.inner.find_by_email(email).await?;
            self.inner
                .update_fields(email, &AccountUpdate::new().password_hash(self.reset_hash.clone()))
                .await?;
            Ok(found)
        }

        async fn find_by_token(&self, token_hash: &str) -> Result<Option<Account>> {
            self.inner.find_by_token(token_hash).await
        }

        async fn update_fields(&self, email: &str, update: &AccountUpdate) -> Result<u64> {
            self.inner.update_fields(email, update).await
        }

        async fn delete_where(&self, filter: &AccountFilter) -> Result<u64> {
            self.inner.delete_where(filter).await
        }
    }

    #[tokio::test]
    async fn test_rehash_does_not_overwrite_concurrent_reset() {
        let h = Harness::new();
        let legacy = CredentialHasher::new(PasswordConfig::new(2048, 1, 1));
        h.seed("a@x.com", legacy.hash("pw123456").unwrap(), true).await;

        let store = ResetAfterRead {
            inner: h.store.clone(),
            reset_hash: h.hasher.hash("fresh-password").unwrap(),
        };
        let ctx = FlowContext::new(
            Arc::new(store),
            Arc::new(RecordingNotifier::new()),
            MessageTemplates::new("https://ranker.app"),
        )
        .with_clock(Arc::new(h.clock.clone()))
        .with_hasher(h.hasher.clone());

        // The old password was valid when read, so login still succeeds.
        LoginFlow::new(ctx, h.issuer.clone(), LoginFlowConfig::default())
            .authenticate("a@x.com", "pw123456")
            .await
            .unwrap();

        let stored = h.store.find_by_email("a@x.com").await.unwrap().unwrap();
        assert!(h.hasher.verify("fresh-password", &stored.password_hash).unwrap());
        assert!(!h.hasher.verify("pw123456", &stored.password_hash).unwrap());
    }
}
