//! Entry point for every account operation.
//!
//! [`AccountService`] owns the rate limiter and the three flows. Each public
//! operation is admitted by the limiter first; a rejected call touches
//! neither the store nor the password hasher.

use crate::auth::flows::{
    FlowContext, LoginFlow, LoginFlowConfig, PasswordResetFlow, RegistrationFlow,
};
use crate::auth::rate_limit::AuthRateLimiter;
use crate::auth::session::TokenIssuer;
use crate::error::Result;
use governor::clock::{Clock, DefaultClock};

/// Rate-limited facade over the registration, reset and login flows.
///
/// # Example
///
/// ```rust,ignore
/// let ctx = FlowContext::new(store, notifier, MessageTemplates::new(base_url));
/// let service = AccountService::new(
///     AuthRateLimiter::new(&RateLimitConfig::default())?,
///     ctx,
///     TokenIssuer::new(secret, Arc::new(SystemClock))?,
///     LoginFlowConfig::default(),
/// );
///
/// service.initiate_registration("new@example.com").await?;
/// ```
pub struct AccountService<C: Clock = DefaultClock> {
    limiter: AuthRateLimiter<C>,
    registration: RegistrationFlow,
    reset: PasswordResetFlow,
    login: LoginFlow,
}

impl<C: Clock> AccountService<C> {
    pub fn new(
        limiter: AuthRateLimiter<C>,
        ctx: FlowContext,
        issuer: TokenIssuer,
        login_config: LoginFlowConfig,
    ) -> Self {
        Self {
            limiter,
            registration: RegistrationFlow::new(ctx.clone()),
            reset: PasswordResetFlow::new(ctx.clone()),
            login: LoginFlow::new(ctx, issuer, login_config),
        }
    }

    /// Verifier for session tokens issued by [`authenticate`](Self::authenticate).
    pub fn token_issuer(&self) -> &TokenIssuer {
        self.login.issuer()
    }

    pub async fn initiate_registration(&self, email: &str) -> Result<()> {
        self.limiter.check()?;
        self.registration.initiate(email).await
    }

    pub async fn complete_registration(&self, token: &str, password: &str) -> Result<()> {
        self.limiter.check()?;
        self.registration.complete(token, password).await
    }

    pub async fn initiate_reset(&self, email: &str) -> Result<()> {
        self.limiter.check()?;
        self.reset.initiate_reset(email).await
    }

    pub async fn complete_reset(&self, token: &str, new_password: &str) -> Result<()> {
        self.limiter.check()?;
        self.reset.complete_reset(token, new_password).await
    }

    /// Returns a signed session token.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<String> {
        self.limiter.check()?;
        self.login.authenticate(email, password).await
    }
}

impl<C: Clock> std::fmt::Debug for AccountService<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountService")
            .field("login", &self.login)
            .finish_non_exhaustive()
    }
}
