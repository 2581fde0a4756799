//! Account authentication.
//!
//! - [`password`] - Argon2id hashing and the password policy
//! - [`tokens`] - single-use confirmation and reset tokens
//! - [`session`] - signed session tokens
//! - [`rate_limit`] - admission control shared by all operations
//! - [`flows`] - registration, reset and login state machines
//! - [`AccountService`] - the rate-limited entry point over the flows
//! - [`AuthSession`] - axum extractor for protected routes

pub mod extractors;
pub mod flows;
pub mod password;
pub mod rate_limit;
pub mod service;
pub mod session;
pub mod tokens;

pub use extractors::{AuthSession, TokenExtractor};
pub use flows::{
    FlowContext, LoginFlow, LoginFlowConfig, PasswordResetFlow, RegistrationFlow,
};
pub use password::{CredentialHasher, PasswordConfig, PasswordError, PasswordPolicy};
pub use rate_limit::{AuthRateLimiter, RateLimitConfig};
pub use service::AccountService;
pub use session::{SessionClaims, TokenIssuer};
pub use tokens::{IssuedToken, hash_token};
