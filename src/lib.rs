//! Ranker accounts - account lifecycle and credential issuance
//!
//! Email-first registration, password reset and login for the ranker API,
//! built on Axum and Tokio.
//!
//! # Features
//!
//! - **Registration**: email-first signup with a single-use confirmation link
//! - **Password reset**: enumeration-resistant reset by emailed link
//! - **Login**: Argon2id credential checks and HS256 session tokens
//! - **Rate limiting**: one token bucket in front of every auth operation
//! - **Cleanup**: background removal of registrations never confirmed
//! - **Testing**: in-memory store, recording notifier and HTTP scenarios
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use ranker_accounts::{App, ConfigBuilder, notify::ConsoleNotifier, store::InMemoryAccountStore};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> ranker_accounts::Result<()> {
//!     ranker_accounts::init_tracing();
//!
//!     let config = ConfigBuilder::new().from_env().build()?;
//!     let app = App::new(
//!         config,
//!         Arc::new(InMemoryAccountStore::new()),
//!         Arc::new(ConsoleNotifier::new()),
//!     )?;
//!
//!     app.serve().await
//! }
//! ```

pub mod account;
pub mod auth;
pub mod clock;
mod config;
mod core;
mod error;
pub mod http;
pub mod jobs;
pub mod notify;
pub mod store;
pub mod testing;
mod utils;

// Re-exports for public API
pub use account::{Account, PendingToken, TokenPurpose};
pub use auth::{AccountService, AuthSession, SessionClaims};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{
    AuthConfig, Config, ConfigBuilder, LoggingConfig, MailConfig, ServerConfig, StoreConfig,
};
pub use core::App;
pub use error::{AccountError, ErrorKind, Result};

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing/logging with sensible defaults
///
/// # Environment Variables
///
/// - `RUST_LOG`: Set log level (e.g., "info", "auth=debug")
/// - `RANKER_LOG_JSON`: Set to "true" for JSON formatted logs
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let json_logs = std::env::var("RANKER_LOG_JSON")
        .map(|v| v.parse::<bool>().unwrap_or(false))
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

/// Initialize tracing with a custom configuration
///
/// `RUST_LOG` still wins over `config.logging.level` when set.
pub fn init_tracing_with_config(config: &Config) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    if config.logging.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}
