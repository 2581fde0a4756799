//! Account Server Example
//!
//! Runs the account endpoints over the in-memory store, with a protected
//! `/me` route and the cleanup sweeper.
//!
//! Run with: RANKER_JWT_SECRET=dev-secret cargo run --example server
//!
//! Messages are printed to the console unless `SMTP_HOST` and `MAIL_FROM`
//! are set.

use axum::{Json, Router, routing::get};
use ranker_accounts::notify::{ConsoleNotifier, Notifier};
use ranker_accounts::store::InMemoryAccountStore;
use ranker_accounts::{App, AuthSession, Config, ConfigBuilder, Result};
use serde_json::json;
use std::sync::Arc;

async fn me(AuthSession(session): AuthSession) -> Json<serde_json::Value> {
    Json(json!({
        "user_id": session.user_id,
        "email": session.email,
        "role": session.role,
    }))
}

fn notifier(config: &Config) -> Result<Arc<dyn Notifier>> {
    #[cfg(feature = "smtp")]
    if let Ok(smtp) = ranker_accounts::notify::SmtpConfig::from_env() {
        let smtp = ranker_accounts::notify::SmtpNotifier::new(smtp)?;
        tracing::info!(?smtp, "Sending account messages over SMTP");
        return Ok(Arc::new(smtp));
    }

    Ok(Arc::new(
        ConsoleNotifier::new().with_full_output(config.mail.console_full_output),
    ))
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = ConfigBuilder::new().from_env().build()?;
    ranker_accounts::init_tracing_with_config(&config);

    let notifier = notifier(&config)?;
    let app = App::new(config, Arc::new(InMemoryAccountStore::new()), notifier)?
        .merge_protected(Router::new().route("/me", get(me)));

    app.serve().await
}
