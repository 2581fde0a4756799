//! Outbound account notifications
//!
//! The flows hand a [`Message`] to a [`Notifier`] after the store write that
//! created the token it carries. Backends:
//! - `ConsoleNotifier` - logs messages to stdout with bodies redacted (development)
//! - `SmtpNotifier` - sends via SMTP using lettre (feature `smtp`)
//!
//! Message bodies come from [`MessageTemplates`].

mod console;
#[cfg(feature = "smtp")]
mod smtp;
mod templates;

pub use console::ConsoleNotifier;
#[cfg(feature = "smtp")]
pub use smtp::{SmtpConfig, SmtpNotifier};
pub use templates::MessageTemplates;

use crate::error::{AccountError, Result};
use async_trait::async_trait;

/// A plain-text message addressed to one account holder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl Message {
    pub fn new(to: impl Into<String>, subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            subject: subject.into(),
            body: body.into(),
        }
    }

    /// Validate the message has required fields
    pub fn validate(&self) -> Result<()> {
        if self.to.is_empty() {
            return Err(AccountError::internal("message recipient is required"));
        }
        if self.subject.is_empty() {
            return Err(AccountError::internal("message subject is required"));
        }
        if self.body.is_empty() {
            return Err(AccountError::internal("message body is required"));
        }
        Ok(())
    }
}

/// Delivery backend for account messages.
///
/// Delivery is best-effort: an `Err` means the message was not handed off,
/// and the calling flow decides what to do about it.
///
/// # Example
///
/// ```rust,ignore
/// use ranker_accounts::notify::{Message, Notifier};
/// use async_trait::async_trait;
///
/// struct QueueNotifier { queue: MyQueue }
///
/// #[async_trait]
/// impl Notifier for QueueNotifier {
///     async fn send(&self, message: &Message) -> Result<()> {
///         self.queue.push(message.clone()).await.map_err(AccountError::internal)
///     }
/// }
/// ```
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, message: &Message) -> Result<()>;
}
