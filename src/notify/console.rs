//! Console notifier for development
//!
//! Prints messages to stdout instead of delivering them.
//!
//! # Security Warning
//!
//! Message bodies carry live confirmation and reset links. Bodies are
//! redacted unless `with_full_output(true)` is set, and that should never be
//! enabled where stdout is shipped to a log aggregator.

use super::{Message, Notifier};
use crate::error::Result;
use async_trait::async_trait;

#[derive(Debug, Clone)]
pub struct ConsoleNotifier {
    prefix: String,
    show_full_content: bool,
}

impl ConsoleNotifier {
    pub fn new() -> Self {
        Self {
            prefix: "[MAIL]".to_string(),
            show_full_content: false,
        }
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            show_full_content: false,
        }
    }

    /// Print message bodies in full. Development only.
    pub fn with_full_output(mut self, enabled: bool) -> Self {
        if enabled {
            tracing::warn!(
                "ConsoleNotifier: full output enabled - confirmation links will be visible in logs. \
                 Do not use in production!"
            );
        }
        self.show_full_content = enabled;
        self
    }

    fn render(&self, message: &Message) -> Vec<String> {
        let mut lines = vec![
            format!("{} To:      {}", self.prefix, message.to),
            format!("{} Subject: {}", self.prefix, message.subject),
        ];
        if self.show_full_content {
            lines.extend(message.body.lines().map(|l| format!("{} {}", self.prefix, l)));
        } else {
            lines.push(format!("{} [BODY] {} bytes [REDACTED]", self.prefix, message.body.len()));
        }
        lines
    }
}

impl Default for ConsoleNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Notifier for ConsoleNotifier {
    async fn send(&self, message: &Message) -> Result<()> {
        message.validate()?;
        for line in self.render(message) {
            println!("{line}");
        }
        Ok(())
    }
}
