//! Bodies for the verification and reset messages.

use super::Message;
use chrono::Duration;

/// Renders account messages with links back to the web app.
#[derive(Debug, Clone)]
pub struct MessageTemplates {
    base_url: String,
}

impl MessageTemplates {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Sent when registration is initiated and when an unconfirmed account
    /// asks for a reset.
    pub fn verification(&self, to: &str, raw_token: &str, expires_in: Duration) -> Message {
        let link = format!("{}/confirm?token={}", self.base_url, raw_token);
        let body = format!(
            "Welcome to Ranker!\n\n\
             Confirm your email address and choose a password by opening the link below:\n\n\
             {link}\n\n\
             This link will expire in {}. If you did not sign up, you can ignore this message.",
            expiry_hours(expires_in)
        );
        Message::new(to, "Confirm your Ranker account", body)
    }

    pub fn password_reset(&self, to: &str, raw_token: &str, expires_in: Duration) -> Message {
        let link = format!("{}/reset-password?token={}", self.base_url, raw_token);
        let body = format!(
            "We received a request to reset your Ranker password.\n\n\
             Choose a new password by opening the link below:\n\n\
             {link}\n\n\
             This link will expire in {}. If you did not request a reset, you can ignore this message.",
            expiry_hours(expires_in)
        );
        Message::new(to, "Reset your Ranker password", body)
    }
}

fn expiry_hours(ttl: Duration) -> String {
    match ttl.num_hours().max(1) {
        1 => "1 hour".to_string(),
        n => format!("{n} hours"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verification_link() {
        let templates = MessageTemplates::new("https://ranker.app/");
        let message = templates.verification("a@x.com", "abc", Duration::hours(24));

        assert_eq!(message.to, "a@x.com");
        assert!(message.body.contains("https://ranker.app/confirm?token=abc"));
        assert!(message.body.contains("expire in 24 hours"));
    }

    #[test]
    fn test_reset_link() {
        let templates = MessageTemplates::new("http://localhost:3000");
        let message = templates.password_reset("a@x.com", "xyz", Duration::hours(2));

        assert!(message.body.contains("http://localhost:3000/reset-password?token=xyz"));
        assert!(message.body.contains("expire in 2 hours"));
    }

    #[test]
    fn test_short_ttl_rounds_to_one_hour() {
        let message = MessageTemplates::new("http://x").verification("a@x.com", "t", Duration::minutes(10));
        assert!(message.body.contains("expire in 1 hour."));
    }
}
