//! SMTP notifier using lettre

use super::{Message, Notifier};
use crate::error::{AccountError, Result};
use crate::utils::{get_env_with_prefix, parse_env_with_prefix};
use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Tokio1Executor,
    message::{Mailbox, header::ContentType},
    transport::smtp::authentication::Credentials,
};
use secrecy::{ExposeSecret, SecretString};

/// SMTP configuration
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    /// Default: 587 (STARTTLS)
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<SecretString>,
    /// Sender address for every account message.
    pub from: String,
    pub starttls: bool,
}

impl SmtpConfig {
    pub fn new(host: impl Into<String>, from: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: 587,
            username: None,
            password: None,
            from: from.into(),
            starttls: true,
        }
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(SecretString::new(password.into()));
        self
    }

    /// Disable STARTTLS (use plain connection or implicit TLS)
    pub fn no_starttls(mut self) -> Self {
        self.starttls = false;
        self
    }

    /// Create config from environment variables
    ///
    /// Each key is read with the `RANKER_` prefix first:
    /// - `SMTP_HOST` (required)
    /// - `SMTP_PORT` (optional, default: 587)
    /// - `SMTP_USERNAME` / `SMTP_PASSWORD` (optional)
    /// - `MAIL_FROM` (required)
    /// - `SMTP_STARTTLS` (optional, default: true)
    pub fn from_env() -> Result<Self> {
        let host = get_env_with_prefix("SMTP_HOST")
            .ok_or_else(|| AccountError::configuration("SMTP_HOST environment variable not set"))?;
        let from = get_env_with_prefix("MAIL_FROM")
            .ok_or_else(|| AccountError::configuration("MAIL_FROM environment variable not set"))?;

        Ok(Self {
            host,
            port: parse_env_with_prefix("SMTP_PORT").unwrap_or(587),
            username: get_env_with_prefix("SMTP_USERNAME"),
            password: get_env_with_prefix("SMTP_PASSWORD").map(SecretString::new),
            from,
            starttls: get_env_with_prefix("SMTP_STARTTLS")
                .map(|v| v != "false" && v != "0")
                .unwrap_or(true),
        })
    }
}

/// Delivers account messages over SMTP.
///
/// # Example
///
/// ```rust,ignore
/// use ranker_accounts::notify::{SmtpConfig, SmtpNotifier};
///
/// let config = SmtpConfig::new("smtp.example.com", "noreply@ranker.app")
///     .credentials("user", "app-password");
/// let notifier = SmtpNotifier::new(config)?;
/// ```
pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    host: String,
}

impl SmtpNotifier {
    pub fn new(config: SmtpConfig) -> Result<Self> {
        let from: Mailbox = config
            .from
            .parse()
            .map_err(|e| AccountError::configuration(format!("Invalid sender address: {}", e)))?;

        let mut builder = if config.starttls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
        }
        .map_err(|e| AccountError::configuration(format!("Failed to create SMTP transport: {}", e)))?
        .port(config.port);

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(
                username.clone(),
                password.expose_secret().clone(),
            ));
        }

        Ok(Self {
            transport: builder.build(),
            from,
            host: config.host,
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(SmtpConfig::from_env()?)
    }

    fn build_message(&self, message: &Message) -> Result<lettre::Message> {
        let to: Mailbox = message
            .to
            .parse()
            .map_err(|e| AccountError::internal(format!("Invalid recipient address: {}", e)))?;

        lettre::Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(&message.subject)
            .header(ContentType::TEXT_PLAIN)
            .body(message.body.clone())
            .map_err(|e| AccountError::internal(format!("Failed to build email: {}", e)))
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send(&self, message: &Message) -> Result<()> {
        message.validate()?;
        let email = self.build_message(message)?;

        self.transport
            .send(email)
            .await
            .map_err(|e| AccountError::internal(format!("Failed to send email: {}", e)))?;

        Ok(())
    }
}

// AsyncSmtpTransport doesn't impl Debug
impl std::fmt::Debug for SmtpNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpNotifier")
            .field("host", &self.host)
            .field("from", &self.from.to_string())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_bad_sender() {
        let err = SmtpNotifier::new(SmtpConfig::new("localhost", "not an address")).unwrap_err();
        assert!(matches!(err, AccountError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_builds_plain_text_message() {
        let notifier =
            SmtpNotifier::new(SmtpConfig::new("localhost", "noreply@ranker.app").no_starttls())
                .unwrap();
        let email = notifier
            .build_message(&Message::new("a@x.com", "Confirm", "Body"))
            .unwrap();
        let raw = String::from_utf8(email.formatted()).unwrap();
        assert!(raw.contains("Subject: Confirm"));
        assert!(raw.contains("To: a@x.com"));
    }

    #[test]
    fn test_config_password_is_secret() {
        let config = SmtpConfig::new("localhost", "noreply@ranker.app").credentials("u", "hunter2");
        assert!(!format!("{:?}", config).contains("hunter2"));
    }
}
