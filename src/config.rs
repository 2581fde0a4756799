use secrecy::{ExposeSecret, SecretString};
use std::net::SocketAddr;
use std::time::Duration;

use crate::auth::RateLimitConfig;
use crate::error::{AccountError, Result};
use crate::jobs::CleanupConfig;
use crate::utils::{get_env_with_prefix, parse_env_with_prefix};

/// Configuration for the account service
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub auth: AuthConfig,
    pub rate_limit: RateLimitConfig,
    pub cleanup: CleanupConfig,
    pub store: StoreConfig,
    pub mail: MailConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Maximum request body size in bytes. Default: 64 KiB
    pub max_body_size: usize,
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// HS256 signing secret for session tokens. Required.
    pub jwt_secret: Option<SecretString>,
    /// Optional `iss` claim stamped on and required of session tokens.
    pub issuer: Option<String>,
    /// Default: 24 hours
    pub session_ttl: Duration,
    /// Lifetime of confirmation and reset tokens. Default: 24 hours
    pub token_ttl: Duration,
    /// Web app origin used in confirmation and reset links.
    pub app_base_url: String,
    pub conceal_account_state: bool,
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Deadline for each store call. Default: 5 seconds
    pub timeout: Duration,
}

#[derive(Debug, Clone, Default)]
pub struct MailConfig {
    /// Print full message bodies from the console notifier (development only).
    pub console_full_output: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            max_body_size: 64 * 1024,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            issuer: None,
            session_ttl: Duration::from_secs(24 * 60 * 60),
            token_ttl: Duration::from_secs(24 * 60 * 60),
            app_base_url: "http://localhost:3000".to_string(),
            conceal_account_state: false,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
        }
    }
}

impl ServerConfig {
    pub fn addr(&self) -> std::result::Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }
}

/// Builder for Config with environment variable support
#[must_use = "builder does nothing until you call build()"]
pub struct ConfigBuilder {
    config: Config,
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.config.server.host = host.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.config.server.port = port;
        self
    }

    pub fn with_max_body_size(mut self, bytes: usize) -> Self {
        self.config.server.max_body_size = bytes;
        self
    }

    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    pub fn with_json_logging(mut self, enabled: bool) -> Self {
        self.config.logging.json = enabled;
        self
    }

    pub fn with_jwt_secret(mut self, secret: impl Into<String>) -> Self {
        self.config.auth.jwt_secret = Some(SecretString::new(secret.into()));
        self
    }

    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.config.auth.issuer = Some(issuer.into());
        self
    }

    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.config.auth.session_ttl = ttl;
        self
    }

    pub fn with_token_ttl(mut self, ttl: Duration) -> Self {
        self.config.auth.token_ttl = ttl;
        self
    }

    pub fn with_app_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.auth.app_base_url = url.into();
        self
    }

    pub fn with_conceal_account_state(mut self, conceal: bool) -> Self {
        self.config.auth.conceal_account_state = conceal;
        self
    }

    pub fn with_rate_limit(mut self, rate_limit: RateLimitConfig) -> Self {
        self.config.rate_limit = rate_limit;
        self
    }

    pub fn with_cleanup(mut self, cleanup: CleanupConfig) -> Self {
        self.config.cleanup = cleanup;
        self
    }

    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.config.store.timeout = timeout;
        self
    }

    pub fn with_console_full_output(mut self, enabled: bool) -> Self {
        self.config.mail.console_full_output = enabled;
        self
    }

    /// Load configuration from environment variables with RANKER_ prefix
    ///
    /// Every key falls back to its unprefixed name (`PORT`, `JWT_SECRET`, ...).
    /// Values that fail to parse are ignored and the current setting kept.
    pub fn from_env(mut self) -> Self {
        let c = &mut self.config;

        if let Some(host) = get_env_with_prefix("HOST") {
            c.server.host = host;
        }
        if let Some(port) = parse_env_with_prefix("PORT") {
            c.server.port = port;
        }
        if let Some(bytes) = parse_env_with_prefix("MAX_BODY_SIZE") {
            c.server.max_body_size = bytes;
        }
        if let Some(level) = get_env_with_prefix("LOG_LEVEL") {
            c.logging.level = level;
        }
        if let Some(json) = parse_env_with_prefix("LOG_JSON") {
            c.logging.json = json;
        }

        if let Some(secret) = get_env_with_prefix("JWT_SECRET") {
            c.auth.jwt_secret = Some(SecretString::new(secret));
        }
        if let Some(issuer) = get_env_with_prefix("JWT_ISSUER") {
            c.auth.issuer = Some(issuer);
        }
        if let Some(secs) = parse_env_with_prefix("SESSION_TTL_SECS") {
            c.auth.session_ttl = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_env_with_prefix("TOKEN_TTL_SECS") {
            c.auth.token_ttl = Duration::from_secs(secs);
        }
        if let Some(url) = get_env_with_prefix("APP_BASE_URL") {
            c.auth.app_base_url = url;
        }
        if let Some(conceal) = parse_env_with_prefix("CONCEAL_ACCOUNT_STATE") {
            c.auth.conceal_account_state = conceal;
        }

        if let Some(capacity) = parse_env_with_prefix("RATE_LIMIT_CAPACITY") {
            c.rate_limit.capacity = capacity;
        }
        if let Some(ms) = parse_env_with_prefix("RATE_LIMIT_REFILL_MS") {
            c.rate_limit.refill_interval = Duration::from_millis(ms);
        }

        if let Some(secs) = parse_env_with_prefix("CLEANUP_PERIOD_SECS") {
            c.cleanup.period = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_env_with_prefix("CLEANUP_RETENTION_SECS") {
            c.cleanup.retention = Duration::from_secs(secs);
        }

        if let Some(ms) = parse_env_with_prefix("STORE_TIMEOUT_MS") {
            c.store.timeout = Duration::from_millis(ms);
        }

        if let Some(full) = parse_env_with_prefix("MAIL_CONSOLE_FULL") {
            c.mail.console_full_output = full;
        }

        self
    }

    /// Build the configuration, validating all settings
    ///
    /// # Errors
    ///
    /// Returns `Configuration` if:
    /// - the JWT secret is missing or empty
    /// - the server address does not parse, or the port is 0
    /// - the log level is unknown
    /// - any capacity, interval or TTL is zero
    /// - the app base URL is not http(s)
    pub fn build(self) -> Result<Config> {
        let config = self.config;

        match &config.auth.jwt_secret {
            Some(secret) if !secret.expose_secret().is_empty() => {}
            _ => {
                return Err(AccountError::configuration(
                    "JWT secret is required (set RANKER_JWT_SECRET)",
                ));
            }
        }

        config.server.addr().map_err(|e| {
            AccountError::configuration(format!(
                "Invalid server address {}:{} - {}",
                config.server.host, config.server.port, e
            ))
        })?;
        if config.server.port == 0 {
            return Err(AccountError::configuration("Server port must not be 0"));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.to_lowercase().as_str()) {
            return Err(AccountError::configuration(format!(
                "Invalid log level: {}. Must be one of: {}",
                config.logging.level,
                valid_log_levels.join(", ")
            )));
        }

        if config.rate_limit.capacity == 0 {
            return Err(AccountError::configuration("Rate limit capacity must be positive"));
        }

        let durations = [
            ("rate limit refill interval", config.rate_limit.refill_interval),
            ("cleanup period", config.cleanup.period),
            ("cleanup retention", config.cleanup.retention),
            ("store timeout", config.store.timeout),
            ("session TTL", config.auth.session_ttl),
            ("token TTL", config.auth.token_ttl),
        ];
        for (name, value) in durations {
            if value.is_zero() {
                return Err(AccountError::configuration(format!("{} must be positive", name)));
            }
        }

        let url = &config.auth.app_base_url;
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(AccountError::configuration(format!(
                "App base URL must start with http:// or https://, got {}",
                url
            )));
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> ConfigBuilder {
        ConfigBuilder::new().with_jwt_secret("test-secret")
    }

    #[test]
    fn test_defaults() {
        let config = base().build().unwrap();

        assert_eq!(config.server.port, 8000);
        assert_eq!(config.rate_limit.capacity, 3);
        assert_eq!(config.rate_limit.refill_interval, Duration::from_secs(6));
        assert_eq!(config.cleanup.period, Duration::from_secs(86_400));
        assert_eq!(config.cleanup.retention, Duration::from_secs(172_800));
        assert_eq!(config.store.timeout, Duration::from_secs(5));
        assert_eq!(config.auth.session_ttl, Duration::from_secs(86_400));
        assert!(!config.auth.conceal_account_state);
    }

    #[test]
    fn test_missing_secret_rejected() {
        assert!(matches!(
            ConfigBuilder::new().build(),
            Err(AccountError::Configuration(_))
        ));
        assert!(ConfigBuilder::new().with_jwt_secret("").build().is_err());
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(base().with_log_level("verbose").build().is_err());
        assert!(base().with_port(0).build().is_err());
        assert!(base().with_host("not a host").build().is_err());
        assert!(base().with_rate_limit(RateLimitConfig::new(0, Duration::from_secs(6))).build().is_err());
        assert!(base().with_store_timeout(Duration::ZERO).build().is_err());
        assert!(base().with_app_base_url("ranker.app").build().is_err());
        assert!(
            base()
                .with_cleanup(CleanupConfig {
                    period: Duration::ZERO,
                    retention: Duration::from_secs(1),
                })
                .build()
                .is_err()
        );
    }

    #[test]
    fn test_secret_not_in_debug() {
        let config = base().build().unwrap();
        assert!(!format!("{:?}", config).contains("test-secret"));
    }

    #[test]
    fn test_from_env() {
        unsafe {
            std::env::set_var("RANKER_JWT_SECRET", "env-secret");
            std::env::set_var("RANKER_RATE_LIMIT_CAPACITY", "5");
            std::env::set_var("RANKER_RATE_LIMIT_REFILL_MS", "2000");
            std::env::set_var("RANKER_CLEANUP_RETENTION_SECS", "3600");
            std::env::set_var("RANKER_APP_BASE_URL", "https://ranker.app");
        }

        let config = ConfigBuilder::new().from_env().build().unwrap();

        unsafe {
            std::env::remove_var("RANKER_JWT_SECRET");
            std::env::remove_var("RANKER_RATE_LIMIT_CAPACITY");
            std::env::remove_var("RANKER_RATE_LIMIT_REFILL_MS");
            std::env::remove_var("RANKER_CLEANUP_RETENTION_SECS");
            std::env::remove_var("RANKER_APP_BASE_URL");
        }

        assert_eq!(
            config.auth.jwt_secret.as_ref().map(|s| s.expose_secret().as_str()),
            Some("env-secret")
        );
        assert_eq!(config.rate_limit.capacity, 5);
        assert_eq!(config.rate_limit.refill_interval, Duration::from_millis(2000));
        assert_eq!(config.cleanup.retention, Duration::from_secs(3600));
        assert_eq!(config.auth.app_base_url, "https://ranker.app");
    }
}
