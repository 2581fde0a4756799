use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// The main error type for account operations
#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    #[error("Invalid email format")]
    InvalidEmail,

    #[error("Password requirements not met: {0}")]
    WeakPassword(String),

    #[error("Email already registered")]
    Conflict,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token expired")]
    ExpiredToken,

    #[error("Too many requests, retry in {retry_after_secs} seconds")]
    RateLimited { retry_after_secs: u64 },

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Email not confirmed")]
    UnconfirmedEmail,

    #[error("Registration not completed")]
    RegistrationIncomplete,

    #[error("Invalid session: {0}")]
    InvalidSession(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse classification of [`AccountError`], one entry per failure class
/// callers are expected to branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Conflict,
    InvalidToken,
    ExpiredToken,
    RateLimit,
    InvalidCredentials,
    UnconfirmedEmail,
    RegistrationIncomplete,
    Unauthorized,
    Internal,
}

/// Error body returned to clients.
#[derive(Serialize)]
pub struct ErrorResponse {
    error: String,
    error_id: String,
}

impl AccountError {
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidBody(_) | Self::InvalidEmail | Self::WeakPassword(_) => {
                ErrorKind::Validation
            }
            Self::Conflict => ErrorKind::Conflict,
            Self::InvalidToken => ErrorKind::InvalidToken,
            Self::ExpiredToken => ErrorKind::ExpiredToken,
            Self::RateLimited { .. } => ErrorKind::RateLimit,
            Self::InvalidCredentials => ErrorKind::InvalidCredentials,
            Self::UnconfirmedEmail => ErrorKind::UnconfirmedEmail,
            Self::RegistrationIncomplete => ErrorKind::RegistrationIncomplete,
            Self::InvalidSession(_) => ErrorKind::Unauthorized,
            Self::Configuration(_) | Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// True for store, notifier and other server-side failures.
    pub fn is_internal(&self) -> bool {
        self.kind() == ErrorKind::Internal
    }

    pub fn status_code(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::Validation
            | ErrorKind::Conflict
            | ErrorKind::InvalidToken
            | ErrorKind::ExpiredToken => StatusCode::BAD_REQUEST,
            ErrorKind::RateLimit => StatusCode::TOO_MANY_REQUESTS,
            ErrorKind::InvalidCredentials | ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorKind::UnconfirmedEmail | ErrorKind::RegistrationIncomplete => {
                StatusCode::FORBIDDEN
            }
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns a message suitable for client responses.
    ///
    /// Client errors carry no sensitive information and are returned as-is.
    /// Server errors are replaced with a generic message; the details are
    /// logged server-side only.
    pub fn safe_message(&self) -> String {
        match self {
            Self::InvalidBody(_) => "Invalid request body".to_string(),
            Self::InvalidSession(_) => "Unauthorized".to_string(),
            Self::Configuration(_) | Self::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AccountError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_id = uuid::Uuid::new_v4().to_string();

        if self.is_internal() {
            tracing::error!(
                status = status.as_u16(),
                error_id = %error_id,
                error = %self,
                "Request failed"
            );
        } else {
            tracing::debug!(
                status = status.as_u16(),
                error_id = %error_id,
                error = %self,
                "Request rejected"
            );
        }

        let retry_after = match &self {
            Self::RateLimited { retry_after_secs } => Some(*retry_after_secs),
            _ => None,
        };

        let body = Json(ErrorResponse {
            error: self.safe_message(),
            error_id,
        });

        let mut response = (status, body).into_response();
        if let Some(secs) = retry_after {
            if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}

/// Result type alias for account operations
pub type Result<T> = std::result::Result<T, AccountError>;

impl From<serde_json::Error> for AccountError {
    fn from(err: serde_json::Error) -> Self {
        AccountError::Internal(format!("JSON serialization error: {}", err))
    }
}
