use crate::auth::session::{SessionClaims, TokenIssuer};
use crate::error::AccountError;
use axum::{extract::FromRequestParts, http::request::Parts};
use std::future::Future;

/// Extracts bearer token from request headers
pub struct TokenExtractor;

impl TokenExtractor {
    /// Extract token from Authorization header
    pub fn from_header(parts: &Parts) -> Result<String, AccountError> {
        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AccountError::InvalidSession("missing authorization header".into()))?;

        let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
            AccountError::InvalidSession(
                "invalid authorization header format, expected: Bearer <token>".into(),
            )
        })?;

        if token.trim().is_empty() {
            return Err(AccountError::InvalidSession("empty bearer token".into()));
        }

        Ok(token.trim().to_string())
    }
}

/// Axum extractor for routes that require a signed-in account.
///
/// Verifies the bearer token with the [`TokenIssuer`] installed as a request
/// extension (see [`crate::http::routes`]) and yields its claims. Any
/// failure is a 401.
///
/// # Example
///
/// ```rust,ignore
/// async fn cast_vote(
///     AuthSession(session): AuthSession,
///     Json(vote): Json<Vote>,
/// ) -> Result<Json<VoteReceipt>> {
///     votes.record(&session.user_id, vote).await
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthSession(pub SessionClaims);

impl<S> FromRequestParts<S> for AuthSession
where
    S: Send + Sync,
{
    type Rejection = AccountError;

    fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> impl Future<Output = Result<Self, Self::Rejection>> + Send {
        let result = parts
            .extensions
            .get::<TokenIssuer>()
            .ok_or_else(|| AccountError::internal("TokenIssuer not found in request extensions"))
            .and_then(|issuer| {
                let token = TokenExtractor::from_header(parts)?;
                issuer.verify(&token)
            });

        async move {
            match result {
                Ok(claims) => Ok(AuthSession(claims)),
                Err(err) => {
                    if !err.is_internal() {
                        tracing::debug!(target: "auth.session.rejected", error = %err, "Session rejected");
                    }
                    Err(err)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::Account;
    use crate::clock::ManualClock;
    use axum::http::{Request, StatusCode};
    use axum::response::IntoResponse;
    use secrecy::SecretString;
    use std::sync::Arc;

    fn issuer(clock: &ManualClock) -> TokenIssuer {
        TokenIssuer::new(SecretString::new("test-secret".into()), Arc::new(clock.clone())).unwrap()
    }

    fn active_account() -> Account {
        Account {
            id: "user-1".into(),
            email: "a@x.com".into(),
            password_hash: "$argon2id$stub".into(),
            confirmed: true,
            pending_token: None,
            created_at: chrono::Utc::now(),
        }
    }

    fn parts(header: Option<&str>, issuer: Option<TokenIssuer>) -> Parts {
        let mut builder = Request::builder();
        if let Some(value) = header {
            builder = builder.header("authorization", value);
        }
        let (mut parts, _) = builder.body(()).unwrap().into_parts();
        if let Some(issuer) = issuer {
            parts.extensions.insert(issuer);
        }
        parts
    }

    #[test]
    fn test_extract_from_valid_bearer_header() {
        let parts = parts(Some("Bearer test_token_123"), None);
        assert_eq!(TokenExtractor::from_header(&parts).unwrap(), "test_token_123");
    }

    #[test]
    fn test_extract_rejects_missing_and_malformed() {
        assert!(TokenExtractor::from_header(&parts(None, None)).is_err());
        assert!(TokenExtractor::from_header(&parts(Some("Basic abc"), None)).is_err());
        assert!(TokenExtractor::from_header(&parts(Some("Bearer   "), None)).is_err());
    }

    #[tokio::test]
    async fn test_auth_session_yields_claims() {
        let clock = ManualClock::starting_now();
        let issuer = issuer(&clock);
        let token = issuer.issue(&active_account()).unwrap();
        let mut parts = parts(Some(&format!("Bearer {}", token)), Some(issuer));

        let AuthSession(claims) = AuthSession::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(claims.user_id, "user-1");
    }

    #[tokio::test]
    async fn test_auth_session_rejects_bad_token_with_401() {
        let clock = ManualClock::starting_now();
        let mut parts = parts(Some("Bearer nope"), Some(issuer(&clock)));

        let err = AuthSession::from_request_parts(&mut parts, &()).await.unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_auth_session_without_issuer_is_internal() {
        let mut parts = parts(Some("Bearer x"), None);
        let err = AuthSession::from_request_parts(&mut parts, &()).await.unwrap_err();
        assert!(err.is_internal());
    }
}
