use super::extract::JsonBody;
use crate::auth::AccountService;
use crate::auth::flows::{
    CompleteRegistrationRequest, InitiateRegistrationRequest, LoginRequest, LoginResponse,
    MessageResponse, PasswordResetComplete, PasswordResetRequest,
};
use crate::error::{AccountError, Result};
use axum::{Extension, Json, Router, extract::State, routing::post};
use governor::clock::Clock;
use std::sync::Arc;

const RESET_REQUESTED: &str =
    "If your email exists in our system, you will receive password reset instructions.";

type Service<C> = State<Arc<AccountService<C>>>;

/// Router for the five account endpoints, with the service as state.
///
/// # Example
///
/// ```rust,ignore
/// let service = Arc::new(AccountService::new(limiter, ctx, issuer, LoginFlowConfig::default()));
///
/// let app = Router::new()
///     .route("/me", get(me))
///     .layer(http::session_layer(&service))
///     .merge(http::routes(service));
/// ```
pub fn routes<C>(service: Arc<AccountService<C>>) -> Router
where
    C: Clock + Send + Sync + 'static,
{
    Router::new()
        .route("/auth/register/initiate", post(initiate_registration::<C>))
        .route("/auth/register/complete", post(complete_registration::<C>))
        .route("/auth/password/reset", post(request_password_reset::<C>))
        .route("/auth/password/complete", post(complete_password_reset::<C>))
        .route("/auth/login", post(login::<C>))
        .with_state(service)
}

/// Layer that makes [`AuthSession`](crate::auth::AuthSession) work on the
/// routes it wraps.
pub fn session_layer<C: Clock>(service: &AccountService<C>) -> Extension<crate::auth::TokenIssuer> {
    Extension(service.token_issuer().clone())
}

async fn initiate_registration<C: Clock>(
    State(service): Service<C>,
    JsonBody(req): JsonBody<InitiateRegistrationRequest>,
) -> Result<Json<MessageResponse>> {
    service.initiate_registration(&req.email).await?;
    Ok(Json(MessageResponse::new(
        "Please check your email to complete registration.",
    )))
}

async fn complete_registration<C: Clock>(
    State(service): Service<C>,
    JsonBody(req): JsonBody<CompleteRegistrationRequest>,
) -> Result<Json<MessageResponse>> {
    service
        .complete_registration(&req.token, &req.password)
        .await?;
    Ok(Json(MessageResponse::new(
        "Registration completed successfully. You can now log in.",
    )))
}

async fn request_password_reset<C: Clock>(
    State(service): Service<C>,
    JsonBody(req): JsonBody<PasswordResetRequest>,
) -> Result<Json<MessageResponse>> {
    match service.initiate_reset(&req.email).await {
        Ok(()) => {}
        Err(err @ AccountError::RateLimited { .. }) => return Err(err),
        // Same response either way.
        Err(err) => tracing::error!(error = %err, "Password reset request failed"),
    }
    Ok(Json(MessageResponse::new(RESET_REQUESTED)))
}

async fn complete_password_reset<C: Clock>(
    State(service): Service<C>,
    JsonBody(req): JsonBody<PasswordResetComplete>,
) -> Result<Json<MessageResponse>> {
    service
        .complete_reset(&req.token, &req.new_password)
        .await?;
    Ok(Json(MessageResponse::new(
        "Password has been reset successfully. You can now log in with your new password.",
    )))
}

async fn login<C: Clock>(
    State(service): Service<C>,
    JsonBody(req): JsonBody<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    let token = service.authenticate(&req.email, &req.password).await?;
    Ok(Json(LoginResponse { token }))
}
