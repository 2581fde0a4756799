use crate::error::AccountError;
use axum::{
    Json,
    extract::{FromRequest, Request},
};
use serde::de::DeserializeOwned;

/// JSON body extractor whose rejections use the account error format.
///
/// Any body that cannot be read as `T` (bad syntax, missing fields, wrong
/// content type) is a 400 `InvalidBody`.
pub struct JsonBody<T>(pub T);

impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = AccountError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| AccountError::InvalidBody(e.body_text()))?;
        Ok(JsonBody(value))
    }
}
