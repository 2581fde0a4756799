//! HTTP surface for the account endpoints.
//!
//! - `POST /auth/register/initiate` - `{email}`
//! - `POST /auth/register/complete` - `{token, password}`
//! - `POST /auth/password/reset` - `{email}`, always 200 unless rate limited
//! - `POST /auth/password/complete` - `{token, new_password}`
//! - `POST /auth/login` - `{email, password}` → `{token}`
//!
//! Errors are rendered by [`AccountError`](crate::AccountError)'s
//! `IntoResponse` as `{"error", "error_id"}`.

mod extract;
mod routes;

pub use extract::JsonBody;
pub use routes::{routes, session_layer};
