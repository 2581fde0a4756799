//! In-process HTTP scenarios for the account router
//!
//! Requests are sent through the router with `tower::ServiceExt::oneshot`,
//! so no listener is bound.
//!
//! # Example
//!
//! ```rust,ignore
//! use ranker_accounts::testing;
//! use serde_json::json;
//!
//! #[tokio::test]
//! async fn test_login_with_unknown_email() {
//!     let app = ranker_accounts::http::routes(service);
//!
//!     testing::post_json(app, "/auth/login", &json!({"email": "x@y.com", "password": "pw123456"}))
//!         .execute()
//!         .await
//!         .assert_unauthorized()
//!         .assert_error("Invalid email or password")
//!         .await;
//! }
//! ```

use axum::{
    Router,
    body::Body,
    http::{HeaderName, HeaderValue, Method, Request, StatusCode, header},
    response::Response,
};
use serde::{Deserialize, Serialize};
use tower::ServiceExt;

/// A single request against a router
pub struct Scenario {
    app: Router,
    request: Request<Body>,
}

impl Scenario {
    pub fn new(app: Router, method: Method, uri: &str) -> Self {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        Self { app, request }
    }

    pub fn header(mut self, key: &str, value: &str) -> Self {
        self.request.headers_mut().insert(
            HeaderName::from_bytes(key.as_bytes()).unwrap(),
            HeaderValue::from_str(value).unwrap(),
        );
        self
    }

    /// Set the Authorization header with a Bearer token
    pub fn bearer_token(self, token: &str) -> Self {
        self.header("authorization", &format!("Bearer {}", token))
    }

    /// Set JSON body from a serializable type
    pub fn json_body<T: Serialize>(mut self, body: &T) -> Self {
        let json = serde_json::to_vec(body).unwrap();
        *self.request.body_mut() = Body::from(json);
        self.request.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        self
    }

    /// Raw body sent as `application/json`, for malformed-input cases
    pub fn raw_json(mut self, body: impl Into<String>) -> Self {
        *self.request.body_mut() = Body::from(body.into());
        self.request.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        self
    }

    pub async fn execute(self) -> ScenarioAssert {
        let response = self.app.oneshot(self.request).await.unwrap();
        ScenarioAssert { response }
    }
}

/// Assertions over a scenario's response
pub struct ScenarioAssert {
    response: Response,
}

impl ScenarioAssert {
    pub fn status(&self) -> StatusCode {
        self.response.status()
    }

    pub fn assert_status(self, expected: StatusCode) -> Self {
        assert_eq!(
            self.response.status(),
            expected,
            "Expected status {}, got {}",
            expected,
            self.response.status()
        );
        self
    }

    pub fn assert_ok(self) -> Self {
        self.assert_status(StatusCode::OK)
    }

    pub fn assert_bad_request(self) -> Self {
        self.assert_status(StatusCode::BAD_REQUEST)
    }

    pub fn assert_unauthorized(self) -> Self {
        self.assert_status(StatusCode::UNAUTHORIZED)
    }

    pub fn assert_forbidden(self) -> Self {
        self.assert_status(StatusCode::FORBIDDEN)
    }

    /// 429 with a positive whole-second `Retry-After`
    pub fn assert_rate_limited(self) -> Self {
        let this = self.assert_status(StatusCode::TOO_MANY_REQUESTS);
        let retry_after: u64 = this
            .header(header::RETRY_AFTER.as_str())
            .unwrap_or_else(|| panic!("Retry-After header not found"))
            .parse()
            .unwrap();
        assert!(retry_after >= 1, "Retry-After must be at least 1, got {}", retry_after);
        this
    }

    pub fn header(&self, key: &str) -> Option<String> {
        self.response
            .headers()
            .get(key)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }

    pub async fn body_bytes(self) -> Vec<u8> {
        axum::body::to_bytes(self.response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec()
    }

    pub async fn json<T: for<'de> Deserialize<'de>>(self) -> T {
        let bytes = self.body_bytes().await;
        serde_json::from_slice(&bytes).expect("Failed to parse JSON response")
    }

    /// Assert the `error` field of an error body
    pub async fn assert_error(self, expected: &str) -> serde_json::Value {
        let body: serde_json::Value = self.json().await;
        assert_eq!(body["error"], expected, "Unexpected error body: {}", body);
        body
    }

    /// Assert the `message` field of a success body
    pub async fn assert_message(self, expected: &str) -> serde_json::Value {
        let body: serde_json::Value = self.json().await;
        assert_eq!(body["message"], expected, "Unexpected body: {}", body);
        body
    }

    pub fn response(self) -> Response {
        self.response
    }
}

pub fn get(app: Router, uri: &str) -> Scenario {
    Scenario::new(app, Method::GET, uri)
}

pub fn post(app: Router, uri: &str) -> Scenario {
    Scenario::new(app, Method::POST, uri)
}

/// POST with a JSON body
pub fn post_json<T: Serialize>(app: Router, uri: &str, body: &T) -> Scenario {
    post(app, uri).json_body(body)
}
