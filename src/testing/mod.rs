//! Testing utilities for the account service
//!
//! - [`RecordingNotifier`] / [`FailingNotifier`] - notifier doubles
//! - [`SpyStore`] - in-memory store that counts calls
//! - [`TestAccount`] / [`fake`] - seeded accounts and fake data
//! - [`Scenario`] - in-process HTTP requests against a router
//!
//! # Example
//!
//! ```rust,ignore
//! use ranker_accounts::testing::{self, RecordingNotifier, SpyStore};
//!
//! #[tokio::test]
//! async fn test_registration_sends_link() {
//!     let notifier = RecordingNotifier::new();
//!     let service = build_service(SpyStore::new(), notifier.clone());
//!
//!     service.initiate_registration("new@example.com").await.unwrap();
//!     assert!(notifier.last_token().is_some());
//! }
//! ```

mod doubles;
mod fixtures;
mod scenario;

pub use doubles::{FailingNotifier, RecordingNotifier, SpyStore, token_from_body};
pub use fixtures::{TestAccount, fake};
pub use scenario::{Scenario, ScenarioAssert, get, post, post_json};
