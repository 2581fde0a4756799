//! Per-call deadline for store operations.

use super::{AccountFilter, AccountStore, AccountUpdate};
use crate::account::Account;
use crate::error::{AccountError, Result};
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;

/// Wraps an [`AccountStore`] and bounds every call with a timeout.
///
/// A call that exceeds the deadline fails with [`AccountError::Internal`].
pub struct TimedStore<S> {
    inner: S,
    timeout: Duration,
}

impl<S: AccountStore> TimedStore<S> {
    pub fn new(inner: S, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    async fn bounded<T>(&self, op: &'static str, fut: impl Future<Output = Result<T>>) -> Result<T> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(op, timeout_ms = self.timeout.as_millis() as u64, "Store call timed out");
                Err(AccountError::internal(format!("store call `{op}` timed out")))
            }
        }
    }
}

#[async_trait]
impl<S: AccountStore> AccountStore for TimedStore<S> {
    async fn create(&self, account: &Account) -> Result<()> {
        self.bounded("create", self.inner.create(account)).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>> {
        self.bounded("find_by_email", self.inner.find_by_email(email)).await
    }

    async fn find_by_token(&self, token_hash: &str) -> Result<Option<Account>> {
        self.bounded("find_by_token", self.inner.find_by_token(token_hash))
            .await
    }

    async fn update_fields(&self, email: &str, update: &AccountUpdate) -> Result<u64> {
        self.bounded("update_fields", self.inner.update_fields(email, update))
            .await
    }

    async fn delete_where(&self, filter: &AccountFilter) -> Result<u64> {
        self.bounded("delete_where", self.inner.delete_where(filter))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryAccountStore;

    struct StalledStore;

    #[async_trait]
    impl AccountStore for StalledStore {
        async fn create(&self, _account: &Account) -> Result<()> {
            std::future::pending().await
        }
        async fn find_by_email(&self, _email: &str) -> Result<Option<Account>> {
            std::future::pending().await
        }
        async fn find_by_token(&self, _token_hash: &str) -> Result<Option<Account>> {
            std::future::pending().await
        }
        async fn update_fields(&self, _email: &str, _update: &AccountUpdate) -> Result<u64> {
            std::future::pending().await
        }
        async fn delete_where(&self, _filter: &AccountFilter) -> Result<u64> {
            std::future::pending().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_call_becomes_internal_error() {
        let store = TimedStore::new(StalledStore, Duration::from_secs(5));

        let err = store.find_by_email("a@x.com").await.unwrap_err();

        assert!(err.is_internal());
    }

    #[tokio::test]
    async fn test_passes_through_results() {
        let store = TimedStore::new(InMemoryAccountStore::new(), Duration::from_secs(5));
        assert!(store.find_by_email("a@x.com").await.unwrap().is_none());
        assert_eq!(
            store
                .delete_where(&AccountFilter::unconfirmed_email("a@x.com"))
                .await
                .unwrap(),
            0
        );
    }
}
