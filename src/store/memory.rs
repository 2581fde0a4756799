//! In-memory account store.
//!
//! Suitable for tests, local development and single-instance deployments.
//! A single write lock around the map gives the same per-document atomicity
//! a real document store provides for conditional updates and predicate
//! deletes.

use super::{AccountFilter, AccountStore, AccountUpdate};
use crate::account::Account;
use crate::error::{AccountError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Account store backed by a `HashMap` keyed on email.
///
/// Clones share the same underlying map.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAccountStore {
    accounts: Arc<RwLock<HashMap<String, Account>>>,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored accounts.
    pub async fn len(&self) -> usize {
        self.accounts.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.accounts.read().await.is_empty()
    }

    /// Snapshot of every stored account.
    pub async fn all(&self) -> Vec<Account> {
        self.accounts.read().await.values().cloned().collect()
    }

    /// Insert or replace an account without the uniqueness check.
    ///
    /// Intended for seeding fixtures.
    pub async fn insert(&self, account: Account) {
        self.accounts
            .write()
            .await
            .insert(account.email.clone(), account);
    }
}

#[async_trait]
impl AccountStore for InMemoryAccountStore {
    async fn create(&self, account: &Account) -> Result<()> {
        let mut accounts = self.accounts.write().await;
        if accounts.contains_key(&account.email) {
            return Err(AccountError::Conflict);
        }
        accounts.insert(account.email.clone(), account.clone());
        Ok(())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>> {
        Ok(self.accounts.read().await.get(email).cloned())
    }

    async fn find_by_token(&self, token_hash: &str) -> Result<Option<Account>> {
        let accounts = self.accounts.read().await;
        Ok(accounts
            .values()
            .find(|a| {
                a.pending_token
                    .as_ref()
                    .is_some_and(|t| t.token_hash == token_hash)
            })
            .cloned())
    }

    async fn update_fields(&self, email: &str, update: &AccountUpdate) -> Result<u64> {
        let mut accounts = self.accounts.write().await;
        let Some(account) = accounts.get_mut(email) else {
            return Ok(0);
        };
        if !update.precondition_holds(account) {
            return Ok(0);
        }
        update.apply_to(account);
        Ok(1)
    }

    async fn delete_where(&self, filter: &AccountFilter) -> Result<u64> {
        let mut accounts = self.accounts.write().await;
        let before = accounts.len();
        accounts.retain(|_, account| !filter.matches(account));
        Ok((before - accounts.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::{PendingToken, TokenPurpose};
    use chrono::{Duration, Utc};

    fn pending(email: &str, hash: &str) -> Account {
        let now = Utc::now();
        Account::pending(
            email,
            PendingToken {
                token_hash: hash.to_string(),
                purpose: TokenPurpose::Confirmation,
                expires_at: now + Duration::hours(24),
            },
            now,
        )
    }

    #[tokio::test]
    async fn test_create_rejects_duplicate_email() {
        let store = InMemoryAccountStore::new();
        store.create(&pending("a@x.com", "h1")).await.unwrap();

        let err = store.create(&pending("a@x.com", "h2")).await.unwrap_err();
        assert!(matches!(err, AccountError::Conflict));

        // Original document untouched
        let stored = store.find_by_email("a@x.com").await.unwrap().unwrap();
        assert_eq!(stored.pending_token.unwrap().token_hash, "h1");
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_find_by_token() {
        let store = InMemoryAccountStore::new();
        store.create(&pending("a@x.com", "h1")).await.unwrap();
        store.create(&pending("b@x.com", "h2")).await.unwrap();

        let found = store.find_by_token("h2").await.unwrap().unwrap();
        assert_eq!(found.email, "b@x.com");
        assert!(store.find_by_token("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_conditional_update_applies_once() {
        let store = InMemoryAccountStore::new();
        store.create(&pending("a@x.com", "h1")).await.unwrap();

        let update = AccountUpdate::new()
            .password_hash("hash")
            .confirmed(true)
            .clear_token()
            .when_token("h1");

        assert_eq!(store.update_fields("a@x.com", &update).await.unwrap(), 1);
        assert_eq!(store.update_fields("a@x.com", &update).await.unwrap(), 0);
        assert_eq!(
            store.update_fields("missing@x.com", &AccountUpdate::new()).await.unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn test_delete_where_counts() {
        let store = InMemoryAccountStore::new();
        store.create(&pending("a@x.com", "h1")).await.unwrap();
        store.create(&pending("b@x.com", "h2")).await.unwrap();

        let deleted = store
            .delete_where(&AccountFilter::unconfirmed_email("a@x.com"))
            .await
            .unwrap();

        assert_eq!(deleted, 1);
        assert!(store.find_by_email("a@x.com").await.unwrap().is_none());
        assert!(store.find_by_email("b@x.com").await.unwrap().is_some());
    }
}
