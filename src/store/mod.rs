//! Account storage.
//!
//! [`AccountStore`] is the interface the flows need from the document store.
//! Implement it for your database layer. The store is expected to provide:
//!
//! - uniqueness on `email` enforced at write time (`create` must fail with
//!   [`AccountError::Conflict`](crate::AccountError::Conflict), never overwrite)
//! - atomic per-document partial updates, including the conditional form
//!   used for single-use token consumption ([`AccountUpdate::when_token`])
//! - atomic predicate deletes ([`AccountFilter`])
//!
//! No cross-document transactions are required.

mod memory;
mod timed;

pub use memory::InMemoryAccountStore;
pub use timed::TimedStore;

use crate::account::{Account, PendingToken};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Storage operations required by the account flows.
///
/// # Example
///
/// ```rust,ignore
/// use ranker_accounts::store::{AccountStore, AccountUpdate, AccountFilter};
///
/// struct EsAccountStore { client: elasticsearch::Elasticsearch }
///
/// #[async_trait]
/// impl AccountStore for EsAccountStore {
///     async fn create(&self, account: &Account) -> Result<()> {
///         // index with op_type=create and the email as document id
///     }
///     // ...
/// }
/// ```
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Insert a new account. Fails with `Conflict` if the email is taken.
    async fn create(&self, account: &Account) -> Result<()>;

    /// Find an account by (normalized) email.
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>>;

    /// Find the account whose pending token has the given hash.
    async fn find_by_token(&self, token_hash: &str) -> Result<Option<Account>>;

    /// Apply a partial update to the account with this email.
    ///
    /// Must be atomic with respect to other operations on the same account.
    /// Returns the number of accounts modified (0 or 1); 0 when the account
    /// does not exist or the update's precondition does not hold.
    async fn update_fields(&self, email: &str, update: &AccountUpdate) -> Result<u64>;

    /// Delete every account matching the filter in one atomic operation,
    /// evaluating the predicate at delete time. Returns the number deleted.
    async fn delete_where(&self, filter: &AccountFilter) -> Result<u64>;
}

#[async_trait]
impl<T: AccountStore + ?Sized> AccountStore for Arc<T> {
    async fn create(&self, account: &Account) -> Result<()> {
        (**self).create(account).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>> {
        (**self).find_by_email(email).await
    }

    async fn find_by_token(&self, token_hash: &str) -> Result<Option<Account>> {
        (**self).find_by_token(token_hash).await
    }

    async fn update_fields(&self, email: &str, update: &AccountUpdate) -> Result<u64> {
        (**self).update_fields(email, update).await
    }

    async fn delete_where(&self, filter: &AccountFilter) -> Result<u64> {
        (**self).delete_where(filter).await
    }
}

/// Change applied to the pending-token slot.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TokenChange {
    #[default]
    Keep,
    Clear,
    Set(PendingToken),
}

/// A partial update to an account.
///
/// Fields left as `None` / [`TokenChange::Keep`] are not touched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountUpdate {
    pub password_hash: Option<String>,
    pub confirmed: Option<bool>,
    pub token: TokenChange,
    /// Precondition: only apply if the stored token hash equals this value.
    pub when_token: Option<String>,
    /// Precondition: only apply if the stored password hash equals this value.
    pub when_password_hash: Option<String>,
}

impl AccountUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn password_hash(mut self, hash: impl Into<String>) -> Self {
        self.password_hash = Some(hash.into());
        self
    }

    pub fn confirmed(mut self, confirmed: bool) -> Self {
        self.confirmed = Some(confirmed);
        self
    }

    pub fn set_token(mut self, token: PendingToken) -> Self {
        self.token = TokenChange::Set(token);
        self
    }

    pub fn clear_token(mut self) -> Self {
        self.token = TokenChange::Clear;
        self
    }

    /// Only apply while the account still holds the token with this hash.
    pub fn when_token(mut self, token_hash: impl Into<String>) -> Self {
        self.when_token = Some(token_hash.into());
        self
    }

    /// Only apply while the account's password hash is still `hash`.
    pub fn when_password_hash(mut self, hash: impl Into<String>) -> Self {
        self.when_password_hash = Some(hash.into());
        self
    }

    /// Whether every precondition holds for `account`.
    pub fn precondition_holds(&self, account: &Account) -> bool {
        let token_ok = match &self.when_token {
            None => true,
            Some(expected) => account
                .pending_token
                .as_ref()
                .is_some_and(|t| &t.token_hash == expected),
        };
        let hash_ok = self
            .when_password_hash
            .as_ref()
            .is_none_or(|expected| &account.password_hash == expected);
        token_ok && hash_ok
    }

    /// Apply the update in place. Callers must hold whatever lock makes this
    /// atomic and check [`precondition_holds`](Self::precondition_holds) first.
    pub fn apply_to(&self, account: &mut Account) {
        if let Some(hash) = &self.password_hash {
            account.password_hash = hash.clone();
        }
        if let Some(confirmed) = self.confirmed {
            account.confirmed = confirmed;
        }
        match &self.token {
            TokenChange::Keep => {}
            TokenChange::Clear => account.pending_token = None,
            TokenChange::Set(token) => account.pending_token = Some(token.clone()),
        }
    }
}

/// Predicate for [`AccountStore::delete_where`].
///
/// Every filter includes `confirmed == false`; confirmed accounts are never
/// deleted through this path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountFilter {
    pub created_before: Option<DateTime<Utc>>,
    pub email: Option<String>,
}

impl AccountFilter {
    /// Unconfirmed accounts created strictly before `cutoff`.
    pub fn unconfirmed_before(cutoff: DateTime<Utc>) -> Self {
        Self {
            created_before: Some(cutoff),
            email: None,
        }
    }

    /// The unconfirmed account with this email, if any.
    pub fn unconfirmed_email(email: impl Into<String>) -> Self {
        Self {
            created_before: None,
            email: Some(email.into()),
        }
    }

    pub fn matches(&self, account: &Account) -> bool {
        if account.confirmed {
            return false;
        }
        if let Some(cutoff) = self.created_before {
            if account.created_at >= cutoff {
                return false;
            }
        }
        if let Some(email) = &self.email {
            if &account.email != email {
                return false;
            }
        }
        true
    }
}
