//! Notifier and store doubles for exercising the flows.

use crate::account::Account;
use crate::error::{AccountError, Result};
use crate::notify::{Message, Notifier};
use crate::store::{AccountFilter, AccountStore, AccountUpdate, InMemoryAccountStore};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Notifier that keeps every message it is asked to send.
///
/// Clones share the same outbox.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<Message>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<Message> {
        self.sent.lock().unwrap().clone()
    }

    /// Messages addressed to `to`.
    pub fn messages_to(&self, to: &str) -> Vec<Message> {
        self.messages().into_iter().filter(|m| m.to == to).collect()
    }

    /// The raw token from the link in the most recent message.
    pub fn last_token(&self) -> Option<String> {
        let sent = self.sent.lock().unwrap();
        sent.last().and_then(|m| token_from_body(&m.body))
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
    }
}

/// Pull the `token=` query value out of a message body.
pub fn token_from_body(body: &str) -> Option<String> {
    let start = body.find("token=")? + "token=".len();
    let token: String = body[start..]
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();
    (!token.is_empty()).then_some(token)
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, message: &Message) -> Result<()> {
        message.validate()?;
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

/// Notifier whose every send fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingNotifier;

impl FailingNotifier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Notifier for FailingNotifier {
    async fn send(&self, _message: &Message) -> Result<()> {
        Err(AccountError::internal("mail relay unavailable"))
    }
}

#[derive(Debug, Default)]
struct CallCounts {
    create: AtomicUsize,
    find_by_email: AtomicUsize,
    find_by_token: AtomicUsize,
    update_fields: AtomicUsize,
    delete_where: AtomicUsize,
}

/// In-memory store that counts calls per operation.
///
/// Clones share both the documents and the counters.
#[derive(Debug, Clone, Default)]
pub struct SpyStore {
    inner: InMemoryAccountStore,
    calls: Arc<CallCounts>,
}

impl SpyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The backing store, for seeding and inspection.
    pub fn inner(&self) -> &InMemoryAccountStore {
        &self.inner
    }

    pub fn total_calls(&self) -> usize {
        self.read_calls() + self.write_calls()
    }

    pub fn read_calls(&self) -> usize {
        self.calls.find_by_email.load(Ordering::SeqCst)
            + self.calls.find_by_token.load(Ordering::SeqCst)
    }

    /// Calls that could modify a document.
    pub fn write_calls(&self) -> usize {
        self.calls.create.load(Ordering::SeqCst)
            + self.calls.update_fields.load(Ordering::SeqCst)
            + self.calls.delete_where.load(Ordering::SeqCst)
    }

    pub fn find_by_email_calls(&self) -> usize {
        self.calls.find_by_email.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AccountStore for SpyStore {
    async fn create(&self, account: &Account) -> Result<()> {
        self.calls.create.fetch_add(1, Ordering::SeqCst);
        self.inner.create(account).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>> {
        self.calls.find_by_email.fetch_add(1, Ordering::SeqCst);
        self.inner.find_by_email(email).await
    }

    async fn find_by_token(&self, token_hash: &str) -> Result<Option<Account>> {
        self.calls.find_by_token.fetch_add(1, Ordering::SeqCst);
        self.inner.find_by_token(token_hash).await
    }

    async fn update_fields(&self, email: &str, update: &AccountUpdate) -> Result<u64> {
        self.calls.update_fields.fetch_add(1, Ordering::SeqCst);
        self.inner.update_fields(email, update).await
    }

    async fn delete_where(&self, filter: &AccountFilter) -> Result<u64> {
        self.calls.delete_where.fetch_add(1, Ordering::SeqCst);
        self.inner.delete_where(filter).await
    }
}
