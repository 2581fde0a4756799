//! Integration tests for the unconfirmed-account sweeper.

use chrono::{Duration as ChronoDuration, Utc};
use ranker_accounts::jobs::{CleanupConfig, CleanupSweeper};
use ranker_accounts::store::{AccountUpdate, AccountStore, InMemoryAccountStore};
use ranker_accounts::testing::TestAccount;
use ranker_accounts::{ManualClock, TokenPurpose};
use std::sync::Arc;
use std::time::Duration;

const HOUR: Duration = Duration::from_secs(60 * 60);

fn config() -> CleanupConfig {
    CleanupConfig {
        period: 24 * HOUR,
        retention: 48 * HOUR,
    }
}

/// A: unconfirmed, 50h old. B: unconfirmed, 10h old. C: confirmed, 100h old.
async fn seed(store: &InMemoryAccountStore, clock: &ManualClock) {
    use ranker_accounts::Clock;
    let now = clock.now();

    store
        .insert(
            TestAccount::builder()
                .email("a@x.com")
                .created_at(now - ChronoDuration::hours(50))
                .token("a-token", TokenPurpose::Confirmation, ChronoDuration::hours(24))
                .build(),
        )
        .await;
    store
        .insert(
            TestAccount::builder()
                .email("b@x.com")
                .created_at(now - ChronoDuration::hours(10))
                .token("b-token", TokenPurpose::Confirmation, ChronoDuration::hours(24))
                .build(),
        )
        .await;
    store
        .insert(
            TestAccount::builder()
                .email("c@x.com")
                .password("pw123456")
                .confirmed()
                .created_at(now - ChronoDuration::hours(100))
                .build(),
        )
        .await;
}

async fn emails(store: &InMemoryAccountStore) -> Vec<String> {
    let mut emails: Vec<_> = store.all().await.into_iter().map(|a| a.email).collect();
    emails.sort();
    emails
}

#[tokio::test]
async fn test_sweep_removes_only_stale_unconfirmed() {
    let store = InMemoryAccountStore::new();
    let clock = ManualClock::new(Utc::now());
    seed(&store, &clock).await;

    let sweeper =
        CleanupSweeper::new(Arc::new(store.clone()), Arc::new(clock.clone()), config()).unwrap();

    assert_eq!(sweeper.sweep_once().await.unwrap(), 1);
    assert_eq!(emails(&store).await, vec!["b@x.com", "c@x.com"]);

    // B crosses the retention window later.
    clock.advance(ChronoDuration::hours(39));
    assert_eq!(sweeper.sweep_once().await.unwrap(), 1);
    assert_eq!(emails(&store).await, vec!["c@x.com"]);
}

#[tokio::test]
async fn test_account_confirmed_before_sweep_survives() {
    let store = InMemoryAccountStore::new();
    let clock = ManualClock::new(Utc::now());
    seed(&store, &clock).await;

    store
        .update_fields(
            "a@x.com",
            &AccountUpdate::new().confirmed(true).clear_token(),
        )
        .await
        .unwrap();

    let sweeper = CleanupSweeper::new(Arc::new(store.clone()), Arc::new(clock), config()).unwrap();
    assert_eq!(sweeper.sweep_once().await.unwrap(), 0);
    assert_eq!(store.len().await, 3);
}

#[tokio::test(start_paused = true)]
async fn test_periodic_sweeper_runs_and_stops() {
    let store = InMemoryAccountStore::new();
    let clock = ManualClock::new(Utc::now());
    seed(&store, &clock).await;

    let handle = CleanupSweeper::new(Arc::new(store.clone()), Arc::new(clock), config())
        .unwrap()
        .start();

    // Nothing runs before the first period elapses.
    tokio::time::sleep(HOUR).await;
    assert_eq!(store.len().await, 3);

    tokio::time::sleep(24 * HOUR).await;
    assert_eq!(emails(&store).await, vec!["b@x.com", "c@x.com"]);

    handle.shutdown().await;
}
