mod common;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{TimeZone, Utc};
use common::{make_token, record, settle, Journal, RecordingNavigator, RecordingNotifier, TokioClock};
use hrportal_core::auth::{MemoryBackend, SessionBackend};
use hrportal_core::{Access, NoticeLevel, SessionGuard, SessionStatus, SessionStore};

/// Expiry claim used by every test, in seconds since epoch.
const T0: i64 = 1_900_000_000;

struct Fixture {
    guard: SessionGuard,
    store: SessionStore,
    backend: Arc<MemoryBackend>,
    notifier: Arc<RecordingNotifier>,
    journal: Journal,
}

/// Guard whose clock starts `lead` before `T0`.
fn fixture(lead: Duration) -> Fixture {
    let journal: Journal = Arc::new(Mutex::new(Vec::new()));
    let backend = Arc::new(MemoryBackend::new());
    let store = SessionStore::new(backend.clone());
    let notifier = Arc::new(RecordingNotifier::with_journal(journal.clone()));
    let navigator = Arc::new(RecordingNavigator {
        store: store.clone(),
        journal: journal.clone(),
    });
    let start = Utc.timestamp_opt(T0, 0).unwrap() - chrono::Duration::from_std(lead).unwrap();

    let guard = SessionGuard::new(store.clone(), notifier.clone(), navigator)
        .with_clock(Arc::new(TokioClock::starting_at(start)))
        .with_sign_in_path("/login");

    Fixture {
        guard,
        store,
        backend,
        notifier,
        journal,
    }
}

fn journal(f: &Fixture) -> Vec<String> {
    f.journal.lock().unwrap().clone()
}

#[tokio::test(start_paused = true)]
async fn test_expiry_fires_once_at_deadline_in_order() {
    let f = fixture(Duration::from_millis(5000));
    f.store.set(record(&make_token(T0))).unwrap();

    assert_eq!(f.guard.mount(), Access::Granted);
    assert!(f.guard.is_armed());

    tokio::time::advance(Duration::from_millis(4999)).await;
    settle().await;
    assert!(f.notifier.alerts().is_empty());
    assert!(f.store.get().is_some());

    tokio::time::advance(Duration::from_millis(1)).await;
    settle().await;

    let alerts = f.notifier.alerts();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].level, NoticeLevel::SessionTimeout);
    assert_eq!(journal(&f), vec!["alert", "redirect /login (cleared)"]);
    assert!(f.backend.keys().is_empty());
    assert!(f.backend.load().unwrap().is_none());

    tokio::time::advance(Duration::from_secs(60)).await;
    settle().await;
    assert_eq!(f.notifier.alerts().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_remount_cancels_previous_timer() {
    let f = fixture(Duration::from_secs(5));
    f.store.set(record(&make_token(T0))).unwrap();
    assert_eq!(f.guard.mount(), Access::Granted);

    f.store.set(record(&make_token(T0 + 5))).unwrap();
    assert_eq!(f.guard.mount(), Access::Granted);

    tokio::time::advance(Duration::from_secs(5)).await;
    settle().await;
    assert!(f.notifier.alerts().is_empty());
    assert!(f.guard.is_armed());

    tokio::time::advance(Duration::from_secs(5)).await;
    settle().await;
    assert_eq!(f.notifier.alerts().len(), 1);
    assert_eq!(journal(&f).len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_missing_token_is_denied_and_logs_out() {
    let f = fixture(Duration::from_secs(5));

    assert_eq!(f.guard.status(), SessionStatus::Missing);
    assert_eq!(f.guard.mount(), Access::Denied);
    settle().await;

    assert_eq!(f.notifier.alerts().len(), 1);
    assert_eq!(journal(&f), vec!["alert", "redirect /login (cleared)"]);
}

#[tokio::test(start_paused = true)]
async fn test_expired_token_never_grants_access() {
    let f = fixture(Duration::ZERO);
    f.store.set(record(&make_token(T0))).unwrap();

    assert_eq!(f.guard.status(), SessionStatus::Expired);
    assert_eq!(f.guard.mount(), Access::Denied);
    settle().await;

    assert!(f.store.get().is_none());
    assert_eq!(f.notifier.alerts().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_unmount_cancels_timer() {
    let f = fixture(Duration::from_secs(5));
    f.store.set(record(&make_token(T0))).unwrap();
    f.guard.mount();
    f.guard.unmount();

    tokio::time::advance(Duration::from_secs(10)).await;
    settle().await;
    assert!(f.notifier.alerts().is_empty());
    assert!(f.store.get().is_some());
}

#[tokio::test(start_paused = true)]
async fn test_repeated_logout_is_harmless() {
    let f = fixture(Duration::from_secs(5));
    f.store.set(record(&make_token(T0))).unwrap();

    f.guard.expire_now().await;
    f.guard.expire_now().await;
    f.store.clear().unwrap();

    assert!(f.store.get().is_none());
    assert!(f.backend.keys().is_empty());
    assert_eq!(
        journal(&f),
        vec![
            "alert",
            "redirect /login (cleared)",
            "alert",
            "redirect /login (cleared)"
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_denied_logout_survives_guard_drop() {
    let f = fixture(Duration::ZERO);
    f.store.set(record(&make_token(T0))).unwrap();

    assert_eq!(f.guard.mount(), Access::Denied);
    let Fixture {
        guard,
        store,
        notifier,
        journal,
        ..
    } = f;
    drop(guard);
    settle().await;

    assert_eq!(notifier.alerts().len(), 1);
    assert!(store.get().is_none());
    assert_eq!(*journal.lock().unwrap(), vec!["alert", "redirect /login (cleared)"]);
}

#[tokio::test(start_paused = true)]
async fn test_timer_follows_replaced_token() {
    let f = fixture(Duration::from_secs(5));
    f.store.set(record(&make_token(T0))).unwrap();
    assert_eq!(f.guard.mount(), Access::Granted);

    // Signed in again without a remount.
    f.store.set(record(&make_token(T0 + 3600))).unwrap();

    tokio::time::advance(Duration::from_secs(5)).await;
    settle().await;
    assert!(f.notifier.alerts().is_empty());
    assert!(f.store.get().is_some());
    assert!(f.guard.is_armed());

    tokio::time::advance(Duration::from_secs(3600)).await;
    settle().await;
    assert_eq!(f.notifier.alerts().len(), 1);
    assert!(f.store.get().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_timer_dropped_after_sign_out() {
    let f = fixture(Duration::from_secs(5));
    f.store.set(record(&make_token(T0))).unwrap();
    assert_eq!(f.guard.mount(), Access::Granted);

    f.store.clear().unwrap();

    tokio::time::advance(Duration::from_secs(5)).await;
    settle().await;
    assert!(f.notifier.alerts().is_empty());
    assert!(!f.guard.is_armed());
    assert!(journal(&f).is_empty());
}
