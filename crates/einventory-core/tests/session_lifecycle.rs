mod common;

use std::sync::Arc;
use std::time::Duration;

use einventory_core::auth::MemoryTokenStore;
use einventory_core::Token;

use common::{session_with, FakeIdentity};

#[tokio::test(start_paused = true)]
async fn profile_is_fetched_for_new_token() {
    let identity = Arc::new(FakeIdentity::new().with_profile("abc", Duration::from_millis(50), Some("ana")));
    let store = MemoryTokenStore::new();
    let ctx = session_with(&store, &identity);

    ctx.set_token(Some("abc".to_string()));
    assert!(ctx.profile().is_none());

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(identity.profile_calls(), vec!["abc".to_string()]);
    assert_eq!(ctx.profile().and_then(|p| p.username), Some("ana".to_string()));
}

#[tokio::test(start_paused = true)]
async fn late_profile_for_replaced_token_is_discarded() {
    let identity = Arc::new(
        FakeIdentity::new()
            .with_profile("A", Duration::from_secs(10), Some("alice"))
            .with_profile("B", Duration::from_secs(1), None),
    );
    let ctx = session_with(&MemoryTokenStore::new(), &identity);

    ctx.set_token(Some("A".to_string()));
    ctx.set_token(Some("B".to_string()));

    tokio::time::sleep(Duration::from_secs(30)).await;
    let mut calls = identity.profile_calls();
    calls.sort();
    assert_eq!(calls, vec!["A".to_string(), "B".to_string()]);
    assert_eq!(ctx.token(), Token::new("B"));
    assert!(ctx.profile().is_none());
}

#[tokio::test(start_paused = true)]
async fn profile_failure_keeps_session() {
    let identity = Arc::new(FakeIdentity::new().with_profile("abc", Duration::from_millis(10), None));
    let ctx = session_with(&MemoryTokenStore::new(), &identity);

    ctx.set_token(Some("abc".to_string()));
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert!(ctx.is_authenticated());
    assert!(ctx.profile().is_none());
}

#[tokio::test(start_paused = true)]
async fn logout_clears_profile_immediately() {
    let identity = Arc::new(FakeIdentity::new().with_profile("abc", Duration::from_millis(10), Some("ana")));
    let store = MemoryTokenStore::new();
    let ctx = session_with(&store, &identity);
    let mut rx = ctx.subscribe();

    ctx.set_token(Some("abc".to_string()));
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(ctx.profile().is_some());

    rx.borrow_and_update();
    ctx.set_token(None);
    assert!(rx.has_changed().unwrap());
    let state = rx.borrow_and_update().clone();
    assert!(state.token.is_none());
    assert!(state.profile.is_none());
    assert!(store.peek().is_none());
}

#[tokio::test(start_paused = true)]
async fn restored_token_survives_reload_and_loads_profile() {
    let identity = Arc::new(FakeIdentity::new().with_profile("abc", Duration::from_millis(10), Some("ana")));
    let store = MemoryTokenStore::new();

    session_with(&store, &identity).set_token(Some("abc".to_string()));

    let reloaded = session_with(&store, &identity);
    assert_eq!(reloaded.token(), Token::new("abc"));

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(reloaded.profile().and_then(|p| p.username), Some("ana".to_string()));
}

#[tokio::test(start_paused = true)]
async fn dropped_session_ignores_pending_profile() {
    let identity = Arc::new(FakeIdentity::new().with_profile("abc", Duration::from_secs(5), Some("ana")));
    let store = MemoryTokenStore::new();
    let ctx = session_with(&store, &identity);

    ctx.set_token(Some("abc".to_string()));
    drop(ctx);

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(identity.profile_calls(), vec!["abc".to_string()]);
    assert_eq!(store.peek(), Token::new("abc"));
}

#[tokio::test]
async fn observers_are_woken_on_logout() {
    let identity = Arc::new(FakeIdentity::new());
    let ctx = session_with(&MemoryTokenStore::with_token("abc"), &identity);
    let mut rx = ctx.subscribe();

    let observer = tokio::spawn(async move {
        rx.changed().await.unwrap();
        rx.borrow().is_authenticated()
    });

    ctx.logout();
    assert!(!observer.await.unwrap());
}
