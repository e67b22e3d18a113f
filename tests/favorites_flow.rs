//! End-to-end favorites reconciliation scenarios, driven through client
//! sessions the way the HTTP handlers drive them. The cloud collection is an
//! in-memory fake behind the same trait as the hosted store; the local store
//! is the real SQLite repository.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use marquee_rs::catalog::Movie;
use marquee_rs::cloud::{AuthUser, FavoritesCollection, StoreError, StoreResult, Subscription};
use marquee_rs::db::{AnonFavoritesRepo, SqliteRepository};
use marquee_rs::session::{ClientSession, SessionRegistry};

fn movie(id: i64, title: &str) -> Movie {
    serde_json::from_value(serde_json::json!({ "id": id, "title": title })).unwrap()
}

fn user(uid: &str) -> AuthUser {
    AuthUser {
        uid: uid.to_string(),
        email: Some(format!("{uid}@example.com")),
        display_name: Some(uid.to_string()),
        photo_url: None,
        id_token: "token".to_string(),
        refresh_token: "refresh".to_string(),
    }
}

/// In-memory stand-in for the hosted per-user favorites collection. Every
/// mutation pushes a fresh full snapshot to live subscribers, like the real
/// stream does.
#[derive(Default)]
struct FakeCollection {
    data: Mutex<HashMap<String, BTreeMap<i64, Movie>>>,
    subscribers: Mutex<Vec<(String, mpsc::Sender<Vec<Movie>>)>>,
    fail_puts: AtomicBool,
}

impl FakeCollection {
    fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn seed(&self, uid: &str, movies: &[Movie]) {
        let mut data = self.data.lock().unwrap();
        let collection = data.entry(uid.to_string()).or_default();
        for m in movies {
            collection.insert(m.id, m.clone());
        }
    }

    fn ids(&self, uid: &str) -> Vec<i64> {
        self.data
            .lock()
            .unwrap()
            .get(uid)
            .map(|c| c.keys().copied().collect())
            .unwrap_or_default()
    }

    fn set_fail_puts(&self, fail: bool) {
        self.fail_puts.store(fail, Ordering::Relaxed);
    }

    fn snapshot(&self, uid: &str) -> Vec<Movie> {
        self.data
            .lock()
            .unwrap()
            .get(uid)
            .map(|c| c.values().cloned().collect())
            .unwrap_or_default()
    }

    fn notify(&self, uid: &str) {
        let snapshot = self.snapshot(uid);
        let mut subscribers = self.subscribers.lock().unwrap();
        subscribers.retain(|(sub_uid, tx)| {
            if sub_uid != uid {
                return !tx.is_closed();
            }
            tx.try_send(snapshot.clone()).is_ok() || !tx.is_closed()
        });
    }

    fn injected_failure() -> StoreError {
        StoreError::Status {
            status: reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            body: "injected failure".to_string(),
        }
    }
}

#[async_trait]
impl FavoritesCollection for FakeCollection {
    async fn list(&self, user: &AuthUser) -> StoreResult<Vec<Movie>> {
        Ok(self.snapshot(&user.uid))
    }

    async fn exists(&self, user: &AuthUser, movie_id: i64) -> StoreResult<bool> {
        Ok(self
            .data
            .lock()
            .unwrap()
            .get(&user.uid)
            .map(|c| c.contains_key(&movie_id))
            .unwrap_or(false))
    }

    async fn put(&self, user: &AuthUser, movie: &Movie) -> StoreResult<()> {
        if self.fail_puts.load(Ordering::Relaxed) {
            return Err(Self::injected_failure());
        }
        self.data
            .lock()
            .unwrap()
            .entry(user.uid.clone())
            .or_default()
            .insert(movie.id, movie.clone());
        self.notify(&user.uid);
        Ok(())
    }

    async fn delete(&self, user: &AuthUser, movie_id: i64) -> StoreResult<()> {
        if let Some(collection) = self.data.lock().unwrap().get_mut(&user.uid) {
            collection.remove(&movie_id);
        }
        self.notify(&user.uid);
        Ok(())
    }

    async fn clear(&self, user: &AuthUser) -> StoreResult<()> {
        self.data.lock().unwrap().remove(&user.uid);
        self.notify(&user.uid);
        Ok(())
    }

    async fn subscribe(&self, user: &AuthUser) -> StoreResult<Subscription> {
        let (tx, rx) = mpsc::channel(16);
        tx.try_send(self.snapshot(&user.uid)).ok();
        self.subscribers
            .lock()
            .unwrap()
            .push((user.uid.clone(), tx));

        let cancel = CancellationToken::new();
        let parked = cancel.clone();
        let task = tokio::spawn(async move { parked.cancelled().await });
        Ok(Subscription::new(rx, cancel, task))
    }
}

struct Harness {
    remote: Arc<FakeCollection>,
    local: Arc<SqliteRepository>,
    registry: Arc<SessionRegistry>,
}

async fn harness() -> Harness {
    let path = std::env::temp_dir().join(format!("marquee-flow-{}.db", uuid::Uuid::new_v4()));
    let local = Arc::new(SqliteRepository::new(path.to_str().unwrap()).await.unwrap());
    let remote = FakeCollection::new();
    let registry = Arc::new(SessionRegistry::new(
        local.clone() as Arc<dyn AnonFavoritesRepo>,
        remote.clone() as Arc<dyn FavoritesCollection>,
        Duration::from_secs(3600),
    ));
    Harness {
        remote,
        local,
        registry,
    }
}

/// Wait for the subscription snapshot to land; the list update after a
/// transition is asynchronous by design.
async fn wait_until(session: &ClientSession, predicate: impl Fn(&ClientSession) -> bool) {
    for _ in 0..200 {
        if predicate(session) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached within timeout");
}

#[tokio::test]
async fn anonymous_add_is_idempotent() {
    let h = harness().await;
    let session = h.registry.get_or_create("client-1").await;

    session.favorites.add(movie(5, "X")).await;
    session.favorites.add(movie(5, "X")).await;

    assert_eq!(session.favorites.favorites().len(), 1);
    assert!(session.favorites.is_favorite(5));
    assert_eq!(h.local.list_favorites("client-1").await.unwrap().len(), 1);
}

#[tokio::test]
async fn removing_absent_id_is_noop() {
    let h = harness().await;
    let session = h.registry.get_or_create("client-1").await;

    session.favorites.remove(404).await;
    assert!(session.favorites.favorites().is_empty());

    session.favorites.add(movie(5, "X")).await;
    session.favorites.remove(404).await;
    assert_eq!(session.favorites.favorites().len(), 1);
}

#[tokio::test]
async fn signin_nudge_is_single_shot_per_session() {
    let h = harness().await;
    let session = h.registry.get_or_create("client-1").await;

    let outcome = session.favorites.add(movie(5, "X")).await;
    assert!(outcome.nudge_signin);

    session.favorites.dismiss_nudge();

    let outcome = session.favorites.add(movie(9, "Y")).await;
    assert!(!outcome.nudge_signin);
    let outcome = session.favorites.add(movie(5, "X")).await;
    assert!(!outcome.nudge_signin);
}

#[tokio::test]
async fn authenticated_add_never_nudges() {
    let h = harness().await;
    let session = h.registry.get_or_create("client-1").await;

    session.sign_in(user("alice")).await;
    let outcome = session.favorites.add(movie(5, "X")).await;
    assert!(!outcome.nudge_signin);
}

#[tokio::test]
async fn migration_merges_local_into_remote_and_clears_local() {
    let h = harness().await;
    let session = h.registry.get_or_create("client-1").await;

    // Local {A, B}, remote {B} before sign-in.
    session.favorites.add(movie(1, "A")).await;
    session.favorites.add(movie(2, "B")).await;
    h.remote.seed("alice", &[movie(2, "B")]);

    session.sign_in(user("alice")).await;

    assert_eq!(h.remote.ids("alice"), vec![1, 2]);
    assert!(h.local.list_favorites("client-1").await.unwrap().is_empty());

    wait_until(&session, |s| {
        s.favorites.is_favorite(1) && s.favorites.is_favorite(2)
    })
    .await;
}

#[tokio::test]
async fn partial_migration_failure_keeps_local_store() {
    let h = harness().await;
    let session = h.registry.get_or_create("client-1").await;

    session.favorites.add(movie(1, "A")).await;
    session.favorites.add(movie(2, "B")).await;
    h.remote.seed("alice", &[movie(2, "B")]);
    h.remote.set_fail_puts(true);

    session.sign_in(user("alice")).await;

    // B already existed, A's write failed: the local copy must survive so a
    // later sign-in can retry.
    assert_eq!(h.remote.ids("alice"), vec![2]);
    assert_eq!(h.local.list_favorites("client-1").await.unwrap().len(), 2);

    // Retry on the next sign-in completes the migration.
    h.remote.set_fail_puts(false);
    session.sign_out().await;
    session.sign_in(user("alice")).await;

    assert_eq!(h.remote.ids("alice"), vec![1, 2]);
    assert!(h.local.list_favorites("client-1").await.unwrap().is_empty());
}

#[tokio::test]
async fn session_transitions_never_mix_sources() {
    let h = harness().await;
    let session = h.registry.get_or_create("client-1").await;

    // Anonymous: local only.
    session.favorites.add(movie(5, "X")).await;
    assert!(session.favorites.is_favorite(5));

    // Sign in: the single local favorite migrates, local storage empties,
    // and membership now reflects the remote subscription.
    session.sign_in(user("alice")).await;
    assert_eq!(h.remote.ids("alice"), vec![5]);
    assert!(h.local.list_favorites("client-1").await.unwrap().is_empty());
    wait_until(&session, |s| s.favorites.is_favorite(5)).await;

    // Sign out: back to the (now empty) local store; the remote list no
    // longer shows through.
    session.sign_out().await;
    assert!(!session.favorites.is_favorite(5));
    assert!(session.favorites.favorites().is_empty());
}

#[tokio::test]
async fn authenticated_operations_write_through_to_remote() {
    let h = harness().await;
    let session = h.registry.get_or_create("client-1").await;

    session.sign_in(user("alice")).await;

    session.favorites.add(movie(9, "Y")).await;
    assert_eq!(h.remote.ids("alice"), vec![9]);
    wait_until(&session, |s| s.favorites.is_favorite(9)).await;

    // Nothing leaked into the anonymous store.
    assert!(h.local.list_favorites("client-1").await.unwrap().is_empty());

    session.favorites.remove(9).await;
    assert!(h.remote.ids("alice").is_empty());
    wait_until(&session, |s| !s.favorites.is_favorite(9)).await;
}

#[tokio::test]
async fn remote_snapshot_replaces_list_wholesale() {
    let h = harness().await;
    let session = h.registry.get_or_create("client-1").await;

    session.sign_in(user("alice")).await;
    session.favorites.add(movie(1, "A")).await;
    wait_until(&session, |s| s.favorites.is_favorite(1)).await;

    // A change made elsewhere (another device) lands via the subscription.
    h.remote.seed("alice", &[movie(2, "B")]);
    h.remote.notify("alice");
    wait_until(&session, |s| s.favorites.is_favorite(2)).await;
    assert_eq!(session.favorites.favorites().len(), 2);
}

#[tokio::test]
async fn second_signin_only_migrates_what_is_still_local() {
    let h = harness().await;
    let session = h.registry.get_or_create("client-1").await;

    session.favorites.add(movie(5, "X")).await;
    session.sign_in(user("alice")).await;
    assert_eq!(h.remote.ids("alice"), vec![5]);

    session.sign_out().await;
    session.favorites.add(movie(7, "Z")).await;
    assert_eq!(session.favorites.favorites().len(), 1);

    session.sign_in(user("alice")).await;
    assert_eq!(h.remote.ids("alice"), vec![5, 7]);
    assert!(h.local.list_favorites("client-1").await.unwrap().is_empty());
}

#[tokio::test]
async fn different_clients_have_independent_anonymous_lists() {
    let h = harness().await;
    let a = h.registry.get_or_create("client-a").await;
    let b = h.registry.get_or_create("client-b").await;

    a.favorites.add(movie(5, "X")).await;

    assert!(a.favorites.is_favorite(5));
    assert!(!b.favorites.is_favorite(5));
}
