use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::catalog::Movie;
use crate::cloud::{AuthUser, FavoritesCollection, Subscription};
use crate::db::AnonFavoritesRepo;
use crate::session::Session;

/// Result of an `add`: whether the movie is now a favorite, and whether the
/// UI should show the one-shot sign-in prompt.
#[derive(Debug, Clone, Copy)]
pub struct AddOutcome {
    pub favorite: bool,
    pub nudge_signin: bool,
}

/// Which store currently backs the list. Exactly one is live at any time;
/// the other is inert until the next session transition.
enum Backing {
    Local,
    Remote {
        user: AuthUser,
        _watcher: Option<Watcher>,
    },
}

struct Watcher(JoinHandle<()>);

impl Drop for Watcher {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Favorites list for one client session.
///
/// Presents one add/remove/contains surface regardless of session state.
/// Anonymous sessions are backed by the device-scoped local store;
/// authenticated sessions by the user's cloud collection, mirrored into
/// memory by a live snapshot subscription. The session transition handler
/// performs the one-shot local-to-remote migration on sign-in.
pub struct Favorites {
    client_id: String,
    local: Arc<dyn AnonFavoritesRepo>,
    remote: Arc<dyn FavoritesCollection>,
    list: Arc<ArcSwap<Vec<Movie>>>,
    backing: Mutex<Backing>,
    nudge_dismissed: AtomicBool,
}

impl Favorites {
    pub fn new(
        client_id: String,
        local: Arc<dyn AnonFavoritesRepo>,
        remote: Arc<dyn FavoritesCollection>,
    ) -> Self {
        Self {
            client_id,
            local,
            remote,
            list: Arc::new(ArcSwap::from_pointee(Vec::new())),
            backing: Mutex::new(Backing::Local),
            nudge_dismissed: AtomicBool::new(false),
        }
    }

    /// Current in-memory snapshot.
    pub fn favorites(&self) -> Arc<Vec<Movie>> {
        self.list.load_full()
    }

    /// Linear membership scan; favorites lists stay small.
    pub fn is_favorite(&self, movie_id: i64) -> bool {
        self.list.load().iter().any(|m| m.id == movie_id)
    }

    pub fn dismiss_nudge(&self) {
        self.nudge_dismissed.store(true, Ordering::Relaxed);
    }

    /// Add to whichever store is active. Re-adding an id is a no-op in both
    /// modes. Store failures are logged and leave the list as it was.
    pub async fn add(&self, movie: Movie) -> AddOutcome {
        let backing = self.backing.lock().await;
        match &*backing {
            Backing::Remote { user, .. } => {
                let movie_id = movie.id;
                match self.remote.put(user, &movie).await {
                    Ok(()) => self.insert_in_memory(movie),
                    Err(e) => {
                        error!(client_id = %self.client_id, error = %e,
                            "failed to store favorite in cloud collection");
                    }
                }
                AddOutcome {
                    favorite: self.is_favorite(movie_id),
                    nudge_signin: false,
                }
            }
            Backing::Local => {
                let movie_id = movie.id;
                match self.local.put_favorite(&self.client_id, &movie).await {
                    Ok(()) => self.insert_in_memory(movie),
                    Err(e) => {
                        error!(client_id = %self.client_id, error = %e,
                            "failed to store favorite locally");
                    }
                }
                AddOutcome {
                    favorite: self.is_favorite(movie_id),
                    nudge_signin: !self.nudge_dismissed.load(Ordering::Relaxed),
                }
            }
        }
    }

    /// Remove by id from whichever store is active; an absent id is a no-op.
    pub async fn remove(&self, movie_id: i64) {
        let backing = self.backing.lock().await;
        match &*backing {
            Backing::Remote { user, .. } => match self.remote.delete(user, movie_id).await {
                Ok(()) => self.remove_in_memory(movie_id),
                Err(e) => {
                    error!(client_id = %self.client_id, error = %e,
                        "failed to remove favorite from cloud collection");
                }
            },
            Backing::Local => {
                match self.local.delete_favorite(&self.client_id, movie_id).await {
                    Ok(()) => self.remove_in_memory(movie_id),
                    Err(e) => {
                        error!(client_id = %self.client_id, error = %e,
                            "failed to remove local favorite");
                    }
                }
            }
        }
    }

    /// Session transition handler. The caller (the client session) runs this
    /// to completion before publishing the new session state.
    pub async fn on_session_change(&self, session: &Session) {
        let mut backing = self.backing.lock().await;
        match session {
            Session::Authenticated(user) => {
                self.migrate_local(user).await;

                let watcher = match self.remote.subscribe(user).await {
                    Ok(subscription) => Some(Watcher(self.spawn_watcher(subscription))),
                    Err(e) => {
                        error!(uid = %user.uid, error = %e,
                            "failed to subscribe to cloud favorites");
                        None
                    }
                };

                // Empty until the first snapshot arrives; never shows
                // local entries while the remote store is authoritative.
                self.list.store(Arc::new(Vec::new()));
                *backing = Backing::Remote {
                    user: user.clone(),
                    _watcher: watcher,
                };
            }
            Session::Anonymous => {
                *backing = Backing::Local;
                self.reload_local().await;
            }
        }
    }

    /// Read the local store into memory. Used on first load and on sign-out.
    pub async fn reload_local(&self) {
        let list = match self.local.list_favorites(&self.client_id).await {
            Ok(list) => list,
            Err(e) => {
                error!(client_id = %self.client_id, error = %e,
                    "failed to read local favorites");
                Vec::new()
            }
        };
        self.list.store(Arc::new(list));
    }

    /// One-shot local-to-remote migration. Each item is existence-checked
    /// before writing, so a retried migration never duplicates. The local
    /// store is cleared only when every item made it across; otherwise it is
    /// kept so the next sign-in retries the remainder.
    async fn migrate_local(&self, user: &AuthUser) {
        let local = match self.local.list_favorites(&self.client_id).await {
            Ok(list) => list,
            Err(e) => {
                error!(client_id = %self.client_id, error = %e,
                    "cannot read local favorites, skipping migration");
                return;
            }
        };
        if local.is_empty() {
            return;
        }

        let mut failed = 0usize;
        for movie in &local {
            let present = match self.remote.exists(user, movie.id).await {
                Ok(present) => present,
                Err(e) => {
                    warn!(movie_id = movie.id, error = %e, "migration existence check failed");
                    failed += 1;
                    continue;
                }
            };
            if present {
                continue;
            }
            if let Err(e) = self.remote.put(user, movie).await {
                warn!(movie_id = movie.id, error = %e, "migration write failed");
                failed += 1;
            }
        }

        if failed == 0 {
            match self.local.clear_favorites(&self.client_id).await {
                Ok(()) => {
                    info!(uid = %user.uid, count = local.len(), "migrated anonymous favorites")
                }
                Err(e) => {
                    error!(client_id = %self.client_id, error = %e,
                        "favorites migrated but local store could not be cleared");
                }
            }
        } else {
            warn!(uid = %user.uid, failed, total = local.len(),
                "favorites migration incomplete, keeping local copy for retry");
        }
    }

    fn spawn_watcher(&self, mut subscription: Subscription) -> JoinHandle<()> {
        let list = Arc::clone(&self.list);
        tokio::spawn(async move {
            // Every snapshot replaces the list wholesale; the producer ends
            // the channel when the subscription gives up, leaving the last
            // snapshot in place.
            while let Some(snapshot) = subscription.receiver.recv().await {
                list.store(Arc::new(snapshot));
            }
        })
    }

    fn insert_in_memory(&self, movie: Movie) {
        let current = self.list.load();
        if current.iter().any(|m| m.id == movie.id) {
            return;
        }
        let mut next: Vec<Movie> = current.iter().cloned().collect();
        next.push(movie);
        self.list.store(Arc::new(next));
    }

    fn remove_in_memory(&self, movie_id: i64) {
        let current = self.list.load();
        if !current.iter().any(|m| m.id == movie_id) {
            return;
        }
        let next: Vec<Movie> = current
            .iter()
            .filter(|m| m.id != movie_id)
            .cloned()
            .collect();
        self.list.store(Arc::new(next));
    }
}
