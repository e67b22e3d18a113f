use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{watch, Mutex, RwLock};
use tracing::{debug, info};

use crate::cloud::{AuthUser, FavoritesCollection};
use crate::db::AnonFavoritesRepo;
use crate::favorites::Favorites;

const EVICTION_INTERVAL: Duration = Duration::from_secs(60);

/// Identity state of one client. Selects which store backs the favorites
/// list.
#[derive(Debug, Clone, Default)]
pub enum Session {
    #[default]
    Anonymous,
    Authenticated(AuthUser),
}

impl Session {
    pub fn user(&self) -> Option<&AuthUser> {
        match self {
            Session::Anonymous => None,
            Session::Authenticated(user) => Some(user),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user().is_some()
    }
}

/// Server-side state for one browser client, addressed by its stable
/// client id.
pub struct ClientSession {
    pub client_id: String,
    pub favorites: Arc<Favorites>,
    state: watch::Sender<Session>,
    transition: Mutex<()>,
    last_seen: std::sync::Mutex<Instant>,
}

impl ClientSession {
    fn new(client_id: String, favorites: Arc<Favorites>) -> Self {
        let (state, _) = watch::channel(Session::Anonymous);
        Self {
            client_id,
            favorites,
            state,
            transition: Mutex::new(()),
            last_seen: std::sync::Mutex::new(Instant::now()),
        }
    }

    pub fn session(&self) -> Session {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }

    pub async fn sign_in(&self, user: AuthUser) {
        info!(client_id = %self.client_id, uid = %user.uid, "session signed in");
        self.apply(Session::Authenticated(user)).await;
    }

    pub async fn sign_out(&self) {
        info!(client_id = %self.client_id, "session signed out");
        self.apply(Session::Anonymous).await;
    }

    /// Transitions are serialized per session, and the favorites handler
    /// (including migration) completes before observers see the new state.
    async fn apply(&self, next: Session) {
        let _guard = self.transition.lock().await;
        self.favorites.on_session_change(&next).await;
        self.state.send_replace(next);
    }

    pub fn touch(&self) {
        *self.last_seen.lock().unwrap() = Instant::now();
    }

    fn idle_for(&self) -> Duration {
        self.last_seen.lock().unwrap().elapsed()
    }
}

/// All live client sessions. Sessions are created on first sight (anonymous,
/// local favorites loaded) and evicted after an idle period; eviction drops
/// the session, which tears down any cloud subscription.
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Arc<ClientSession>>>,
    local: Arc<dyn AnonFavoritesRepo>,
    remote: Arc<dyn FavoritesCollection>,
    idle_timeout: Duration,
}

impl SessionRegistry {
    pub fn new(
        local: Arc<dyn AnonFavoritesRepo>,
        remote: Arc<dyn FavoritesCollection>,
        idle_timeout: Duration,
    ) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            local,
            remote,
            idle_timeout,
        }
    }

    pub async fn get_or_create(&self, client_id: &str) -> Arc<ClientSession> {
        {
            let sessions = self.sessions.read().await;
            if let Some(session) = sessions.get(client_id) {
                session.touch();
                return Arc::clone(session);
            }
        }

        let mut sessions = self.sessions.write().await;
        if let Some(session) = sessions.get(client_id) {
            session.touch();
            return Arc::clone(session);
        }

        let favorites = Arc::new(Favorites::new(
            client_id.to_string(),
            Arc::clone(&self.local),
            Arc::clone(&self.remote),
        ));
        favorites.reload_local().await;

        debug!(client_id = %client_id, "created client session");
        let session = Arc::new(ClientSession::new(client_id.to_string(), favorites));
        sessions.insert(client_id.to_string(), Arc::clone(&session));
        session
    }

    pub fn start_eviction_loop(self: Arc<Self>) {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(EVICTION_INTERVAL);
            loop {
                interval.tick().await;
                self.evict_idle().await;
            }
        });
    }

    async fn evict_idle(&self) {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| session.idle_for() < self.idle_timeout);
        let evicted = before - sessions.len();
        if evicted > 0 {
            info!(evicted, remaining = sessions.len(), "evicted idle client sessions");
        }
    }
}
