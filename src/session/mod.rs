pub mod store;

pub use store::{MemorySessionStore, SessionStore, SqliteSessionStore, StoreKey, open_store};

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::error::{ApiError, ApiResult};
use crate::models::{SignInRequest, SignUpRequest, UserProfile};

/// The calls the session manager makes against the backend.
#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// Exchanges credentials for a bearer token.
    async fn sign_in(&self, request: &SignInRequest) -> ApiResult<String>;
    async fn sign_up(&self, request: &SignUpRequest) -> ApiResult<UserProfile>;
    async fn fetch_profile(&self, username: &str) -> ApiResult<UserProfile>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Unauthenticated,
    /// A persisted token is being checked against the backend.
    Rehydrating,
    Authenticated { token: String, user: UserProfile },
}

/// Owner of "who is signed in". Construct one per application instance and
/// share it by `Arc`.
pub struct SessionManager {
    backend: Arc<dyn AuthBackend>,
    store: Arc<dyn SessionStore>,
    state: watch::Sender<SessionState>,
    /// Bumped by every sign-out. Work that awaited the backend only publishes
    /// its result if this has not moved since it started.
    epoch: AtomicU64,
}

impl SessionManager {
    pub fn new(backend: Arc<dyn AuthBackend>, store: Arc<dyn SessionStore>) -> Self {
        let (state, _) = watch::channel(SessionState::Unauthenticated);
        Self {
            backend,
            store,
            state,
            epoch: AtomicU64::new(0),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(*self.state.borrow(), SessionState::Authenticated { .. })
    }

    pub fn is_loading(&self) -> bool {
        matches!(*self.state.borrow(), SessionState::Rehydrating)
    }

    pub fn user(&self) -> Option<UserProfile> {
        match &*self.state.borrow() {
            SessionState::Authenticated { user, .. } => Some(user.clone()),
            _ => None,
        }
    }

    pub fn token(&self) -> Option<String> {
        match &*self.state.borrow() {
            SessionState::Authenticated { token, .. } => Some(token.clone()),
            _ => None,
        }
    }

    /// Restores the session persisted by a previous run.
    ///
    /// A profile lookup failure is not an error here: the stored credentials are
    /// deleted and the session ends up signed out. Only storage failures propagate.
    pub async fn rehydrate(&self) -> ApiResult<()> {
        let epoch = self.epoch.load(Ordering::SeqCst);
        let token = non_empty(self.store.get(StoreKey::Token).await?);
        let username = non_empty(self.store.get(StoreKey::Username).await?);

        let (token, username) = match (token, username) {
            (Some(token), Some(username)) => (token, username),
            (None, None) => {
                self.state.send_replace(SessionState::Unauthenticated);
                return Ok(());
            }
            _ => {
                warn!("Found a partial persisted session, discarding it");
                self.state.send_replace(SessionState::Unauthenticated);
                return self.store.clear().await;
            }
        };

        if !self.publish_if_current(epoch, SessionState::Rehydrating) {
            return Ok(());
        }
        info!("Rehydrating session for {}", username);

        match self.backend.fetch_profile(&username).await {
            Ok(user) => {
                let restored = user.username.clone();
                if self.publish_if_current(epoch, SessionState::Authenticated { token, user }) {
                    info!("Session restored for {}", restored);
                } else {
                    info!("Signed out during rehydration, {} stays signed out", restored);
                }
                Ok(())
            }
            Err(e) => {
                warn!("Session rehydration failed for {}: {}", username, e);
                self.publish_if_current(epoch, SessionState::Unauthenticated);
                self.store.clear().await
            }
        }
    }

    /// Credential exchange followed by a profile lookup. Storage is only written
    /// once the exchange succeeded, and is wiped again if the profile cannot be
    /// resolved or a sign-out ran in the meantime.
    pub async fn sign_in(&self, username: &str, password: &str) -> ApiResult<UserProfile> {
        let request = SignInRequest::new(username, password);
        request.validate()?;
        let epoch = self.epoch.load(Ordering::SeqCst);

        let token = self.backend.sign_in(&request).await.map_err(|e| {
            warn!("Sign-in failed for {}: {}", username, e);
            e
        })?;

        if self.epoch.load(Ordering::SeqCst) != epoch {
            warn!("Signed out while signing in {}, dropping the token", username);
            return Err(ApiError::SessionInterrupted("signing in"));
        }

        if let Err(e) = self.persist(&token, username).await {
            error!("Failed to persist session for {}: {}", username, e);
            self.discard_credentials().await;
            return Err(e);
        }

        match self.backend.fetch_profile(username).await {
            Ok(user) => {
                let session = SessionState::Authenticated {
                    token,
                    user: user.clone(),
                };
                if self.publish_if_current(epoch, session) {
                    info!("Signed in as {}", user.username);
                    Ok(user)
                } else {
                    warn!("Signed out while signing in {}, dropping the token", username);
                    self.discard_credentials().await;
                    Err(ApiError::SessionInterrupted("signing in"))
                }
            }
            Err(e) => {
                error!("Signed in as {} but profile lookup failed: {}", username, e);
                self.discard_credentials().await;
                self.state.send_replace(SessionState::Unauthenticated);
                Err(e)
            }
        }
    }

    /// Registers an account. The session state is left alone; callers sign in
    /// separately.
    pub async fn sign_up(
        &self,
        username: &str,
        password: &str,
        firstname: &str,
        lastname: &str,
    ) -> ApiResult<UserProfile> {
        let request = SignUpRequest {
            username: username.to_string(),
            password: password.to_string(),
            firstname: firstname.to_string(),
            lastname: lastname.to_string(),
        };
        request.validate()?;

        match self.backend.sign_up(&request).await {
            Ok(user) => {
                info!("Registered account {}", username);
                Ok(user)
            }
            Err(e) => {
                warn!("Sign-up failed for {}: {}", username, e);
                Err(e)
            }
        }
    }

    /// Ends the session in memory at the call itself, before the returned future
    /// is polled. The future wipes persisted storage; its error only reports a
    /// failure of that wipe.
    pub fn sign_out(&self) -> impl Future<Output = ApiResult<()>> + Send {
        self.end_session();
        let store = self.store.clone();
        async move {
            store.clear().await.map_err(|e| {
                error!("Failed to clear persisted session: {}", e);
                e
            })
        }
    }

    /// The in-memory half of [`SessionManager::sign_out`]. A sign-in or
    /// rehydration still waiting on the backend will not publish its result.
    pub fn end_session(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.state.send_replace(SessionState::Unauthenticated);
        info!("Signed out");
    }

    /// Re-fetches the signed-in user's profile, e.g. after a profile update.
    pub async fn refresh_profile(&self) -> ApiResult<UserProfile> {
        let (token, username) = match &*self.state.borrow() {
            SessionState::Authenticated { token, user } => (token.clone(), user.username.clone()),
            _ => return Err(ApiError::Validation("no active session".to_string())),
        };

        let user = self.backend.fetch_profile(&username).await?;

        // A sign-out that happened while the lookup was in flight wins.
        self.state.send_if_modified(|state| match state {
            SessionState::Authenticated { token: current, .. } if *current == token => {
                *state = SessionState::Authenticated {
                    token: token.clone(),
                    user: user.clone(),
                };
                true
            }
            _ => false,
        });
        Ok(user)
    }

    /// Publishes `next` unless a sign-out happened since `epoch` was read. The
    /// check runs under the channel's write lock.
    fn publish_if_current(&self, epoch: u64, next: SessionState) -> bool {
        self.state.send_if_modified(|state| {
            if self.epoch.load(Ordering::SeqCst) != epoch {
                return false;
            }
            *state = next;
            true
        })
    }

    async fn persist(&self, token: &str, username: &str) -> ApiResult<()> {
        self.store.set(StoreKey::Token, token).await?;
        self.store.set(StoreKey::Username, username).await
    }

    async fn discard_credentials(&self) {
        if let Err(e) = self.store.clear().await {
            error!("Failed to clear persisted session: {}", e);
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use reqwest::StatusCode;
    use tokio::sync::Notify;

    /// Accepts `ada`/`secret`; profile lookups succeed for the usernames listed.
    /// A gated backend parks every profile lookup until `release` is notified.
    struct FakeBackend {
        known_profiles: Vec<String>,
        profile_calls: Mutex<Vec<String>>,
        gated: bool,
        entered: Notify,
        release: Notify,
    }

    impl FakeBackend {
        fn new(known: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                known_profiles: known.iter().map(|s| s.to_string()).collect(),
                profile_calls: Mutex::new(Vec::new()),
                gated: false,
                entered: Notify::new(),
                release: Notify::new(),
            })
        }

        fn gated(known: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                known_profiles: known.iter().map(|s| s.to_string()).collect(),
                profile_calls: Mutex::new(Vec::new()),
                gated: true,
                entered: Notify::new(),
                release: Notify::new(),
            })
        }
    }

    #[async_trait]
    impl AuthBackend for FakeBackend {
        async fn sign_in(&self, request: &SignInRequest) -> ApiResult<String> {
            if request.username == "ada" && request.password == "secret" {
                Ok("token-ada".to_string())
            } else {
                Err(ApiError::InvalidCredentials("invalid credentials".to_string()))
            }
        }

        async fn sign_up(&self, request: &SignUpRequest) -> ApiResult<UserProfile> {
            if request.username == "taken" {
                return Err(ApiError::Server {
                    status: StatusCode::BAD_REQUEST,
                    message: "User already exists".to_string(),
                });
            }
            Ok(UserProfile {
                username: request.username.clone(),
                ..Default::default()
            })
        }

        async fn fetch_profile(&self, username: &str) -> ApiResult<UserProfile> {
            self.profile_calls.lock().unwrap().push(username.to_string());
            if self.gated {
                self.entered.notify_one();
                self.release.notified().await;
            }
            if self.known_profiles.iter().any(|u| u == username) {
                Ok(UserProfile {
                    id: 1,
                    username: username.to_string(),
                    ..Default::default()
                })
            } else {
                Err(ApiError::Server {
                    status: StatusCode::UNAUTHORIZED,
                    message: "token expired".to_string(),
                })
            }
        }
    }

    fn manager(backend: Arc<FakeBackend>) -> (SessionManager, Arc<MemorySessionStore>) {
        let store = Arc::new(MemorySessionStore::default());
        (SessionManager::new(backend, store.clone()), store)
    }

    #[tokio::test]
    async fn sign_in_persists_and_authenticates() {
        let (session, store) = manager(FakeBackend::new(&["ada"]));
        let user = session.sign_in("ada", "secret").await.unwrap();

        assert_eq!(user.username, "ada");
        assert!(session.is_authenticated());
        assert_eq!(session.token().as_deref(), Some("token-ada"));
        assert_eq!(store.get(StoreKey::Token).await.unwrap().as_deref(), Some("token-ada"));
        assert_eq!(store.get(StoreKey::Username).await.unwrap().as_deref(), Some("ada"));
    }

    #[tokio::test]
    async fn rejected_sign_in_touches_nothing() {
        let (session, store) = manager(FakeBackend::new(&["ada"]));
        store.set(StoreKey::Username, "previous").await.unwrap();

        let err = session.sign_in("ada", "wrong").await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidCredentials(_)));
        assert_eq!(session.state(), SessionState::Unauthenticated);
        assert_eq!(store.get(StoreKey::Token).await.unwrap(), None);
        assert_eq!(store.get(StoreKey::Username).await.unwrap().as_deref(), Some("previous"));
    }

    #[tokio::test]
    async fn blank_credentials_never_reach_the_backend() {
        let backend = FakeBackend::new(&["ada"]);
        let (session, _) = manager(backend.clone());
        let err = session.sign_in("", "secret").await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
        assert!(backend.profile_calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn orphaned_token_is_torn_down() {
        // Credentials are accepted but the profile cannot be resolved.
        let (session, store) = manager(FakeBackend::new(&[]));
        let err = session.sign_in("ada", "secret").await.unwrap_err();

        assert!(err.is_authorization());
        assert!(!session.is_authenticated());
        assert_eq!(store.get(StoreKey::Token).await.unwrap(), None);
        assert_eq!(store.get(StoreKey::Username).await.unwrap(), None);
    }

    #[tokio::test]
    async fn rehydrate_restores_a_valid_session() {
        let (session, store) = manager(FakeBackend::new(&["ada"]));
        store.set(StoreKey::Token, "persisted").await.unwrap();
        store.set(StoreKey::Username, "ada").await.unwrap();

        let mut changes = session.subscribe();
        session.rehydrate().await.unwrap();

        assert!(changes.has_changed().unwrap());
        assert_eq!(session.token().as_deref(), Some("persisted"));
        assert_eq!(session.user().unwrap().username, "ada");
        assert!(!session.is_loading());
    }

    #[tokio::test]
    async fn failed_rehydration_is_swallowed_and_cleans_up() {
        let (session, store) = manager(FakeBackend::new(&[]));
        store.set(StoreKey::Token, "expired").await.unwrap();
        store.set(StoreKey::Username, "ada").await.unwrap();

        session.rehydrate().await.unwrap();

        assert_eq!(session.state(), SessionState::Unauthenticated);
        assert_eq!(store.get(StoreKey::Token).await.unwrap(), None);
        assert_eq!(store.get(StoreKey::Username).await.unwrap(), None);
    }

    #[tokio::test]
    async fn rehydrate_without_storage_skips_the_backend() {
        let backend = FakeBackend::new(&["ada"]);
        let (session, store) = manager(backend.clone());
        store.set(StoreKey::Username, "ada").await.unwrap();

        session.rehydrate().await.unwrap();

        assert!(backend.profile_calls.lock().unwrap().is_empty());
        assert_eq!(store.get(StoreKey::Username).await.unwrap(), None);
        assert!(!session.is_authenticated());
    }

    #[tokio::test]
    async fn sign_out_always_clears() {
        let (session, store) = manager(FakeBackend::new(&["ada"]));

        // From signed out.
        session.sign_out().await.unwrap();
        assert_eq!(session.state(), SessionState::Unauthenticated);

        // From signed in.
        session.sign_in("ada", "secret").await.unwrap();
        session.sign_out().await.unwrap();
        assert_eq!(session.state(), SessionState::Unauthenticated);
        for key in StoreKey::ALL {
            assert_eq!(store.get(key).await.unwrap(), None);
        }
    }

    #[tokio::test]
    async fn sign_out_resets_before_the_store_is_wiped() {
        let (session, store) = manager(FakeBackend::new(&["ada"]));
        session.sign_in("ada", "secret").await.unwrap();

        let wipe = session.sign_out();
        assert_eq!(session.state(), SessionState::Unauthenticated);
        assert!(store.get(StoreKey::Token).await.unwrap().is_some());

        wipe.await.unwrap();
        assert_eq!(store.get(StoreKey::Token).await.unwrap(), None);
    }

    #[tokio::test]
    async fn sign_out_during_sign_in_wins() {
        let backend = FakeBackend::gated(&["ada"]);
        let store = Arc::new(MemorySessionStore::default());
        let session = Arc::new(SessionManager::new(backend.clone(), store.clone()));

        let signing_in = tokio::spawn({
            let session = session.clone();
            async move { session.sign_in("ada", "secret").await }
        });

        // The token is persisted and the profile lookup is parked.
        backend.entered.notified().await;
        session.sign_out().await.unwrap();
        backend.release.notify_one();

        let err = signing_in.await.unwrap().unwrap_err();
        assert!(matches!(err, ApiError::SessionInterrupted(_)));
        assert_eq!(session.state(), SessionState::Unauthenticated);
        for key in StoreKey::ALL {
            assert_eq!(store.get(key).await.unwrap(), None);
        }
    }

    #[tokio::test]
    async fn sign_out_during_rehydration_wins() {
        let backend = FakeBackend::gated(&["ada"]);
        let store = Arc::new(MemorySessionStore::default());
        store.set(StoreKey::Token, "persisted").await.unwrap();
        store.set(StoreKey::Username, "ada").await.unwrap();
        let session = Arc::new(SessionManager::new(backend.clone(), store.clone()));

        let rehydrating = tokio::spawn({
            let session = session.clone();
            async move { session.rehydrate().await }
        });

        backend.entered.notified().await;
        assert!(session.is_loading());
        session.sign_out().await.unwrap();
        backend.release.notify_one();

        rehydrating.await.unwrap().unwrap();
        assert!(!session.is_authenticated());
        assert_eq!(store.get(StoreKey::Token).await.unwrap(), None);
    }

    #[tokio::test]
    async fn sign_up_leaves_the_session_alone() {
        let (session, store) = manager(FakeBackend::new(&["ada"]));
        let user = session
            .sign_up("grace", "pw", "Grace", "Hopper")
            .await
            .unwrap();
        assert_eq!(user.username, "grace");
        assert!(!session.is_authenticated());
        assert_eq!(store.get(StoreKey::Token).await.unwrap(), None);

        let err = session
            .sign_up("taken", "pw", "Some", "One")
            .await
            .unwrap_err();
        assert_eq!(err.user_message(), "User already exists");
    }

    #[tokio::test]
    async fn refresh_requires_a_session() {
        let (session, _) = manager(FakeBackend::new(&["ada"]));
        assert!(session.refresh_profile().await.is_err());

        session.sign_in("ada", "secret").await.unwrap();
        let refreshed = session.refresh_profile().await.unwrap();
        assert_eq!(refreshed.username, "ada");
        assert!(session.is_authenticated());
    }
}
