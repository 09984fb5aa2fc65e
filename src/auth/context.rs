use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

use super::credentials::CredentialExchange;
use super::session::Session;
use super::store::SessionStore;
use crate::error::Result;

/// Authentication state observed by every screen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AuthState {
    #[default]
    Unauthenticated,
    Authenticated(Session),
}

impl AuthState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthState::Authenticated(_))
    }

    pub fn session(&self) -> Option<&Session> {
        match self {
            AuthState::Authenticated(session) => Some(session),
            AuthState::Unauthenticated => None,
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.session().map(Session::token)
    }
}

/// Which top-level view to mount for a given auth state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Login,
    Backoffice,
}

impl Screen {
    pub fn for_state(state: &AuthState) -> Self {
        if state.is_authenticated() {
            Screen::Backoffice
        } else {
            Screen::Login
        }
    }
}

struct Inner {
    state: watch::Sender<AuthState>,
    store: SessionStore,
    // Bumped under the watch lock by every sign-in, sign-out and
    // invalidation. A restore that started in an older epoch is discarded.
    epoch: AtomicU64,
    // Held across a transition and its storage write so writes land in
    // transition order.
    persist: Mutex<()>,
}

/// The single owner and writer of the session.
///
/// Create one per application at the root and hand clones down to the
/// screens; clones share state. Observers get synchronous change
/// notifications through [`AuthContext::subscribe`]. Persisting to device
/// storage is best-effort: a failed write is logged and the in-memory state
/// stays as it is.
#[derive(Clone)]
pub struct AuthContext {
    inner: Arc<Inner>,
}

impl AuthContext {
    pub fn new(store: SessionStore) -> Self {
        let (state, _) = watch::channel(AuthState::Unauthenticated);
        Self {
            inner: Arc::new(Inner {
                state,
                store,
                epoch: AtomicU64::new(0),
                persist: Mutex::new(()),
            }),
        }
    }

    pub fn state(&self) -> AuthState {
        self.inner.state.borrow().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.state.borrow().is_authenticated()
    }

    pub fn token(&self) -> Option<String> {
        self.inner.state.borrow().token().map(str::to_owned)
    }

    pub fn screen(&self) -> Screen {
        Screen::for_state(&self.inner.state.borrow())
    }

    /// Receives every state change from now on.
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.inner.state.subscribe()
    }

    /// Restores a persisted session, if any, without contacting the backend.
    ///
    /// The restored session is marked [`Restored`](super::SessionOrigin::Restored);
    /// a stale token is only discovered when an authenticated call is
    /// rejected and passed through [`AuthContext::check`]. Returns whether a
    /// session was restored. Storage failures are logged and swallowed.
    pub async fn restore(&self) -> bool {
        let epoch = self.inner.epoch.load(Ordering::SeqCst);
        let session = match self.inner.store.load().await {
            Ok(Some(session)) => session.into_restored(),
            Ok(None) => return false,
            Err(e) => {
                warn!(error = %e, "could not restore persisted session");
                return false;
            }
        };

        let user_id = session.user_id().to_owned();
        // Any sign-in or sign-out that happened while storage was being
        // read wins over the stored session.
        let restored = self.inner.state.send_if_modified(|state| {
            if self.inner.epoch.load(Ordering::SeqCst) != epoch || state.is_authenticated() {
                return false;
            }
            *state = AuthState::Authenticated(session);
            true
        });
        if restored {
            info!(%user_id, "session restored from device storage");
        } else {
            debug!(%user_id, "persisted session superseded before restore finished");
        }
        restored
    }

    /// Enters the authenticated state and persists the session.
    pub async fn authenticate(&self, session: Session) {
        let _persist = self.inner.persist.lock().await;
        info!(user_id = %session.user_id(), "session started");
        self.transition(AuthState::Authenticated(session.clone()));
        if let Err(e) = self.inner.store.save(&session).await {
            warn!(error = %e, "session will not survive a restart");
        }
    }

    /// Exchanges credentials and, on success, authenticates.
    ///
    /// On failure the state is left untouched.
    pub async fn sign_in(
        &self,
        exchange: &CredentialExchange,
        email: &str,
        password: &str,
    ) -> Result<()> {
        let session = exchange.sign_in(email, password).await?;
        self.authenticate(session).await;
        Ok(())
    }

    /// Signs out from any state and clears device storage.
    pub async fn logout(&self) {
        let _persist = self.inner.persist.lock().await;
        let previous = self.transition(AuthState::Unauthenticated);
        if let Some(session) = previous.session() {
            info!(user_id = %session.user_id(), "signed out");
        }
        self.clear_storage().await;
    }

    /// Drops the session after the backend refused it.
    pub async fn invalidate(&self, reason: &str) {
        let _persist = self.inner.persist.lock().await;
        let was_authenticated = self.inner.state.send_if_modified(|state| {
            if !state.is_authenticated() {
                return false;
            }
            self.inner.epoch.fetch_add(1, Ordering::SeqCst);
            *state = AuthState::Unauthenticated;
            true
        });
        if was_authenticated {
            warn!(%reason, "session invalidated by backend");
            self.clear_storage().await;
        }
    }

    /// Passes `result` through, invalidating the session first when the
    /// backend rejected the token.
    ///
    /// Wrap authenticated operations with this so a stale restored token
    /// forces a new login.
    pub async fn check<T>(&self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            if e.is_session_rejection() {
                self.invalidate(&e.to_string()).await;
            }
        }
        result
    }

    /// Replaces the state and starts a new epoch, returning the old state.
    fn transition(&self, next: AuthState) -> AuthState {
        let mut previous = next;
        self.inner.state.send_modify(|state| {
            self.inner.epoch.fetch_add(1, Ordering::SeqCst);
            std::mem::swap(state, &mut previous);
        });
        previous
    }

    async fn clear_storage(&self) {
        if let Err(e) = self.inner.store.clear().await {
            warn!(error = %e, "could not clear persisted session");
        }
    }
}
