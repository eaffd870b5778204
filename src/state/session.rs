//! Auth-session state for the current user.
//!
//! SYSTEM CONTEXT
//! ==============
//! Route guards and user-aware views read this store and re-render from its
//! subscription callback. All mutators talk to the API through [`AuthApi`]
//! and fold every failure into state or a return value; nothing here panics
//! or propagates transport errors to a view.
//!
//! DESIGN
//! ======
//! - `init_auth` is coalesced: concurrent callers await one shared future, so
//!   exactly one `get_me` round-trip happens per store lifetime (or `reset`).
//! - Each user-changing operation takes a sequence number when it starts. A
//!   result is applied only if no newer operation has already applied one, so
//!   a slow stale response cannot overwrite a fresher session.
//! - Loading is an in-flight counter; a drop guard decrements it, so a
//!   cancelled login still clears the flag and notifies.

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use tracing::{debug, info, warn};

use super::observer::{Subscribers, Subscription};
use crate::net::api::AuthApi;
use crate::net::error::{ApiError, ErrorKind};
use crate::net::types::User;

pub const LOGIN_FAILED: &str = "Login failed";
pub const REGISTRATION_FAILED: &str = "Registration failed";
pub const NETWORK_FAILED: &str = "Network error. Please try again.";
pub const SUPERSEDED: &str = "Session changed before sign-in completed";

/// Lifecycle phase derived from the flags.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionPhase {
    Uninitialized,
    Loading,
    Ready,
}

/// Point-in-time copy of the session for rendering.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub user: Option<User>,
    pub loading: bool,
    pub initialized: bool,
}

impl SessionSnapshot {
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }
}

/// Why a login or registration did not produce a session.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct AuthFailure {
    pub kind: ErrorKind,
    pub message: String,
}

impl AuthFailure {
    fn from_api(err: &ApiError, fallback: &str) -> Self {
        let message = match err {
            ApiError::Network(_) => NETWORK_FAILED.to_owned(),
            ApiError::Decode(_) => fallback.to_owned(),
            other if other.message().trim().is_empty() => fallback.to_owned(),
            other => other.message().to_owned(),
        };
        Self { kind: err.kind(), message }
    }

    fn superseded() -> Self {
        Self { kind: ErrorKind::Auth, message: SUPERSEDED.to_owned() }
    }
}

#[derive(Debug, Default)]
struct SessionState {
    user: Option<User>,
    in_flight: usize,
    initialized: bool,
    /// Last sequence number handed out.
    issued: u64,
    /// Sequence number of the most recent result written to `user`.
    applied: u64,
}

struct SessionInner {
    api: Arc<dyn AuthApi>,
    state: Mutex<SessionState>,
    subscribers: Subscribers,
    init: Mutex<Option<Shared<BoxFuture<'static, ()>>>>,
}

/// Shared handle to the session; clones observe the same state.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<SessionInner>,
}

impl SessionStore {
    #[must_use]
    pub fn new(api: Arc<dyn AuthApi>) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                api,
                state: Mutex::new(SessionState::default()),
                subscribers: Subscribers::new(),
                init: Mutex::new(None),
            }),
        }
    }

    // -------------------------------------------------------------------------
    // Mutators
    // -------------------------------------------------------------------------

    /// Resolve the session once. Later calls are no-ops; concurrent calls
    /// share the in-flight attempt.
    pub async fn init_auth(&self) {
        let pending = {
            let mut slot = self.inner.init.lock().unwrap_or_else(PoisonError::into_inner);
            if self.inner.lock().initialized {
                return;
            }
            match slot.as_ref() {
                Some(pending) => pending.clone(),
                None => {
                    let inner = Arc::clone(&self.inner);
                    let pending = async move { inner.run_init().await }.boxed().shared();
                    *slot = Some(pending.clone());
                    pending
                }
            }
        };
        pending.await;
    }

    /// Sign in. `user` is untouched on failure.
    ///
    /// # Errors
    ///
    /// Returns [`AuthFailure`] carrying the server message, or `"Login failed"`.
    /// A sign-in overtaken by a later logout or login fails with [`SUPERSEDED`].
    pub async fn login(&self, email: &str, password: &str) -> Result<(), AuthFailure> {
        let (seq, _loading) = self.inner.begin_loading();
        match self.inner.api.login(email, password).await {
            Ok(session) => {
                if self.inner.apply_session(seq, session.user) {
                    Ok(())
                } else {
                    Err(AuthFailure::superseded())
                }
            }
            Err(err) => {
                debug!(error = %err, "login rejected");
                Err(AuthFailure::from_api(&err, LOGIN_FAILED))
            }
        }
    }

    /// Create an account and sign in. `user` is untouched on failure.
    ///
    /// # Errors
    ///
    /// Returns [`AuthFailure`] carrying the server message, or
    /// `"Registration failed"`, or [`SUPERSEDED`] when overtaken.
    pub async fn register(&self, email: &str, password: &str, name: Option<&str>) -> Result<(), AuthFailure> {
        let (seq, _loading) = self.inner.begin_loading();
        match self.inner.api.register(email, password, name).await {
            Ok(session) => {
                if self.inner.apply_session(seq, session.user) {
                    Ok(())
                } else {
                    Err(AuthFailure::superseded())
                }
            }
            Err(err) => {
                debug!(error = %err, "registration rejected");
                Err(AuthFailure::from_api(&err, REGISTRATION_FAILED))
            }
        }
    }

    /// Sign out. The local user is cleared even if the remote call fails.
    pub async fn logout(&self) {
        let seq = self.inner.next_seq();
        if let Err(err) = self.inner.api.logout().await {
            warn!(error = %err, "remote logout failed; clearing local session anyway");
        }
        if self.inner.apply_user(seq, None) {
            info!("session cleared");
        }
        self.inner.subscribers.notify();
    }

    /// Re-fetch the current user. An auth rejection clears the session; a
    /// transport failure leaves it as is.
    pub async fn refresh_user(&self) {
        let seq = self.inner.next_seq();
        match self.inner.api.get_me().await {
            Ok(user) => {
                self.inner.apply_user(seq, Some(user));
            }
            Err(err) if err.is_auth() => {
                debug!(error = %err, "session no longer valid");
                self.inner.apply_user(seq, None);
            }
            Err(err) => {
                warn!(error = %err, "user refresh failed; keeping current session");
                return;
            }
        }
        self.inner.subscribers.notify();
    }

    /// Restore the freshly constructed state and drop all subscribers.
    pub fn reset(&self) {
        *self.inner.init.lock().unwrap_or_else(PoisonError::into_inner) = None;
        *self.inner.lock() = SessionState::default();
        self.inner.subscribers.clear();
    }

    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.inner.subscribers.subscribe(callback)
    }

    // -------------------------------------------------------------------------
    // Projections
    // -------------------------------------------------------------------------

    #[must_use]
    pub fn user(&self) -> Option<User> {
        self.inner.lock().user.clone()
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.inner.lock().in_flight > 0
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.inner.lock().user.is_some()
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.inner.lock().initialized
    }

    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        let state = self.inner.lock();
        if state.in_flight > 0 {
            SessionPhase::Loading
        } else if state.initialized {
            SessionPhase::Ready
        } else {
            SessionPhase::Uninitialized
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.inner.lock();
        SessionSnapshot { user: state.user.clone(), loading: state.in_flight > 0, initialized: state.initialized }
    }
}

impl SessionInner {
    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn next_seq(&self) -> u64 {
        let mut state = self.lock();
        state.issued += 1;
        state.issued
    }

    /// Start a loading window and notify. The guard ends it.
    fn begin_loading(self: &Arc<Self>) -> (u64, LoadingGuard) {
        let seq = {
            let mut state = self.lock();
            state.in_flight += 1;
            state.issued += 1;
            state.issued
        };
        self.subscribers.notify();
        (seq, LoadingGuard { inner: Arc::clone(self), notify: true })
    }

    /// Write `user` if `seq` is not older than the last applied result.
    fn apply_user(&self, seq: u64, user: Option<User>) -> bool {
        let mut state = self.lock();
        if seq < state.applied {
            debug!(seq, applied = state.applied, "discarding stale session result");
            return false;
        }
        state.applied = seq;
        state.user = user;
        true
    }

    fn apply_session(&self, seq: u64, user: User) -> bool {
        let user_id = user.id.clone();
        let applied = {
            let mut state = self.lock();
            if seq < state.applied {
                false
            } else {
                state.applied = seq;
                state.user = Some(user);
                state.initialized = true;
                true
            }
        };
        if applied {
            info!(%user_id, "session established");
            self.subscribers.notify();
        } else {
            debug!(seq, "discarding stale session result");
        }
        applied
    }

    async fn run_init(self: Arc<Self>) {
        let seq = {
            let mut state = self.lock();
            state.in_flight += 1;
            state.issued += 1;
            state.issued
        };
        // Notification is deferred to the single end-of-init notify.
        let guard = LoadingGuard { inner: Arc::clone(&self), notify: false };

        let user = match self.api.get_me().await {
            Ok(user) => Some(user),
            Err(err) => {
                debug!(error = %err, "no active session");
                None
            }
        };
        self.apply_user(seq, user);
        self.lock().initialized = true;
        drop(guard);
        info!(authenticated = self.lock().user.is_some(), "auth initialized");
        self.subscribers.notify();
    }
}

/// Ends a loading window on drop, including when the owning future is
/// cancelled mid-request.
struct LoadingGuard {
    inner: Arc<SessionInner>,
    notify: bool,
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        {
            let mut state = self.inner.lock();
            state.in_flight = state.in_flight.saturating_sub(1);
        }
        if self.notify {
            self.inner.subscribers.notify();
        }
    }
}
