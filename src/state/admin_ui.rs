//! Admin chrome state: theme, sidebar, and the toast queue.
//!
//! DESIGN
//! ======
//! Theme and sidebar-collapsed are mirrored into a [`PreferenceStore`] on
//! every toggle, before subscribers hear about the change. Persist failures
//! are logged and otherwise ignored. Toast expiry runs on a tokio task that
//! holds only a weak reference, so a dropped store cancels its timers.

#[cfg(test)]
#[path = "admin_ui_test.rs"]
mod admin_ui_test;

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use tracing::{debug, warn};
use uuid::Uuid;

use super::observer::{Subscribers, Subscription};
use crate::config::DEFAULT_TOAST_DURATION_MS;
use crate::util::ui_persistence::{PreferenceStore, SIDEBAR_COLLAPSED_KEY, THEME_KEY};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "light" => Some(Self::Light),
            "dark" => Some(Self::Dark),
            _ => None,
        }
    }

    #[must_use]
    pub fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Error,
    Info,
    Warning,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Toast {
    pub id: String,
    pub kind: ToastKind,
    pub message: String,
    /// Zero means the toast stays until removed.
    pub duration_ms: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AdminUiState {
    pub theme: Theme,
    pub sidebar_collapsed: bool,
    pub sidebar_mobile_open: bool,
    pub toasts: Vec<Toast>,
}

struct AdminUiInner {
    state: Mutex<AdminUiState>,
    prefs: Arc<dyn PreferenceStore>,
    subscribers: Subscribers,
    toast_duration_ms: u64,
}

#[derive(Clone)]
pub struct AdminUiStore {
    inner: Arc<AdminUiInner>,
}

impl AdminUiStore {
    #[must_use]
    pub fn new(prefs: Arc<dyn PreferenceStore>) -> Self {
        Self::with_toast_duration(prefs, DEFAULT_TOAST_DURATION_MS)
    }

    /// Store whose `toast()` helpers use `toast_duration_ms`.
    #[must_use]
    pub fn with_toast_duration(prefs: Arc<dyn PreferenceStore>, toast_duration_ms: u64) -> Self {
        Self {
            inner: Arc::new(AdminUiInner {
                state: Mutex::new(AdminUiState::default()),
                prefs,
                subscribers: Subscribers::new(),
                toast_duration_ms,
            }),
        }
    }

    // -------------------------------------------------------------------------
    // Preferences
    // -------------------------------------------------------------------------

    /// Load the saved theme, if any. Unknown values are ignored.
    pub fn init_theme(&self) {
        if let Some(theme) = self.inner.prefs.get(THEME_KEY).as_deref().and_then(Theme::parse) {
            self.inner.lock().theme = theme;
        }
    }

    /// Load the saved sidebar state; only `"true"` collapses it.
    pub fn init_sidebar(&self) {
        if self.inner.prefs.get(SIDEBAR_COLLAPSED_KEY).as_deref() == Some("true") {
            self.inner.lock().sidebar_collapsed = true;
        }
    }

    pub fn toggle_theme(&self) {
        let theme = {
            let mut state = self.inner.lock();
            state.theme = state.theme.toggled();
            state.theme
        };
        self.inner.persist(THEME_KEY, theme.as_str());
        self.inner.subscribers.notify();
    }

    pub fn toggle_sidebar(&self) {
        let collapsed = {
            let mut state = self.inner.lock();
            state.sidebar_collapsed = !state.sidebar_collapsed;
            state.sidebar_collapsed
        };
        self.inner.persist(SIDEBAR_COLLAPSED_KEY, if collapsed { "true" } else { "false" });
        self.inner.subscribers.notify();
    }

    pub fn toggle_mobile_sidebar(&self) {
        {
            let mut state = self.inner.lock();
            state.sidebar_mobile_open = !state.sidebar_mobile_open;
        }
        self.inner.subscribers.notify();
    }

    pub fn close_mobile_sidebar(&self) {
        self.inner.lock().sidebar_mobile_open = false;
        self.inner.subscribers.notify();
    }

    // -------------------------------------------------------------------------
    // Toasts
    // -------------------------------------------------------------------------

    /// Append a toast and return its id. A non-zero duration schedules removal.
    pub fn add_toast(&self, kind: ToastKind, message: impl Into<String>, duration_ms: u64) -> String {
        let id = Uuid::new_v4().to_string();
        self.inner.lock().toasts.push(Toast { id: id.clone(), kind, message: message.into(), duration_ms });
        self.inner.subscribers.notify();

        if duration_ms > 0 {
            self.schedule_removal(id.clone(), Duration::from_millis(duration_ms));
        }
        id
    }

    /// Remove the toast with `id`. Unknown ids are a no-op but still notify.
    pub fn remove_toast(&self, id: &str) {
        self.inner.lock().toasts.retain(|t| t.id != id);
        self.inner.subscribers.notify();
    }

    #[must_use]
    pub fn toast(&self) -> Toaster<'_> {
        Toaster { store: self }
    }

    fn schedule_removal(&self, id: String, after: Duration) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!(%id, "no async runtime; toast will persist until removed");
            return;
        };
        let weak: Weak<AdminUiInner> = Arc::downgrade(&self.inner);
        handle.spawn(async move {
            tokio::time::sleep(after).await;
            if let Some(inner) = weak.upgrade() {
                debug!(%id, "toast expired");
                AdminUiStore { inner }.remove_toast(&id);
            }
        });
    }

    // -------------------------------------------------------------------------
    // Projections
    // -------------------------------------------------------------------------

    #[must_use]
    pub fn theme(&self) -> Theme {
        self.inner.lock().theme
    }

    #[must_use]
    pub fn sidebar_collapsed(&self) -> bool {
        self.inner.lock().sidebar_collapsed
    }

    #[must_use]
    pub fn sidebar_mobile_open(&self) -> bool {
        self.inner.lock().sidebar_mobile_open
    }

    #[must_use]
    pub fn toasts(&self) -> Vec<Toast> {
        self.inner.lock().toasts.clone()
    }

    #[must_use]
    pub fn snapshot(&self) -> AdminUiState {
        self.inner.lock().clone()
    }

    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.inner.subscribers.subscribe(callback)
    }

    /// Restore defaults and drop all subscribers. Stored preferences are kept.
    pub fn reset(&self) {
        *self.inner.lock() = AdminUiState::default();
        self.inner.subscribers.clear();
    }
}

impl AdminUiInner {
    fn lock(&self) -> MutexGuard<'_, AdminUiState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist(&self, key: &str, value: &str) {
        if let Err(e) = self.prefs.set(key, value) {
            warn!(error = %e, key, "failed to persist preference");
        }
    }
}

/// Shorthand for adding toasts. The `_for` variants take an explicit duration
/// in milliseconds; 0 keeps the toast until it is removed.
pub struct Toaster<'a> {
    store: &'a AdminUiStore,
}

impl Toaster<'_> {
    pub fn success(&self, message: impl Into<String>) -> String {
        self.add(ToastKind::Success, message)
    }

    pub fn error(&self, message: impl Into<String>) -> String {
        self.add(ToastKind::Error, message)
    }

    pub fn info(&self, message: impl Into<String>) -> String {
        self.add(ToastKind::Info, message)
    }

    pub fn warning(&self, message: impl Into<String>) -> String {
        self.add(ToastKind::Warning, message)
    }

    pub fn success_for(&self, message: impl Into<String>, duration_ms: u64) -> String {
        self.store.add_toast(ToastKind::Success, message, duration_ms)
    }

    pub fn error_for(&self, message: impl Into<String>, duration_ms: u64) -> String {
        self.store.add_toast(ToastKind::Error, message, duration_ms)
    }

    pub fn info_for(&self, message: impl Into<String>, duration_ms: u64) -> String {
        self.store.add_toast(ToastKind::Info, message, duration_ms)
    }

    pub fn warning_for(&self, message: impl Into<String>, duration_ms: u64) -> String {
        self.store.add_toast(ToastKind::Warning, message, duration_ms)
    }

    pub fn remove(&self, id: &str) {
        self.store.remove_toast(id);
    }

    fn add(&self, kind: ToastKind, message: impl Into<String>) -> String {
        self.store.add_toast(kind, message, self.store.inner.toast_duration_ms)
    }
}
