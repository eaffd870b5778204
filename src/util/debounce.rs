//! Debounced search input.
//!
//! Each keystroke replaces the single pending timer, so only the last value
//! typed within the window reaches the callback. Enter and clear fire at once
//! and cancel whatever is pending.

#[cfg(test)]
#[path = "debounce_test.rs"]
mod debounce_test;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::debug;

use crate::config::DEFAULT_SEARCH_DEBOUNCE_MS;

type OnSearch = Arc<dyn Fn(String) + Send + Sync>;

#[derive(Default)]
struct Pending {
    value: String,
    /// Bumped on every input, submit and clear; a timer fires only if its
    /// generation is still current.
    generation: u64,
    timer: Option<JoinHandle<()>>,
}

#[derive(Clone)]
pub struct Debouncer {
    delay: Duration,
    on_search: OnSearch,
    pending: Arc<Mutex<Pending>>,
}

impl Debouncer {
    pub fn new<F>(delay: Duration, on_search: F) -> Self
    where
        F: Fn(String) + Send + Sync + 'static,
    {
        Self { delay, on_search: Arc::new(on_search), pending: Arc::new(Mutex::new(Pending::default())) }
    }

    /// Debouncer with the default 300 ms window.
    pub fn with_default_delay<F>(on_search: F) -> Self
    where
        F: Fn(String) + Send + Sync + 'static,
    {
        Self::new(Duration::from_millis(DEFAULT_SEARCH_DEBOUNCE_MS), on_search)
    }

    #[must_use]
    pub fn value(&self) -> String {
        self.lock().value.clone()
    }

    /// Record a keystroke and restart the timer.
    pub fn input(&self, value: impl Into<String>) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            let value = value.into();
            self.cancel_and_set(Some(value.clone()));
            (self.on_search)(value);
            return;
        };

        let mut pending = self.lock();
        pending.value = value.into();
        pending.generation += 1;
        if let Some(timer) = pending.timer.take() {
            timer.abort();
        }

        let generation = pending.generation;
        let delay = self.delay;
        let state = Arc::clone(&self.pending);
        let on_search = Arc::clone(&self.on_search);
        pending.timer = Some(handle.spawn(async move {
            tokio::time::sleep(delay).await;
            let value = {
                let mut pending = state.lock().unwrap_or_else(PoisonError::into_inner);
                if pending.generation != generation {
                    return;
                }
                pending.timer = None;
                pending.value.clone()
            };
            debug!(query = %value, "debounced search fired");
            on_search(value);
        }));
    }

    /// Fire now with the current value (Enter).
    pub fn submit(&self) {
        let value = self.cancel_and_set(None);
        (self.on_search)(value);
    }

    /// Empty the input and fire `""` now.
    pub fn clear(&self) {
        let value = self.cancel_and_set(Some(String::new()));
        (self.on_search)(value);
    }

    fn cancel_and_set(&self, value: Option<String>) -> String {
        let mut pending = self.lock();
        pending.generation += 1;
        if let Some(timer) = pending.timer.take() {
            timer.abort();
        }
        if let Some(value) = value {
            pending.value = value;
        }
        pending.value.clone()
    }

    fn lock(&self) -> MutexGuard<'_, Pending> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
