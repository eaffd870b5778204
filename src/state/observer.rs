//! Ordered subscriber registry shared by the stores.
//!
//! DESIGN
//! ======
//! `notify` snapshots the callback list and releases the lock before calling
//! anything, so callbacks may subscribe or unsubscribe (themselves or others)
//! freely. A subscriber removed mid-round is skipped for the rest of that
//! round; one added mid-round first hears the next notification.

#[cfg(test)]
#[path = "observer_test.rs"]
mod observer_test;

use std::sync::{Arc, Mutex, PoisonError, Weak};

type Callback = Arc<dyn Fn() + Send + Sync>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    entries: Vec<(u64, Callback)>,
}

impl Registry {
    fn contains(&self, id: u64) -> bool {
        self.entries.iter().any(|(entry_id, _)| *entry_id == id)
    }
}

#[derive(Clone, Default)]
pub struct Subscribers {
    registry: Arc<Mutex<Registry>>,
}

impl Subscribers {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback`; notification order is registration order.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        let mut registry = self.lock();
        let id = registry.next_id;
        registry.next_id += 1;
        registry.entries.push((id, Arc::new(callback)));
        Subscription { id, registry: Arc::downgrade(&self.registry) }
    }

    /// Synchronously invoke every registered callback.
    pub fn notify(&self) {
        let snapshot: Vec<(u64, Callback)> = self.lock().entries.clone();
        for (id, callback) in snapshot {
            if self.lock().contains(id) {
                callback();
            }
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every registration.
    pub fn clear(&self) {
        self.lock().entries.clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Handle returned by [`Subscribers::subscribe`].
///
/// Dropping the handle does not unsubscribe; call [`Subscription::unsubscribe`].
#[derive(Clone)]
pub struct Subscription {
    id: u64,
    registry: Weak<Mutex<Registry>>,
}

impl Subscription {
    /// Remove exactly this registration. Idempotent.
    pub fn unsubscribe(&self) {
        if let Some(registry) = self.registry.upgrade() {
            let mut registry = registry.lock().unwrap_or_else(PoisonError::into_inner);
            registry.entries.retain(|(id, _)| *id != self.id);
        }
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.registry.upgrade().is_some_and(|registry| {
            registry.lock().unwrap_or_else(PoisonError::into_inner).contains(self.id)
        })
    }
}
