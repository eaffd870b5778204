//! In-memory bearer token storage.
//!
//! Tokens never touch disk. The refresh token is only held when the server
//! returns one in the body; cookie-based refresh lives in the HTTP client's
//! cookie jar instead.

#[cfg(test)]
#[path = "tokens_test.rs"]
mod tokens_test;

use std::sync::Mutex;

#[derive(Debug, Default)]
pub struct TokenStore {
    inner: Mutex<Tokens>,
}

#[derive(Debug, Default)]
struct Tokens {
    access: Option<String>,
    refresh: Option<String>,
    /// Bumped on every change so a caller can tell whether another task
    /// replaced the token since it last looked.
    generation: u64,
    /// Bumped on sign-out only. Writes tagged with an older epoch are refused.
    epoch: u64,
}

impl TokenStore {
    fn with<R>(&self, f: impl FnOnce(&mut Tokens) -> R) -> R {
        let mut guard = self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        f(&mut guard)
    }

    #[must_use]
    pub fn access_token(&self) -> Option<String> {
        self.with(|t| t.access.clone())
    }

    #[must_use]
    pub fn refresh_token(&self) -> Option<String> {
        self.with(|t| t.refresh.clone())
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.with(|t| t.generation)
    }

    /// Sign-out epoch; read before a request whose result may store tokens.
    #[must_use]
    pub fn epoch(&self) -> u64 {
        self.with(|t| t.epoch)
    }

    /// Store a new access token; the refresh token is only replaced when a new
    /// one is supplied.
    pub fn replace(&self, access: String, refresh: Option<String>) {
        self.with(|t| t.store(access, refresh));
    }

    /// Like [`TokenStore::replace`], but only if no sign-out happened since
    /// `epoch` was read. Returns whether the tokens were stored.
    pub fn replace_if_current(&self, epoch: u64, access: String, refresh: Option<String>) -> bool {
        self.with(|t| {
            if t.epoch != epoch {
                return false;
            }
            t.store(access, refresh);
            true
        })
    }

    /// Sign out: drop both tokens and start a new epoch. Returns the access
    /// token that was held, for the final logout request.
    pub fn clear(&self) -> Option<String> {
        self.with(|t| {
            t.epoch += 1;
            t.wipe()
        })
    }

    /// Drop both tokens after the server rejected them. In-flight sign-ins
    /// may still store theirs.
    pub fn discard(&self) {
        self.with(|t| {
            t.wipe();
        });
    }
}

impl Tokens {
    fn store(&mut self, access: String, refresh: Option<String>) {
        self.access = Some(access);
        if refresh.is_some() {
            self.refresh = refresh;
        }
        self.generation += 1;
    }

    fn wipe(&mut self) -> Option<String> {
        self.refresh = None;
        self.generation += 1;
        self.access.take()
    }
}
