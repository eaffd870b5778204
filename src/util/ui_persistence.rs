//! Key/value storage for UI preferences that survive restarts.
//!
//! Two backends: an in-memory map for tests and embedding, and a JSON file
//! (one flat object of string values) for the CLI.

#[cfg(test)]
#[path = "ui_persistence_test.rs"]
mod ui_persistence_test;

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use tracing::warn;

pub const THEME_KEY: &str = "admin-theme";
pub const SIDEBAR_COLLAPSED_KEY: &str = "admin-sidebar-collapsed";

#[derive(Debug, thiserror::Error)]
pub enum PrefsError {
    #[error("preferences io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("preferences file {path} is not a JSON string map: {source}")]
    Format {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Storage seam used by the admin UI store.
pub trait PreferenceStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    /// # Errors
    ///
    /// Returns [`PrefsError`] if the value could not be made durable.
    fn set(&self, key: &str, value: &str) -> Result<(), PrefsError>;
}

// =============================================================================
// MEMORY
// =============================================================================

#[derive(Debug, Default)]
pub struct MemoryPreferences {
    values: Mutex<BTreeMap<String, String>>,
}

impl MemoryPreferences {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryPreferences {
    fn get(&self, key: &str) -> Option<String> {
        self.values.lock().unwrap_or_else(PoisonError::into_inner).get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), PrefsError> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_owned(), value.to_owned());
        Ok(())
    }
}

// =============================================================================
// FILE
// =============================================================================

/// JSON-file backend. The whole map is cached and rewritten on every `set`.
#[derive(Debug)]
pub struct FilePreferences {
    path: PathBuf,
    values: Mutex<BTreeMap<String, String>>,
}

impl FilePreferences {
    /// Open `path`, treating a missing file as empty.
    ///
    /// # Errors
    ///
    /// Returns [`PrefsError`] if the file exists but cannot be read or parsed.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, PrefsError> {
        let path = path.into();
        let values = load(&path)?;
        Ok(Self { path, values: Mutex::new(values) })
    }

    /// Like [`FilePreferences::open`], but a corrupt file starts empty.
    pub fn open_or_empty(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let values = load(&path).unwrap_or_else(|e| {
            warn!(error = %e, "ignoring unreadable preferences file");
            BTreeMap::new()
        });
        Self { path, values: Mutex::new(values) }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn load(path: &Path) -> Result<BTreeMap<String, String>, PrefsError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
        Err(source) => return Err(PrefsError::Io { path: path.to_owned(), source }),
    };
    if content.trim().is_empty() {
        return Ok(BTreeMap::new());
    }
    serde_json::from_str(&content).map_err(|source| PrefsError::Format { path: path.to_owned(), source })
}

impl PreferenceStore for FilePreferences {
    fn get(&self, key: &str) -> Option<String> {
        self.values.lock().unwrap_or_else(PoisonError::into_inner).get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), PrefsError> {
        let content = {
            let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
            values.insert(key.to_owned(), value.to_owned());
            serde_json::to_string_pretty(&*values)
                .map_err(|source| PrefsError::Format { path: self.path.clone(), source })?
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| PrefsError::Io { path: parent.to_owned(), source })?;
        }
        fs::write(&self.path, content).map_err(|source| PrefsError::Io { path: self.path.clone(), source })
    }
}
