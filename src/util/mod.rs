//! Stateless helpers and small stateful widgets used by the admin views.

pub mod auth;
pub mod debounce;
pub mod ui_persistence;
pub mod upload;
pub mod validate;

pub use debounce::Debouncer;
pub use ui_persistence::{FilePreferences, MemoryPreferences, PreferenceStore, PrefsError};
pub use validate::{FieldDef, FieldKind, FieldValue, validate, validate_form};
