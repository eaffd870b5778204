//! Reactive stores for the admin console.
//!
//! SYSTEM CONTEXT
//! ==============
//! `session` owns the authenticated user, `admin_ui` owns chrome state, and
//! both notify views through the shared `observer` registry.

pub mod admin_ui;
pub mod observer;
pub mod session;

pub use admin_ui::{AdminUiState, AdminUiStore, Theme, Toast, ToastKind};
pub use observer::{Subscribers, Subscription};
pub use session::{AuthFailure, SessionPhase, SessionSnapshot, SessionStore};
