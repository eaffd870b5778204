//! Client-side core of the admin console: an authenticated API client with
//! silent token refresh, reactive session and UI stores, and the form and
//! input helpers the admin views share.

pub mod config;
pub mod context;
pub mod net;
pub mod state;
pub mod util;

pub use context::AppContext;
