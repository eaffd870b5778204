//! Networking: the admin API client and its wire schema.
//!
//! SYSTEM CONTEXT
//! ==============
//! `api` owns transport, tokens and refresh; `admin` and `account` add typed
//! endpoint wrappers; `types` defines the wire schema; `error` classifies
//! failures for the stores.

pub mod account;
pub mod admin;
pub mod api;
pub mod error;
pub mod tokens;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;

pub use api::{ApiClient, AuthApi};
pub use error::{ApiError, ErrorKind};
