//! Password reset and change endpoints.

#[cfg(test)]
#[path = "account_test.rs"]
mod account_test;

use reqwest::Method;
use serde_json::json;
use tracing::info;

use super::api::ApiClient;
use super::error::ApiError;

/// Shown when the confirmation field does not match.
pub const PASSWORDS_DO_NOT_MATCH: &str = "Passwords do not match";

/// Client-side check run before any password-setting request is sent.
///
/// # Errors
///
/// Returns [`ApiError::Validation`] when `new_password != confirmation`.
pub fn ensure_passwords_match(new_password: &str, confirmation: &str) -> Result<(), ApiError> {
    if new_password == confirmation {
        Ok(())
    } else {
        Err(ApiError::Validation { message: PASSWORDS_DO_NOT_MATCH.to_owned(), code: None })
    }
}

impl ApiClient {
    /// Ask the server to email a reset link.
    ///
    /// # Errors
    ///
    /// Returns the classified failure.
    pub async fn forgot_password(&self, email: &str) -> Result<(), ApiError> {
        let body = json!({ "email": email });
        self.request_empty(Method::POST, "/auth/forgot-password", &[], Some(&body)).await
    }

    /// Set a new password using the token from a reset link.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Validation`] for an expired or unknown token.
    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<(), ApiError> {
        let body = json!({ "token": token, "newPassword": new_password });
        self.request_empty(Method::POST, "/auth/reset-password", &[], Some(&body)).await?;
        info!("password reset completed");
        Ok(())
    }

    /// Change the signed-in user's password.
    ///
    /// # Errors
    ///
    /// Returns the classified failure; a wrong current password is usually
    /// [`ApiError::Validation`] or [`ApiError::Auth`].
    pub async fn change_password(&self, current_password: &str, new_password: &str) -> Result<(), ApiError> {
        let body = json!({ "currentPassword": current_password, "newPassword": new_password });
        self.request_empty(Method::PUT, "/auth/change-password", &[], Some(&body)).await?;
        info!("password changed");
        Ok(())
    }
}
