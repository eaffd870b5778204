//! Admin endpoints: users, files, settings, dashboard.
//!
//! Thin typed wrappers over [`ApiClient::request`]; the refresh-and-retry
//! behaviour comes for free.

#[cfg(test)]
#[path = "admin_test.rs"]
mod admin_test;

use std::collections::BTreeMap;

use reqwest::Method;
use serde_json::json;
use tracing::info;

use super::api::ApiClient;
use super::error::ApiError;
use super::types::{AdminUser, AppSetting, DashboardStats, FileListing, ListParams, NewUser, Paginated, SettingUpdate, UserUpdate};

fn user_path(id: &str) -> String {
    format!("/admin/users/{id}")
}

fn encode<T: serde::Serialize>(value: &T) -> Result<serde_json::Value, ApiError> {
    serde_json::to_value(value).map_err(|e| ApiError::Decode(e.to_string()))
}

impl ApiClient {
    /// # Errors
    ///
    /// Returns the classified failure.
    pub async fn list_users(&self, params: &ListParams) -> Result<Paginated<AdminUser>, ApiError> {
        self.request_with_query(Method::GET, "/admin/users", &params.to_query(), None).await
    }

    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] when the user does not exist.
    pub async fn get_user(&self, id: &str) -> Result<AdminUser, ApiError> {
        self.request(Method::GET, &user_path(id), None).await
    }

    /// # Errors
    ///
    /// Returns [`ApiError::Validation`] for rejected input (e.g. duplicate email).
    pub async fn create_user(&self, user: &NewUser) -> Result<AdminUser, ApiError> {
        let body = encode(user)?;
        let created: AdminUser = self.request(Method::POST, "/admin/users", Some(&body)).await?;
        info!(user_id = %created.id, "admin created user");
        Ok(created)
    }

    /// # Errors
    ///
    /// Returns the classified failure.
    pub async fn update_user(&self, id: &str, update: &UserUpdate) -> Result<AdminUser, ApiError> {
        let body = encode(update)?;
        self.request(Method::PUT, &user_path(id), Some(&body)).await
    }

    /// # Errors
    ///
    /// Returns the classified failure.
    pub async fn delete_user(&self, id: &str) -> Result<(), ApiError> {
        self.request_empty(Method::DELETE, &user_path(id), &[], None).await?;
        info!(user_id = %id, "admin deleted user");
        Ok(())
    }

    /// List a directory under the upload root; `""` is the root.
    ///
    /// # Errors
    ///
    /// Returns the classified failure.
    pub async fn list_files(&self, dir: &str) -> Result<FileListing, ApiError> {
        self.request_with_query(Method::GET, "/admin/files", &[("dir", dir.to_owned())], None).await
    }

    /// # Errors
    ///
    /// Returns the classified failure.
    pub async fn delete_file(&self, path: &str) -> Result<(), ApiError> {
        self.request_empty(Method::DELETE, "/admin/files", &[("path", path.to_owned())], None).await?;
        info!(path, "admin deleted file");
        Ok(())
    }

    /// # Errors
    ///
    /// Returns the classified failure.
    pub async fn get_settings(&self) -> Result<Vec<AppSetting>, ApiError> {
        self.request(Method::GET, "/admin/settings", None).await
    }

    /// Persist changed settings. An empty change set is not sent.
    ///
    /// # Errors
    ///
    /// Returns the classified failure.
    pub async fn update_settings(&self, changes: &[SettingUpdate]) -> Result<(), ApiError> {
        if changes.is_empty() {
            return Ok(());
        }
        let body = json!({ "settings": encode(&changes)? });
        self.request_empty(Method::PUT, "/admin/settings", &[], Some(&body)).await?;
        info!(count = changes.len(), "settings saved");
        Ok(())
    }

    /// # Errors
    ///
    /// Returns the classified failure.
    pub async fn get_dashboard(&self) -> Result<DashboardStats, ApiError> {
        self.request(Method::GET, "/admin/dashboard", None).await
    }
}

/// Settings whose edited value differs from the loaded one, in load order.
///
/// Keys missing from `edited` are treated as unchanged.
#[must_use]
pub fn changed_settings(loaded: &[AppSetting], edited: &BTreeMap<String, String>) -> Vec<SettingUpdate> {
    loaded
        .iter()
        .filter_map(|s| {
            let value = edited.get(&s.key)?;
            (value != &s.value).then(|| SettingUpdate { key: s.key.clone(), value: value.clone() })
        })
        .collect()
}

/// Group settings for sectioned display, preserving load order within groups.
#[must_use]
pub fn group_settings(settings: &[AppSetting]) -> BTreeMap<String, Vec<AppSetting>> {
    let mut groups: BTreeMap<String, Vec<AppSetting>> = BTreeMap::new();
    for setting in settings {
        groups.entry(setting.group_or_default().to_owned()).or_default().push(setting.clone());
    }
    groups
}
