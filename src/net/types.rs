//! Wire DTOs for the admin API.
//!
//! DESIGN
//! ======
//! The API speaks camelCase JSON wrapped in a `{ success, data, error }`
//! envelope. These types mirror that schema directly so serde does all of the
//! shape checking; callers never see the envelope itself.

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;

use serde::{Deserialize, Serialize};

// =============================================================================
// ENVELOPE
// =============================================================================

/// Response envelope shared by every endpoint.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ErrorBody>,
}

/// Error payload carried by a `success: false` envelope.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ErrorBody {
    pub message: String,
    #[serde(default)]
    pub code: Option<String>,
}

// =============================================================================
// IDENTITY
// =============================================================================

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

/// Authenticated identity as returned by `/auth/me` and the admin endpoints.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    pub role: Role,
    pub is_active: bool,
    /// ISO-8601 timestamp.
    pub created_at: String,
    #[serde(default)]
    pub last_login_at: Option<String>,
}

impl User {
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Name if set, otherwise the email address.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name.as_deref().filter(|n| !n.is_empty()).unwrap_or(&self.email)
    }
}

/// Admin screens use the same record shape as the session user.
pub type AdminUser = User;

#[derive(Clone, Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Clone, Debug, Serialize)]
pub struct RegisterRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<&'a str>,
}

/// Payload of a successful login or registration.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthSession {
    pub user: User,
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Payload of `POST /auth/refresh`.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

// =============================================================================
// ADMIN: USERS
// =============================================================================

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDir {
    Asc,
    #[default]
    Desc,
}

impl SortDir {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// Query parameters for the paginated user list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListParams {
    pub page: u32,
    pub page_size: u32,
    pub search: Option<String>,
    pub sort_by: Option<String>,
    pub sort_dir: SortDir,
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: 10,
            search: None,
            sort_by: Some("created_at".to_owned()),
            sort_dir: SortDir::Desc,
        }
    }
}

impl ListParams {
    /// Encode as query pairs; blank searches are omitted.
    #[must_use]
    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut query = vec![("page", self.page.to_string()), ("pageSize", self.page_size.to_string())];
        if let Some(search) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            query.push(("search", search.to_owned()));
        }
        if let Some(sort_by) = &self.sort_by {
            query.push(("sortBy", sort_by.clone()));
            query.push(("sortDir", self.sort_dir.as_str().to_owned()));
        }
        query
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub total: u64,
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub page_size: u32,
    pub total_pages: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub role: Role,
    pub is_active: bool,
}

/// Partial update for `PUT /admin/users/{id}`.
///
/// `name: Some(None)` clears the name; `None` leaves it untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_users: u64,
    pub active_users: u64,
    pub admin_users: u64,
    pub new_users_today: u64,
    pub new_users_this_week: u64,
    pub new_users_this_month: u64,
    #[serde(default)]
    pub recent_users: Vec<AdminUser>,
}

// =============================================================================
// ADMIN: FILES
// =============================================================================

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileInfo {
    pub name: String,
    /// Path relative to the upload root, `/`-separated.
    pub path: String,
    pub is_dir: bool,
    pub size: u64,
    pub mod_time: String,
    #[serde(default)]
    pub extension: Option<String>,
    #[serde(default, rename = "type")]
    pub mime_type: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileListing {
    pub files: Vec<FileInfo>,
    pub current_dir: String,
    pub total_size: u64,
}

impl FileListing {
    /// Directory one level up, or `None` at the root.
    #[must_use]
    pub fn parent_dir(&self) -> Option<String> {
        if self.current_dir.is_empty() {
            return None;
        }
        Some(
            self.current_dir
                .rsplit_once('/')
                .map_or_else(String::new, |(parent, _)| parent.to_owned()),
        )
    }
}

// =============================================================================
// ADMIN: SETTINGS
// =============================================================================

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct AppSetting {
    pub key: String,
    pub value: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl AppSetting {
    /// Group used for sectioning; ungrouped settings land in `"other"`.
    #[must_use]
    pub fn group_or_default(&self) -> &str {
        self.group.as_deref().filter(|g| !g.is_empty()).unwrap_or("other")
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SettingUpdate {
    pub key: String,
    pub value: String,
}

// =============================================================================
// UPLOADS
// =============================================================================

/// A file staged for `POST /upload/multiple`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadFile {
    pub name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    #[must_use]
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}
