//! Client configuration parsed from environment variables.

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;

use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:3001/api";
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 3002;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_SEARCH_DEBOUNCE_MS: u64 = 300;
pub const DEFAULT_TOAST_DURATION_MS: u64 = 5000;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An environment value was present but could not be parsed.
    #[error("invalid {var}={value:?}: {reason}")]
    Invalid { var: &'static str, value: String, reason: String },

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApiTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

impl ApiTimeouts {
    #[must_use]
    pub fn request(self) -> Duration {
        Duration::from_secs(self.request_secs)
    }

    #[must_use]
    pub fn connect(self) -> Duration {
        Duration::from_secs(self.connect_secs)
    }
}

impl Default for ApiTimeouts {
    fn default() -> Self {
        Self { request_secs: DEFAULT_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// API base URL without a trailing slash, e.g. `http://127.0.0.1:3001/api`.
    pub api_url: String,
    pub host: String,
    pub port: u16,
    pub timeouts: ApiTimeouts,
    /// JSON file backing UI preferences; in-memory when absent.
    pub prefs_path: Option<PathBuf>,
    pub search_debounce_ms: u64,
    pub toast_duration_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_owned(),
            host: DEFAULT_HOST.to_owned(),
            port: DEFAULT_PORT,
            timeouts: ApiTimeouts::default(),
            prefs_path: None,
            search_debounce_ms: DEFAULT_SEARCH_DEBOUNCE_MS,
            toast_duration_ms: DEFAULT_TOAST_DURATION_MS,
        }
    }
}

impl ClientConfig {
    /// Build typed config from the process environment.
    ///
    /// Optional:
    /// - `API_URL`: default `http://127.0.0.1:3001/api`
    /// - `HOST`, `PORT`: default `127.0.0.1:3002`
    /// - `API_REQUEST_TIMEOUT_SECS`: default 30
    /// - `API_CONNECT_TIMEOUT_SECS`: default 10
    /// - `ADMIN_PREFS_PATH`: JSON file for persisted UI preferences
    /// - `SEARCH_DEBOUNCE_MS`: default 300
    /// - `TOAST_DURATION_MS`: default 5000
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a present value does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build typed config from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a present value does not parse.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_owned()).filter(|v| !v.is_empty());

        let api_url = parse_api_url(get("API_URL").as_deref())?;
        let host = get("HOST").unwrap_or_else(|| DEFAULT_HOST.to_owned());
        let port = parse_number("PORT", get("PORT"), DEFAULT_PORT)?;
        let timeouts = ApiTimeouts {
            request_secs: parse_number("API_REQUEST_TIMEOUT_SECS", get("API_REQUEST_TIMEOUT_SECS"), DEFAULT_REQUEST_TIMEOUT_SECS)?,
            connect_secs: parse_number("API_CONNECT_TIMEOUT_SECS", get("API_CONNECT_TIMEOUT_SECS"), DEFAULT_CONNECT_TIMEOUT_SECS)?,
        };
        let prefs_path = get("ADMIN_PREFS_PATH").map(PathBuf::from);
        let search_debounce_ms = parse_number("SEARCH_DEBOUNCE_MS", get("SEARCH_DEBOUNCE_MS"), DEFAULT_SEARCH_DEBOUNCE_MS)?;
        let toast_duration_ms = parse_number("TOAST_DURATION_MS", get("TOAST_DURATION_MS"), DEFAULT_TOAST_DURATION_MS)?;

        Ok(Self { api_url, host, port, timeouts, prefs_path, search_debounce_ms, toast_duration_ms })
    }

    /// `host:port` of the serving process.
    #[must_use]
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    #[must_use]
    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }
}

fn parse_api_url(raw: Option<&str>) -> Result<String, ConfigError> {
    let Some(raw) = raw else {
        return Ok(DEFAULT_API_URL.to_owned());
    };
    if !(raw.starts_with("http://") || raw.starts_with("https://")) {
        return Err(ConfigError::Invalid {
            var: "API_URL",
            value: raw.to_owned(),
            reason: "expected an http:// or https:// URL".to_owned(),
        });
    }
    Ok(raw.trim_end_matches('/').to_owned())
}

fn parse_number<T>(var: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(value) => value.parse::<T>().map_err(|e| ConfigError::Invalid { var, reason: e.to_string(), value }),
    }
}
