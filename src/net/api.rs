//! HTTP client for the admin API.
//!
//! SYSTEM CONTEXT
//! ==============
//! Every outbound call goes through [`ApiClient::request`]: it attaches the
//! bearer token, unwraps the `{ success, data, error }` envelope and, on a
//! 401, performs one silent refresh (`POST /auth/refresh`) before retrying
//! the original request once.
//!
//! Logout starts a new token epoch. A login, registration or refresh that was
//! already in flight when the user signed out cannot store its token.
//!
//! ERROR HANDLING
//! ==============
//! Expected failures (bad credentials, validation, missing records) come back
//! as `Err(ApiError)` values. A failed refresh returns the original 401
//! classification rather than the refresh error, so callers see why their
//! request was rejected.

#[cfg(test)]
#[path = "api_test.rs"]
mod api_test;

use std::sync::atomic::{AtomicU64, Ordering};

use reqwest::Method;
use serde::de::{DeserializeOwned, IgnoredAny};
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use super::error::ApiError;
use super::tokens::TokenStore;
use super::types::{AuthSession, Envelope, LoginRequest, RegisterRequest, TokenPair, UploadFile, User};
use crate::config::{ApiTimeouts, ClientConfig, ConfigError};

const ME_PATH: &str = "/auth/me";
const LOGIN_PATH: &str = "/auth/login";
const REGISTER_PATH: &str = "/auth/register";
const LOGOUT_PATH: &str = "/auth/logout";
const REFRESH_PATH: &str = "/auth/refresh";

const SIGNED_OUT_MESSAGE: &str = "Signed out before sign-in completed";

/// Endpoints whose 401 means "wrong credentials", not "stale token".
const NO_REFRESH_PATHS: [&str; 4] = [LOGIN_PATH, REGISTER_PATH, REFRESH_PATH, LOGOUT_PATH];

// =============================================================================
// AUTH TRAIT
// =============================================================================

/// The four session operations the session store depends on. Enables mocking
/// in tests.
#[async_trait::async_trait]
pub trait AuthApi: Send + Sync {
    /// Fetch the user behind the current session.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Auth`] when there is no valid session.
    async fn get_me(&self) -> Result<User, ApiError>;

    /// Exchange credentials for a session.
    ///
    /// # Errors
    ///
    /// Returns the classified server rejection or transport failure.
    async fn login(&self, email: &str, password: &str) -> Result<AuthSession, ApiError>;

    /// Create an account and sign it in.
    ///
    /// # Errors
    ///
    /// Returns the classified server rejection or transport failure.
    async fn register(&self, email: &str, password: &str, name: Option<&str>) -> Result<AuthSession, ApiError>;

    /// End the remote session. Local tokens are dropped either way.
    ///
    /// # Errors
    ///
    /// Returns the classified server rejection or transport failure.
    async fn logout(&self) -> Result<(), ApiError>;
}

// =============================================================================
// CLIENT
// =============================================================================

#[derive(Clone, Copy)]
pub(crate) enum Payload<'a> {
    Empty,
    Json(&'a Value),
    Files(&'a [UploadFile]),
}

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    tokens: TokenStore,
    /// Serializes refreshes so concurrent 401s share one round-trip.
    refresh_gate: tokio::sync::Mutex<()>,
    /// Completed refresh round-trips, successful or not.
    refresh_attempts: AtomicU64,
}

impl ApiClient {
    /// Build a client for `base_url` (no trailing slash needed).
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client fails to build.
    pub fn new(base_url: impl Into<String>, timeouts: ApiTimeouts) -> Result<Self, ConfigError> {
        let http = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(timeouts.request())
            .connect_timeout(timeouts.connect())
            .build()
            .map_err(|e| ConfigError::HttpClientBuild(e.to_string()))?;
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        Ok(Self {
            http,
            base_url,
            tokens: TokenStore::default(),
            refresh_gate: tokio::sync::Mutex::new(()),
            refresh_attempts: AtomicU64::new(0),
        })
    }

    /// Build a client from parsed config.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client fails to build.
    pub fn from_config(config: &ClientConfig) -> Result<Self, ConfigError> {
        Self::new(config.api_url.clone(), config.timeouts)
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn access_token(&self) -> Option<String> {
        self.tokens.access_token()
    }

    /// Forget both tokens. Sign-ins already in flight will not store theirs.
    pub fn clear_tokens(&self) {
        self.tokens.clear();
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    // -------------------------------------------------------------------------
    // Generic request surface
    // -------------------------------------------------------------------------

    /// Send a request and decode the envelope's `data`.
    ///
    /// # Errors
    ///
    /// Returns the classified failure; a success envelope without `data` is a
    /// [`ApiError::Decode`].
    pub async fn request<T: DeserializeOwned>(&self, method: Method, path: &str, body: Option<&Value>) -> Result<T, ApiError> {
        self.request_with_query(method, path, &[], body).await
    }

    /// Like [`ApiClient::request`] with query parameters.
    ///
    /// # Errors
    ///
    /// Returns the classified failure.
    pub async fn request_with_query<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> Result<T, ApiError> {
        let payload = body.map_or(Payload::Empty, Payload::Json);
        self.execute(method, path, query, payload).await?.ok_or_else(|| missing_data(path))
    }

    /// Send a request whose success carries no meaningful `data`.
    ///
    /// # Errors
    ///
    /// Returns the classified failure.
    pub async fn request_empty(&self, method: Method, path: &str, query: &[(&str, String)], body: Option<&Value>) -> Result<(), ApiError> {
        let payload = body.map_or(Payload::Empty, Payload::Json);
        self.execute::<IgnoredAny>(method, path, query, payload).await?;
        Ok(())
    }

    pub(crate) async fn execute<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        payload: Payload<'_>,
    ) -> Result<Option<T>, ApiError> {
        let seen_generation = self.tokens.generation();
        let seen_attempts = self.refresh_attempts.load(Ordering::SeqCst);
        let (status, body) = self.send(method.clone(), path, query, payload).await?;
        if status != 401 || NO_REFRESH_PATHS.contains(&path) {
            return parse_envelope(status, &body);
        }

        let original = parse_envelope(status, &body);
        if !self.refresh_after(seen_generation, seen_attempts).await {
            debug!(path, "refresh failed; returning original auth failure");
            return original;
        }

        let (status, body) = self.send(method, path, query, payload).await?;
        parse_envelope(status, &body)
    }

    async fn send(&self, method: Method, path: &str, query: &[(&str, String)], payload: Payload<'_>) -> Result<(u16, String), ApiError> {
        self.send_as(self.tokens.access_token(), method, path, query, payload).await
    }

    /// Send with an explicit bearer token instead of the stored one.
    async fn send_as(
        &self,
        token: Option<String>,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        payload: Payload<'_>,
    ) -> Result<(u16, String), ApiError> {
        let mut req = self.http.request(method.clone(), self.url(path));
        if !query.is_empty() {
            req = req.query(query);
        }
        if let Some(token) = token {
            req = req.bearer_auth(token);
        }
        req = match payload {
            Payload::Empty => req,
            Payload::Json(value) => req.json(value),
            Payload::Files(files) => req.multipart(multipart_form(files)?),
        };

        let response = req.send().await.map_err(|e| {
            warn!(%method, path, error = %e, "api request failed");
            ApiError::from(e)
        })?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        debug!(%method, path, status, "api response");
        Ok((status, body))
    }

    // -------------------------------------------------------------------------
    // Refresh
    // -------------------------------------------------------------------------

    /// Refresh the access token unless the counters show another task already
    /// settled it since the failed request was sent. A refresh that ran in the
    /// meantime and left no token is not repeated.
    async fn refresh_after(&self, seen_generation: u64, seen_attempts: u64) -> bool {
        let _gate = self.refresh_gate.lock().await;
        if self.tokens.generation() != seen_generation && self.tokens.access_token().is_some() {
            debug!("token already refreshed by a concurrent request");
            return true;
        }
        if self.refresh_attempts.load(Ordering::SeqCst) != seen_attempts {
            debug!("concurrent refresh already failed");
            return false;
        }
        self.refresh_locked().await
    }

    /// Explicitly refresh the access token. Returns whether a new token is held.
    pub async fn refresh_token(&self) -> bool {
        let _gate = self.refresh_gate.lock().await;
        self.refresh_locked().await
    }

    async fn refresh_locked(&self) -> bool {
        let epoch = self.tokens.epoch();
        let body = self.tokens.refresh_token().map(|token| json!({ "refreshToken": token }));
        let payload = body.as_ref().map_or(Payload::Empty, Payload::Json);

        let result = match self.send(Method::POST, REFRESH_PATH, &[], payload).await {
            Ok((status, text)) => parse_envelope::<TokenPair>(status, &text),
            Err(err) => Err(err),
        };
        self.refresh_attempts.fetch_add(1, Ordering::SeqCst);
        match result {
            Ok(Some(pair)) => {
                if !self.tokens.replace_if_current(epoch, pair.access_token, pair.refresh_token) {
                    debug!("signed out during refresh; token dropped");
                    return false;
                }
                info!("access token refreshed");
                true
            }
            Ok(None) => {
                warn!("refresh succeeded without a token payload");
                false
            }
            Err(err) => {
                if err.is_auth() {
                    self.tokens.discard();
                }
                debug!(error = %err, "token refresh rejected");
                false
            }
        }
    }

    // -------------------------------------------------------------------------
    // Uploads
    // -------------------------------------------------------------------------

    /// Upload files as multipart field `files` to `POST /upload/multiple`.
    ///
    /// Refreshes first when no access token is held, so a reload followed by
    /// an upload does not spend the multipart body on a guaranteed 401.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Auth`] when no session can be established, or the
    /// classified server rejection.
    pub async fn upload_files(&self, files: &[UploadFile]) -> Result<Value, ApiError> {
        if self.tokens.access_token().is_none() && !self.refresh_token().await {
            return Err(ApiError::Auth {
                message: "Authentication required. Please log in again.".to_owned(),
                code: None,
            });
        }
        let data = self.execute::<Value>(Method::POST, "/upload/multiple", &[], Payload::Files(files)).await?;
        info!(count = files.len(), "files uploaded");
        Ok(data.unwrap_or(Value::Null))
    }
}

#[async_trait::async_trait]
impl AuthApi for ApiClient {
    async fn get_me(&self) -> Result<User, ApiError> {
        self.request(Method::GET, ME_PATH, None).await
    }

    async fn login(&self, email: &str, password: &str) -> Result<AuthSession, ApiError> {
        let body = serde_json::to_value(LoginRequest { email, password }).map_err(|e| ApiError::Decode(e.to_string()))?;
        let epoch = self.tokens.epoch();
        let session: AuthSession = self.request(Method::POST, LOGIN_PATH, Some(&body)).await?;
        self.store_session(epoch, &session)?;
        info!(user_id = %session.user.id, "logged in");
        Ok(session)
    }

    async fn register(&self, email: &str, password: &str, name: Option<&str>) -> Result<AuthSession, ApiError> {
        let body =
            serde_json::to_value(RegisterRequest { email, password, name }).map_err(|e| ApiError::Decode(e.to_string()))?;
        let epoch = self.tokens.epoch();
        let session: AuthSession = self.request(Method::POST, REGISTER_PATH, Some(&body)).await?;
        self.store_session(epoch, &session)?;
        info!(user_id = %session.user.id, "registered");
        Ok(session)
    }

    async fn logout(&self) -> Result<(), ApiError> {
        let token = self.tokens.clear();
        let (status, body) = self.send_as(token, Method::POST, LOGOUT_PATH, &[], Payload::Empty).await?;
        parse_envelope::<IgnoredAny>(status, &body)?;
        Ok(())
    }
}

impl ApiClient {
    /// Store the tokens from a sign-in that started in `epoch`.
    fn store_session(&self, epoch: u64, session: &AuthSession) -> Result<(), ApiError> {
        if self.tokens.replace_if_current(epoch, session.access_token.clone(), session.refresh_token.clone()) {
            return Ok(());
        }
        debug!(user_id = %session.user.id, "signed out while signing in; tokens dropped");
        Err(ApiError::Auth { message: SIGNED_OUT_MESSAGE.to_owned(), code: None })
    }
}

// =============================================================================
// PARSING
// =============================================================================

/// Decode an envelope, classifying failures by status.
///
/// `Ok(None)` means a success envelope with no `data`.
pub(crate) fn parse_envelope<T: DeserializeOwned>(status: u16, body: &str) -> Result<Option<T>, ApiError> {
    if !(200..300).contains(&status) {
        let error = serde_json::from_str::<Envelope<IgnoredAny>>(body).map_or(None, |env| env.error);
        return Err(match error {
            Some(e) => ApiError::from_status(status, e.message, e.code),
            None => ApiError::from_status(status, request_failed_message(status), None),
        });
    }

    let envelope: Envelope<T> = serde_json::from_str(body).map_err(|e| ApiError::Decode(e.to_string()))?;
    if envelope.success {
        return Ok(envelope.data);
    }
    let (message, code) = envelope
        .error
        .map_or_else(|| (request_failed_message(status), None), |e| (e.message, e.code));
    Err(ApiError::Validation { message, code })
}

fn request_failed_message(status: u16) -> String {
    format!("request failed: {status}")
}

fn missing_data(path: &str) -> ApiError {
    ApiError::Decode(format!("{path}: success response without data"))
}

fn multipart_form(files: &[UploadFile]) -> Result<reqwest::multipart::Form, ApiError> {
    let mut form = reqwest::multipart::Form::new();
    for file in files {
        let part = reqwest::multipart::Part::bytes(file.bytes.clone())
            .file_name(file.name.clone())
            .mime_str(&file.mime_type)
            .map_err(|e| ApiError::Validation { message: format!("{}: {e}", file.name), code: None })?;
        form = form.part("files", part);
    }
    Ok(form)
}
