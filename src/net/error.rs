//! API failure taxonomy.
//!
//! DESIGN
//! ======
//! Every non-success outcome of a request is folded into one `ApiError` so
//! stores can branch on `ErrorKind` without inspecting HTTP details. Status
//! codes are classified once, here.

#[cfg(test)]
#[path = "error_test.rs"]
mod error_test;

/// Coarse classification used by views to pick a presentation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Field-level or request-level rejection; shown inline.
    Validation,
    /// Bad credentials or an expired session; banner and/or redirect.
    Auth,
    /// The addressed resource does not exist; navigate away.
    NotFound,
    /// Transport failure; generic retry message.
    Network,
    /// Anything else the server or decoder produced.
    Server,
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    #[error("{message}")]
    Validation { message: String, code: Option<String> },

    #[error("{message}")]
    Auth { message: String, code: Option<String> },

    #[error("{message}")]
    NotFound { message: String, code: Option<String> },

    #[error("server error {status}: {message}")]
    Server { status: u16, message: String, code: Option<String> },

    #[error("network error: {0}")]
    Network(String),

    #[error("response parse failed: {0}")]
    Decode(String),
}

impl ApiError {
    /// Classify a failed response by HTTP status.
    #[must_use]
    pub fn from_status(status: u16, message: impl Into<String>, code: Option<String>) -> Self {
        let message = message.into();
        match status {
            400 | 409 | 422 => Self::Validation { message, code },
            401 | 403 => Self::Auth { message, code },
            404 => Self::NotFound { message, code },
            _ => Self::Server { status, message, code },
        }
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } => ErrorKind::Validation,
            Self::Auth { .. } => ErrorKind::Auth,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Network(_) => ErrorKind::Network,
            Self::Server { .. } | Self::Decode(_) => ErrorKind::Server,
        }
    }

    /// Server-supplied message, or the transport/decoder detail.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Validation { message, .. }
            | Self::Auth { message, .. }
            | Self::NotFound { message, .. }
            | Self::Server { message, .. } => message,
            Self::Network(detail) | Self::Decode(detail) => detail,
        }
    }

    #[must_use]
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Validation { code, .. }
            | Self::Auth { code, .. }
            | Self::NotFound { code, .. }
            | Self::Server { code, .. } => code.as_deref(),
            Self::Network(_) | Self::Decode(_) => None,
        }
    }

    #[must_use]
    pub fn is_auth(&self) -> bool {
        self.kind() == ErrorKind::Auth
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}
