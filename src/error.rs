//! Tagged error type for everything that crosses the API boundary.
//!
//! Failures are classified exactly once, where the HTTP response (or the lack
//! of one) is first seen. Call sites match on the variant instead of poking at
//! status codes or optional body fields.

use thiserror::Error;

/// Coarse classification of an [`ApiError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Auth,
    Network,
    Server,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Auth => "auth",
            Self::Network => "network",
            Self::Server => "server",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApiError {
    /// Malformed or missing input. Raised locally before any request is sent,
    /// or from a backend 422.
    #[error("{message}")]
    Validation {
        message: String,
        status: Option<u16>,
    },

    /// Credentials rejected or the bearer token is no longer valid (401).
    #[error("{message}")]
    Auth { message: String, status: u16 },

    /// The backend could not be reached at all.
    #[error("Server not responding: {message}")]
    Network { message: String },

    /// Any other unexpected status, or a success body we could not decode.
    #[error("{message}")]
    Server { message: String, status: u16 },
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            status: None,
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } => ErrorKind::Validation,
            Self::Auth { .. } => ErrorKind::Auth,
            Self::Network { .. } => ErrorKind::Network,
            Self::Server { .. } => ErrorKind::Server,
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Validation { status, .. } => *status,
            Self::Auth { status, .. } | Self::Server { status, .. } => Some(*status),
            Self::Network { .. } => None,
        }
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth { .. })
    }

    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network { .. })
    }

    /// Message suitable for showing to the person at the console.
    pub fn user_message(&self) -> String {
        match self {
            Self::Network { .. } => "Server not responding. Please try again later.".to_string(),
            Self::Auth { message, .. } => message.clone(),
            Self::Validation { message, .. } | Self::Server { message, .. } => message.clone(),
        }
    }
}
