use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Coarse classification of every failure the client surfaces to a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiErrorKind {
    Unauthorized,
    Forbidden,
    NotFound,
    Validation,
    Network,
    ServerError,
}

impl fmt::Display for ApiErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ApiErrorKind::Unauthorized => "Unauthorized",
            ApiErrorKind::Forbidden => "Forbidden",
            ApiErrorKind::NotFound => "Not found",
            ApiErrorKind::Validation => "Validation error",
            ApiErrorKind::Network => "Network error",
            ApiErrorKind::ServerError => "Server error",
        };
        f.write_str(label)
    }
}

/// Client-level error type.
/// Raw transport errors never leave `api_client`; they are folded into this.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{kind}: {message}")]
pub struct ApiError {
    pub kind: ApiErrorKind,
    pub message: String,
    pub status_code: Option<u16>,
}

impl ApiError {
    pub fn new(kind: ApiErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status_code: None,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status_code = Some(status);
        self
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Unauthorized, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Forbidden, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::NotFound, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Validation, message)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Network, message)
    }

    pub fn server(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::ServerError, message)
    }

    /// Maps a non-2xx HTTP status to the taxonomy.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let kind = match status {
            401 => ApiErrorKind::Unauthorized,
            403 => ApiErrorKind::Forbidden,
            404 => ApiErrorKind::NotFound,
            400..=499 => ApiErrorKind::Validation,
            _ => ApiErrorKind::ServerError,
        };
        Self::new(kind, message).with_status(status)
    }

    /// True for the kinds that tear down the session and send the user to login.
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self.kind,
            ApiErrorKind::Unauthorized | ApiErrorKind::Forbidden
        )
    }

    /// Message suitable for inline display in a view.
    pub fn user_message(&self) -> String {
        match self.kind {
            ApiErrorKind::Unauthorized => "Your session has ended. Please log in again.".to_string(),
            ApiErrorKind::Forbidden => {
                "Access Denied. You are not authorized to access this resource.".to_string()
            }
            ApiErrorKind::Network => {
                "Could not reach the server. Check your connection and try again.".to_string()
            }
            ApiErrorKind::ServerError => {
                "An error occurred on the server. Please try again later.".to_string()
            }
            ApiErrorKind::NotFound | ApiErrorKind::Validation => self.message.clone(),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
