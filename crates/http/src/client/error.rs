//! Client error types

use amplify_core::{Redirect, StorageError};
use reqwest::StatusCode;
use thiserror::Error;

/// Message shown when the login endpoint rejects credentials without saying why
pub const INVALID_CREDENTIALS: &str = "Invalid credentials";

/// Client error types
#[derive(Debug, Error)]
pub enum ClientError {
    /// No response received; the session is left untouched
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The login endpoint rejected the credentials
    #[error("{0}")]
    InvalidCredentials(String),

    /// The session could not be recovered; a redirect has already been issued
    #[error("Session expired, redirecting to {}", .redirect.path)]
    SessionExpired { redirect: Redirect },

    /// A request still failed authorization after its single retry
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Email verification failed
    #[error("Verification failed: {0}")]
    VerificationFailed(String),

    /// Bad request
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Forbidden
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Resource not found
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Server returned another error status
    #[error("Server error {status}: {message}")]
    ServerError { status: u16, message: String },

    /// The request body cannot be cloned, so it cannot be replayed after a refresh
    #[error("Request to {0} cannot be replayed after a token refresh")]
    NotReplayable(String),

    /// The session could not be written
    #[error("Session storage failed: {0}")]
    Storage(#[from] StorageError),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Configuration(String),
}

impl ClientError {
    /// Create error from HTTP status code
    pub fn from_status(status: StatusCode, message: String) -> Self {
        match status.as_u16() {
            400 => Self::BadRequest(message),
            401 => Self::AuthenticationFailed(message),
            403 => Self::Forbidden(message),
            404 => Self::NotFound(message),
            _ => Self::ServerError {
                status: status.as_u16(),
                message,
            },
        }
    }

    /// Whether the session has been dropped and the user sent back to a login page
    pub const fn is_auth_expired(&self) -> bool {
        matches!(self, Self::SessionExpired { .. })
    }

    /// Whether the server never answered
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Request(_))
    }

    /// Message the server supplied, for errors that carry one
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::InvalidCredentials(message)
            | Self::AuthenticationFailed(message)
            | Self::VerificationFailed(message)
            | Self::BadRequest(message)
            | Self::Forbidden(message)
            | Self::NotFound(message)
            | Self::ServerError { message, .. } => Some(message),
            _ => None,
        }
    }

    /// Redirect issued for this error, if any
    pub const fn redirect(&self) -> Option<&Redirect> {
        match self {
            Self::SessionExpired { redirect } => Some(redirect),
            _ => None,
        }
    }
}

/// Extract the user-facing message from an error response body
///
/// Prefers the JSON `message` field (a string, or a list joined with ", "),
/// then a non-empty plain-text body, then a generic message for the status.
pub fn error_message(status: StatusCode, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        match value.get("message") {
            Some(serde_json::Value::String(message)) if !message.is_empty() => {
                return message.clone();
            }
            Some(serde_json::Value::Array(messages)) if !messages.is_empty() => {
                return messages
                    .iter()
                    .map(|m| m.as_str().map_or_else(|| m.to_string(), str::to_string))
                    .collect::<Vec<_>>()
                    .join(", ");
            }
            _ => {}
        }
        if value.is_object() {
            return generic_message(status);
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        generic_message(status)
    } else {
        trimmed.to_string()
    }
}

/// Fallback message keyed by status code
pub fn generic_message(status: StatusCode) -> String {
    match status.as_u16() {
        400 => "The request was invalid".to_string(),
        401 => "Authentication required".to_string(),
        403 => "You do not have permission to perform this action".to_string(),
        404 => "The requested resource was not found".to_string(),
        409 => "The resource already exists".to_string(),
        422 => "The submitted data could not be processed".to_string(),
        429 => "Too many requests, please try again later".to_string(),
        code if code >= 500 => "The server encountered an error, please try again later".to_string(),
        code => format!("Request failed with status {code}"),
    }
}
