use reqwest::StatusCode;
use thiserror::Error;

/// Shown to the user when the server gave no usable message.
pub const GENERIC_FAILURE: &str = "request failed";

pub const INVALID_CREDENTIALS: &str = "invalid credentials";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Sign-in rejected: {0}")]
    InvalidCredentials(String),

    #[error("insufficient privilege ({status})")]
    InsufficientPrivilege { status: StatusCode },

    #[error("Server error {status}: {message}")]
    Server { status: StatusCode, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Failed to parse response: {0}")]
    Decode(#[from] serde_json::Error),

    /// A sign-out ran while a sign-in or rehydration was awaiting the backend.
    #[error("Session ended by a sign-out while {0}")]
    SessionInterrupted(&'static str),

    #[error("Unexpected payload: {0}")]
    UnexpectedPayload(String),

    #[error("Session storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("Config error: {0}")]
    Config(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    /// Text safe to put in front of a user. The underlying cause stays in
    /// `Display`/`source()` for logging.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Validation(msg) => msg.clone(),
            ApiError::InvalidCredentials(msg) => msg.clone(),
            ApiError::InsufficientPrivilege { .. } => "insufficient privilege".to_string(),
            ApiError::Server { message, .. } => message.clone(),
            ApiError::Config(msg) => msg.clone(),
            ApiError::SessionInterrupted(_) => "signed out".to_string(),
            ApiError::Network(_)
            | ApiError::Decode(_)
            | ApiError::UnexpectedPayload(_)
            | ApiError::Storage(_) => GENERIC_FAILURE.to_string(),
        }
    }

    pub fn is_authorization(&self) -> bool {
        match self {
            ApiError::InsufficientPrivilege { .. } => true,
            ApiError::Server { status, .. } => {
                *status == StatusCode::UNAUTHORIZED || *status == StatusCode::FORBIDDEN
            }
            _ => false,
        }
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::InsufficientPrivilege { status } | ApiError::Server { status, .. } => {
                Some(*status)
            }
            ApiError::Network(e) => e.status(),
            _ => None,
        }
    }
}
