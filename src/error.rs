// Service and dispatch error types
use axum::http::StatusCode;
use serde_json::{json, Value};
use thiserror::Error;

use crate::api::format::Envelope;
use crate::auth::AuthOutcome;
use crate::services::LocatorError;

/// Errors raised by service handlers and collaborators
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    Message(String),

    #[error("Missing argument '{0}'")]
    MissingArgument(String),

    #[error("Invalid argument '{name}': {reason}")]
    InvalidArgument { name: String, reason: String },

    #[error("Method '{0}' is not implemented by this service")]
    UnknownMethod(String),

    #[error("Data access failed: {0}")]
    Data(String),

    #[error(transparent)]
    Locator(#[from] LocatorError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ServiceError {
    pub fn message(message: impl Into<String>) -> Self {
        ServiceError::Message(message.into())
    }

    pub fn invalid_argument(name: impl Into<String>, reason: impl Into<String>) -> Self {
        ServiceError::InvalidArgument {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

/// Failure of one dispatch, mapped onto the response envelope
#[derive(Debug)]
pub enum DispatchError {
    // 400 Bad Request
    BadRequest(String),

    // 401 Unauthorized
    Unauthorized(AuthOutcome),

    // 404 Not Found
    NotFound,

    // 200 with FAILED status: target service missing from the locator
    Configuration(LocatorError),

    // 200 with FAILED status: the handler itself failed
    Handler {
        error: ServiceError,
        /// Endpoint and redacted arguments, present only in debug mode
        detail: Option<Value>,
    },
}

impl DispatchError {
    /// Get HTTP status code. Business failures deliberately travel as 200.
    pub fn status_code(&self) -> StatusCode {
        match self {
            DispatchError::BadRequest(_) => StatusCode::BAD_REQUEST,
            DispatchError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            DispatchError::NotFound => StatusCode::NOT_FOUND,
            DispatchError::Configuration(_) | DispatchError::Handler { .. } => StatusCode::OK,
        }
    }

    /// Get error code for logging
    pub fn error_code(&self) -> &'static str {
        match self {
            DispatchError::BadRequest(_) => "BAD_REQUEST",
            DispatchError::Unauthorized(_) => "UNAUTHORIZED",
            DispatchError::NotFound => "NOT_FOUND",
            DispatchError::Configuration(_) => "CONFIGURATION_ERROR",
            DispatchError::Handler { .. } => "HANDLER_ERROR",
        }
    }

    /// Client-facing message. Routing and auth causes never leave the process.
    pub fn client_message(&self) -> Value {
        match self {
            DispatchError::BadRequest(_) => json!("Bad Request"),
            DispatchError::Unauthorized(_) => json!("Unauthorized"),
            DispatchError::NotFound => json!("Not Found"),
            DispatchError::Configuration(_) => json!("Internal Server Error"),
            DispatchError::Handler { detail: Some(detail), .. } => detail.clone(),
            DispatchError::Handler { detail: None, .. } => json!("Internal Server Error"),
        }
    }

    pub fn into_envelope(self) -> Envelope {
        Envelope::failed(self.status_code(), self.client_message())
    }
}

impl std::fmt::Display for DispatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DispatchError::BadRequest(reason) => write!(f, "bad request: {}", reason),
            DispatchError::Unauthorized(outcome) => write!(f, "unauthorized: {}", outcome),
            DispatchError::NotFound => write!(f, "not found"),
            DispatchError::Configuration(e) => write!(f, "configuration error: {}", e),
            DispatchError::Handler { error, .. } => write!(f, "handler error: {}", error),
        }
    }
}

impl std::error::Error for DispatchError {}

impl From<DispatchError> for Envelope {
    fn from(err: DispatchError) -> Self {
        err.into_envelope()
    }
}
