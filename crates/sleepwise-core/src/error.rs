//! Error types for the SleepWise client

use crate::validation::ValidationErrors;

/// Message used when the backend gives no usable `detail`
pub const GENERIC_API_ERROR: &str = "Request failed";

/// Message shown for anything that is not a known client error
pub const GENERIC_USER_MESSAGE: &str = "Something went wrong. Please try again.";

/// Result type alias using our error type
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors surfaced by the client
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// One or more fields failed local validation
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    /// No active session credential
    #[error("Not signed in: missing credential")]
    AuthenticationMissing,

    /// Non-2xx response or transport failure
    #[error("{message}")]
    Api {
        /// HTTP status, absent for transport failures
        status: Option<u16>,
        message: String,
    },

    /// 2xx response whose body does not match the expected shape
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Invalid client configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Session store could not be read or written
    #[error("Session error: {0}")]
    Session(String),
}

impl ClientError {
    /// Build an API error from a status and an optional backend detail
    pub fn api(status: Option<u16>, detail: Option<String>) -> Self {
        let message = detail
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| GENERIC_API_ERROR.to_string());
        ClientError::Api { status, message }
    }

    /// HTTP status attached to the error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => *status,
            _ => None,
        }
    }

    /// Short message suitable for a transient notification
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Validation(errors) => errors.summary(),
            ClientError::AuthenticationMissing => {
                "You are not signed in. Run `sleepwise login` first.".to_string()
            }
            ClientError::Api { message, .. } => message.clone(),
            ClientError::MalformedResponse(_) => {
                "The server sent an unexpected response.".to_string()
            }
            ClientError::Config(msg) => format!("Configuration error: {}", msg),
            ClientError::Session(msg) => format!("Session error: {}", msg),
        }
    }
}

impl From<ValidationErrors> for ClientError {
    fn from(errors: ValidationErrors) -> Self {
        ClientError::Validation(errors)
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        let status = err.status().map(|s| s.as_u16());
        let message = if err.is_timeout() {
            "Request timed out".to_string()
        } else if err.is_connect() {
            "Could not reach the server".to_string()
        } else {
            GENERIC_API_ERROR.to_string()
        };
        ClientError::Api { status, message }
    }
}
