use std::io;
use thiserror::Error;

/// Application-wide error type, consolidating all possible errors into a single enum.
#[derive(Debug, Error)]
pub enum AppError {
    /// Represents standard input/output errors.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Represents a failed HTTP exchange with the detection service (connection refused, DNS, broken body).
    #[error("HTTP error: {message}")]
    Http {
        message: String,
        /// True when the service could not be reached at all.
        connect: bool,
    },

    /// The detection service answered with a non-2xx status.
    #[error("Server error ({status}): {body}")]
    Remote { status: u16, body: String },

    /// Represents errors specific to the actor system, such as communication failures.
    #[error("Actor error: {0}")]
    Actor(#[from] crate::actors::messages::ActorError),

    /// A message could not be delivered to a tab (no listener, tab closed).
    #[error("Transport error: {0}")]
    Transport(String),

    /// Represents data validation errors (e.g., invalid input format).
    #[error("Validation error: {0}")]
    Validation(String),

    /// Represents configuration-related errors (e.g., invalid environment variables).
    #[error("Configuration error: {0}")]
    Config(String),

    /// Errors reading or writing the persisted extension settings.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Represents unexpected internal errors that indicate a bug.
    #[error("Internal error: {0}")]
    Internal(String),

    /// Represents errors from operations that did not complete in time.
    #[error("Operation timed out: {0}")]
    Timeout(String),
}

impl AppError {
    /// The message shown to the user in the error modal.
    ///
    /// Timeouts and unreachable servers get a hint instead of the raw transport detail.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Timeout(_) => "The server is taking too long to respond.".to_string(),
            AppError::Http { connect: true, .. } => {
                "Server disconnected (check that the backend is running on localhost:8000).".to_string()
            }
            other => format!("Unable to reach the AI: {}", other),
        }
    }
}

impl Clone for AppError {
    fn clone(&self) -> Self {
        match self {
            AppError::Io(e) => AppError::Io(io::Error::new(e.kind(), e.to_string())),
            AppError::Http { message, connect } => AppError::Http {
                message: message.clone(),
                connect: *connect,
            },
            AppError::Remote { status, body } => AppError::Remote {
                status: *status,
                body: body.clone(),
            },
            AppError::Actor(e) => AppError::Actor(e.clone()),
            AppError::Transport(s) => AppError::Transport(s.clone()),
            AppError::Validation(s) => AppError::Validation(s.clone()),
            AppError::Config(s) => AppError::Config(s.clone()),
            AppError::Storage(s) => AppError::Storage(s.clone()),
            AppError::Internal(s) => AppError::Internal(s.clone()),
            AppError::Timeout(s) => AppError::Timeout(s.clone()),
        }
    }
}

impl From<tokio::time::error::Elapsed> for AppError {
    fn from(err: tokio::time::error::Elapsed) -> Self {
        AppError::Timeout(format!("Operation timed out: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Validation(format!("JSON error: {}", err))
    }
}

impl From<url::ParseError> for AppError {
    fn from(err: url::ParseError) -> Self {
        AppError::Config(format!("URL parse error: {}", err))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Validation(format!("Validation errors: {}", err))
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AppError::Timeout(format!("HTTP request timed out: {}", err))
        } else {
            AppError::Http {
                message: err.to_string(),
                connect: err.is_connect(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actors::messages::ActorError;

    #[test]
    fn test_user_message_for_timeout() {
        let err = AppError::Timeout("15s".to_string());
        assert_eq!(err.user_message(), "The server is taking too long to respond.");
    }

    #[test]
    fn test_user_message_for_unreachable_server() {
        let err = AppError::Http {
            message: "connection refused".to_string(),
            connect: true,
        };
        assert!(err.user_message().contains("localhost:8000"));
    }

    #[test]
    fn test_user_message_keeps_remote_detail() {
        let err = AppError::Remote {
            status: 503,
            body: "down".to_string(),
        };
        assert_eq!(err.user_message(), "Unable to reach the AI: Server error (503): down");
    }

    #[test]
    fn test_clone_preserves_variant() {
        let err = AppError::Actor(ActorError::ReplyDropped("background".to_string()));
        match err.clone() {
            AppError::Actor(ActorError::ReplyDropped(who)) => assert_eq!(who, "background"),
            other => panic!("unexpected clone: {:?}", other),
        }
    }
}
