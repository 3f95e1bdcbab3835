//! Error types and result aliases for Apiary operations.
//!
//! One error type covers configuration, registry and request failures so
//! that every crate in the workspace can propagate with `?` without
//! conversions.

use serde_json::Value;
use thiserror::Error;

/// Unified error type for all Apiary operations
#[derive(Error, Debug)]
pub enum ApiaryError {
    // Config errors
    #[error("Failed to parse apiary.toml: {message} at line {line}, column {column}")]
    TomlParse {
        message: String,
        line: usize,
        column: usize,
    },

    #[error("Configuration field '{field}' is invalid: {reason}")]
    ConfigValidation { field: String, reason: String },

    // Registry errors
    #[error("Client name must be a non-empty string")]
    InvalidClientName,

    #[error("Client '{name}' is already registered")]
    DuplicateClient { name: String },

    #[error("Cannot register '{name}' as default: '{existing}' is already the default client")]
    DuplicateDefault { name: String, existing: String },

    #[error("No client name given and no default client is registered")]
    NoDefaultClient,

    #[error("Client '{name}' is not registered")]
    ClientNotFound { name: String },

    // Request errors
    /// The server answered with a non-success status.
    #[error("{message}")]
    Response {
        message: String,
        status: u16,
        data: Value,
    },

    /// The body was not JSON, even after fallback extraction.
    #[error("invalid JSON response")]
    InvalidJson {
        status: u16,
        body: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Failed to serialize request body: {message}")]
    Serialization {
        message: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Unsupported request method '{method}'")]
    UnsupportedMethod { method: String },

    #[error("Request aborted")]
    Aborted,

    // IO errors
    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias for Apiary operations
pub type ApiaryResult<T> = Result<T, ApiaryError>;

impl ApiaryError {
    /// Create a network error from any error type
    pub fn network<E>(message: String, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Network {
            message,
            source: Some(Box::new(source)),
        }
    }

    /// Create an IO error from std::io::Error
    pub fn io(message: String, source: std::io::Error) -> Self {
        Self::Io { message, source }
    }

    /// Build the error raised for a non-success HTTP status.
    ///
    /// The message comes from the body's own `message` field when it is a
    /// string, otherwise a generic status line is used.
    pub fn from_status(status: u16, data: Value) -> Self {
        let message = data
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| format!("request failed with status {}", status));

        Self::Response {
            message,
            status,
            data,
        }
    }

    /// HTTP status attached to this error, `None` for non-HTTP failures
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiaryError::Response { status, .. } | ApiaryError::InvalidJson { status, .. } => {
                Some(*status)
            },
            _ => None,
        }
    }

    /// Parsed response body, or the raw text when it could not be parsed
    pub fn data(&self) -> Option<Value> {
        match self {
            ApiaryError::Response { data, .. } => Some(data.clone()),
            ApiaryError::InvalidJson { body, .. } => Some(Value::String(body.clone())),
            _ => None,
        }
    }

    /// Whether this is the distinguished abort signal
    pub fn is_aborted(&self) -> bool {
        matches!(self, ApiaryError::Aborted)
    }

    /// Whether this error came from configuration or registry setup
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            ApiaryError::TomlParse { .. }
                | ApiaryError::ConfigValidation { .. }
                | ApiaryError::InvalidClientName
                | ApiaryError::DuplicateClient { .. }
                | ApiaryError::DuplicateDefault { .. }
                | ApiaryError::NoDefaultClient
                | ApiaryError::ClientNotFound { .. }
        )
    }

    /// Check if this error is recoverable
    pub fn is_recoverable(&self) -> bool {
        match self {
            ApiaryError::Network { .. } | ApiaryError::Io { .. } | ApiaryError::Aborted => true,
            ApiaryError::Response { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    /// Get a user-friendly suggestion for fixing this error
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            ApiaryError::NoDefaultClient => {
                Some("Register a client with is_default = true or pass a client name explicitly")
            },
            ApiaryError::DuplicateClient { .. } => {
                Some("Each client must be registered under a unique name")
            },
            ApiaryError::DuplicateDefault { .. } => {
                Some("Only one client may be the default; register the others without the flag")
            },
            ApiaryError::Network { .. } => Some("Check your internet connection and try again"),
            ApiaryError::InvalidJson { .. } => {
                Some("The endpoint did not return JSON; check the URL and server logs")
            },
            ApiaryError::UnsupportedMethod { .. } => {
                Some("Use one of get, post, put, delete or upload")
            },
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_status_uses_body_message() {
        let err = ApiaryError::from_status(404, json!({"message": "bad"}));
        assert_eq!(err.to_string(), "bad");
        assert_eq!(err.status(), Some(404));
        assert_eq!(err.data(), Some(json!({"message": "bad"})));
    }

    #[test]
    fn test_from_status_generic_message() {
        let err = ApiaryError::from_status(500, json!({"error": "boom"}));
        assert_eq!(err.to_string(), "request failed with status 500");

        // A non-string message field is ignored
        let err = ApiaryError::from_status(400, json!({"message": 42}));
        assert_eq!(err.to_string(), "request failed with status 400");
    }

    #[test]
    fn test_invalid_json_carries_raw_text() {
        let source = serde_json::from_str::<Value>("nope").unwrap_err();
        let err = ApiaryError::InvalidJson {
            status: 200,
            body: "nope".to_string(),
            source,
        };
        assert_eq!(err.to_string(), "invalid JSON response");
        assert_eq!(err.status(), Some(200));
        assert_eq!(err.data(), Some(Value::String("nope".to_string())));
    }

    #[test]
    fn test_non_http_errors_have_no_status() {
        let err = ApiaryError::Network {
            message: "connection refused".to_string(),
            source: None,
        };
        assert_eq!(err.status(), None);
        assert_eq!(err.data(), None);
        assert!(err.is_recoverable());
        assert!(ApiaryError::Aborted.is_aborted());
    }

    #[test]
    fn test_config_error_classification() {
        assert!(ApiaryError::NoDefaultClient.is_config_error());
        assert!(ApiaryError::InvalidClientName.is_config_error());
        assert!(!ApiaryError::Aborted.is_config_error());
        assert!(ApiaryError::NoDefaultClient.suggestion().is_some());
    }
}
