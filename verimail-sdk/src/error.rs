//! SDK error types and handling
//!
//! Transport failures and server errors on a single endpoint are absorbed by the
//! dispatcher and only surface, aggregated, inside [`SdkError::ServiceUnreachable`].
//! Account-level conditions (authorization, credit, throttling) are terminal.

use std::fmt;
use thiserror::Error;
use url::Url;
use verimail_core::CoreError;

/// The main error type for the SDK
#[derive(Error, Debug)]
pub enum SdkError {
    /// The operation was canceled through its cancellation token
    #[error("Operation canceled")]
    OperationCanceled,

    /// Every configured endpoint failed with a recoverable error
    #[error("All {} service endpoints are unreachable: {}", .errors.len(), EndpointErrors(.errors))]
    ServiceUnreachable {
        /// One error per endpoint, in attempt order
        errors: Vec<EndpointError>,
    },

    /// Credentials were missing, wrong or insufficient (HTTP 401/403)
    #[error("Authorization failed for {url}: {message}")]
    AuthorizationError {
        /// Request URL
        url: String,
        /// Response body sent by the service
        message: String,
    },

    /// The account has run out of credits (HTTP 402)
    #[error("Insufficient credit to complete the request to {url}")]
    InsufficientCredit {
        /// Request URL
        url: String,
    },

    /// The service throttled the client (HTTP 429)
    #[error("Request to {url} was throttled, slow down and retry later")]
    RequestThrottled {
        /// Request URL
        url: String,
    },

    /// A status code the calling operation does not expect
    #[error("Unexpected response: {status} {status_text}")]
    UnexpectedResponse {
        /// HTTP status code
        status: u16,
        /// Canonical reason phrase
        status_text: String,
    },

    /// The request was rejected before being sent
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// URL parsing error
    #[error("Invalid URL: {0}")]
    UrlError(#[from] url::ParseError),

    /// HTTP client construction error
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// Domain model error
    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Result type alias for SDK operations
pub type SdkResult<T> = Result<T, SdkError>;

impl SdkError {
    /// Whether this error is the cancellation signal rather than a failure
    pub fn is_cancellation(&self) -> bool {
        matches!(self, SdkError::OperationCanceled)
    }

    /// Get the HTTP status code if the error maps to one
    pub fn status_code(&self) -> Option<u16> {
        match self {
            SdkError::InsufficientCredit { .. } => Some(402),
            SdkError::RequestThrottled { .. } => Some(429),
            SdkError::UnexpectedResponse { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub(crate) fn unexpected(status: reqwest::StatusCode) -> Self {
        SdkError::UnexpectedResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
        }
    }
}

impl From<config::ConfigError> for SdkError {
    fn from(err: config::ConfigError) -> Self {
        SdkError::ConfigurationError(err.to_string())
    }
}

/// A recoverable failure of one endpoint during a multiplexed invocation
#[derive(Error, Debug)]
pub enum EndpointError {
    /// The request never produced an HTTP response
    #[error("{url}: transport failure: {source}")]
    Transport {
        /// Request URL
        url: Url,
        /// Underlying transport error
        #[source]
        source: reqwest::Error,
    },

    /// The endpoint answered with a 5xx status
    #[error("{url}: server error {status}")]
    ServerError {
        /// Request URL
        url: Url,
        /// HTTP status code
        status: u16,
        /// Response body
        body: String,
    },
}

impl EndpointError {
    /// URL of the failed attempt
    pub fn url(&self) -> &Url {
        match self {
            EndpointError::Transport { url, .. } | EndpointError::ServerError { url, .. } => url,
        }
    }
}

struct EndpointErrors<'a>(&'a [EndpointError]);

impl fmt::Display for EndpointErrors<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        write!(f, "{}", messages.join("; "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unreachable_message_lists_every_endpoint() {
        let error = SdkError::ServiceUnreachable {
            errors: vec![
                EndpointError::ServerError {
                    url: Url::parse("https://api-1.example.com/v2.6/credits/balance").unwrap(),
                    status: 503,
                    body: String::new(),
                },
                EndpointError::ServerError {
                    url: Url::parse("https://api-2.example.com/v2.6/credits/balance").unwrap(),
                    status: 500,
                    body: String::new(),
                },
            ],
        };

        let message = error.to_string();
        assert!(message.starts_with("All 2 service endpoints are unreachable"));
        assert!(message.contains("api-1.example.com"));
        assert!(message.contains("server error 500"));
    }

    #[test]
    fn test_error_status_code() {
        assert_eq!(
            SdkError::InsufficientCredit { url: "u".to_string() }.status_code(),
            Some(402)
        );
        assert_eq!(
            SdkError::unexpected(reqwest::StatusCode::CONFLICT).status_code(),
            Some(409)
        );
        assert_eq!(SdkError::OperationCanceled.status_code(), None);
    }

    #[test]
    fn test_unexpected_carries_status_text() {
        let error = SdkError::unexpected(reqwest::StatusCode::BAD_REQUEST);
        assert!(matches!(
            error,
            SdkError::UnexpectedResponse { status: 400, ref status_text } if status_text == "Bad Request"
        ));
        assert!(SdkError::OperationCanceled.is_cancellation());
    }
}
