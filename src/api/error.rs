//! Error types for catalog API calls.

use thiserror::Error;

/// Maximum number of body bytes kept in [`ApiError::Rejected`] messages.
const MAX_BODY_CHARS: usize = 512;

/// Errors returned by the remote catalog API boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// Transport or connectivity failure (DNS, refused connection, TLS, timeout).
    #[error("network error calling {endpoint}: {message}")]
    Network {
        /// Logical endpoint name (e.g. `auth/login`).
        endpoint: String,
        /// Description of the transport failure.
        message: String,
    },

    /// Session absent or rejected by the server (HTTP 401/403).
    #[error("unauthorized calling {endpoint} (HTTP {status})")]
    Unauthorized {
        /// Logical endpoint name.
        endpoint: String,
        /// The HTTP status code.
        status: u16,
        /// Response body, truncated.
        message: String,
    },

    /// Malformed response payload or a locally detected precondition violation.
    #[error("invalid response from {endpoint}: {message}")]
    Validation {
        /// Logical endpoint name.
        endpoint: String,
        /// What was wrong with the payload.
        message: String,
    },

    /// The targeted resource does not exist server-side (HTTP 404).
    #[error("not found: {endpoint}")]
    NotFound {
        /// Logical endpoint name.
        endpoint: String,
        /// Response body, truncated.
        message: String,
    },

    /// Any other non-success response. Carries the body for callers that
    /// classify server messages (e.g. registration conflicts).
    #[error("{endpoint} rejected with HTTP {status}: {message}")]
    Rejected {
        /// Logical endpoint name.
        endpoint: String,
        /// The HTTP status code.
        status: u16,
        /// Response body, truncated.
        message: String,
    },

    /// The configured base URL cannot be used to build request URLs.
    #[error("invalid API base URL '{url}': {reason}")]
    InvalidBaseUrl {
        /// The offending URL.
        url: String,
        /// Parse failure.
        reason: String,
    },

    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(String),
}

impl ApiError {
    /// Creates a network error from a reqwest transport error.
    pub fn network(endpoint: impl Into<String>, source: &reqwest::Error) -> Self {
        let message = if source.is_timeout() {
            "request timed out".to_string()
        } else if source.is_connect() {
            format!("connection failed: {source}")
        } else {
            source.to_string()
        };
        Self::Network {
            endpoint: endpoint.into(),
            message,
        }
    }

    /// Creates a network error from a plain message.
    pub fn network_message(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Network {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// Creates a validation error.
    pub fn validation(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// Maps a non-success HTTP status and its body to the error taxonomy.
    pub fn from_status(endpoint: impl Into<String>, status: u16, body: &str) -> Self {
        let endpoint = endpoint.into();
        let message = truncate_body(body);
        match status {
            401 | 403 => Self::Unauthorized {
                endpoint,
                status,
                message,
            },
            404 => Self::NotFound { endpoint, message },
            _ => Self::Rejected {
                endpoint,
                status,
                message,
            },
        }
    }

    /// Returns `true` for transport failures.
    #[must_use]
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network { .. })
    }

    /// Returns `true` when the server refused the session.
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }

    /// Response body of a non-success HTTP answer, if the server answered.
    #[must_use]
    pub fn rejection_message(&self) -> Option<&str> {
        match self {
            Self::Unauthorized { message, .. }
            | Self::NotFound { message, .. }
            | Self::Rejected { message, .. } => Some(message),
            _ => None,
        }
    }
}

fn truncate_body(body: &str) -> String {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(MAX_BODY_CHARS) {
        Some((index, _)) => format!("{}...", &trimmed[..index]),
        None => trimmed.to_string(),
    }
}
