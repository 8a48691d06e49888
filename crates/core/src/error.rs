//! Unified error types for the docs explorer.
//!
//! Every variant carries a stable code prefix so tool callers can match on it.

use rmcp::model::{ErrorCode, ErrorData as McpError};

/// Unified error types for the docs explorer.
///
/// `Clone` so a single in-flight page load can hand the same failure to every waiter.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., a malformed version string).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Requested path escapes the documentation root or is malformed.
    #[error("INVALID_PATH: {0}")]
    InvalidPath(String),

    /// Empty or oversized search query.
    #[error("INVALID_QUERY: {0}")]
    InvalidQuery(String),

    /// Invalid URL.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// Connection failure, reset, or unreadable response body.
    #[error("NETWORK_ERROR: {0}")]
    Network(String),

    /// Fetch timeout.
    #[error("FETCH_TIMEOUT: {0}")]
    FetchTimeout(String),

    /// Fetch response too large.
    #[error("FETCH_TOO_LARGE: {0}")]
    FetchTooLarge(String),

    /// Non-2xx HTTP response.
    #[error("HTTP_ERROR: status {status} for {url}")]
    Http { status: u16, url: String },
}

impl Error {
    /// Whether the fetcher should try again after this failure.
    ///
    /// Timeouts, connection failures and 5xx responses are transient; 4xx never is.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Network(_) | Error::FetchTimeout(_) => true,
            Error::Http { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Whether this is a 404 from the documentation host.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Http { status: 404, .. })
    }
}

impl From<Error> for McpError {
    fn from(err: Error) -> Self {
        let (code, message) = match &err {
            Error::InvalidInput(msg) => (-32602, msg.clone()),
            Error::InvalidQuery(msg) => (-32602, msg.clone()),
            Error::InvalidPath(msg) => (-32003, msg.clone()),
            Error::InvalidUrl(msg) => (-32003, msg.clone()),
            Error::Http { status: 404, url } => (-32001, format!("document not found: {url}")),
            Error::FetchTimeout(msg) => (-32006, msg.clone()),
            Error::FetchTooLarge(msg) => (-32007, msg.clone()),
            Error::Http { status, url } => (-32008, format!("fetch failed with status {status}: {url}")),
            Error::Network(msg) => (-32009, msg.clone()),
        };

        McpError { code: ErrorCode(code), message: message.into(), data: None }
    }
}
