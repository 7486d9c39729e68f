//! Fetch error classification

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Broad category of a failed fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorKind {
    /// Connect or read timeout elapsed
    Timeout,
    /// Provider answered with a non-success status
    HttpStatus,
    /// Connection refused, reset or otherwise broken
    Network,
    /// Body was not valid JSON
    Decode,
}

impl fmt::Display for FetchErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Timeout => "timeout",
            Self::HttpStatus => "http_status",
            Self::Network => "network",
            Self::Decode => "decode",
        };
        f.write_str(s)
    }
}

/// Weather fetch error
///
/// Timeouts, network failures, 429 and 5xx responses are retryable. Other
/// 4xx responses and undecodable bodies are not.
#[derive(Debug, Clone, Error)]
#[error("{kind} error: {message}")]
pub struct FetchError {
    kind: FetchErrorKind,
    retryable: bool,
    status: Option<u16>,
    retry_after: Option<Duration>,
    message: String,
}

impl FetchError {
    #[must_use]
    pub fn timeout(message: impl Into<String>) -> Self {
        Self {
            kind: FetchErrorKind::Timeout,
            retryable: true,
            status: None,
            retry_after: None,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn network(message: impl Into<String>, retryable: bool) -> Self {
        Self {
            kind: FetchErrorKind::Network,
            retryable,
            status: None,
            retry_after: None,
            message: message.into(),
        }
    }

    /// Error for a non-success HTTP status
    #[must_use]
    pub fn http_status(status: u16, retry_after: Option<Duration>) -> Self {
        let retryable = status == 429 || (500..600).contains(&status);
        Self {
            kind: FetchErrorKind::HttpStatus,
            retryable,
            status: Some(status),
            retry_after: if retryable { retry_after } else { None },
            message: format!("HTTP {status}"),
        }
    }

    #[must_use]
    pub fn decode(message: impl Into<String>) -> Self {
        Self {
            kind: FetchErrorKind::Decode,
            retryable: false,
            status: None,
            retry_after: None,
            message: message.into(),
        }
    }

    #[must_use]
    pub const fn kind(&self) -> FetchErrorKind {
        self.kind
    }

    /// Whether another attempt may succeed
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        self.retryable
    }

    /// HTTP status, for [`FetchErrorKind::HttpStatus`]
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        self.status
    }

    /// Delay requested by the provider via `Retry-After`
    #[must_use]
    pub const fn retry_after(&self) -> Option<Duration> {
        self.retry_after
    }
}
