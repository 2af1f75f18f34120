//! Error classification and backoff policy for backend calls.

use serde_json::Value;
use std::time::Duration;

/// Message used when an attempt outlives its deadline.
pub const TIMEOUT_MESSAGE: &str = "The request timed out. Please try again.";

/// Message used when the server cannot be reached at all.
pub const NETWORK_MESSAGE: &str =
    "Unable to reach the server. Please check your internet connection.";

/// Status reported for connectivity failures.
pub const STATUS_NETWORK: u16 = 0;

/// Status reported for a locally enforced timeout.
pub const STATUS_TIMEOUT: u16 = 408;

/// Where a classified error came from. Only used for the retry decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorOrigin {
    /// DNS, connection refused, reset, offline.
    Network,
    /// The per-attempt deadline fired.
    Timeout,
    /// The server answered with a non-success status.
    Response,
    /// The server answered with a success status but an undecodable body.
    InvalidResponse,
    /// The request could not be built (bad header name/value).
    InvalidRequest,
}

/// The one error type callers of the request client ever see.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiError {
    /// 0 for connectivity failures, 408 for local timeouts, else the HTTP status.
    pub status: u16,
    pub message: String,
    /// Parsed error body from the server, when there was one.
    pub data: Option<Value>,
    origin: ErrorOrigin,
}

impl ApiError {
    pub fn network(detail: impl AsRef<str>) -> Self {
        log::debug!("network failure: {}", detail.as_ref());
        Self {
            status: STATUS_NETWORK,
            message: NETWORK_MESSAGE.to_string(),
            data: None,
            origin: ErrorOrigin::Network,
        }
    }

    pub fn timeout() -> Self {
        Self {
            status: STATUS_TIMEOUT,
            message: TIMEOUT_MESSAGE.to_string(),
            data: None,
            origin: ErrorOrigin::Timeout,
        }
    }

    /// Builds an error from a non-success response body.
    ///
    /// The message comes from the body's `message` field, then `error`, then
    /// falls back to `HTTP <status>`. A body that is not JSON counts as `{}`.
    pub fn from_response(status: u16, body: &str) -> Self {
        let data = serde_json::from_str::<Value>(body)
            .unwrap_or_else(|_| Value::Object(Default::default()));

        let message = ["message", "error"]
            .iter()
            .find_map(|key| match data.get(key) {
                Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
                _ => None,
            })
            .unwrap_or_else(|| format!("HTTP {}", status));

        Self {
            status,
            message,
            data: Some(data),
            origin: ErrorOrigin::Response,
        }
    }

    pub fn invalid_response(status: u16, detail: impl std::fmt::Display) -> Self {
        Self {
            status,
            message: format!("Invalid JSON response: {}", detail),
            data: None,
            origin: ErrorOrigin::InvalidResponse,
        }
    }

    pub fn invalid_request(detail: impl std::fmt::Display) -> Self {
        Self {
            status: STATUS_NETWORK,
            message: format!("Invalid request: {}", detail),
            data: None,
            origin: ErrorOrigin::InvalidRequest,
        }
    }

    pub fn origin(&self) -> ErrorOrigin {
        self.origin
    }

    /// True for connectivity failures (status 0).
    pub fn is_network(&self) -> bool {
        self.origin == ErrorOrigin::Network
    }

    /// True for locally enforced timeouts (status 408).
    pub fn is_timeout(&self) -> bool {
        self.origin == ErrorOrigin::Timeout
    }

    /// Whether another attempt could plausibly succeed.
    ///
    /// Server-returned 4xx responses stop the loop. A local timeout is also
    /// reported as 408 but is an attempt-level failure and is retried.
    pub fn is_retryable(&self) -> bool {
        match self.origin {
            ErrorOrigin::Network | ErrorOrigin::Timeout | ErrorOrigin::InvalidResponse => true,
            ErrorOrigin::Response => !(400..500).contains(&self.status),
            ErrorOrigin::InvalidRequest => false,
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (status {})", self.message, self.status)
    }
}

impl std::error::Error for ApiError {}

/// Delay before the attempt following `attempt` (1-based): `unit * 2^attempt`.
pub fn backoff_delay(attempt: usize, unit: Duration) -> Duration {
    let exponent = attempt.min(20) as u32;
    unit.saturating_mul(2u32.pow(exponent))
}
