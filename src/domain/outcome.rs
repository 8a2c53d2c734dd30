use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use strum::Display;

/// Coarse classification of a request that produced no usable response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    Timeout,
    Network,
}

/// Why a request has no status code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestError {
    pub kind: ErrorKind,
    /// Finer-grained cause, e.g. `connect`, `body`, `redirect`.
    pub detail: String,
}

impl RequestError {
    pub fn timeout() -> Self {
        Self {
            kind: ErrorKind::Timeout,
            detail: "timeout".to_string(),
        }
    }

    pub fn network(detail: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Network,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.kind, self.detail)
    }
}

/// Result of executing exactly one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub status: Option<u16>,
    /// Send until full response body (or error).
    pub latency: Duration,
    pub body: Option<String>,
    pub error: Option<RequestError>,
}

impl Outcome {
    pub fn response(status: u16, latency: Duration, body: Option<String>) -> Self {
        Self {
            status: Some(status),
            latency,
            body,
            error: None,
        }
    }

    pub fn failure(error: RequestError, latency: Duration) -> Self {
        Self {
            status: None,
            latency,
            body: None,
            error: Some(error),
        }
    }
}

/// Result of one named check over one [`Outcome`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckResult {
    pub name: String,
    pub passed: bool,
}

/// Append-only latency fact kept by the aggregator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSample {
    pub tag: String,
    pub latency: Duration,
    pub timestamp: DateTime<Utc>,
    pub failed: bool,
}
