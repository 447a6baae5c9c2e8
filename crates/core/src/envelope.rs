//! Uniform response envelope returned by every tool invocation

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const API_VERSION: &str = "2.0.0";

/// Closed set of failure kinds reported to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidParameters,
    CkanApiError,
    NetworkError,
    PermissionDenied,
    DataNotFound,
}

/// Best-effort classifier
///
/// Looks for keywords in the lower-cased message, first match wins:
/// "not found", then "permission"/"unauthorized", then "network"/"connection",
/// then "invalid"/"parameter". Everything else is a `CkanApiError`. This is a
/// heuristic and can misclassify.
pub fn classify_error(message: &str) -> ErrorKind {
    let message = message.to_lowercase();
    let has = |needle: &str| message.contains(needle);

    if has("not found") {
        ErrorKind::DataNotFound
    } else if has("permission") || has("unauthorized") {
        ErrorKind::PermissionDenied
    } else if has("network") || has("connection") {
        ErrorKind::NetworkError
    } else if has("invalid") || has("parameter") {
        ErrorKind::InvalidParameters
    } else {
        ErrorKind::CkanApiError
    }
}

/// ISO-8601 timestamp without offset, microsecond precision
pub fn iso_timestamp(now: DateTime<Utc>) -> String {
    now.format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ResponseMetadata {
    pub timestamp: String,
    pub execution_time_ms: u64,
    pub api_version: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ErrorDetail {
    #[serde(rename = "type")]
    pub kind: ErrorKind,
    pub message: String,
    pub tool: String,
    pub arguments: Value,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ResponseEnvelope {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetail>,
    pub metadata: ResponseMetadata,
}

impl ResponseEnvelope {
    fn metadata(timestamp: String) -> ResponseMetadata {
        ResponseMetadata {
            timestamp,
            execution_time_ms: 0,
            api_version: API_VERSION.to_string(),
        }
    }

    pub fn success(data: Value, timestamp: String) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            metadata: Self::metadata(timestamp),
        }
    }

    pub fn failure(
        kind: ErrorKind,
        message: impl Into<String>,
        tool: &str,
        arguments: Value,
        timestamp: String,
    ) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ErrorDetail {
                kind,
                message: message.into(),
                tool: tool.to_string(),
                arguments,
            }),
            metadata: Self::metadata(timestamp),
        }
    }

    /// Back-fill the execution time once the operation has finished
    pub fn with_execution_time(mut self, execution_time_ms: u64) -> Self {
        self.metadata.execution_time_ms = execution_time_ms;
        self
    }
}
