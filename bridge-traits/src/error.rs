//! Failure shapes reported by native backends.
//!
//! Backends describe failures in one of two ways: a direct failure carrying
//! its own message/description/code, or an operational wrapper around a
//! deeper cause. Both shapes stay on this side of the bridge; the core
//! normalizes them before anything reaches a caller.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Machine-readable code attached to a native failure.
///
/// Platforms disagree on the representation: POSIX-style errno values arrive
/// as numbers, Cocoa/Java style codes as strings. The value is preserved as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ErrorCode {
    Number(i64),
    Text(String),
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCode::Number(n) => write!(f, "{}", n),
            ErrorCode::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for ErrorCode {
    fn from(value: i64) -> Self {
        ErrorCode::Number(value)
    }
}

impl From<&str> for ErrorCode {
    fn from(value: &str) -> Self {
        ErrorCode::Text(value.to_string())
    }
}

impl From<String> for ErrorCode {
    fn from(value: String) -> Self {
        ErrorCode::Text(value)
    }
}

/// Fields a backend may populate on a direct failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureDetail {
    pub message: Option<String>,
    /// Localized description, preferred over `message` when present.
    pub description: Option<String>,
    pub code: Option<ErrorCode>,
}

impl FailureDetail {
    fn summary(&self) -> &str {
        self.description
            .as_deref()
            .or(self.message.as_deref())
            .unwrap_or("native failure")
    }
}

/// Failure value surfaced by a native call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NativeFailure {
    #[error("{}", .0.summary())]
    Direct(FailureDetail),

    #[error("{message}")]
    Wrapped {
        message: String,
        #[source]
        cause: Box<NativeFailure>,
    },
}

impl NativeFailure {
    /// Direct failure with only a message.
    pub fn message(message: impl Into<String>) -> Self {
        NativeFailure::Direct(FailureDetail {
            message: Some(message.into()),
            ..FailureDetail::default()
        })
    }

    /// Direct failure with a message and a code.
    pub fn with_code(message: impl Into<String>, code: impl Into<ErrorCode>) -> Self {
        NativeFailure::Direct(FailureDetail {
            message: Some(message.into()),
            code: Some(code.into()),
            ..FailureDetail::default()
        })
    }

    /// Direct failure carrying a platform description and optional code.
    pub fn described(description: impl Into<String>, code: Option<ErrorCode>) -> Self {
        NativeFailure::Direct(FailureDetail {
            description: Some(description.into()),
            code,
            ..FailureDetail::default()
        })
    }

    /// Operational wrapper around a deeper cause.
    pub fn wrap(message: impl Into<String>, cause: NativeFailure) -> Self {
        NativeFailure::Wrapped {
            message: message.into(),
            cause: Box::new(cause),
        }
    }

    /// Failure reported by default implementations of optional operations.
    pub fn unsupported(operation: &str) -> Self {
        NativeFailure::with_code(
            format!("{} is not implemented by this backend", operation),
            "EUNSUPPORTED",
        )
    }
}

impl From<std::io::Error> for NativeFailure {
    fn from(err: std::io::Error) -> Self {
        NativeFailure::Direct(FailureDetail {
            message: Some(err.to_string()),
            description: None,
            code: err.raw_os_error().map(|code| ErrorCode::Number(code as i64)),
        })
    }
}

pub type Result<T> = std::result::Result<T, NativeFailure>;
