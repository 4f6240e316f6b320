//! Uniform error type and the native failure normalizer.

use bridge_traits::error::{ErrorCode, FailureDetail, NativeFailure};
use thiserror::Error;

use crate::capability::Capability;

const UNKNOWN_NATIVE_MESSAGE: &str = "Unknown native error";

/// Error returned by every fallible facade operation.
///
/// Whatever shape the backend reported, callers see a message and, when the
/// backend supplied one, its code.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FsError {
    /// Optional native operation missing on this platform.
    #[error("{capability} is not available on this platform")]
    NotAvailable { capability: Capability },

    /// Caller-supplied value rejected before reaching the native layer.
    #[error("{0}")]
    InvalidArgument(String),

    /// Failure reported by the native layer, after normalization.
    #[error("{message}")]
    Native {
        message: String,
        code: Option<ErrorCode>,
    },
}

impl FsError {
    /// Normalizes a backend failure.
    ///
    /// Wrapped failures are unwrapped to their innermost cause. The cause's
    /// description is preferred over its message; its code is kept as-is.
    pub fn normalize(failure: NativeFailure) -> Self {
        let detail = innermost_cause(failure);
        let message = detail
            .description
            .or(detail.message)
            .unwrap_or_else(|| UNKNOWN_NATIVE_MESSAGE.to_string());

        FsError::Native {
            message,
            code: detail.code,
        }
    }

    pub(crate) fn timed_out(after: std::time::Duration) -> Self {
        FsError::Native {
            message: format!("Download timed out after {} ms", after.as_millis()),
            code: Some(ErrorCode::Text("ETIMEDOUT".to_string())),
        }
    }

    /// Human-readable message.
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// Machine-readable code, when the backend supplied one.
    pub fn code(&self) -> Option<&ErrorCode> {
        match self {
            FsError::Native { code, .. } => code.as_ref(),
            FsError::NotAvailable { .. } | FsError::InvalidArgument(_) => None,
        }
    }
}

impl From<NativeFailure> for FsError {
    fn from(failure: NativeFailure) -> Self {
        FsError::normalize(failure)
    }
}

fn innermost_cause(mut failure: NativeFailure) -> FailureDetail {
    loop {
        match failure {
            NativeFailure::Direct(detail) => return detail,
            NativeFailure::Wrapped { cause, .. } => failure = *cause,
        }
    }
}

pub type Result<T> = std::result::Result<T, FsError>;
