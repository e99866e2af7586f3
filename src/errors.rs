use serde::Serialize;
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Boxed error as produced by a native collaborator.
pub type NativeError = Box<dyn StdError + Send + Sync + 'static>;

/// Closed set of failure kinds every facade reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    PrinterNotFound,
    PrinterOffline,
    AccessDenied,
    JobNotFound,
    DriverError,
    InvalidArguments,
    FileNotFound,
    UnsupportedFormat,
    Unknown,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::PrinterNotFound => "PRINTER_NOT_FOUND",
            ErrorCode::PrinterOffline => "PRINTER_OFFLINE",
            ErrorCode::AccessDenied => "ACCESS_DENIED",
            ErrorCode::JobNotFound => "JOB_NOT_FOUND",
            ErrorCode::DriverError => "DRIVER_ERROR",
            ErrorCode::InvalidArguments => "INVALID_ARGUMENTS",
            ErrorCode::FileNotFound => "FILE_NOT_FOUND",
            ErrorCode::UnsupportedFormat => "UNSUPPORTED_FORMAT",
            ErrorCode::Unknown => "UNKNOWN",
        }
    }

    /// Classify a native error message.
    ///
    /// Rules are checked in order and the first hit wins. Matching is on
    /// lower-case English substrings, so localized or capitalized messages
    /// from the OS fall through to `Unknown`.
    pub fn classify(message: &str) -> ErrorCode {
        let has = |needle: &str| message.contains(needle);

        if has("printer") && has("not found") {
            ErrorCode::PrinterNotFound
        } else if has("offline") || has("not available") {
            ErrorCode::PrinterOffline
        } else if has("access denied") || has("permission") {
            ErrorCode::AccessDenied
        } else if has("job") && has("not found") {
            ErrorCode::JobNotFound
        } else if has("driver") {
            ErrorCode::DriverError
        } else if has("file") && has("not found") {
            ErrorCode::FileNotFound
        } else {
            ErrorCode::Unknown
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The only error type that crosses a facade boundary.
///
/// Cloneable so one outcome can be handed to both the awaiting caller and
/// a callback. The native cause is kept for diagnostics only.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct PrinterError {
    code: ErrorCode,
    message: String,
    #[source]
    source: Option<Arc<dyn StdError + Send + Sync + 'static>>,
}

pub type PrinterResult<T> = Result<T, PrinterError>;

impl PrinterError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        code: ErrorCode,
        message: impl Into<String>,
        source: impl Into<NativeError>,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            source: Some(Arc::from(source.into())),
        }
    }

    pub fn invalid_arguments(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidArguments, message)
    }

    pub fn printer_not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::PrinterNotFound, message)
    }

    /// Normalize an arbitrary native failure.
    ///
    /// A `PrinterError` passes through unchanged; anything else is
    /// classified by its message and kept as the source.
    pub fn from_native(err: NativeError) -> Self {
        match err.downcast::<PrinterError>() {
            Ok(already) => *already,
            Err(other) => {
                let message = other.to_string();
                let code = ErrorCode::classify(&message);
                Self {
                    code,
                    message,
                    source: Some(Arc::from(other)),
                }
            }
        }
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn original(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        self.source.as_deref()
    }

    pub(crate) fn or_code(mut self, fallback: ErrorCode) -> Self {
        if self.code == ErrorCode::Unknown {
            self.code = fallback;
        }
        self
    }

    pub fn error_response(&self) -> serde_json::Value {
        serde_json::json!({
            "ok": false,
            "error": self.message,
            "code": self.code.as_str()
        })
    }
}
