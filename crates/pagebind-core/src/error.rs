//! Error types module
//!
//! Job-level errors are unified under the `AppError` enum. These are the only
//! failures that cross the HTTP boundary: batch validation rejections, an empty
//! result, and unexpected faults during orchestration. Per-item failures are
//! absorbed by the conversion pipeline and never reach this type.

/// Level at which the HTTP layer logs an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Client mistakes: limits breached, malformed body
    Debug,
    /// Accepted requests that produced nothing
    Warn,
    /// Faults on our side
    Error,
}

/// How an error is presented over HTTP.
pub trait ErrorMetadata {
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "TOO_MANY_IMAGES")
    fn error_code(&self) -> &'static str;

    /// Text safe to show a client
    fn client_message(&self) -> String;

    /// Whether details must be hidden from the client
    fn is_sensitive(&self) -> bool;

    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("no images")]
    NoImages,

    #[error("too many images: {count} submitted, at most {max} allowed")]
    TooManyImages { count: usize, max: usize },

    #[error("total size exceeded: {total} bytes submitted, at most {max} bytes allowed")]
    TotalSizeExceeded { total: u64, max: u64 },

    #[error("no valid pages: none of the {submitted} submitted images could be converted")]
    NoValidPages { submitted: usize },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

/// Static metadata for each variant: (http_status, error_code, sensitive, log_level).
/// client_message stays per-variant for dynamic content.
fn app_error_static_metadata(err: &AppError) -> (u16, &'static str, bool, LogLevel) {
    match err {
        AppError::NoImages => (400, "NO_IMAGES", false, LogLevel::Debug),
        AppError::TooManyImages { .. } => (400, "TOO_MANY_IMAGES", false, LogLevel::Debug),
        AppError::TotalSizeExceeded { .. } => {
            (400, "TOTAL_SIZE_EXCEEDED", false, LogLevel::Debug)
        }
        AppError::NoValidPages { .. } => (400, "NO_VALID_PAGES", false, LogLevel::Warn),
        AppError::InvalidInput(_) => (400, "INVALID_INPUT", false, LogLevel::Debug),
        AppError::Internal(_) => (500, "INTERNAL_ERROR", true, LogLevel::Error),
        AppError::InternalWithSource { .. } => (500, "INTERNAL_ERROR", true, LogLevel::Error),
    }
}

impl AppError {
    /// Get the error type name for log records
    pub fn error_type(&self) -> &str {
        match self {
            AppError::NoImages
            | AppError::TooManyImages { .. }
            | AppError::TotalSizeExceeded { .. } => "BatchValidation",
            AppError::NoValidPages { .. } => "EmptyResult",
            AppError::InvalidInput(_) => "InvalidInput",
            AppError::Internal(_) | AppError::InternalWithSource { .. } => "Internal",
        }
    }

    /// Display text followed by the source chain, for logs.
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();

        let mut source = self.source();
        let mut depth = 0;
        while let Some(err) = source {
            depth += 1;
            if depth > 5 {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }

        details
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        app_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).1
    }

    fn is_sensitive(&self) -> bool {
        app_error_static_metadata(self).2
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).3
    }

    fn client_message(&self) -> String {
        match self {
            AppError::NoImages => "no images".to_string(),
            AppError::TooManyImages { max, .. } => {
                format!("too many images: at most {} images are supported", max)
            }
            AppError::TotalSizeExceeded { max, .. } => format!(
                "total size exceeded: at most {} MB may be uploaded at once",
                max / 1024 / 1024
            ),
            AppError::NoValidPages { .. } => "no valid pages".to_string(),
            AppError::InvalidInput(ref msg) => msg.clone(),
            AppError::Internal(_) | AppError::InternalWithSource { .. } => {
                "Internal server error".to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_metadata_no_images() {
        let err = AppError::NoImages;
        assert_eq!(err.http_status_code(), 400);
        assert_eq!(err.error_code(), "NO_IMAGES");
        assert_eq!(err.client_message(), "no images");
        assert!(!err.is_sensitive());
        assert_eq!(err.log_level(), LogLevel::Debug);
    }

    #[test]
    fn test_error_metadata_too_many_images() {
        let err = AppError::TooManyImages {
            count: 101,
            max: 100,
        };
        assert_eq!(err.http_status_code(), 400);
        assert!(err.client_message().starts_with("too many images"));
        assert!(err.client_message().contains("100"));
    }

    #[test]
    fn test_error_metadata_total_size() {
        let err = AppError::TotalSizeExceeded {
            total: 200 * 1024 * 1024,
            max: 100 * 1024 * 1024,
        };
        assert_eq!(err.http_status_code(), 400);
        assert_eq!(err.error_code(), "TOTAL_SIZE_EXCEEDED");
        assert!(err.client_message().starts_with("total size exceeded"));
        assert!(err.client_message().contains("100 MB"));
    }

    #[test]
    fn test_error_metadata_no_valid_pages() {
        let err = AppError::NoValidPages { submitted: 3 };
        assert_eq!(err.http_status_code(), 400);
        assert_eq!(err.client_message(), "no valid pages");
        assert_eq!(err.log_level(), LogLevel::Warn);
        assert_eq!(err.error_type(), "EmptyResult");
    }

    #[test]
    fn test_internal_errors_hide_details() {
        let err = AppError::from(anyhow::anyhow!("encoder exploded"));
        assert_eq!(err.http_status_code(), 500);
        assert!(err.is_sensitive());
        assert_eq!(err.client_message(), "Internal server error");
        assert!(err.detailed_message().contains("Caused by: encoder exploded"));
    }
}
