//! HTTP error response conversion
//!
//! Handlers return `Result<_, HttpAppError>`; any `AppError` converts with `?`
//! and renders as a plain-text body with the status from its metadata.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use pagebind_core::{AppError, ErrorMetadata, LogLevel};

/// `AppError` as an HTTP response. `AppError` lives in pagebind-core, so the
/// `IntoResponse` impl needs a local newtype.
#[derive(Debug)]
pub struct HttpAppError(pub AppError);

impl From<AppError> for HttpAppError {
    fn from(err: AppError) -> Self {
        HttpAppError(err)
    }
}

impl From<anyhow::Error> for HttpAppError {
    fn from(err: anyhow::Error) -> Self {
        HttpAppError(AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        })
    }
}

fn log_error(error: &AppError) {
    let error_type = error.error_type();
    let error_code = error.error_code();
    match error.log_level() {
        LogLevel::Debug => {
            tracing::debug!(error = %error, error_type, error_code, "Request rejected");
        }
        LogLevel::Warn => {
            tracing::warn!(error = %error, error_type, error_code, "Request rejected");
        }
        LogLevel::Error => {
            tracing::error!(
                error = %error,
                details = %error.detailed_message(),
                error_type,
                error_code,
                "Request failed"
            );
        }
    }
}

fn is_production_env() -> bool {
    let env = std::env::var("ENVIRONMENT")
        .or_else(|_| std::env::var("APP_ENV"))
        .unwrap_or_default()
        .to_lowercase();
    matches!(env.as_str(), "production" | "prod")
}

impl IntoResponse for HttpAppError {
    fn into_response(self) -> Response {
        let app_error = &self.0;

        let status = StatusCode::from_u16(app_error.http_status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        log_error(app_error);

        // Sensitive errors never leave the process; elsewhere the full reason
        // is only shown outside production.
        let body = if is_production_env() || app_error.is_sensitive() {
            app_error.client_message()
        } else {
            app_error.to_string()
        };

        (
            status,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            body,
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_errors_are_bad_request() {
        let response = HttpAppError(AppError::TooManyImages { count: 2, max: 1 }).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/plain; charset=utf-8"
        );
    }

    #[test]
    fn test_internal_errors_are_server_error() {
        let err: HttpAppError = anyhow::anyhow!("lopdf exploded").into();
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
