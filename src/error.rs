//! Error types for VexaRoute
//!
//! All errors implement `IntoResponse` for Axum handlers. Provider failure
//! details are logged where they happen and never copied into response bodies.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Main error type for the application
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to read config file {path}: {source}")]
    ConfigFileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    ConfigParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid configuration in {path}: {reason}")]
    ConfigValidationFailed { path: String, reason: String },

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("User {0} not found")]
    UserNotFound(u64),

    #[error(
        "Rate limit exceeded. Free users are limited to {limit} requests per {window_seconds} seconds \
        ({remaining} remaining in the current window)."
    )]
    RateLimited {
        remaining: u64,
        limit: u64,
        window_seconds: u64,
    },

    #[error("All AI models are currently unavailable. Please retry later.")]
    ServiceUnavailable,

    #[error("Request admission is temporarily unavailable. Please retry later.")]
    AdmissionUnavailable,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::UserNotFound(_) => StatusCode::NOT_FOUND,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::ServiceUnavailable | Self::AdmissionUnavailable => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            Self::Config(_)
            | Self::ConfigFileRead { .. }
            | Self::ConfigParseFailed { .. }
            | Self::ConfigValidationFailed { .. }
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = match &self {
            Self::RateLimited { remaining, .. } => serde_json::json!({
                "error": self.to_string(),
                "remaining_requests": remaining,
            }),
            Self::ServiceUnavailable | Self::AdmissionUnavailable => serde_json::json!({
                "error": self.to_string(),
                "retry": true,
            }),
            // Internal details stay in the logs
            Self::Internal(_) => serde_json::json!({
                "error": "Internal server error",
            }),
            _ => serde_json::json!({
                "error": self.to_string(),
            }),
        };

        (status, Json(body)).into_response()
    }
}

impl From<crate::service::QueryError> for AppError {
    fn from(err: crate::service::QueryError) -> Self {
        use crate::service::QueryError;
        match err {
            QueryError::Validation(msg) => Self::Validation(msg),
            QueryError::UserNotFound(user_id) => Self::UserNotFound(user_id),
            QueryError::RateLimited {
                remaining,
                limit,
                window_seconds,
            } => Self::RateLimited {
                remaining,
                limit,
                window_seconds,
            },
            QueryError::AllProvidersUnavailable => Self::ServiceUnavailable,
            // Counter store down: fail closed
            QueryError::Admission(e) => {
                tracing::error!(error = %e, "Admission check failed");
                Self::AdmissionUnavailable
            }
            QueryError::Account(crate::accounts::AccountError::NotFound(user_id)) => {
                Self::UserNotFound(user_id)
            }
            QueryError::Account(e) => Self::Internal(e.to_string()),
        }
    }
}

/// Convenience type alias for Results
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body should be readable");
        serde_json::from_slice(&bytes).expect("body should be JSON")
    }

    #[test]
    fn test_config_error_creates() {
        let err = AppError::Config("test error".to_string());
        assert_eq!(err.to_string(), "Configuration error: test error");
    }

    #[test]
    fn test_validation_error_creates() {
        let err = AppError::Validation("invalid input".to_string());
        assert_eq!(err.to_string(), "Invalid request: invalid input");
    }

    #[test]
    fn test_validation_error_response_status() {
        let response = AppError::Validation("test".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_user_not_found_response_status() {
        let response = AppError::UserNotFound(42).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_rate_limited_response_carries_remaining() {
        let response = AppError::RateLimited {
            remaining: 0,
            limit: 5,
            window_seconds: 60,
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

        let body = body_json(response).await;
        assert_eq!(body["remaining_requests"], 0);
        assert!(body["error"].as_str().unwrap().contains("5 requests per 60"));
    }

    #[tokio::test]
    async fn test_service_unavailable_asks_for_retry() {
        let response = AppError::ServiceUnavailable.into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let body = body_json(response).await;
        assert_eq!(body["retry"], true);
        assert!(body["error"].as_str().unwrap().contains("retry later"));
    }

    #[tokio::test]
    async fn test_internal_error_hides_details() {
        let response =
            AppError::Internal("counter store connection refused at 10.0.0.3".to_string())
                .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(response).await;
        assert_eq!(body["error"], "Internal server error");
    }

    #[test]
    fn test_admission_store_failure_fails_closed() {
        let err = crate::service::QueryError::Admission(
            crate::limits::CounterStoreError("down".to_string()).into(),
        );
        let response = AppError::from(err).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_config_error_response_status() {
        let response = AppError::Config("test".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
