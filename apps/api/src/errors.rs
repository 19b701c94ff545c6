use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::analysis::gateway::ProviderError;
use crate::analysis::parser::ParseError;
use crate::analysis::validation::ValidationError;

/// Raw provider output longer than this is cut before it is logged.
const MAX_LOGGED_RAW_CHARS: usize = 2000;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
///
/// Validation and conflict messages are caller-facing and specific. Provider,
/// parse, database and internal failures are reported to the caller
/// generically; the detail only goes to the log.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Analysis already in progress")]
    Conflict,

    #[error("Provider rejected the request: {0}")]
    ProviderRejected(String),

    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Unparseable provider output: {detail}")]
    Parse { detail: String, raw: String },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<ValidationError> for AppError {
    fn from(e: ValidationError) -> Self {
        AppError::Validation(e.to_string())
    }
}

impl From<ProviderError> for AppError {
    fn from(e: ProviderError) -> Self {
        match e {
            ProviderError::Transient(msg) => AppError::ProviderUnavailable(msg),
            ProviderError::Permanent(msg) => AppError::ProviderRejected(msg),
        }
    }
}

impl From<ParseError> for AppError {
    fn from(e: ParseError) -> Self {
        let detail = e.to_string();
        match e {
            ParseError::NoScore { raw } | ParseError::Empty { raw } => AppError::Parse { detail, raw },
        }
    }
}

impl AppError {
    /// Stable machine-readable code included in every error body.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Unauthorized => "UNAUTHORIZED",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Conflict => "CONFLICT",
            AppError::ProviderRejected(_) => "ANALYSIS_REJECTED",
            AppError::ProviderUnavailable(_) => "SERVICE_UNAVAILABLE",
            AppError::Parse { .. } => "ANALYSIS_FAILED",
            AppError::Database(_) => "DATABASE_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "Authentication required".to_string(),
            ),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Conflict => (
                StatusCode::CONFLICT,
                "analysis already in progress".to_string(),
            ),
            AppError::ProviderRejected(detail) => {
                tracing::error!("Provider rejected analysis: {detail}");
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "analysis rejected".to_string(),
                )
            }
            AppError::ProviderUnavailable(detail) => {
                tracing::error!("Provider unavailable: {detail}");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "service temporarily unavailable".to_string(),
                )
            }
            AppError::Parse { detail, raw } => {
                let raw: String = raw.chars().take(MAX_LOGGED_RAW_CHARS).collect();
                tracing::error!(raw_output = %raw, "Parse error: {detail}");
                (
                    StatusCode::BAD_GATEWAY,
                    "analysis failed, try again".to_string(),
                )
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "A database error occurred".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "success": false,
            "message": message,
            "code": self.code(),
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(error: AppError) -> (StatusCode, serde_json::Value) {
        let response = error.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_validation_message_is_verbatim() {
        let (status, body) =
            body_json(AppError::Validation("Resume text must be at least 50 characters".into()))
                .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Resume text must be at least 50 characters");
        assert_eq!(body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_provider_detail_is_not_leaked() {
        let (status, body) =
            body_json(AppError::ProviderUnavailable("upstream 529 overloaded_error".into())).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["message"], "service temporarily unavailable");
        assert!(!body.to_string().contains("529"));
    }

    #[tokio::test]
    async fn test_parse_error_is_generic() {
        let (status, body) = body_json(AppError::Parse {
            detail: "no score".into(),
            raw: "I'm sorry, I can't help with that.".into(),
        })
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["message"], "analysis failed, try again");
        assert!(!body.to_string().contains("sorry"));
    }

    #[tokio::test]
    async fn test_conflict_reports_busy() {
        let (status, body) = body_json(AppError::Conflict).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["message"], "analysis already in progress");
    }

    #[test]
    fn test_provider_error_mapping() {
        assert!(matches!(
            AppError::from(ProviderError::Transient("timeout".into())),
            AppError::ProviderUnavailable(_)
        ));
        assert!(matches!(
            AppError::from(ProviderError::Permanent("bad request".into())),
            AppError::ProviderRejected(_)
        ));
    }
}
