use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::services::question_merge::UnknownStatus;
use crate::services::workflow::WorkflowError;

#[derive(Debug, Serialize)]
struct ErrorResponse {
    status: u16,
    detail: String,
}

#[derive(Debug)]
pub(crate) enum ApiError {
    Unauthorized(&'static str),
    Forbidden(String),
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    TooManyRequests(&'static str),
    Internal(String),
}

impl ApiError {
    /// Log the underlying error with context and return an `Internal` variant.
    pub(crate) fn internal(err: impl std::fmt::Display, context: &str) -> Self {
        tracing::error!(error = %err, "{context}");
        Self::Internal(context.to_string())
    }

    pub(crate) fn forbidden(message: &str) -> Self {
        Self::Forbidden(message.to_string())
    }

    pub(crate) fn not_found(message: &str) -> Self {
        Self::NotFound(message.to_string())
    }

    fn parts(self) -> (StatusCode, String) {
        match self {
            Self::Unauthorized(message) => (StatusCode::UNAUTHORIZED, message.to_string()),
            Self::Forbidden(message) => (StatusCode::FORBIDDEN, message),
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            Self::NotFound(message) => (StatusCode::NOT_FOUND, message),
            Self::Conflict(message) => (StatusCode::CONFLICT, message),
            Self::TooManyRequests(message) => (StatusCode::TOO_MANY_REQUESTS, message.to_string()),
            Self::Internal(message) => {
                tracing::error!(error = %message, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, message)
            }
        }
    }
}

impl From<WorkflowError> for ApiError {
    fn from(err: WorkflowError) -> Self {
        match err {
            WorkflowError::RoleNotPermitted { .. } => Self::Forbidden(err.to_string()),
            WorkflowError::IllegalTransition { .. }
            | WorkflowError::FlagPending
            | WorkflowError::AlreadyFlagged
            | WorkflowError::NoPendingFlag => Self::Conflict(err.to_string()),
            WorkflowError::MissingExplanation | WorkflowError::UnexpectedRouting => {
                Self::BadRequest(err.to_string())
            }
            WorkflowError::Inconsistent(_) => Self::internal(err, "Question state is inconsistent"),
        }
    }
}

impl From<UnknownStatus> for ApiError {
    fn from(err: UnknownStatus) -> Self {
        Self::BadRequest(err.to_string())
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::BadRequest(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let unauthorized = matches!(self, Self::Unauthorized(_));
        let (status, detail) = self.parts();
        let mut response =
            (status, Json(ErrorResponse { status: status.as_u16(), detail })).into_response();
        if unauthorized {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use axum::body::to_bytes;

    use super::*;

    async fn body_of(error: ApiError) -> (StatusCode, serde_json::Value, bool) {
        let response = error.into_response();
        let status = response.status();
        let has_challenge = response.headers().contains_key(header::WWW_AUTHENTICATE);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap(), has_challenge)
    }

    #[tokio::test]
    async fn unauthorized_carries_bearer_challenge() {
        let (status, json, challenge) = body_of(ApiError::Unauthorized("nope")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["status"], 401);
        assert_eq!(json["detail"], "nope");
        assert!(challenge);

        let (status, _, challenge) = body_of(ApiError::forbidden("no")).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert!(!challenge);
    }

    #[tokio::test]
    async fn workflow_errors_map_to_http_statuses() {
        let cases = [
            (WorkflowError::FlagPending, StatusCode::CONFLICT),
            (
                WorkflowError::IllegalTransition { from: "rejected", action: "approve" },
                StatusCode::CONFLICT,
            ),
            (
                WorkflowError::RoleNotPermitted { role: "student", action: "approve" },
                StatusCode::FORBIDDEN,
            ),
            (WorkflowError::MissingExplanation, StatusCode::BAD_REQUEST),
        ];
        for (err, expected) in cases {
            let (status, json, _) = body_of(ApiError::from(err)).await;
            assert_eq!(status, expected);
            assert!(json["detail"].as_str().is_some_and(|detail| !detail.is_empty()));
        }
    }
}
