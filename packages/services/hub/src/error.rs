//! Hub 에러 타입

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Hub 에러
#[derive(Debug, thiserror::Error)]
pub enum HubError {
    #[error("invalid request body: {message}")]
    InvalidBody { status: StatusCode, message: String },

    #[error("unauthorized: {message}")]
    Unauthorized { message: String },

    #[error("service unavailable: {message}")]
    Unavailable { message: String },

    #[error("core error: {0}")]
    Core(#[from] rotor_core::Error),
}

impl HubError {
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }
}

impl From<JsonRejection> for HubError {
    fn from(rejection: JsonRejection) -> Self {
        Self::InvalidBody {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

/// 에러 응답 JSON
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    #[serde(rename = "requestId", skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl IntoResponse for HubError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            HubError::InvalidBody { status, message } => {
                (*status, "VALIDATION_ERROR", message.clone())
            }
            HubError::Unauthorized { message } => {
                (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", message.clone())
            }
            HubError::Unavailable { message } => {
                (StatusCode::SERVICE_UNAVAILABLE, "UNAVAILABLE", message.clone())
            }
            HubError::Core(e) => {
                let status = StatusCode::from_u16(e.status_code())
                    .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                let message = match e.kind() {
                    // 저장소/내부 오류의 상세는 로그로만
                    rotor_core::ErrorKind::StoreError | rotor_core::ErrorKind::Internal => {
                        tracing::error!("Request failed: {:?}", e);
                        "operation failed, retry later".to_string()
                    }
                    _ => e.to_string(),
                };
                (status, e.code(), message)
            }
        };

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message,
                request_id: crate::middleware::current_request_id(),
            },
        };

        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, HubError>;
