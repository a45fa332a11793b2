//! 공통 에러 타입
//!
//! 토큰 수명주기 전반에서 사용되는 닫힌 에러 분류입니다.
//! 호출자는 문자열이 아닌 [`ErrorKind`]로 분기합니다.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::auth::Invalidation;

pub type Result<T> = std::result::Result<T, Error>;

/// Rotor 공통 에러
#[derive(Debug, Error)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────────────────────
    // Lookup Errors
    // ─────────────────────────────────────────────────────────────────────────────
    #[error("identity not found: {identity}")]
    IdentityNotFound { identity: String },

    #[error("refresh token not found")]
    TokenNotFound,

    // ─────────────────────────────────────────────────────────────────────────────
    // Credential Errors
    // ─────────────────────────────────────────────────────────────────────────────
    #[error("identity or password incorrect")]
    BadCredential,

    #[error("refresh token {token_id} expired at {expires_at}")]
    Expired {
        token_id: String,
        expires_at: DateTime<Utc>,
    },

    #[error("access token expired at {expires_at}")]
    AccessTokenExpired { expires_at: DateTime<Utc> },

    #[error("refresh token {token_id} is no longer valid ({reason})")]
    Invalidated {
        token_id: String,
        reason: Invalidation,
    },

    #[error("invalid access token: {reason}")]
    InvalidAccessToken { reason: String },

    // ─────────────────────────────────────────────────────────────────────────────
    // Store Errors
    // ─────────────────────────────────────────────────────────────────────────────
    #[error("store error: {message}")]
    Store { message: String },

    #[error("store deadline exceeded during {operation}")]
    DeadlineExceeded { operation: &'static str },

    // ─────────────────────────────────────────────────────────────────────────────
    // Input Errors
    // ─────────────────────────────────────────────────────────────────────────────
    #[error("validation error: {message}")]
    Validation { message: String },

    #[error("internal error: {message}")]
    Internal { message: String },
}

/// 에러 분류
///
/// "재인증 필요" 조건과 "일시적 인프라 장애"를 구분하기 위한 닫힌 열거형입니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    BadCredential,
    Expired,
    Invalidated,
    StoreError,
    ValidationError,
    Internal,
}

impl ErrorKind {
    /// 사용자가 다시 로그인해야 하는 조건인지
    pub fn requires_reauthentication(&self) -> bool {
        matches!(
            self,
            ErrorKind::NotFound
                | ErrorKind::BadCredential
                | ErrorKind::Expired
                | ErrorKind::Invalidated
        )
    }

    /// 호출자가 재시도할 수 있는 조건인지
    pub fn is_transient(&self) -> bool {
        matches!(self, ErrorKind::StoreError)
    }
}

impl Error {
    /// 저장소 에러 생성 헬퍼
    pub fn store(err: impl std::fmt::Display) -> Self {
        Error::Store {
            message: err.to_string(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation {
            message: message.into(),
        }
    }

    pub fn internal(err: impl std::fmt::Display) -> Self {
        Error::Internal {
            message: err.to_string(),
        }
    }

    /// 에러 분류
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::IdentityNotFound { .. } | Error::TokenNotFound => ErrorKind::NotFound,
            Error::BadCredential => ErrorKind::BadCredential,
            Error::Expired { .. } | Error::AccessTokenExpired { .. } => ErrorKind::Expired,
            Error::Invalidated { .. } => ErrorKind::Invalidated,
            Error::Store { .. } | Error::DeadlineExceeded { .. } => ErrorKind::StoreError,
            Error::Validation { .. } | Error::InvalidAccessToken { .. } => {
                ErrorKind::ValidationError
            }
            Error::Internal { .. } => ErrorKind::Internal,
        }
    }

    /// HTTP 상태 코드로 변환
    pub fn status_code(&self) -> u16 {
        match self {
            // 400 Bad Request
            Error::Validation { .. } => 400,

            // 401 Unauthorized
            Error::BadCredential
            | Error::Expired { .. }
            | Error::AccessTokenExpired { .. }
            | Error::Invalidated { .. }
            | Error::InvalidAccessToken { .. } => 401,

            // 404 Not Found
            Error::IdentityNotFound { .. } | Error::TokenNotFound => 404,

            // 503 Service Unavailable (재시도 가능)
            Error::Store { .. } | Error::DeadlineExceeded { .. } => 503,

            Error::Internal { .. } => 500,
        }
    }

    /// 에러 코드 (클라이언트용)
    pub fn code(&self) -> &'static str {
        match self {
            Error::IdentityNotFound { .. } => "IDENTITY_NOT_FOUND",
            Error::TokenNotFound => "TOKEN_NOT_FOUND",
            Error::BadCredential => "BAD_CREDENTIAL",
            Error::Expired { .. } => "TOKEN_EXPIRED",
            Error::AccessTokenExpired { .. } => "ACCESS_TOKEN_EXPIRED",
            Error::Invalidated { .. } => "TOKEN_INVALIDATED",
            Error::InvalidAccessToken { .. } => "INVALID_ACCESS_TOKEN",
            Error::Store { .. } => "STORE_ERROR",
            Error::DeadlineExceeded { .. } => "STORE_TIMEOUT",
            Error::Validation { .. } => "VALIDATION_ERROR",
            Error::Internal { .. } => "INTERNAL_ERROR",
        }
    }
}
