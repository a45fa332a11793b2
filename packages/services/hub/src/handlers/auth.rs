//! 토큰 엔드포인트
//!
//! 요청 본문의 ID와 Refresh Token은 여기서 디코딩한 뒤 코어 연산에 넘깁니다.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use rotor_core::auth::RefreshToken;
use rotor_core::{IdentityRef, TokenPair};

use super::AppJson;
use crate::error::{HubError, Result};
use crate::state::AppState;

/// POST /register 요청 본문
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub guid: String,
}

/// POST /auth 요청 본문
#[derive(Debug, Deserialize)]
pub struct AuthRequest {
    pub guid: String,
    pub password: String,
}

/// /refresh, /revoke, /delete 요청 본문
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh: String,
}

/// POST /deleteAll 요청 본문
#[derive(Debug, Deserialize)]
pub struct IdentityRequest {
    pub guid: String,
}

/// 토큰 쌍 응답
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub access: String,
    pub refresh: String,
    /// Refresh Token 만료 시각
    pub expires_at: DateTime<Utc>,
    pub access_expires_at: DateTime<Utc>,
}

impl From<TokenPair> for TokenResponse {
    fn from(pair: TokenPair) -> Self {
        Self {
            access: pair.access_token,
            refresh: pair.refresh_token.to_base64(),
            expires_at: pair.expires_at,
            access_expires_at: pair.access_expires_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted: Option<u64>,
}

impl StatusResponse {
    fn ok() -> Self {
        Self {
            status: "ok",
            deleted: None,
        }
    }
}

/// GET /me 응답
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    pub guid: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// 남은 수명 (초)
    pub expires_in: i64,
}

/// POST /register
pub async fn register(
    State(state): State<Arc<AppState>>,
    AppJson(request): AppJson<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>)> {
    let id = state
        .sessions
        .register(
            &request.first_name,
            &request.last_name,
            &request.password,
            state.deadline(),
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            guid: id.to_string(),
        }),
    ))
}

/// POST /auth
pub async fn authenticate(
    State(state): State<Arc<AppState>>,
    AppJson(request): AppJson<AuthRequest>,
) -> Result<Json<TokenResponse>> {
    let identity = IdentityRef::parse(&request.guid)?;
    let pair = state
        .sessions
        .authenticate(&identity, &request.password, state.deadline())
        .await?;
    Ok(Json(pair.into()))
}

/// POST /refresh
pub async fn refresh(
    State(state): State<Arc<AppState>>,
    AppJson(request): AppJson<RefreshRequest>,
) -> Result<Json<TokenResponse>> {
    let presented = RefreshToken::from_base64(&request.refresh)?;
    let pair = state.sessions.renew(&presented, state.deadline()).await?;
    Ok(Json(pair.into()))
}

/// POST /revoke
pub async fn revoke(
    State(state): State<Arc<AppState>>,
    AppJson(request): AppJson<RefreshRequest>,
) -> Result<Json<StatusResponse>> {
    let presented = RefreshToken::from_base64(&request.refresh)?;
    state.sessions.revoke(&presented, state.deadline()).await?;
    Ok(Json(StatusResponse::ok()))
}

/// POST /delete
pub async fn delete(
    State(state): State<Arc<AppState>>,
    AppJson(request): AppJson<RefreshRequest>,
) -> Result<Json<StatusResponse>> {
    let presented = RefreshToken::from_base64(&request.refresh)?;
    state.sessions.delete(&presented, state.deadline()).await?;
    Ok(Json(StatusResponse::ok()))
}

/// POST /deleteAll
pub async fn delete_all(
    State(state): State<Arc<AppState>>,
    AppJson(request): AppJson<IdentityRequest>,
) -> Result<Json<StatusResponse>> {
    let identity = IdentityRef::parse(&request.guid)?;
    let deleted = state
        .sessions
        .revoke_all(&identity, state.deadline())
        .await?;
    Ok(Json(StatusResponse {
        status: "ok",
        deleted: Some(deleted),
    }))
}

/// GET /me
///
/// Bearer Access Token을 서명과 만료만으로 확인합니다.
pub async fn me(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Result<Json<MeResponse>> {
    let token = bearer_token(&headers)
        .ok_or_else(|| HubError::unauthorized("missing bearer access token"))?;

    let claims = state.sessions.introspect(token)?;
    let now = state.sessions.tokens().now();

    Ok(Json(MeResponse {
        guid: claims.sub.clone(),
        issued_at: claims.issued_at()?,
        expires_at: claims.expires_at()?,
        expires_in: claims.remaining_ttl(now),
    }))
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_token() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(bearer_token(&headers), Some("abc.def"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&headers), None);
    }
}
