//! HTTP 핸들러

use axum::extract::FromRequest;

use crate::error::HubError;

pub mod auth;
pub mod health;

/// JSON 본문 추출기
///
/// 본문 파싱 실패도 공통 에러 응답 형식으로 돌려줍니다.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(HubError))]
pub struct AppJson<T>(pub T);
