//! Credential Store 계약
//!
//! 저장소는 외부 협력자입니다. 코어는 트랜잭션 단위로만 저장소를 다룹니다.
//!
//! # 트랜잭션 규칙
//!
//! - [`CredentialStore::begin`]으로 얻은 [`StoreTx`]는 작업 하나에서만 사용합니다.
//! - [`StoreTx::commit`]을 호출하지 않고 drop되면 롤백되고 세션이 반환됩니다.
//! - [`StoreTx::invalidate_token`]은 `valid = true`인 레코드만 뒤집으며,
//!   실제로 뒤집었는지를 반환합니다. 동시 갱신 중 하나만 성공하는 근거입니다.

use std::future::Future;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::time::Instant;

use crate::auth::{Invalidation, TokenDigest};
use crate::error::{Error, Result};
use crate::id::{IdentityRef, TokenId};

/// 저장된 Identity
#[derive(Debug, Clone)]
pub struct IdentityRecord {
    pub id: IdentityRef,
    pub first_name: String,
    pub last_name: String,
    /// Argon2 PHC 문자열
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// 저장된 토큰 쌍
///
/// Refresh Token 원문은 저장하지 않습니다.
#[derive(Debug, Clone)]
pub struct TokenRecord {
    pub id: TokenId,
    pub identity: IdentityRef,
    pub access_token: String,
    pub token_hash: TokenDigest,
    pub issued_at: DateTime<Utc>,
    pub access_expires_at: DateTime<Utc>,
    /// Refresh Token 만료 시각
    pub expires_at: DateTime<Utc>,
    pub valid: bool,
    pub invalidated_by: Option<Invalidation>,
    pub invalidated_at: Option<DateTime<Utc>>,
}

/// 토큰 쌍의 상태
///
/// 만료는 갱신 시도 시점에 게으르게 판정됩니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenState {
    Active,
    Expired,
    Consumed,
    Revoked,
}

impl TokenRecord {
    /// `now` 시점의 상태. 만료가 무효화보다 먼저 판정됩니다.
    pub fn state_at(&self, now: DateTime<Utc>) -> TokenState {
        if now > self.expires_at {
            return TokenState::Expired;
        }
        if !self.valid {
            return match self.invalidated_by {
                Some(Invalidation::Revoked) => TokenState::Revoked,
                _ => TokenState::Consumed,
            };
        }
        TokenState::Active
    }
}

/// 프로세스 전역 저장소 핸들
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// 새 트랜잭션 시작
    async fn begin(&self) -> Result<Box<dyn StoreTx>>;
}

/// 단일 작업용 트랜잭션
#[async_trait]
pub trait StoreTx: Send {
    async fn insert_identity(&mut self, record: &IdentityRecord) -> Result<()>;

    async fn find_identity(&mut self, id: &IdentityRef) -> Result<Option<IdentityRecord>>;

    async fn identity_exists(&mut self, id: &IdentityRef) -> Result<bool>;

    async fn find_token(&mut self, digest: &TokenDigest) -> Result<Option<TokenRecord>>;

    async fn insert_token(&mut self, record: &TokenRecord) -> Result<()>;

    /// `valid = true`인 경우에만 무효화. 뒤집었으면 `true`
    async fn invalidate_token(
        &mut self,
        digest: &TokenDigest,
        reason: Invalidation,
        at: DateTime<Utc>,
    ) -> Result<bool>;

    /// 레코드 물리 삭제. 삭제했으면 `true`
    async fn delete_token(&mut self, digest: &TokenDigest) -> Result<bool>;

    /// Identity의 모든 토큰 쌍 삭제. 삭제된 개수 반환
    async fn delete_tokens_for(&mut self, id: &IdentityRef) -> Result<u64>;

    async fn commit(self: Box<Self>) -> Result<()>;
}

/// 호출자가 준 마감 시각 안에서 저장소 작업 실행
///
/// 마감을 넘기면 future가 drop되고, 그 안에서 열린 트랜잭션은 커밋 없이 롤백됩니다.
pub async fn with_deadline<T, F>(operation: &'static str, deadline: Instant, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout_at(deadline, fut).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(operation, "store deadline exceeded, transaction aborted");
            Err(Error::DeadlineExceeded { operation })
        }
    }
}
