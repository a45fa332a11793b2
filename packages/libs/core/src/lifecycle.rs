//! Token Lifecycle Manager
//!
//! Access/Refresh 토큰 쌍의 발급, 1회용 갱신, 폐기를 담당합니다.
//!
//! # 상태 전이
//!
//! ```text
//! Active ──renew──▶ Consumed
//!    │  └─revoke──▶ Revoked
//!    └──(시간 경과)─▶ Expired   (다음 갱신 시도에서 판정)
//! 모든 상태 ──revoke_all──▶ 삭제
//! ```
//!
//! 되돌아가는 전이는 없습니다. 변경이 일어나는 작업은 모두 트랜잭션 하나 안에서 끝나며,
//! 실패하면 저장소는 작업 이전 상태 그대로입니다. 재시도는 호출자가 결정합니다.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tokio::time::Instant;

use crate::auth::{AccessTokenClaims, Invalidation, RefreshToken, SecretSigner};
use crate::clock::{Clock, SystemClock};
use crate::error::{Error, Result};
use crate::id::{IdentityRef, TokenId};
use crate::store::{with_deadline, CredentialStore, TokenRecord, TokenState};

/// 토큰 수명
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenTtl {
    pub access: Duration,
    pub refresh: Duration,
}

impl TokenTtl {
    pub fn new(access: Duration, refresh: Duration) -> Result<Self> {
        if access <= Duration::zero() {
            return Err(Error::validation("access token TTL must be positive"));
        }
        if refresh <= Duration::zero() {
            return Err(Error::validation("refresh token TTL must be positive"));
        }
        Ok(Self { access, refresh })
    }

    pub fn from_secs(access: i64, refresh: i64) -> Result<Self> {
        Self::new(Duration::seconds(access), Duration::seconds(refresh))
    }
}

/// 발급 결과
///
/// Refresh Token 원문은 이 값으로만 호출자에게 전달되며 다시 조회할 수 없습니다.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub token_id: TokenId,
    pub identity: IdentityRef,
    pub access_token: String,
    pub refresh_token: RefreshToken,
    pub issued_at: DateTime<Utc>,
    pub access_expires_at: DateTime<Utc>,
    /// Refresh Token 만료 시각
    pub expires_at: DateTime<Utc>,
    pub valid: bool,
}

pub struct TokenManager {
    store: Arc<dyn CredentialStore>,
    signer: Arc<SecretSigner>,
    ttl: TokenTtl,
    clock: Arc<dyn Clock>,
}

impl TokenManager {
    pub fn new(store: Arc<dyn CredentialStore>, signer: Arc<SecretSigner>, ttl: TokenTtl) -> Self {
        Self {
            store,
            signer,
            ttl,
            clock: Arc::new(SystemClock),
        }
    }

    /// 시계 교체
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// 이 관리자가 쓰는 현재 시각
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// 새 토큰 쌍 발급
    ///
    /// Identity가 없으면 `IdentityNotFound`. 삽입은 단일 트랜잭션입니다.
    pub async fn issue(&self, identity: &IdentityRef, deadline: Instant) -> Result<TokenPair> {
        let pair = with_deadline("issue", deadline, async {
            let mut tx = self.store.begin().await?;
            if !tx.identity_exists(identity).await? {
                return Err(Error::IdentityNotFound {
                    identity: identity.to_string(),
                });
            }

            let (pair, record) = self.mint(identity, self.clock.now())?;
            tx.insert_token(&record).await?;
            tx.commit().await?;
            Ok(pair)
        })
        .await?;

        tracing::info!(identity = %identity, token_id = %pair.token_id, "Issued token pair");
        Ok(pair)
    }

    /// Refresh Token을 소비하고 새 토큰 쌍 발급
    ///
    /// 순서: 조회 → 만료 → 유효성 → (무효화 + 새 쌍 삽입)을 한 트랜잭션에서 커밋.
    /// 커밋에 실패하면 기존 토큰은 그대로 유효합니다.
    pub async fn renew(&self, presented: &RefreshToken, deadline: Instant) -> Result<TokenPair> {
        let digest = presented.digest();

        let (previous, pair) = with_deadline("renew", deadline, async {
            let mut tx = self.store.begin().await?;
            let record = tx.find_token(&digest).await?.ok_or(Error::TokenNotFound)?;
            let now = self.clock.now();

            match record.state_at(now) {
                TokenState::Active => {}
                TokenState::Expired => {
                    return Err(Error::Expired {
                        token_id: record.id.to_string(),
                        expires_at: record.expires_at,
                    });
                }
                TokenState::Consumed | TokenState::Revoked => {
                    let reason = record.invalidated_by.unwrap_or(Invalidation::Consumed);
                    tracing::warn!(
                        identity = %record.identity,
                        token_id = %record.id,
                        reason = %reason,
                        "Refresh token replay detected"
                    );
                    return Err(Error::Invalidated {
                        token_id: record.id.to_string(),
                        reason,
                    });
                }
            }

            if !tx.identity_exists(&record.identity).await? {
                return Err(Error::IdentityNotFound {
                    identity: record.identity.to_string(),
                });
            }

            // 읽은 뒤 다른 트랜잭션이 먼저 소비했다면 여기서 0건
            if !tx
                .invalidate_token(&digest, Invalidation::Consumed, now)
                .await?
            {
                tracing::warn!(
                    identity = %record.identity,
                    token_id = %record.id,
                    "Lost concurrent renewal race"
                );
                return Err(Error::Invalidated {
                    token_id: record.id.to_string(),
                    reason: Invalidation::Consumed,
                });
            }

            let (pair, fresh) = self.mint(&record.identity, now)?;
            tx.insert_token(&fresh).await?;
            tx.commit().await?;
            Ok((record, pair))
        })
        .await?;

        tracing::info!(
            identity = %pair.identity,
            previous = %previous.id,
            token_id = %pair.token_id,
            "Rotated refresh token"
        );
        Ok(pair)
    }

    /// Refresh Token 폐기 (valid → false)
    ///
    /// 이미 무효한 토큰은 변경 없이 성공합니다.
    pub async fn revoke(&self, presented: &RefreshToken, deadline: Instant) -> Result<()> {
        let digest = presented.digest();

        let (record, flipped) = with_deadline("revoke", deadline, async {
            let mut tx = self.store.begin().await?;
            let record = tx.find_token(&digest).await?.ok_or(Error::TokenNotFound)?;
            let flipped = tx
                .invalidate_token(&digest, Invalidation::Revoked, self.clock.now())
                .await?;
            tx.commit().await?;
            Ok::<_, Error>((record, flipped))
        })
        .await?;

        if flipped {
            tracing::info!(identity = %record.identity, token_id = %record.id, "Revoked refresh token");
        } else {
            tracing::debug!(token_id = %record.id, "Refresh token already invalid");
        }
        Ok(())
    }

    /// 토큰 쌍 레코드 하나를 물리 삭제
    pub async fn delete(&self, presented: &RefreshToken, deadline: Instant) -> Result<()> {
        let digest = presented.digest();

        with_deadline("delete", deadline, async {
            let mut tx = self.store.begin().await?;
            if !tx.delete_token(&digest).await? {
                return Err(Error::TokenNotFound);
            }
            tx.commit().await
        })
        .await?;

        tracing::info!("Deleted token pair");
        Ok(())
    }

    /// Identity의 모든 토큰 쌍 삭제 (전체 로그아웃)
    ///
    /// 전부 삭제되거나 하나도 삭제되지 않습니다. 삭제된 개수를 반환합니다.
    pub async fn revoke_all(&self, identity: &IdentityRef, deadline: Instant) -> Result<u64> {
        let deleted = with_deadline("revoke_all", deadline, async {
            let mut tx = self.store.begin().await?;
            if !tx.identity_exists(identity).await? {
                return Err(Error::IdentityNotFound {
                    identity: identity.to_string(),
                });
            }
            let deleted = tx.delete_tokens_for(identity).await?;
            tx.commit().await?;
            Ok(deleted)
        })
        .await?;

        tracing::info!(identity = %identity, deleted, "Deleted all token pairs for identity");
        Ok(deleted)
    }

    /// Access Token 검증 (서명 + 만료). 저장소는 조회하지 않습니다.
    pub fn introspect(&self, access_token: &str) -> Result<AccessTokenClaims> {
        self.signer.verify_at(access_token, self.clock.now())
    }

    fn mint(&self, identity: &IdentityRef, now: DateTime<Utc>) -> Result<(TokenPair, TokenRecord)> {
        let access_expires_at = now + self.ttl.access;
        let expires_at = now + self.ttl.refresh;
        let access_token = self.signer.sign(identity, now, access_expires_at)?;
        let refresh_token = RefreshToken::generate();
        let token_id = TokenId::generate();

        let record = TokenRecord {
            id: token_id.clone(),
            identity: identity.clone(),
            access_token: access_token.clone(),
            token_hash: refresh_token.digest(),
            issued_at: now,
            access_expires_at,
            expires_at,
            valid: true,
            invalidated_by: None,
            invalidated_at: None,
        };

        let pair = TokenPair {
            token_id,
            identity: identity.clone(),
            access_token,
            refresh_token,
            issued_at: now,
            access_expires_at,
            expires_at,
            valid: true,
        };

        Ok((pair, record))
    }
}
