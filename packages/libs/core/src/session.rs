//! 요청 처리기가 사용하는 세션 연산
//!
//! Identity Directory와 Token Lifecycle Manager를 묶어 외부 연산 집합을 제공합니다.
//! 입력 디코딩(base64, ID 파싱)은 호출 경계에서 끝난 상태로 들어옵니다.

use tokio::time::Instant;

use crate::auth::{AccessTokenClaims, RefreshToken};
use crate::error::{Error, Result};
use crate::id::IdentityRef;
use crate::identity::IdentityDirectory;
use crate::lifecycle::{TokenManager, TokenPair};

pub struct SessionService {
    directory: IdentityDirectory,
    tokens: TokenManager,
}

impl SessionService {
    pub fn new(directory: IdentityDirectory, tokens: TokenManager) -> Self {
        Self { directory, tokens }
    }

    pub fn directory(&self) -> &IdentityDirectory {
        &self.directory
    }

    pub fn tokens(&self) -> &TokenManager {
        &self.tokens
    }

    /// Identity 등록
    pub async fn register(
        &self,
        first_name: &str,
        last_name: &str,
        password: &str,
        deadline: Instant,
    ) -> Result<IdentityRef> {
        self.directory
            .register(first_name, last_name, password, deadline)
            .await
    }

    /// 비밀번호 확인 후 토큰 쌍 발급
    pub async fn authenticate(
        &self,
        identity: &IdentityRef,
        password: &str,
        deadline: Instant,
    ) -> Result<TokenPair> {
        if !self
            .directory
            .verify_password(identity, password, deadline)
            .await?
        {
            tracing::info!(identity = %identity, "Password mismatch");
            return Err(Error::BadCredential);
        }
        self.tokens.issue(identity, deadline).await
    }

    pub async fn renew(&self, refresh: &RefreshToken, deadline: Instant) -> Result<TokenPair> {
        self.tokens.renew(refresh, deadline).await
    }

    pub async fn revoke(&self, refresh: &RefreshToken, deadline: Instant) -> Result<()> {
        self.tokens.revoke(refresh, deadline).await
    }

    pub async fn delete(&self, refresh: &RefreshToken, deadline: Instant) -> Result<()> {
        self.tokens.delete(refresh, deadline).await
    }

    pub async fn revoke_all(&self, identity: &IdentityRef, deadline: Instant) -> Result<u64> {
        self.tokens.revoke_all(identity, deadline).await
    }

    pub fn introspect(&self, access_token: &str) -> Result<AccessTokenClaims> {
        self.tokens.introspect(access_token)
    }
}
