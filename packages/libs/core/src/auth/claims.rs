//! 토큰 Claims
//!
//! Access Token의 페이로드 구조입니다.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::id::IdentityRef;

/// Access Token Claims (HS512 JWT 페이로드)
///
/// 저장소를 거치지 않고 서명만으로 검증되는 자기완결적 토큰의 내용입니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    /// Subject (Identity ID)
    pub sub: String,

    /// 발급 시각 (unix 초)
    pub iat: i64,

    /// 만료 시각 (unix 초)
    pub exp: i64,
}

impl AccessTokenClaims {
    pub fn new(identity: &IdentityRef, issued_at: DateTime<Utc>, expires_at: DateTime<Utc>) -> Self {
        Self {
            sub: identity.to_string(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        }
    }

    /// Subject를 Identity 참조로 해석
    pub fn identity(&self) -> Result<IdentityRef> {
        IdentityRef::parse(&self.sub)
    }

    pub fn issued_at(&self) -> Result<DateTime<Utc>> {
        timestamp(self.iat)
    }

    pub fn expires_at(&self) -> Result<DateTime<Utc>> {
        timestamp(self.exp)
    }

    /// 만료 여부 확인
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() > self.exp
    }

    /// 남은 TTL (초)
    pub fn remaining_ttl(&self, now: DateTime<Utc>) -> i64 {
        (self.exp - now.timestamp()).max(0)
    }
}

fn timestamp(secs: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0)
        .ok_or_else(|| Error::validation(format!("timestamp out of range: {secs}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_access_token_claims() {
        let identity = IdentityRef::generate();
        let iat = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let claims = AccessTokenClaims::new(&identity, iat, iat + Duration::seconds(900));

        assert_eq!(claims.identity().unwrap(), identity);
        assert_eq!(claims.exp - claims.iat, 900);
        assert_eq!(claims.issued_at().unwrap(), iat);

        assert!(!claims.is_expired_at(iat));
        assert!(!claims.is_expired_at(iat + Duration::seconds(900)));
        assert!(claims.is_expired_at(iat + Duration::seconds(901)));

        assert_eq!(claims.remaining_ttl(iat + Duration::seconds(600)), 300);
        assert_eq!(claims.remaining_ttl(iat + Duration::seconds(2000)), 0);
    }
}
