//! Access Token 서명/검증
//!
//! 프로세스 전역 시크릿으로 HS512 서명을 만듭니다.
//! 같은 claim 집합은 항상 같은 토큰을 만듭니다.
//! 만료는 [`SecretSigner::verify`]가 보지 않으므로 검증자가 따로 확인해야 합니다.

use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use super::claims::AccessTokenClaims;
use crate::error::{Error, Result};
use crate::id::IdentityRef;

pub struct SecretSigner {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl SecretSigner {
    pub fn new(secret: impl AsRef<[u8]>) -> Result<Self> {
        let secret = secret.as_ref();
        if secret.is_empty() {
            return Err(Error::validation("signing secret must not be empty"));
        }

        let mut validation = Validation::new(Algorithm::HS512);
        // 만료는 호출자가 주입된 시계로 직접 판정
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.set_required_spec_claims(&["sub", "exp"]);

        Ok(Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
        })
    }

    /// Access Token 발급
    pub fn sign(
        &self,
        identity: &IdentityRef,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<String> {
        if issued_at >= expires_at {
            return Err(Error::validation(format!(
                "access token window is empty: {issued_at} >= {expires_at}"
            )));
        }

        let claims = AccessTokenClaims::new(identity, issued_at, expires_at);
        encode(&Header::new(Algorithm::HS512), &claims, &self.encoding).map_err(Error::internal)
    }

    /// 서명 검증 및 Claims 추출 (만료는 확인하지 않음)
    pub fn verify(&self, token: &str) -> Result<AccessTokenClaims> {
        let data = decode::<AccessTokenClaims>(token.trim(), &self.decoding, &self.validation)
            .map_err(|e| Error::InvalidAccessToken {
                reason: e.to_string(),
            })?;
        Ok(data.claims)
    }

    /// 서명과 만료를 함께 확인
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<AccessTokenClaims> {
        let claims = self.verify(token)?;
        if claims.is_expired_at(now) {
            return Err(Error::AccessTokenExpired {
                expires_at: claims.expires_at()?,
            });
        }
        Ok(claims)
    }
}

impl std::fmt::Debug for SecretSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretSigner")
            .field("algorithm", &"HS512")
            .finish_non_exhaustive()
    }
}
