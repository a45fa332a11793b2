//! Refresh Token 재료
//!
//! Refresh Token은 OS CSPRNG에서 뽑은 불투명한 바이트열입니다.
//! 전송 경계에서는 표준 base64로 주고받고, 저장소에는 SHA-256 다이제스트만 남깁니다.

use std::fmt;
use std::str::FromStr;

use base64::{engine::general_purpose, Engine as _};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Serialize, Serializer};
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

/// 새로 발급하는 토큰의 바이트 길이
pub const REFRESH_TOKEN_LEN: usize = 32;

/// 외부에서 받아들이는 최대 길이
const MAX_PRESENTED_LEN: usize = 512;

#[derive(Clone, PartialEq, Eq)]
pub struct RefreshToken(Vec<u8>);

impl RefreshToken {
    /// 새 토큰 생성
    pub fn generate() -> Self {
        let mut bytes = vec![0u8; REFRESH_TOKEN_LEN];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// 원시 바이트에서 생성
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        if bytes.is_empty() {
            return Err(Error::validation("refresh token must not be empty"));
        }
        if bytes.len() > MAX_PRESENTED_LEN {
            return Err(Error::validation(format!(
                "refresh token too long ({} bytes)",
                bytes.len()
            )));
        }
        Ok(Self(bytes))
    }

    /// 전송용 base64 문자열에서 디코딩
    pub fn from_base64(encoded: &str) -> Result<Self> {
        let bytes = general_purpose::STANDARD
            .decode(encoded.trim())
            .map_err(|e| Error::validation(format!("refresh token is not valid base64: {e}")))?;
        Self::from_bytes(bytes)
    }

    pub fn to_base64(&self) -> String {
        general_purpose::STANDARD.encode(&self.0)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// 저장소 조회 키
    pub fn digest(&self) -> TokenDigest {
        let hash = Sha256::digest(&self.0);
        TokenDigest(hash.into())
    }
}

impl fmt::Debug for RefreshToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RefreshToken(<{} bytes redacted>)", self.0.len())
    }
}

impl Serialize for RefreshToken {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base64())
    }
}

/// Refresh Token의 SHA-256 다이제스트
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TokenDigest([u8; 32]);

impl TokenDigest {
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| Error::store(format!("token digest has {} bytes, expected 32", bytes.len())))?;
        Ok(Self(arr))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Refresh Token이 무효화된 경위
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Invalidation {
    /// 갱신에 사용됨
    Consumed,

    /// 명시적으로 폐기됨
    Revoked,
}

impl Invalidation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Invalidation::Consumed => "consumed",
            Invalidation::Revoked => "revoked",
        }
    }
}

impl FromStr for Invalidation {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "consumed" => Ok(Invalidation::Consumed),
            "revoked" => Ok(Invalidation::Revoked),
            other => Err(Error::validation(format!("unknown invalidation reason: {other}"))),
        }
    }
}

impl fmt::Display for Invalidation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
