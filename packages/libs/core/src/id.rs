//! 식별자 타입
//!
//! Identity와 토큰 레코드는 모두 ULID로 식별합니다.
//! 외부에서 들어온 문자열은 [`IdentityRef::parse`]로 검증한 뒤에만 사용합니다.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::error::{Error, Result};

/// Identity 참조
///
/// 등록 시 발급되며 이후 변하지 않습니다.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct IdentityRef(Ulid);

impl IdentityRef {
    /// 새 ID 생성
    pub fn generate() -> Self {
        Self(Ulid::new())
    }

    /// 문자열에서 파싱 (형식 오류는 ValidationError)
    pub fn parse(raw: &str) -> Result<Self> {
        Ulid::from_string(raw.trim())
            .map(Self)
            .map_err(|e| Error::validation(format!("malformed identity reference '{raw}': {e}")))
    }
}

impl fmt::Display for IdentityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for IdentityRef {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for IdentityRef {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<IdentityRef> for String {
    fn from(value: IdentityRef) -> Self {
        value.to_string()
    }
}

/// 토큰 레코드 ID
///
/// 로깅과 에러 메시지용입니다. 조회 키는 refresh token 다이제스트입니다.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TokenId(pub String);

impl TokenId {
    pub fn generate() -> Self {
        Self(Ulid::new().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_identity_ref_parse() {
        let id = IdentityRef::generate();
        let parsed = IdentityRef::parse(&id.to_string()).unwrap();
        assert_eq!(parsed, id);

        let padded = format!("  {}\n", id);
        assert_eq!(IdentityRef::parse(&padded).unwrap(), id);
    }

    #[test]
    fn test_identity_ref_rejects_garbage() {
        let err = IdentityRef::parse("5f2b9c1e8a4d3b2a1c0e9f8d").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationError);

        assert!(IdentityRef::parse("").is_err());
    }

    #[test]
    fn test_identity_ref_serde() {
        let id = IdentityRef::generate();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id));

        let bad: std::result::Result<IdentityRef, _> = serde_json::from_str("\"nope\"");
        assert!(bad.is_err());
    }
}
