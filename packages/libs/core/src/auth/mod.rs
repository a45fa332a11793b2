//! 인증 관련 타입 및 로직
//!
//! # 토큰 종류
//!
//! - **Access Token**: HS512 JWT. 서명만으로 검증되며 저장소를 조회하지 않습니다.
//! - **Refresh Token**: 불투명한 랜덤 바이트열. 1회용이며 저장소에 다이제스트로 보관됩니다.
//!
//! 비밀번호는 Argon2id로 해시합니다.

mod claims;
mod password;
mod refresh;
mod signer;

pub use claims::AccessTokenClaims;
pub use password::{hash_password, verify_password};
pub use refresh::{Invalidation, RefreshToken, TokenDigest, REFRESH_TOKEN_LEN};
pub use signer::SecretSigner;
