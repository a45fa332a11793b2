//! rotor-core: 세션 토큰 수명주기 핵심 라이브러리
//!
//! Hub 서비스가 사용하는 도메인 타입과 로직을 제공합니다.
//!
//! # 모듈 구조
//!
//! - `auth`: Access Token 서명, Refresh Token 재료, 비밀번호 해시
//! - `store`: Credential Store 트랜잭션 계약
//! - `identity`: Identity Directory
//! - `lifecycle`: Token Lifecycle Manager (발급/갱신/폐기)
//! - `session`: 요청 처리기용 연산 묶음
//! - `error`: 공통 에러 타입
//! - `id`, `clock`: 식별자와 시각

pub mod auth;
pub mod clock;
pub mod error;
pub mod id;
pub mod identity;
pub mod lifecycle;
pub mod session;
pub mod store;

pub use error::{Error, ErrorKind, Result};
pub use id::{IdentityRef, TokenId};
pub use lifecycle::{TokenManager, TokenPair, TokenTtl};
pub use session::SessionService;
