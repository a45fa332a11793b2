//! Hub 설정

use std::env;
use std::fmt;
use std::time::Duration;

use rotor_core::TokenTtl;

/// Hub 설정
#[derive(Clone)]
pub struct Config {
    /// 서버 포트
    pub port: u16,

    /// SQLite 연결 URL
    pub db_url: String,

    /// Access Token 서명 비밀값
    pub signing_secret: String,

    /// Access Token 수명 (초)
    pub access_ttl_secs: i64,

    /// Refresh Token 수명 (초)
    pub refresh_ttl_secs: i64,

    /// 쓰기 잠금 대기 한도
    pub write_timeout: Duration,

    /// 요청 하나가 저장소 작업에 쓸 수 있는 시간
    pub request_timeout: Duration,
}

impl Config {
    /// 환경변수에서 설정 로드
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// 임의의 조회 함수에서 설정 로드
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let signing_secret = lookup("ROTOR_SIGNING_SECRET")
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| anyhow::anyhow!("ROTOR_SIGNING_SECRET must be set"))?;

        let config = Self {
            port: var("ROTOR_HUB_PORT", "4000").parse()?,

            db_url: var("ROTOR_DB_URL", "sqlite://rotor.db"),

            signing_secret,

            access_ttl_secs: var("ROTOR_ACCESS_TTL_SECS", "900").parse()?,

            refresh_ttl_secs: var("ROTOR_REFRESH_TTL_SECS", "2592000").parse()?,

            write_timeout: Duration::from_millis(var("ROTOR_WRITE_TIMEOUT_MS", "1000").parse()?),

            request_timeout: Duration::from_millis(
                var("ROTOR_REQUEST_TIMEOUT_MS", "5000").parse()?,
            ),
        };

        // TTL 범위는 시작 시점에 확인
        config.token_ttl()?;
        Ok(config)
    }

    pub fn token_ttl(&self) -> rotor_core::Result<TokenTtl> {
        TokenTtl::from_secs(self.access_ttl_secs, self.refresh_ttl_secs)
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("port", &self.port)
            .field("db_url", &self.db_url)
            .field("signing_secret", &"<redacted>")
            .field("access_ttl_secs", &self.access_ttl_secs)
            .field("refresh_ttl_secs", &self.refresh_ttl_secs)
            .field("write_timeout", &self.write_timeout)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}
