//! Hub 앱 상태

use std::sync::Arc;

use tokio::time::Instant;

use rotor_core::auth::SecretSigner;
use rotor_core::clock::{Clock, SystemClock};
use rotor_core::identity::IdentityDirectory;
use rotor_core::store::CredentialStore;
use rotor_core::{SessionService, TokenManager};

use crate::config::Config;
use crate::db::SqliteStore;

/// 앱 상태
///
/// 모든 핸들러에서 공유하는 상태입니다.
pub struct AppState {
    /// 설정
    pub config: Config,

    /// 저장소 (health check, 종료 시 정리용)
    pub store: SqliteStore,

    /// 세션 연산
    pub sessions: SessionService,
}

impl AppState {
    /// 새 상태 생성 (저장소 연결 포함)
    pub async fn new(config: &Config) -> anyhow::Result<Self> {
        let store = SqliteStore::connect(&config.db_url, config.write_timeout).await?;
        tracing::info!("Connected to store at {}", config.db_url);
        Self::from_parts(config.clone(), store, Arc::new(SystemClock))
    }

    /// 이미 연결된 저장소와 시계로 상태 구성
    pub fn from_parts(
        config: Config,
        store: SqliteStore,
        clock: Arc<dyn Clock>,
    ) -> anyhow::Result<Self> {
        let signer = Arc::new(SecretSigner::new(config.signing_secret.as_bytes())?);
        let ttl = config.token_ttl()?;
        let shared: Arc<dyn CredentialStore> = Arc::new(store.clone());

        let directory = IdentityDirectory::new(shared.clone()).with_clock(clock.clone());
        let tokens = TokenManager::new(shared, signer, ttl).with_clock(clock);

        Ok(Self {
            config,
            store,
            sessions: SessionService::new(directory, tokens),
        })
    }

    /// 현재 요청의 저장소 작업 마감 시각
    pub fn deadline(&self) -> Instant {
        Instant::now() + self.config.request_timeout
    }
}
