//! Identity Directory
//!
//! Identity 등록, 존재 확인, 비밀번호 검증을 담당합니다.
//! 평문 비밀번호는 저장하지 않으며, 해시 연산은 블로킹 풀에서 수행합니다.

use std::sync::Arc;

use tokio::time::Instant;

use crate::auth::{hash_password, verify_password};
use crate::clock::{Clock, SystemClock};
use crate::error::{Error, Result};
use crate::id::IdentityRef;
use crate::store::{with_deadline, CredentialStore, IdentityRecord};

/// 이름 필드 최대 길이
const MAX_NAME_LEN: usize = 128;

pub struct IdentityDirectory {
    store: Arc<dyn CredentialStore>,
    clock: Arc<dyn Clock>,
}

impl IdentityDirectory {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// 새 Identity 등록
    pub async fn register(
        &self,
        first_name: &str,
        last_name: &str,
        password: &str,
        deadline: Instant,
    ) -> Result<IdentityRef> {
        let first_name = validate_name("first name", first_name)?;
        let last_name = validate_name("last name", last_name)?;
        if password.is_empty() {
            return Err(Error::validation("password must not be empty"));
        }

        let plaintext = password.to_owned();
        let password_hash = tokio::task::spawn_blocking(move || hash_password(&plaintext))
            .await
            .map_err(Error::internal)??;

        let record = IdentityRecord {
            id: IdentityRef::generate(),
            first_name,
            last_name,
            password_hash,
            created_at: self.clock.now(),
        };

        with_deadline("register", deadline, async {
            let mut tx = self.store.begin().await?;
            tx.insert_identity(&record).await?;
            tx.commit().await
        })
        .await?;

        tracing::info!(
            identity = %record.id,
            "Registered {} {}",
            record.first_name,
            record.last_name
        );
        Ok(record.id)
    }

    /// Identity 존재 여부
    pub async fn exists(&self, id: &IdentityRef, deadline: Instant) -> Result<bool> {
        with_deadline("identity_exists", deadline, async {
            let mut tx = self.store.begin().await?;
            tx.identity_exists(id).await
        })
        .await
    }

    /// 비밀번호 검증
    ///
    /// Identity가 없으면 `IdentityNotFound`, 불일치는 `Ok(false)`입니다.
    pub async fn verify_password(
        &self,
        id: &IdentityRef,
        password: &str,
        deadline: Instant,
    ) -> Result<bool> {
        let record = with_deadline("find_identity", deadline, async {
            let mut tx = self.store.begin().await?;
            tx.find_identity(id).await
        })
        .await?
        .ok_or_else(|| Error::IdentityNotFound {
            identity: id.to_string(),
        })?;

        let plaintext = password.to_owned();
        tokio::task::spawn_blocking(move || verify_password(&record.password_hash, &plaintext))
            .await
            .map_err(Error::internal)?
    }
}

fn validate_name(field: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::validation(format!("{field} must not be empty")));
    }
    if trimmed.chars().count() > MAX_NAME_LEN {
        return Err(Error::validation(format!(
            "{field} longer than {MAX_NAME_LEN} characters"
        )));
    }
    Ok(trimmed.to_string())
}
