use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow, SqliteSynchronous,
};
use sqlx::{Row, Sqlite, SqlitePool, Transaction};

use rotor_core::auth::{Invalidation, TokenDigest};
use rotor_core::store::{CredentialStore, IdentityRecord, StoreTx, TokenRecord};
use rotor_core::{Error, IdentityRef, Result, TokenId};

/// SQLite 기반 Credential Store
///
/// 프로세스 전역 풀 하나를 공유하고, 변경은 작업마다 새 트랜잭션으로 수행합니다.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// 연결 및 스키마 생성
    ///
    /// 쓰기는 `synchronous = FULL`로 디스크 반영까지 기다리며,
    /// 잠금 대기는 `write_timeout`을 넘지 않습니다.
    pub async fn connect(db_url: &str, write_timeout: Duration) -> anyhow::Result<Self> {
        let in_memory = db_url.contains(":memory:") || db_url.contains("mode=memory");

        let mut options = SqliteConnectOptions::from_str(db_url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(write_timeout)
            .synchronous(SqliteSynchronous::Full);
        if !in_memory {
            options = options.journal_mode(SqliteJournalMode::Wal);
        }

        // 인메모리 DB는 연결마다 별개이므로 연결 하나를 계속 유지
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };

        let pool = pool_options.connect_with(options).await?;
        let store = Self { pool };
        store.init().await?;
        Ok(store)
    }

    async fn init(&self) -> anyhow::Result<()> {
        let queries = [
            r#"CREATE TABLE IF NOT EXISTS identities (
                id TEXT PRIMARY KEY,
                first_name TEXT NOT NULL,
                last_name TEXT NOT NULL,
                password_hash TEXT NOT NULL,
                created_at INTEGER NOT NULL
            );"#,
            r#"CREATE TABLE IF NOT EXISTS token_pairs (
                id TEXT PRIMARY KEY,
                identity_id TEXT NOT NULL REFERENCES identities(id) ON DELETE CASCADE,
                access_token TEXT NOT NULL,
                token_hash BLOB NOT NULL UNIQUE,
                issued_at INTEGER NOT NULL,
                access_expires_at INTEGER NOT NULL,
                expires_at INTEGER NOT NULL,
                valid INTEGER NOT NULL,
                invalidated_by TEXT,
                invalidated_at INTEGER
            );"#,
            r#"CREATE INDEX IF NOT EXISTS token_pairs_identity ON token_pairs(identity_id);"#,
        ];

        for q in queries {
            sqlx::query(q).execute(&self.pool).await?;
        }

        Ok(())
    }

    /// 연결 확인
    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(store_err)?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl CredentialStore for SqliteStore {
    async fn begin(&self) -> Result<Box<dyn StoreTx>> {
        let tx = self.pool.begin().await.map_err(store_err)?;
        Ok(Box::new(SqliteTx { tx }))
    }
}

/// drop 시 커밋되지 않은 변경은 롤백됩니다.
struct SqliteTx {
    tx: Transaction<'static, Sqlite>,
}

#[async_trait]
impl StoreTx for SqliteTx {
    async fn insert_identity(&mut self, record: &IdentityRecord) -> Result<()> {
        sqlx::query(
            r#"INSERT INTO identities (id, first_name, last_name, password_hash, created_at)
               VALUES (?1, ?2, ?3, ?4, ?5)"#,
        )
        .bind(record.id.to_string())
        .bind(&record.first_name)
        .bind(&record.last_name)
        .bind(&record.password_hash)
        .bind(record.created_at.timestamp())
        .execute(&mut *self.tx)
        .await
        .map_err(store_err)?;
        Ok(())
    }

    async fn find_identity(&mut self, id: &IdentityRef) -> Result<Option<IdentityRecord>> {
        let row = sqlx::query(
            r#"SELECT id, first_name, last_name, password_hash, created_at
               FROM identities WHERE id = ?1"#,
        )
        .bind(id.to_string())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(store_err)?;

        row.map(|r| identity_from_row(&r)).transpose()
    }

    async fn identity_exists(&mut self, id: &IdentityRef) -> Result<bool> {
        let found = sqlx::query_scalar::<_, i64>(r#"SELECT 1 FROM identities WHERE id = ?1"#)
            .bind(id.to_string())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(store_err)?;
        Ok(found.is_some())
    }

    async fn find_token(&mut self, digest: &TokenDigest) -> Result<Option<TokenRecord>> {
        let row = sqlx::query(
            r#"SELECT id, identity_id, access_token, token_hash, issued_at, access_expires_at,
                      expires_at, valid, invalidated_by, invalidated_at
               FROM token_pairs WHERE token_hash = ?1"#,
        )
        .bind(digest.as_bytes())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(store_err)?;

        row.map(|r| token_from_row(&r)).transpose()
    }

    async fn insert_token(&mut self, record: &TokenRecord) -> Result<()> {
        sqlx::query(
            r#"INSERT INTO token_pairs (id, identity_id, access_token, token_hash, issued_at,
                                        access_expires_at, expires_at, valid, invalidated_by, invalidated_at)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"#,
        )
        .bind(record.id.as_str())
        .bind(record.identity.to_string())
        .bind(&record.access_token)
        .bind(record.token_hash.as_bytes())
        .bind(record.issued_at.timestamp())
        .bind(record.access_expires_at.timestamp())
        .bind(record.expires_at.timestamp())
        .bind(record.valid)
        .bind(record.invalidated_by.map(|r| r.as_str()))
        .bind(record.invalidated_at.map(|at| at.timestamp()))
        .execute(&mut *self.tx)
        .await
        .map_err(store_err)?;
        Ok(())
    }

    async fn invalidate_token(
        &mut self,
        digest: &TokenDigest,
        reason: Invalidation,
        at: DateTime<Utc>,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"UPDATE token_pairs SET valid = 0, invalidated_by = ?1, invalidated_at = ?2
               WHERE token_hash = ?3 AND valid = 1"#,
        )
        .bind(reason.as_str())
        .bind(at.timestamp())
        .bind(digest.as_bytes())
        .execute(&mut *self.tx)
        .await
        .map_err(store_err)?;
        Ok(result.rows_affected() == 1)
    }

    async fn delete_token(&mut self, digest: &TokenDigest) -> Result<bool> {
        let result = sqlx::query(r#"DELETE FROM token_pairs WHERE token_hash = ?1"#)
            .bind(digest.as_bytes())
            .execute(&mut *self.tx)
            .await
            .map_err(store_err)?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_tokens_for(&mut self, id: &IdentityRef) -> Result<u64> {
        let result = sqlx::query(r#"DELETE FROM token_pairs WHERE identity_id = ?1"#)
            .bind(id.to_string())
            .execute(&mut *self.tx)
            .await
            .map_err(store_err)?;
        Ok(result.rows_affected())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let SqliteTx { tx } = *self;
        tx.commit().await.map_err(store_err)
    }
}

fn store_err(e: sqlx::Error) -> Error {
    tracing::error!("Store error: {:?}", e);
    Error::store(e)
}

fn from_unix(secs: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0)
        .ok_or_else(|| Error::store(format!("stored timestamp out of range: {secs}")))
}

/// 저장된 ID가 손상된 경우는 입력 오류가 아니라 저장소 오류
fn stored_identity(raw: &str) -> Result<IdentityRef> {
    IdentityRef::parse(raw).map_err(|_| Error::store(format!("corrupt identity id in store: {raw}")))
}

fn identity_from_row(row: &SqliteRow) -> Result<IdentityRecord> {
    let id: String = row.try_get("id").map_err(store_err)?;
    let created_at: i64 = row.try_get("created_at").map_err(store_err)?;

    Ok(IdentityRecord {
        id: stored_identity(&id)?,
        first_name: row.try_get("first_name").map_err(store_err)?,
        last_name: row.try_get("last_name").map_err(store_err)?,
        password_hash: row.try_get("password_hash").map_err(store_err)?,
        created_at: from_unix(created_at)?,
    })
}

fn token_from_row(row: &SqliteRow) -> Result<TokenRecord> {
    let identity_id: String = row.try_get("identity_id").map_err(store_err)?;
    let token_hash: Vec<u8> = row.try_get("token_hash").map_err(store_err)?;
    let issued_at: i64 = row.try_get("issued_at").map_err(store_err)?;
    let access_expires_at: i64 = row.try_get("access_expires_at").map_err(store_err)?;
    let expires_at: i64 = row.try_get("expires_at").map_err(store_err)?;
    let invalidated_by: Option<String> = row.try_get("invalidated_by").map_err(store_err)?;
    let invalidated_at: Option<i64> = row.try_get("invalidated_at").map_err(store_err)?;

    let invalidated_by = match invalidated_by {
        Some(value) => Some(
            value
                .parse::<Invalidation>()
                .map_err(|_| Error::store(format!("unknown invalidation reason: {value}")))?,
        ),
        None => None,
    };

    Ok(TokenRecord {
        id: TokenId(row.try_get("id").map_err(store_err)?),
        identity: stored_identity(&identity_id)?,
        access_token: row.try_get("access_token").map_err(store_err)?,
        token_hash: TokenDigest::from_slice(&token_hash)?,
        issued_at: from_unix(issued_at)?,
        access_expires_at: from_unix(access_expires_at)?,
        expires_at: from_unix(expires_at)?,
        valid: row.try_get("valid").map_err(store_err)?,
        invalidated_by,
        invalidated_at: invalidated_at.map(from_unix).transpose()?,
    })
}
