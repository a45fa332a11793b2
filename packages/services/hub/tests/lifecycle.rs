//! 토큰 수명주기 통합 테스트 (SQLite + 수동 시계)

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use tokio::time::Instant;

use rotor_core::auth::{Invalidation, RefreshToken, SecretSigner};
use rotor_core::clock::ManualClock;
use rotor_core::identity::IdentityDirectory;
use rotor_core::store::CredentialStore;
use rotor_core::{Error, ErrorKind, IdentityRef, SessionService, TokenManager, TokenTtl};
use rotor_hub::SqliteStore;

const ACCESS_TTL: i64 = 60;
const REFRESH_TTL: i64 = 3600;

struct Harness {
    store: SqliteStore,
    clock: ManualClock,
    sessions: Arc<SessionService>,
}

async fn harness() -> Harness {
    harness_at("sqlite::memory:").await
}

async fn harness_at(db_url: &str) -> Harness {
    let store = SqliteStore::connect(db_url, Duration::from_secs(1))
        .await
        .unwrap();
    let clock = ManualClock::new(DateTime::from_timestamp(1_700_000_000, 0).unwrap());
    let shared: Arc<dyn CredentialStore> = Arc::new(store.clone());
    let signer = Arc::new(SecretSigner::new("test-signing-secret").unwrap());
    let ttl = TokenTtl::from_secs(ACCESS_TTL, REFRESH_TTL).unwrap();

    let directory = IdentityDirectory::new(shared.clone()).with_clock(Arc::new(clock.clone()));
    let tokens = TokenManager::new(shared, signer, ttl).with_clock(Arc::new(clock.clone()));

    Harness {
        store,
        clock,
        sessions: Arc::new(SessionService::new(directory, tokens)),
    }
}

fn deadline() -> Instant {
    Instant::now() + Duration::from_secs(10)
}

async fn ann(h: &Harness) -> IdentityRef {
    h.sessions
        .register("Ann", "Lee", "secret1", deadline())
        .await
        .unwrap()
}

#[tokio::test]
async fn test_register_and_authenticate() {
    let h = harness().await;
    let id = ann(&h).await;
    assert!(h.sessions.directory().exists(&id, deadline()).await.unwrap());

    let pair = h
        .sessions
        .authenticate(&id, "secret1", deadline())
        .await
        .unwrap();
    assert_eq!(pair.identity, id);
    assert!(pair.valid);
    assert_eq!(pair.expires_at, pair.issued_at + ChronoDuration::seconds(REFRESH_TTL));

    let err = h
        .sessions
        .authenticate(&id, "wrong", deadline())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::BadCredential));
    assert_eq!(err.kind(), ErrorKind::BadCredential);

    // 실패한 인증은 토큰을 만들지 않음
    assert_eq!(h.sessions.revoke_all(&id, deadline()).await.unwrap(), 1);
}

#[tokio::test]
async fn test_unknown_identity() {
    let h = harness().await;
    let stranger = IdentityRef::generate();
    assert!(!h.sessions.directory().exists(&stranger, deadline()).await.unwrap());

    let err = h.sessions.tokens().issue(&stranger, deadline()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = h
        .sessions
        .authenticate(&stranger, "secret1", deadline())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = h.sessions.revoke_all(&stranger, deadline()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_refresh_token_is_single_use() {
    let h = harness().await;
    let id = ann(&h).await;
    let first = h.sessions.tokens().issue(&id, deadline()).await.unwrap();

    h.clock.advance(ChronoDuration::seconds(5));
    let second = h
        .sessions
        .renew(&first.refresh_token, deadline())
        .await
        .unwrap();
    assert_ne!(second.refresh_token, first.refresh_token);
    assert_ne!(second.token_id, first.token_id);
    assert_eq!(second.identity, id);
    assert_eq!(second.issued_at, first.issued_at + ChronoDuration::seconds(5));

    let replay = h
        .sessions
        .renew(&first.refresh_token, deadline())
        .await
        .unwrap_err();
    assert!(matches!(
        replay,
        Error::Invalidated {
            reason: Invalidation::Consumed,
            ..
        }
    ));
    assert_eq!(replay.kind(), ErrorKind::Invalidated);

    // 새 토큰은 계속 사용 가능
    h.sessions
        .renew(&second.refresh_token, deadline())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_expired_refresh_token() {
    let h = harness().await;
    let id = ann(&h).await;
    let pair = h.sessions.tokens().issue(&id, deadline()).await.unwrap();

    h.clock.advance(ChronoDuration::seconds(REFRESH_TTL + 1));
    let err = h
        .sessions
        .renew(&pair.refresh_token, deadline())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Expired);
}

#[tokio::test]
async fn test_renew_at_expiry_boundary() {
    let h = harness().await;
    let id = ann(&h).await;
    let pair = h.sessions.tokens().issue(&id, deadline()).await.unwrap();

    // 만료 시각 정각은 아직 유효
    h.clock.advance(ChronoDuration::seconds(REFRESH_TTL));
    h.sessions
        .renew(&pair.refresh_token, deadline())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_revoke() {
    let h = harness().await;
    let id = ann(&h).await;
    let pair = h.sessions.tokens().issue(&id, deadline()).await.unwrap();

    h.sessions
        .revoke(&pair.refresh_token, deadline())
        .await
        .unwrap();
    // 두 번째 폐기도 성공
    h.sessions
        .revoke(&pair.refresh_token, deadline())
        .await
        .unwrap();

    let err = h
        .sessions
        .renew(&pair.refresh_token, deadline())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Invalidated {
            reason: Invalidation::Revoked,
            ..
        }
    ));

    let unknown = RefreshToken::generate();
    let err = h.sessions.revoke(&unknown, deadline()).await.unwrap_err();
    assert!(matches!(err, Error::TokenNotFound));
}

#[tokio::test]
async fn test_revoke_all_removes_every_pair() {
    let h = harness().await;
    let id = ann(&h).await;
    let other = h
        .sessions
        .register("Bo", "Kim", "secret2", deadline())
        .await
        .unwrap();

    let mut pairs = Vec::new();
    for _ in 0..3 {
        pairs.push(h.sessions.tokens().issue(&id, deadline()).await.unwrap());
    }
    let kept = h.sessions.tokens().issue(&other, deadline()).await.unwrap();

    let deleted = h.sessions.revoke_all(&id, deadline()).await.unwrap();
    assert_eq!(deleted, 3);

    for pair in &pairs {
        let err = h
            .sessions
            .renew(&pair.refresh_token, deadline())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    // 다른 Identity의 토큰은 영향 없음
    h.sessions
        .renew(&kept.refresh_token, deadline())
        .await
        .unwrap();

    // 토큰이 없어도 성공
    assert_eq!(h.sessions.revoke_all(&id, deadline()).await.unwrap(), 0);
}

#[tokio::test]
async fn test_delete_single_pair() {
    let h = harness().await;
    let id = ann(&h).await;
    let pair = h.sessions.tokens().issue(&id, deadline()).await.unwrap();

    h.sessions
        .delete(&pair.refresh_token, deadline())
        .await
        .unwrap();
    assert_eq!(h.sessions.revoke_all(&id, deadline()).await.unwrap(), 0);

    let err = h
        .sessions
        .delete(&pair.refresh_token, deadline())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::TokenNotFound));
}

#[tokio::test]
async fn test_concurrent_renewal_has_one_winner() {
    let h = harness().await;
    let id = ann(&h).await;
    let pair = h.sessions.tokens().issue(&id, deadline()).await.unwrap();

    let (a, b) = tokio::join!(
        h.sessions.renew(&pair.refresh_token, deadline()),
        h.sessions.renew(&pair.refresh_token, deadline()),
    );

    let outcomes = [a, b];
    let winners = outcomes.iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1);
    let loser = outcomes.iter().find_map(|r| r.as_ref().err()).unwrap();
    assert_eq!(loser.kind(), ErrorKind::Invalidated);

    // 원래 쌍 + 승자의 새 쌍
    assert_eq!(h.sessions.revoke_all(&id, deadline()).await.unwrap(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_renewal_on_shared_file_store() {
    let dir = tempfile::tempdir().unwrap();
    let db_url = format!("sqlite://{}", dir.path().join("rotor.db").display());
    let h = harness_at(&db_url).await;
    let id = ann(&h).await;
    let pair = h.sessions.tokens().issue(&id, deadline()).await.unwrap();

    // WAL + 연결 여러 개: 갱신들이 실제로 겹쳐 실행됨
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let sessions = h.sessions.clone();
            let presented = pair.refresh_token.clone();
            tokio::spawn(async move { sessions.renew(&presented, deadline()).await })
        })
        .collect();

    let mut winners = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(renewed) => {
                winners += 1;
                assert_eq!(renewed.identity, id);
            }
            Err(e) => assert!(
                matches!(e.kind(), ErrorKind::Invalidated | ErrorKind::StoreError),
                "unexpected loser error: {e:?}"
            ),
        }
    }
    assert_eq!(winners, 1);

    let err = h
        .sessions
        .renew(&pair.refresh_token, deadline())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Invalidated);

    assert_eq!(h.sessions.revoke_all(&id, deadline()).await.unwrap(), 2);
    h.store.close().await;
}

#[tokio::test]
async fn test_access_token_claims() {
    let h = harness().await;
    let id = ann(&h).await;
    let pair = h.sessions.tokens().issue(&id, deadline()).await.unwrap();

    let claims = h.sessions.introspect(&pair.access_token).unwrap();
    assert_eq!(claims.identity().unwrap(), id);
    assert_eq!(claims.issued_at().unwrap(), pair.issued_at);
    assert_eq!(claims.exp - claims.iat, ACCESS_TTL);
    assert_eq!(claims.expires_at().unwrap(), pair.access_expires_at);

    h.clock.advance(ChronoDuration::seconds(ACCESS_TTL + 1));
    let err = h.sessions.introspect(&pair.access_token).unwrap_err();
    assert!(matches!(err, Error::AccessTokenExpired { .. }));

    let foreign = SecretSigner::new("another-secret").unwrap();
    let now: DateTime<Utc> = h.sessions.tokens().now();
    let forged = foreign
        .sign(&id, now, now + ChronoDuration::seconds(ACCESS_TTL))
        .unwrap();
    let err = h.sessions.introspect(&forged).unwrap_err();
    assert!(matches!(err, Error::InvalidAccessToken { .. }));
}

#[tokio::test]
async fn test_deadline_aborts_without_changes() {
    let h = harness().await;
    let id = ann(&h).await;
    let pair = h.sessions.tokens().issue(&id, deadline()).await.unwrap();

    // 유일한 연결을 점유한 상태에서는 새 트랜잭션을 시작할 수 없음
    let held = h.store.begin().await.unwrap();
    let short = Instant::now() + Duration::from_millis(100);
    let err = h
        .sessions
        .renew(&pair.refresh_token, short)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::DeadlineExceeded { .. }));
    assert!(err.kind().is_transient());
    drop(held);

    // 실패한 갱신은 기존 토큰을 소비하지 않음
    h.sessions
        .renew(&pair.refresh_token, deadline())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_scenario_ann_lee() {
    let h = harness().await;
    let guid = ann(&h).await;

    let first = h
        .sessions
        .authenticate(&guid, "secret1", deadline())
        .await
        .unwrap();
    let renewed = h
        .sessions
        .renew(&first.refresh_token, deadline())
        .await
        .unwrap();
    assert!(h
        .sessions
        .renew(&first.refresh_token, deadline())
        .await
        .is_err());

    assert_eq!(h.sessions.revoke_all(&guid, deadline()).await.unwrap(), 2);
    let err = h
        .sessions
        .renew(&renewed.refresh_token, deadline())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}
