//! rotor-hub: 토큰 발급 HTTP 서비스
//!
//! SQLite 저장소 위에서 등록, 인증, 갱신, 폐기 엔드포인트를 제공합니다.

use std::sync::Arc;

use axum::{
    middleware::from_fn,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod state;

pub use config::Config;
pub use db::SqliteStore;
pub use state::AppState;

/// 라우터 생성
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Token endpoints
        .route("/register", post(handlers::auth::register))
        .route("/auth", post(handlers::auth::authenticate))
        .route("/refresh", post(handlers::auth::refresh))
        .route("/revoke", post(handlers::auth::revoke))
        .route("/delete", post(handlers::auth::delete))
        .route("/deleteAll", post(handlers::auth::delete_all))
        .route("/me", get(handlers::auth::me))
        // Health check
        .route("/health", get(handlers::health::health_check))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(from_fn(middleware::request_id))
        // State
        .with_state(state)
}
