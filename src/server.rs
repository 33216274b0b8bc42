//! 서버 조립 및 기동
//!
//! 상태(엔진, 서비스, 설정)를 구성하고 axum 라우터에 CORS/추적/속도 제한
//! 레이어를 얹어 기동합니다. Redis는 선택적이며 연결 실패 시 속도 제한
//! 없이 계속 실행합니다.

use std::sync::Arc;

use axum::middleware;
use log::{info, warn};
use redis::aio::MultiplexedConnection;
use sqlx::sqlite::SqlitePool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api::create_api_router;
use crate::api::rate_limit::rate_limit;
use crate::config::AppConfig;
use crate::db;
use crate::db::repository::{TradingPairRepository, UserRepository};
use crate::matching::engine::MatchingEngine;
use crate::service::asset_service::AssetService;
use crate::service::auth_service::AuthService;
use crate::service::order_service::OrderService;
use crate::service::pair_cache::PairCache;

/// 서버 상태
#[derive(Clone)]
pub struct ServerState {
    pub config: AppConfig,
    pub db_pool: SqlitePool,
    pub engine: Arc<MatchingEngine>,
    pub order_service: Arc<OrderService>,
    pub asset_service: Arc<AssetService>,
    pub auth_service: Arc<AuthService>,
    pub redis: Option<MultiplexedConnection>,
}

/// 서버 상태 구성
pub async fn build_state(config: AppConfig, db_pool: SqlitePool) -> ServerState {
    let engine = Arc::new(MatchingEngine::new());
    let pairs = Arc::new(PairCache::new(TradingPairRepository::new(db_pool.clone())));

    let order_service = Arc::new(OrderService::new(
        db_pool.clone(),
        engine.clone(),
        pairs.clone(),
    ));
    let asset_service = Arc::new(AssetService::new(db_pool.clone()));

    // 속도 제한과 로그인 실패 제한이 같은 Redis 연결을 공유
    let redis = connect_redis(&config).await;
    let auth_service = Arc::new(AuthService::new(
        UserRepository::new(db_pool.clone()),
        config.auth.clone(),
        redis.clone(),
    ));

    ServerState {
        config,
        db_pool,
        engine,
        order_service,
        asset_service,
        auth_service,
        redis,
    }
}

/// Redis 연결 시도 (실패해도 서버는 계속 실행)
async fn connect_redis(config: &AppConfig) -> Option<MultiplexedConnection> {
    let url = config.redis_url.as_ref()?;

    match redis::Client::open(url.as_str()) {
        Ok(client) => match client.get_multiplexed_async_connection().await {
            Ok(conn) => {
                info!("Redis 연결 완료: {}", url);
                Some(conn)
            }
            Err(e) => {
                warn!("Redis 연결 실패: {} (속도 제한 없이 계속 실행)", e);
                None
            }
        },
        Err(e) => {
            warn!("Redis URL 오류: {} (속도 제한 없이 계속 실행)", e);
            None
        }
    }
}

/// 서버 시작
pub async fn start_server(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let db_pool = db::init_database(&config.data_source).await?;
    let state = build_state(config.clone(), db_pool).await;

    let app = create_api_router()
        .layer(middleware::from_fn_with_state(state.clone(), rate_limit))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("xchange 서버 시작: {}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
