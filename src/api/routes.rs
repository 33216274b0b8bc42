use axum::routing::{get, post};
use axum::Router;

use crate::api::handlers::*;
use crate::server::ServerState;

/// API 라우터 생성
pub fn create_api_router() -> Router<ServerState> {
    Router::new()
        // 인증 API
        .route("/api/v1/auth/register", post(register))
        .route("/api/v1/auth/login", post(login))
        // 주문 API
        .route(
            "/api/v1/trading/orders",
            post(create_order).delete(cancel_order).get(list_orders),
        )
        .route("/api/v1/trading/orders/:id", get(get_order))
        // 시장 데이터 API
        .route("/api/v1/market/depth", get(get_depth))
        // 자산 API
        .route("/api/v1/asset/deposit", post(deposit))
        .route("/api/v1/asset/balances", get(get_balances))
}
