//! HTTP 핸들러
//!
//! 요청 역직렬화와 응답 변환만 담당하고, 검증과 상태 변경은 전부
//! 서비스 계층에 맡깁니다.

use axum::extract::{Path, Query, State};
use axum::response::Json;
use chrono::Utc;

use crate::api::auth::AuthUser;
use crate::api::models::*;
use crate::error::ExchangeError;
use crate::server::ServerState;
use crate::service::order_service::{OrderQuery, PlaceOrder};

/// 회원 가입 핸들러
pub async fn register(
    State(state): State<ServerState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<UserResponse>, ExchangeError> {
    let user = state
        .auth_service
        .register(&payload.email, &payload.password, &payload.nickname)
        .await?;

    Ok(Json(UserResponse::from(&user)))
}

/// 로그인 핸들러
pub async fn login(
    State(state): State<ServerState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ExchangeError> {
    let (token, user) = state
        .auth_service
        .login(&payload.email, &payload.password)
        .await?;

    Ok(Json(LoginResponse {
        token,
        user: UserResponse::from(&user),
    }))
}

/// 주문 생성 핸들러
pub async fn create_order(
    State(state): State<ServerState>,
    auth: AuthUser,
    Json(payload): Json<CreateOrderRequest>,
) -> Result<Json<OrderResponse>, ExchangeError> {
    let req = PlaceOrder {
        symbol: payload.symbol,
        order_type: payload.order_type,
        side: payload.side,
        amount: payload.amount,
        price: payload.price,
    };

    let order = state.order_service.place_order(auth.user_id, &req).await?;
    Ok(Json(OrderResponse::from(&order)))
}

/// 주문 취소 핸들러
pub async fn cancel_order(
    State(state): State<ServerState>,
    auth: AuthUser,
    Json(payload): Json<CancelOrderRequest>,
) -> Result<Json<BaseResponse>, ExchangeError> {
    state
        .order_service
        .cancel_order(auth.user_id, payload.order_id)
        .await?;

    Ok(Json(BaseResponse {
        code: 0,
        message: "주문이 취소되었습니다".to_string(),
    }))
}

/// 주문 목록 조회 핸들러
pub async fn list_orders(
    State(state): State<ServerState>,
    auth: AuthUser,
    Query(params): Query<QueryOrdersRequest>,
) -> Result<Json<PagedOrdersResponse>, ExchangeError> {
    let page = params.page.unwrap_or(1);
    let size = params.size.unwrap_or(20);
    let query = OrderQuery {
        symbol: params.symbol,
        status: params.status,
        page,
        size,
    };

    let (orders, total) = state.order_service.list_orders(auth.user_id, &query).await?;

    Ok(Json(PagedOrdersResponse {
        list: orders.iter().map(OrderResponse::from).collect(),
        total,
        page: page.max(1),
        size: size.clamp(1, 100),
    }))
}

/// 단일 주문 조회 핸들러
pub async fn get_order(
    State(state): State<ServerState>,
    auth: AuthUser,
    Path(order_id): Path<i64>,
) -> Result<Json<OrderResponse>, ExchangeError> {
    let order = state.order_service.get_order(auth.user_id, order_id).await?;
    Ok(Json(OrderResponse::from(&order)))
}

/// 시장 깊이 조회 핸들러 (인증 불필요)
pub async fn get_depth(
    State(state): State<ServerState>,
    Query(params): Query<DepthRequest>,
) -> Result<Json<DepthResponse>, ExchangeError> {
    let levels = params.depth.unwrap_or(20).min(100);
    let snapshot = state.order_service.depth(&params.symbol, levels).await?;

    Ok(Json(DepthResponse::from_snapshot(
        &snapshot,
        Utc::now().timestamp_millis(),
    )))
}

/// 입금 핸들러
pub async fn deposit(
    State(state): State<ServerState>,
    auth: AuthUser,
    Json(payload): Json<DepositRequest>,
) -> Result<Json<DepositResponse>, ExchangeError> {
    let receipt = state
        .asset_service
        .deposit(auth.user_id, &payload.currency, &payload.amount)
        .await?;

    Ok(Json(DepositResponse::from(&receipt)))
}

/// 잔고 조회 핸들러
pub async fn get_balances(
    State(state): State<ServerState>,
    auth: AuthUser,
) -> Result<Json<Vec<BalanceResponse>>, ExchangeError> {
    let balances = state.asset_service.list_balances(auth.user_id).await?;
    Ok(Json(balances.iter().map(BalanceResponse::from).collect()))
}
