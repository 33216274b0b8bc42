//! API 요청/응답 모델
//!
//! 와이어 규약: 금액은 항상 십진 문자열, 열거형은 정수,
//! 주문 시각은 RFC3339 문자열, 깊이 타임스탬프는 epoch 밀리초.

use serde::{Deserialize, Serialize};

use crate::db::models::{Balance, User};
use crate::matching::model::{DepthSnapshot, Order, OrderSide, OrderStatus, OrderType};
use crate::service::asset_service::DepositReceipt;
use crate::util::decimal;

/// 회원 가입 요청
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub nickname: String,
}

/// 사용자 응답 (비밀번호 해시 제외)
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub email: String,
    pub nickname: String,
    pub status: i64,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            nickname: user.nickname.clone(),
            status: user.status,
        }
    }
}

/// 로그인 요청
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// 로그인 응답
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserResponse,
}

/// 주문 생성 요청
#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub symbol: String,
    /// 1-지정가, 2-시장가
    #[serde(rename = "type")]
    pub order_type: i64,
    /// 1-매수, 2-매도
    pub side: i64,
    pub amount: String,
    pub price: Option<String>,
}

/// 주문 응답
#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub id: i64,
    pub user_id: i64,
    pub symbol: String,
    #[serde(rename = "type")]
    pub order_type: OrderType,
    pub side: OrderSide,
    pub amount: String,
    pub price: Option<String>,
    pub filled_amount: String,
    pub status: OrderStatus,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&Order> for OrderResponse {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id,
            user_id: order.user_id,
            symbol: order.symbol.clone(),
            order_type: order.order_type,
            side: order.side,
            amount: decimal::to_canonical(&order.amount),
            price: order.price.as_ref().map(decimal::to_canonical),
            filled_amount: decimal::to_canonical(&order.filled_amount),
            status: order.status,
            created_at: order.created_at.to_rfc3339(),
            updated_at: order.updated_at.to_rfc3339(),
        }
    }
}

/// 주문 취소 요청
#[derive(Debug, Deserialize)]
pub struct CancelOrderRequest {
    pub order_id: i64,
}

/// 기본 응답
#[derive(Debug, Serialize)]
pub struct BaseResponse {
    pub code: i64,
    pub message: String,
}

/// 주문 목록 조회 조건
#[derive(Debug, Deserialize)]
pub struct QueryOrdersRequest {
    pub symbol: Option<String>,
    pub status: Option<i64>,
    pub page: Option<i64>,
    pub size: Option<i64>,
}

/// 주문 목록 페이지 응답
#[derive(Debug, Serialize)]
pub struct PagedOrdersResponse {
    pub list: Vec<OrderResponse>,
    pub total: i64,
    pub page: i64,
    pub size: i64,
}

/// 시장 깊이 조회 조건
#[derive(Debug, Deserialize)]
pub struct DepthRequest {
    pub symbol: String,
    pub depth: Option<usize>,
}

/// 시장 깊이 응답 - [(가격, 잔량 합계)] 문자열 쌍
#[derive(Debug, Serialize)]
pub struct DepthResponse {
    pub symbol: String,
    pub bids: Vec<(String, String)>,
    pub asks: Vec<(String, String)>,
    pub timestamp: i64,
}

impl DepthResponse {
    pub fn from_snapshot(snapshot: &DepthSnapshot, timestamp_ms: i64) -> Self {
        let to_wire = |levels: &[(rust_decimal::Decimal, rust_decimal::Decimal)]| {
            levels
                .iter()
                .map(|(price, amount)| (decimal::to_canonical(price), decimal::to_canonical(amount)))
                .collect()
        };

        Self {
            symbol: snapshot.symbol.clone(),
            bids: to_wire(&snapshot.bids),
            asks: to_wire(&snapshot.asks),
            timestamp: timestamp_ms,
        }
    }
}

/// 입금 요청
#[derive(Debug, Deserialize)]
pub struct DepositRequest {
    pub currency: String,
    pub amount: String,
}

/// 입금 응답
#[derive(Debug, Serialize)]
pub struct DepositResponse {
    pub transaction_id: String,
    pub currency: String,
    pub amount: String,
    pub status: i64,
    pub created_at: String,
}

impl From<&DepositReceipt> for DepositResponse {
    fn from(receipt: &DepositReceipt) -> Self {
        Self {
            transaction_id: receipt.transaction_id.clone(),
            currency: receipt.currency.clone(),
            amount: decimal::to_canonical(&receipt.amount),
            status: receipt.status,
            created_at: receipt.created_at.to_rfc3339(),
        }
    }
}

/// 잔고 응답
#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    pub currency: String,
    pub available: String,
    pub frozen: String,
}

impl From<&Balance> for BalanceResponse {
    fn from(balance: &Balance) -> Self {
        Self {
            currency: balance.currency.clone(),
            available: decimal::to_canonical(&balance.available),
            frozen: decimal::to_canonical(&balance.frozen),
        }
    }
}
