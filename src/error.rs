//! 거래소 공통 에러 타입
//!
//! 모든 클라이언트 노출 에러는 `{code, message}` 형태로 직렬화되며,
//! HTTP 상태 코드 매핑도 여기서 결정합니다.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use log::error;
use serde::Serialize;
use thiserror::Error;

/// 거래소 전역 에러
#[derive(Debug, Error)]
pub enum ExchangeError {
    // 입력 검증
    #[error("잘못된 요청 파라미터입니다: {0}")]
    InvalidParams(String),
    #[error("숫자 형식이 올바르지 않습니다")]
    InvalidDecimal,
    #[error("주문 수량이 올바르지 않습니다")]
    InvalidAmount,
    #[error("지원하지 않는 주문 유형입니다")]
    InvalidOrderType,
    #[error("지원하지 않는 주문 방향입니다")]
    InvalidOrderSide,

    // 인증/인가
    #[error("인증이 필요합니다")]
    Unauthorized,
    #[error("접근 권한이 없습니다")]
    Forbidden,
    #[error("요청 한도를 초과했습니다")]
    RateLimited,
    #[error("로그인 실패가 너무 많습니다. 잠시 후 다시 시도해 주세요")]
    TooManyLoginAttempts,

    // 도메인
    #[error("거래쌍을 찾을 수 없습니다")]
    TradingPairNotFound,
    #[error("거래가 중지된 거래쌍입니다")]
    TradingPairDisabled,
    #[error("주문을 찾을 수 없습니다")]
    OrderNotFound,
    #[error("이미 취소된 주문입니다")]
    OrderAlreadyCanceled,
    #[error("이미 체결 완료된 주문입니다")]
    OrderAlreadyFilled,
    #[error("사용 가능한 잔고가 부족합니다")]
    InsufficientBalance,
    #[error("동결 잔고가 부족합니다")]
    InsufficientFrozen,
    #[error("잔고 정보를 찾을 수 없습니다")]
    BalanceNotFound,
    #[error("지원하지 않는 통화입니다")]
    CurrencyNotFound,

    // 사용자
    #[error("이미 등록된 이메일입니다")]
    UserExists,
    #[error("사용자를 찾을 수 없습니다")]
    UserNotFound,
    #[error("이메일 형식이 올바르지 않습니다")]
    InvalidEmail,
    #[error("비밀번호가 올바르지 않습니다")]
    InvalidPassword,
    #[error("비활성화된 계정입니다")]
    UserDisabled,

    // 시스템
    #[error("내부 서버 오류가 발생했습니다")]
    Internal,
    #[error("데이터베이스 오류")]
    Database(#[from] sqlx::Error),
}

impl ExchangeError {
    /// 클라이언트 노출용 에러 코드
    pub fn code(&self) -> &'static str {
        match self {
            ExchangeError::InvalidParams(_) => "INVALID_PARAMS",
            ExchangeError::InvalidDecimal => "INVALID_DECIMAL",
            ExchangeError::InvalidAmount => "INVALID_AMOUNT",
            ExchangeError::InvalidOrderType => "INVALID_ORDER_TYPE",
            ExchangeError::InvalidOrderSide => "INVALID_ORDER_SIDE",
            ExchangeError::Unauthorized => "UNAUTHORIZED",
            ExchangeError::Forbidden => "FORBIDDEN",
            ExchangeError::RateLimited => "RATE_LIMITED",
            ExchangeError::TooManyLoginAttempts => "TOO_MANY_LOGIN_ATTEMPTS",
            ExchangeError::TradingPairNotFound => "TRADING_PAIR_NOT_FOUND",
            ExchangeError::TradingPairDisabled => "TRADING_PAIR_DISABLED",
            ExchangeError::OrderNotFound => "ORDER_NOT_FOUND",
            ExchangeError::OrderAlreadyCanceled => "ORDER_ALREADY_CANCELED",
            ExchangeError::OrderAlreadyFilled => "ORDER_ALREADY_FILLED",
            ExchangeError::InsufficientBalance => "INSUFFICIENT_BALANCE",
            ExchangeError::InsufficientFrozen => "INSUFFICIENT_FROZEN",
            ExchangeError::BalanceNotFound => "BALANCE_NOT_FOUND",
            ExchangeError::CurrencyNotFound => "CURRENCY_NOT_FOUND",
            ExchangeError::UserExists => "USER_EXISTS",
            ExchangeError::UserNotFound => "USER_NOT_FOUND",
            ExchangeError::InvalidEmail => "INVALID_EMAIL",
            ExchangeError::InvalidPassword => "INVALID_PASSWORD",
            ExchangeError::UserDisabled => "USER_DISABLED",
            ExchangeError::Internal => "INTERNAL_SERVER",
            ExchangeError::Database(_) => "INTERNAL_SERVER",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            ExchangeError::InvalidParams(_)
            | ExchangeError::InvalidDecimal
            | ExchangeError::InvalidAmount
            | ExchangeError::InvalidOrderType
            | ExchangeError::InvalidOrderSide
            | ExchangeError::TradingPairDisabled
            | ExchangeError::OrderAlreadyCanceled
            | ExchangeError::OrderAlreadyFilled
            | ExchangeError::InsufficientBalance
            | ExchangeError::InsufficientFrozen
            | ExchangeError::CurrencyNotFound
            | ExchangeError::UserExists
            | ExchangeError::InvalidEmail => StatusCode::BAD_REQUEST,
            ExchangeError::Unauthorized | ExchangeError::InvalidPassword => {
                StatusCode::UNAUTHORIZED
            }
            ExchangeError::Forbidden | ExchangeError::UserDisabled => StatusCode::FORBIDDEN,
            ExchangeError::RateLimited | ExchangeError::TooManyLoginAttempts => {
                StatusCode::TOO_MANY_REQUESTS
            }
            ExchangeError::TradingPairNotFound
            | ExchangeError::OrderNotFound
            | ExchangeError::BalanceNotFound
            | ExchangeError::UserNotFound => StatusCode::NOT_FOUND,
            ExchangeError::Internal | ExchangeError::Database(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// 에러 응답 바디
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

impl IntoResponse for ExchangeError {
    fn into_response(self) -> Response {
        // 내부 오류 상세는 로그로만 남기고 클라이언트에는 일반 메시지 반환
        let message = match &self {
            ExchangeError::Database(e) => {
                error!("데이터베이스 오류: {}", e);
                ExchangeError::Internal.to_string()
            }
            other => other.to_string(),
        };

        let body = ErrorBody {
            code: self.code().to_string(),
            message,
        };

        (self.status(), Json(body)).into_response()
    }
}
