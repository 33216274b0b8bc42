//! DB 모델
//!
//! 테이블 행과 1:1로 대응하는 레코드 구조체와, 영속 계층이 소유하는
//! 도메인 엔티티(거래쌍, 잔고, 사용자, 자산 트랜잭션)를 정의합니다.
//! 금액 컬럼은 정밀도 손실을 피하기 위해 TEXT(십진 문자열)로 저장하고,
//! 레코드 → 도메인 변환 시 Decimal로 파싱합니다.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;

use crate::error::ExchangeError;
use crate::matching::model::{Order, OrderSide, OrderStatus, OrderType, Trade};
use crate::util::decimal;

/// DB에 저장된 십진 문자열 파싱
///
/// 저장 시점에 항상 정규화된 문자열을 쓰므로 실패는 데이터 손상을 뜻합니다.
fn parse_db_decimal(s: &str) -> Result<Decimal, ExchangeError> {
    decimal::parse(s).map_err(|_| {
        log::error!("DB 십진 문자열 손상: {}", s);
        ExchangeError::Internal
    })
}

/// 거래쌍 상태 (1-거래 가능, 2-거래 중지)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PairStatus {
    Active,
    Disabled,
}

impl PairStatus {
    pub fn as_i64(self) -> i64 {
        match self {
            PairStatus::Active => 1,
            PairStatus::Disabled => 2,
        }
    }
}

impl TryFrom<i64> for PairStatus {
    type Error = ExchangeError;

    fn try_from(v: i64) -> Result<Self, Self::Error> {
        match v {
            1 => Ok(PairStatus::Active),
            2 => Ok(PairStatus::Disabled),
            _ => Err(ExchangeError::Internal),
        }
    }
}

/// 주문 테이블 레코드
#[derive(Debug, Clone, FromRow)]
pub struct OrderRecord {
    pub id: i64,
    pub user_id: i64,
    pub symbol: String,
    #[sqlx(rename = "type")]
    pub order_type: i64,
    pub side: i64,
    pub amount: String,
    pub price: Option<String>,
    pub filled_amount: String,
    pub status: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrderRecord {
    /// 도메인 주문으로 변환
    pub fn into_order(self) -> Result<Order, ExchangeError> {
        Ok(Order {
            id: self.id,
            user_id: self.user_id,
            symbol: self.symbol,
            order_type: OrderType::try_from(self.order_type)?,
            side: OrderSide::try_from(self.side)?,
            amount: parse_db_decimal(&self.amount)?,
            price: match self.price {
                Some(ref p) => Some(parse_db_decimal(p)?),
                None => None,
            },
            filled_amount: parse_db_decimal(&self.filled_amount)?,
            status: OrderStatus::try_from(self.status)?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// 체결 테이블 레코드
#[derive(Debug, Clone, FromRow)]
pub struct TradeRecord {
    pub id: i64,
    pub symbol: String,
    pub buy_order_id: i64,
    pub sell_order_id: i64,
    pub buy_user_id: i64,
    pub sell_user_id: i64,
    pub price: String,
    pub amount: String,
    pub created_at: DateTime<Utc>,
}

impl TradeRecord {
    pub fn into_trade(self) -> Result<Trade, ExchangeError> {
        Ok(Trade {
            id: self.id,
            symbol: self.symbol,
            buy_order_id: self.buy_order_id,
            sell_order_id: self.sell_order_id,
            buy_user_id: self.buy_user_id,
            sell_user_id: self.sell_user_id,
            price: parse_db_decimal(&self.price)?,
            amount: parse_db_decimal(&self.amount)?,
            created_at: self.created_at,
        })
    }
}

/// 거래쌍 설정
#[derive(Debug, Clone)]
pub struct TradingPair {
    pub id: i64,
    /// 심볼, 형식: 기초통화/호가통화 (예: BTC/USDT)
    pub symbol: String,
    pub base_currency: String,
    pub quote_currency: String,
    /// 단일 주문 최소 수량
    pub min_amount: Decimal,
    /// 단일 주문 최대 수량
    pub max_amount: Decimal,
    /// 가격 소수점 자릿수
    pub price_scale: u32,
    /// 수량 소수점 자릿수
    pub amount_scale: u32,
    pub status: PairStatus,
}

/// 거래쌍 테이블 레코드
#[derive(Debug, Clone, FromRow)]
pub struct TradingPairRecord {
    pub id: i64,
    pub symbol: String,
    pub base_currency: String,
    pub quote_currency: String,
    pub min_amount: String,
    pub max_amount: String,
    pub price_scale: i64,
    pub amount_scale: i64,
    pub status: i64,
}

impl TradingPairRecord {
    pub fn into_pair(self) -> Result<TradingPair, ExchangeError> {
        Ok(TradingPair {
            id: self.id,
            symbol: self.symbol,
            base_currency: self.base_currency,
            quote_currency: self.quote_currency,
            min_amount: parse_db_decimal(&self.min_amount)?,
            max_amount: parse_db_decimal(&self.max_amount)?,
            price_scale: self.price_scale as u32,
            amount_scale: self.amount_scale as u32,
            status: PairStatus::try_from(self.status)?,
        })
    }
}

/// 사용자 잔고 ((사용자, 통화) 단위)
#[derive(Debug, Clone)]
pub struct Balance {
    pub user_id: i64,
    pub currency: String,
    /// 사용 가능 잔고
    pub available: Decimal,
    /// 동결 잔고 (미체결 주문에 잡혀 있는 금액)
    pub frozen: Decimal,
}

/// 잔고 테이블 레코드
#[derive(Debug, Clone, FromRow)]
pub struct BalanceRecord {
    pub user_id: i64,
    pub currency: String,
    pub available: String,
    pub frozen: String,
}

impl BalanceRecord {
    pub fn into_balance(self) -> Result<Balance, ExchangeError> {
        Ok(Balance {
            user_id: self.user_id,
            currency: self.currency,
            available: parse_db_decimal(&self.available)?,
            frozen: parse_db_decimal(&self.frozen)?,
        })
    }
}

/// 사용자 (비밀번호는 bcrypt 해시)
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub password: String,
    pub nickname: String,
    /// 1-정상, 2-비활성화
    pub status: i64,
    pub created_at: DateTime<Utc>,
}

/// 자산 트랜잭션 기록 (type: 1-입금, 2-출금)
#[derive(Debug, Clone, FromRow)]
pub struct AssetTransaction {
    pub id: i64,
    pub user_id: i64,
    /// 외부 참조용 트랜잭션 ID
    pub transaction_id: String,
    pub currency: String,
    #[sqlx(rename = "type")]
    pub tx_type: i64,
    pub amount: String,
    pub fee: String,
    /// 1-처리중, 2-성공, 3-실패
    pub status: i64,
    pub remark: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
