//! 매칭 엔진의 기본 모델
//!
//! 주문, 주문 유형, 매수/매도 방향, 주문 상태, 체결 기록 등
//! 매칭 엔진의 핵심 데이터 모델을 정의합니다.
//! 열거형은 와이어/DB에서 정수로 표현됩니다
//! (유형: 1-지정가, 2-시장가 / 방향: 1-매수, 2-매도 / 상태: 1~4).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ExchangeError;

/// 주문 유형
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderType {
  /// 지정가 주문 - 지정된 가격 이상/이하에서만 체결
  Limit = 1,
  /// 시장가 주문 - 호가 잔량을 즉시 소진, 주문장에 남지 않음
  Market = 2,
}

impl OrderType {
  pub fn as_i64(self) -> i64 {
    self as i64
  }
}

impl TryFrom<i64> for OrderType {
  type Error = ExchangeError;

  fn try_from(v: i64) -> Result<Self, Self::Error> {
    match v {
      1 => Ok(OrderType::Limit),
      2 => Ok(OrderType::Market),
      _ => Err(ExchangeError::InvalidOrderType),
    }
  }
}

/// 매수/매도 방향
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderSide {
  /// 매수 주문
  Buy = 1,
  /// 매도 주문
  Sell = 2,
}

impl OrderSide {
  pub fn as_i64(self) -> i64 {
    self as i64
  }

  /// 반대편 방향
  pub fn opposite(self) -> OrderSide {
    match self {
      OrderSide::Buy => OrderSide::Sell,
      OrderSide::Sell => OrderSide::Buy,
    }
  }
}

impl TryFrom<i64> for OrderSide {
  type Error = ExchangeError;

  fn try_from(v: i64) -> Result<Self, Self::Error> {
    match v {
      1 => Ok(OrderSide::Buy),
      2 => Ok(OrderSide::Sell),
      _ => Err(ExchangeError::InvalidOrderSide),
    }
  }
}

/// 주문 상태
///
/// 상태 전이: Pending → PartiallyFilled → Filled,
/// Pending/PartiallyFilled → Canceled. 종결 상태는 불변입니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
  /// 대기 (미체결)
  Pending = 1,
  /// 부분 체결
  PartiallyFilled = 2,
  /// 완전 체결 (종결)
  Filled = 3,
  /// 취소됨 (종결)
  Canceled = 4,
}

impl OrderStatus {
  pub fn as_i64(self) -> i64 {
    self as i64
  }

  /// 종결 상태 여부
  pub fn is_terminal(self) -> bool {
    matches!(self, OrderStatus::Filled | OrderStatus::Canceled)
  }
}

impl TryFrom<i64> for OrderStatus {
  type Error = ExchangeError;

  fn try_from(v: i64) -> Result<Self, Self::Error> {
    match v {
      1 => Ok(OrderStatus::Pending),
      2 => Ok(OrderStatus::PartiallyFilled),
      3 => Ok(OrderStatus::Filled),
      4 => Ok(OrderStatus::Canceled),
      _ => Err(ExchangeError::InvalidParams(format!(
        "알 수 없는 주문 상태: {}",
        v
      ))),
    }
  }
}

// 와이어 표현은 정수이므로 serde 구현은 i64를 거칩니다.
macro_rules! impl_int_serde {
  ($ty:ty) => {
    impl Serialize for $ty {
      fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.as_i64())
      }
    }

    impl<'de> Deserialize<'de> for $ty {
      fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let v = i64::deserialize(deserializer)?;
        <$ty>::try_from(v).map_err(|e| D::Error::custom(e.to_string()))
      }
    }
  };
}

impl_int_serde!(OrderType);
impl_int_serde!(OrderSide);
impl_int_serde!(OrderStatus);

/// 주문 정보
///
/// `amount`는 기초 통화 수량이며, 시장가 매수에서만 예외적으로
/// 총 지불 호가 통화 금액입니다. `filled_amount`도 같은 단위로 누적됩니다.
#[derive(Debug, Clone, Serialize)]
pub struct Order {
  /// 주문 ID (단조 증가)
  pub id: i64,
  /// 주문자 ID
  pub user_id: i64,
  /// 거래쌍 심볼 (예: "BTC/USDT")
  pub symbol: String,
  /// 주문 유형
  pub order_type: OrderType,
  /// 매수/매도 방향
  pub side: OrderSide,
  /// 주문 총 수량
  pub amount: Decimal,
  /// 주문 가격 (지정가 주문에만 존재)
  pub price: Option<Decimal>,
  /// 누적 체결 수량
  pub filled_amount: Decimal,
  /// 주문 상태
  pub status: OrderStatus,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Order {
  /// 남은 미체결 수량
  pub fn remaining(&self) -> Decimal {
    self.amount - self.filled_amount
  }

  /// 완전 체결 여부
  pub fn is_filled(&self) -> bool {
    self.filled_amount >= self.amount
  }

  /// 주문장에 남아 있을 수 있는 상태인지
  pub fn is_open(&self) -> bool {
    matches!(self.status, OrderStatus::Pending | OrderStatus::PartiallyFilled)
  }

  /// 체결 수량 반영
  ///
  /// 상태는 체결량에 따라 PartiallyFilled 또는 Filled로 전이됩니다.
  pub fn fill(&mut self, delta: Decimal) {
    self.filled_amount += delta;
    self.status = if self.is_filled() {
      OrderStatus::Filled
    } else {
      OrderStatus::PartiallyFilled
    };
  }
}

/// 체결 기록
///
/// 체결 가격은 항상 메이커(주문장에 있던 주문)의 가격입니다.
#[derive(Debug, Clone, Serialize)]
pub struct Trade {
  /// 체결 ID (저장 시 부여, 생성 직후에는 0)
  pub id: i64,
  pub symbol: String,
  pub buy_order_id: i64,
  pub sell_order_id: i64,
  pub buy_user_id: i64,
  pub sell_user_id: i64,
  /// 체결 가격 (= 메이커 가격)
  pub price: Decimal,
  /// 체결 수량 (기초 통화)
  pub amount: Decimal,
  pub created_at: DateTime<Utc>,
}

/// 매칭 결과
#[derive(Debug, Default)]
pub struct MatchResult {
  /// 생성된 체결 기록 (생성 순서 = 가격 우선, 레벨 내 FIFO)
  pub trades: Vec<Trade>,
  /// 상태가 변경된 주문 (부분 체결 메이커, 잔량이 주문장에 남은 테이커 등)
  pub updated: Vec<Order>,
  /// 완전 체결된 주문
  pub filled: Vec<Order>,
}

/// 주문장 스냅샷 (시장 깊이)
#[derive(Debug, Clone, Serialize)]
pub struct DepthSnapshot {
  pub symbol: String,
  /// 매수 호가 [(가격, 잔량 합계)] - 가격 내림차순
  pub bids: Vec<(Decimal, Decimal)>,
  /// 매도 호가 [(가격, 잔량 합계)] - 가격 오름차순
  pub asks: Vec<(Decimal, Decimal)>,
}
