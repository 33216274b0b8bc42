//! 매칭 엔진 구현
//!
//! 가격-시간 우선순위로 체결합니다: 반대편 최우선 가격 레벨의 머리 주문이
//! 메이커 후보이며, 체결 가격은 항상 메이커의 가격입니다.
//!
//! `submit`은 순수 인메모리 연산으로 I/O를 하지 않으며, 비즈니스 오류를
//! 만들지 않습니다. 손상된 입력(가격 없는 지정가 등)이나 주문장 불일치는
//! 버그이므로 패닉합니다. 정산 실패 시 주문장을 제출 이전 상태로 되돌릴 수
//! 있도록 되돌리기 로그를 함께 돌려줍니다.

use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use log::debug;
use rust_decimal::Decimal;
use tokio::sync::RwLock;

use crate::matching::model::{DepthSnapshot, MatchResult, Order, OrderSide, OrderStatus, OrderType, Trade};
use crate::matching::order_book::OrderBook;
use crate::util::decimal;

/// 주문장 되돌리기 연산
///
/// `submit`이 주문장을 건드린 순서대로 기록되며, 역순으로 적용하면
/// 제출 이전 상태가 복원됩니다.
#[derive(Debug)]
pub enum BookUndo {
  /// 완전 체결로 제거된 메이커 (체결 이전 스냅샷)
  MakerPopped { order: Order },
  /// 부분 체결된 레벨 머리 주문
  MakerReduced { side: OrderSide, price: Decimal, delta: Decimal },
  /// 주문장에 삽입된 테이커
  TakerInserted { order_id: i64 },
}

/// 주문 제출 및 매칭
///
/// 테이커 주문을 반대편 사다리와 체결시키고, 생성된 체결 기록과
/// 갱신/완결된 주문 목록, 그리고 되돌리기 로그를 돌려줍니다.
/// `amount_scale`은 시장가 매수의 마지막 부분 체결 수량을 내림할 때
/// 사용하는 거래쌍의 수량 자릿수입니다.
pub fn submit(
  book: &mut OrderBook,
  taker: &mut Order,
  amount_scale: u32,
) -> (MatchResult, Vec<BookUndo>) {
  let mut result = MatchResult::default();
  let mut undo = Vec::new();

  match taker.order_type {
    OrderType::Limit => match_limit(book, taker, &mut result, &mut undo),
    OrderType::Market => match_market(book, taker, amount_scale, &mut result, &mut undo),
  }

  debug!(
    "주문 {} 매칭 완료: 체결 {}건, 상태 {:?}, 체결량 {}",
    taker.id,
    result.trades.len(),
    taker.status,
    taker.filled_amount
  );

  (result, undo)
}

/// 되돌리기 로그 적용
///
/// 정산 실패 시 호출되어 주문장을 `submit` 이전 상태로 복원합니다.
/// 같은 심볼 잠금 안에서 호출되어야 합니다.
pub fn rollback(book: &mut OrderBook, undo: Vec<BookUndo>) {
  for op in undo.into_iter().rev() {
    match op {
      BookUndo::MakerPopped { order } => book.restore_front(order),
      BookUndo::MakerReduced { side, price, delta } => book.unreduce_front(side, price, delta),
      BookUndo::TakerInserted { order_id } => {
        book.remove(order_id);
      }
    }
  }
}

/// 지정가 주문 매칭
fn match_limit(
  book: &mut OrderBook,
  taker: &mut Order,
  result: &mut MatchResult,
  undo: &mut Vec<BookUndo>,
) {
  let limit_price = match taker.price {
    Some(p) => p,
    None => panic!("지정가 주문에 가격이 없습니다: {}", taker.id),
  };
  let opposing = taker.side.opposite();

  while taker.remaining() > Decimal::ZERO {
    let best = match book.best_price(opposing) {
      Some(p) => p,
      None => break,
    };

    // 가격 확인: 매수는 best <= 지정가, 매도는 best >= 지정가일 때만 체결
    let crosses = match taker.side {
      OrderSide::Buy => best <= limit_price,
      OrderSide::Sell => best >= limit_price,
    };
    if !crosses {
      break;
    }

    let maker = match book.peek_best(opposing) {
      Some(m) => m,
      None => panic!("가격 레벨에 주문이 없습니다: {} {}", book.symbol, best),
    };

    let x = taker.remaining().min(maker.remaining());
    result.trades.push(make_trade(taker, &maker, best, x));
    consume_maker(book, opposing, best, &maker, x, result, undo);
    taker.fill(x);
  }

  // 루프 종료 후 테이커 상태 확정
  if taker.is_filled() {
    result.filled.push(taker.clone());
  } else {
    // 잔량은 주문장에 남김 (체결이 없으면 Pending 그대로)
    book.insert(taker.clone());
    undo.push(BookUndo::TakerInserted { order_id: taker.id });
    result.updated.push(taker.clone());
  }
}

/// 시장가 주문 매칭
///
/// 시장가 매수의 `amount`는 호가 통화 총 지불액이므로 체결 걸음마다
/// `수량 × 가격`만큼 잔액을 줄이고, 체결량도 호가 통화 단위로 누적합니다.
/// 시장가 주문은 절대 주문장에 남지 않습니다.
fn match_market(
  book: &mut OrderBook,
  taker: &mut Order,
  amount_scale: u32,
  result: &mut MatchResult,
  undo: &mut Vec<BookUndo>,
) {
  // 유동성이 남아있는데 잔액이 최소 수량 단위 미만이라 멈춘 경우 (매수 전용)
  let mut dust_stop = false;

  match taker.side {
    OrderSide::Sell => {
      while taker.remaining() > Decimal::ZERO {
        let best = match book.best_price(OrderSide::Buy) {
          Some(p) => p,
          None => break,
        };
        let maker = match book.peek_best(OrderSide::Buy) {
          Some(m) => m,
          None => panic!("가격 레벨에 주문이 없습니다: {} {}", book.symbol, best),
        };

        let x = taker.remaining().min(maker.remaining());
        result.trades.push(make_trade(taker, &maker, best, x));
        consume_maker(book, OrderSide::Buy, best, &maker, x, result, undo);
        taker.fill(x);
      }
    }
    OrderSide::Buy => {
      while taker.remaining() > Decimal::ZERO {
        let best = match book.best_price(OrderSide::Sell) {
          Some(p) => p,
          None => break,
        };
        let maker = match book.peek_best(OrderSide::Sell) {
          Some(m) => m,
          None => panic!("가격 레벨에 주문이 없습니다: {} {}", book.symbol, best),
        };

        let maker_avail = maker.remaining();
        let x = if maker_avail * best <= taker.remaining() {
          // 메이커 전량을 사도 잔액이 남음
          maker_avail
        } else {
          // 잔액으로 살 수 있는 만큼만, 수량 자릿수로 내림
          let q = decimal::trunc_to_scale(&(taker.remaining() / best), amount_scale);
          if q <= Decimal::ZERO {
            dust_stop = true;
            break;
          }
          q
        };

        result.trades.push(make_trade(taker, &maker, best, x));
        consume_maker(book, OrderSide::Sell, best, &maker, x, result, undo);
        // 잔액 차감은 기초 수량이 아니라 지불액 기준
        taker.fill(x * best);
      }
    }
  }

  // 시장가 잔량은 잔류하지 않음: 전량 소진이면 Filled,
  // 더스트 잔액(최소 단위 미만)도 체결 완료로 간주하고 정산에서 잔액을 반환,
  // 유동성 부족이면 Canceled (동결 자금은 정산에서 전액 해제)
  if taker.is_filled() {
    result.filled.push(taker.clone());
  } else if dust_stop && taker.filled_amount > Decimal::ZERO {
    taker.status = OrderStatus::Filled;
    result.filled.push(taker.clone());
  } else {
    taker.status = OrderStatus::Canceled;
    result.updated.push(taker.clone());
  }
}

/// 체결 기록 생성 (체결 가격 = 메이커 가격)
fn make_trade(taker: &Order, maker: &Order, price: Decimal, amount: Decimal) -> Trade {
  let (buy, sell) = match taker.side {
    OrderSide::Buy => (taker, maker),
    OrderSide::Sell => (maker, taker),
  };

  Trade {
    id: 0,
    symbol: taker.symbol.clone(),
    buy_order_id: buy.id,
    sell_order_id: sell.id,
    buy_user_id: buy.user_id,
    sell_user_id: sell.user_id,
    price,
    amount,
    created_at: Utc::now(),
  }
}

/// 메이커 주문에 체결 반영
///
/// 전량 체결이면 레벨에서 제거하고, 부분 체결이면 머리에 남겨 둡니다.
fn consume_maker(
  book: &mut OrderBook,
  side: OrderSide,
  price: Decimal,
  maker: &Order,
  x: Decimal,
  result: &mut MatchResult,
  undo: &mut Vec<BookUndo>,
) {
  if x == maker.remaining() {
    let popped = match book.pop_front(side, price) {
      Some(o) => o,
      None => panic!("주문장 불일치: {} {} 레벨이 비어 있음", book.symbol, price),
    };
    undo.push(BookUndo::MakerPopped { order: popped.clone() });

    let mut filled_maker = popped;
    filled_maker.fill(x);
    result.filled.push(filled_maker);
  } else {
    let updated = match book.reduce_front(side, price, x) {
      Some(o) => o,
      None => panic!("주문장 불일치: {} {} 레벨이 비어 있음", book.symbol, price),
    };
    undo.push(BookUndo::MakerReduced { side, price, delta: x });
    result.updated.push(updated);
  }
}

/// 매칭 엔진
///
/// 심볼별 주문장을 소유합니다. 주문장 변경(제출, 취소)과 그에 따르는 정산은
/// 해당 심볼의 쓰기 잠금 아래에서만 수행되고 (심볼당 단일 작성자),
/// 깊이 조회는 읽기 잠금으로 일관된 순간을 봅니다.
/// 서로 다른 심볼은 독립적으로 병렬 진행됩니다.
pub struct MatchingEngine {
  /// 심볼별 주문장
  books: DashMap<String, Arc<RwLock<OrderBook>>>,
}

impl MatchingEngine {
  pub fn new() -> Self {
    MatchingEngine {
      books: DashMap::new(),
    }
  }

  /// 심볼의 주문장 핸들 (없으면 생성)
  pub fn book(&self, symbol: &str) -> Arc<RwLock<OrderBook>> {
    self
      .books
      .entry(symbol.to_string())
      .or_insert_with(|| Arc::new(RwLock::new(OrderBook::new(symbol.to_string()))))
      .value()
      .clone()
  }

  /// 시장 깊이 스냅샷 (읽기 잠금)
  pub async fn depth(&self, symbol: &str, max_levels: usize) -> DepthSnapshot {
    let book = self.book(symbol);
    let guard = book.read().await;
    guard.depth(max_levels)
  }
}

impl Default for MatchingEngine {
  fn default() -> Self {
    Self::new()
  }
}
