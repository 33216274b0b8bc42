//! 주문장 구현
//!
//! 심볼당 하나의 주문장이 매수/매도 호가 사다리를 관리합니다.
//! 각 사다리는 가격 → 가격 레벨(FIFO 큐) 맵이며, 매수는 내림차순,
//! 매도는 오름차순으로 정렬됩니다. 시장가 주문은 절대 주문장에 남지 않습니다.
//!
//! 불변식: 레벨의 잔량 합계는 소속 주문들의 남은 수량 합과 같고,
//! 빈 레벨은 즉시 제거됩니다.

use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use log::debug;
use rust_decimal::Decimal;

use crate::matching::model::{DepthSnapshot, Order, OrderSide};
use crate::util::linked_list::{DoublyLinkedList, Node};

/// 가격 레벨
///
/// 동일 가격의 주문들을 시간 우선순위(FIFO)로 관리합니다.
#[derive(Debug)]
pub struct PriceLevel {
  /// 주문 리스트 (시간 우선순위)
  orders: DoublyLinkedList<Order>,
  /// 주문 ID → 노드 참조 맵핑 (O(1) 취소용)
  order_map: HashMap<i64, Arc<Mutex<Node<Order>>>>,
  /// 남은 수량 합계
  pub total_amount: Decimal,
}

impl PriceLevel {
  pub fn new() -> Self {
    PriceLevel {
      orders: DoublyLinkedList::new(),
      order_map: HashMap::new(),
      total_amount: Decimal::ZERO,
    }
  }

  /// 주문 추가 (꼬리에 붙음)
  pub fn add_order(&mut self, order: Order) {
    let order_id = order.id;
    let remaining = order.remaining();

    let node = self.orders.push_back(order);
    self.order_map.insert(order_id, node);
    self.total_amount += remaining;
  }

  /// 주문 복원 (머리에 붙음 - 롤백 전용)
  pub fn push_front_order(&mut self, order: Order) {
    let order_id = order.id;
    let remaining = order.remaining();

    let node = self.orders.push_front(order);
    self.order_map.insert(order_id, node);
    self.total_amount += remaining;
  }

  /// 주문 취소 (레벨 내 임의 위치)
  pub fn remove_order(&mut self, order_id: i64) -> Option<Order> {
    let node = self.order_map.remove(&order_id)?;

    let order = match node.lock() {
      Ok(guard) => guard.value.clone(),
      Err(_) => return None,
    };

    self.orders.remove(node);
    self.total_amount -= order.remaining();
    Some(order)
  }

  /// 머리 주문 조회 (제거하지 않음)
  pub fn peek_front(&self) -> Option<Order> {
    let node = self.orders.peek_front()?;
    let result = match node.lock() {
      Ok(guard) => Some(guard.value.clone()),
      Err(_) => None,
    };
    result
  }

  /// 머리 주문 제거 후 반환 (완전 체결)
  pub fn pop_front(&mut self) -> Option<Order> {
    let node = self.orders.pop_front()?;
    let order = match node.lock() {
      Ok(guard) => guard.value.clone(),
      Err(_) => return None,
    };

    self.order_map.remove(&order.id);
    self.total_amount -= order.remaining();
    Some(order)
  }

  /// 머리 주문 부분 체결
  ///
  /// 머리 주문의 체결량과 레벨 잔량 합계를 `delta`만큼 줄이고,
  /// 갱신된 주문의 사본을 돌려줍니다. 주문은 레벨에 남습니다.
  pub fn reduce_front(&mut self, delta: Decimal) -> Option<Order> {
    let node = self.orders.peek_front()?;
    let updated = match node.lock() {
      Ok(mut guard) => {
        guard.value.fill(delta);
        Some(guard.value.clone())
      }
      Err(_) => None,
    };

    if updated.is_some() {
      self.total_amount -= delta;
    }
    updated
  }

  /// 머리 주문 부분 체결 되돌리기 (롤백 전용)
  pub fn unreduce_front(&mut self, delta: Decimal) {
    if let Some(node) = self.orders.peek_front() {
      if let Ok(mut guard) = node.lock() {
        guard.value.filled_amount -= delta;
        guard.value.status = if guard.value.filled_amount.is_zero() {
          crate::matching::model::OrderStatus::Pending
        } else {
          crate::matching::model::OrderStatus::PartiallyFilled
        };
        self.total_amount += delta;
      }
    }
  }

  pub fn is_empty(&self) -> bool {
    self.orders.is_empty()
  }

  /// 주문 수 반환
  pub fn len(&self) -> usize {
    self.orders.len()
  }
}

/// 주문장
#[derive(Debug)]
pub struct OrderBook {
  /// 심볼
  pub symbol: String,
  /// 매수 호가 (가격 → 가격 레벨), 내림차순 (높은 가격이 앞에 위치)
  bids: BTreeMap<Reverse<Decimal>, PriceLevel>,
  /// 매도 호가 (가격 → 가격 레벨), 오름차순 (낮은 가격이 앞에 위치)
  asks: BTreeMap<Decimal, PriceLevel>,
  /// 주문장에 있는 모든 주문 (주문 ID → (방향, 가격))
  orders: HashMap<i64, (OrderSide, Decimal)>,
}

impl OrderBook {
  pub fn new(symbol: String) -> Self {
    OrderBook {
      symbol,
      bids: BTreeMap::new(),
      asks: BTreeMap::new(),
      orders: HashMap::new(),
    }
  }

  /// 주문 삽입
  ///
  /// 해당 가격 레벨의 꼬리에 붙습니다. 시장가 주문은 가격이 없으므로
  /// 삽입할 수 없으며, 그런 호출은 상위 로직의 버그입니다.
  pub fn insert(&mut self, order: Order) {
    let price = match order.price {
      Some(p) => p,
      None => panic!("가격 없는 주문은 주문장에 넣을 수 없습니다: {}", order.id),
    };
    let order_id = order.id;
    let side = order.side;

    match side {
      OrderSide::Buy => {
        let level = self.bids.entry(Reverse(price)).or_insert_with(PriceLevel::new);
        level.add_order(order);
      }
      OrderSide::Sell => {
        let level = self.asks.entry(price).or_insert_with(PriceLevel::new);
        level.add_order(order);
      }
    }

    self.orders.insert(order_id, (side, price));
    debug!("주문장 삽입: {} ({:?}, 가격: {})", order_id, side, price);
  }

  /// 주문 복원 (레벨 머리에 붙음 - 롤백 전용)
  pub fn restore_front(&mut self, order: Order) {
    let price = match order.price {
      Some(p) => p,
      None => panic!("가격 없는 주문은 복원할 수 없습니다: {}", order.id),
    };
    let order_id = order.id;
    let side = order.side;

    match side {
      OrderSide::Buy => {
        let level = self.bids.entry(Reverse(price)).or_insert_with(PriceLevel::new);
        level.push_front_order(order);
      }
      OrderSide::Sell => {
        let level = self.asks.entry(price).or_insert_with(PriceLevel::new);
        level.push_front_order(order);
      }
    }

    self.orders.insert(order_id, (side, price));
  }

  /// 주문 제거 (취소)
  pub fn remove(&mut self, order_id: i64) -> Option<Order> {
    let (side, price) = self.orders.remove(&order_id)?;

    let removed = match side {
      OrderSide::Buy => {
        let level = self.bids.get_mut(&Reverse(price))?;
        let removed = level.remove_order(order_id);
        if level.is_empty() {
          self.bids.remove(&Reverse(price));
          debug!("빈 가격 레벨 제거 (매수): {}", price);
        }
        removed
      }
      OrderSide::Sell => {
        let level = self.asks.get_mut(&price)?;
        let removed = level.remove_order(order_id);
        if level.is_empty() {
          self.asks.remove(&price);
          debug!("빈 가격 레벨 제거 (매도): {}", price);
        }
        removed
      }
    };

    removed
  }

  /// 주문장 포함 여부
  pub fn contains(&self, order_id: i64) -> bool {
    self.orders.contains_key(&order_id)
  }

  /// 최고 매수가
  pub fn best_bid_price(&self) -> Option<Decimal> {
    self.bids.keys().next().map(|p| p.0)
  }

  /// 최저 매도가
  pub fn best_ask_price(&self) -> Option<Decimal> {
    self.asks.keys().next().copied()
  }

  /// 지정한 방향의 최우선 가격
  pub fn best_price(&self, side: OrderSide) -> Option<Decimal> {
    match side {
      OrderSide::Buy => self.best_bid_price(),
      OrderSide::Sell => self.best_ask_price(),
    }
  }

  /// 지정한 방향의 최우선 레벨 머리 주문 (제거하지 않음)
  pub fn peek_best(&self, side: OrderSide) -> Option<Order> {
    match side {
      OrderSide::Buy => self.bids.values().next().and_then(|l| l.peek_front()),
      OrderSide::Sell => self.asks.values().next().and_then(|l| l.peek_front()),
    }
  }

  /// 지정 레벨의 머리 주문 제거
  ///
  /// 레벨이 비면 레벨 자체를 제거합니다.
  pub fn pop_front(&mut self, side: OrderSide, price: Decimal) -> Option<Order> {
    let popped = match side {
      OrderSide::Buy => {
        let level = self.bids.get_mut(&Reverse(price))?;
        let popped = level.pop_front();
        if level.is_empty() {
          self.bids.remove(&Reverse(price));
          debug!("빈 가격 레벨 제거 (매수): {}", price);
        }
        popped
      }
      OrderSide::Sell => {
        let level = self.asks.get_mut(&price)?;
        let popped = level.pop_front();
        if level.is_empty() {
          self.asks.remove(&price);
          debug!("빈 가격 레벨 제거 (매도): {}", price);
        }
        popped
      }
    };

    if let Some(ref order) = popped {
      self.orders.remove(&order.id);
    }
    popped
  }

  /// 지정 레벨의 머리 주문 부분 체결
  pub fn reduce_front(&mut self, side: OrderSide, price: Decimal, delta: Decimal) -> Option<Order> {
    match side {
      OrderSide::Buy => self.bids.get_mut(&Reverse(price))?.reduce_front(delta),
      OrderSide::Sell => self.asks.get_mut(&price)?.reduce_front(delta),
    }
  }

  /// 부분 체결 되돌리기 (롤백 전용)
  pub fn unreduce_front(&mut self, side: OrderSide, price: Decimal, delta: Decimal) {
    match side {
      OrderSide::Buy => {
        if let Some(level) = self.bids.get_mut(&Reverse(price)) {
          level.unreduce_front(delta);
        }
      }
      OrderSide::Sell => {
        if let Some(level) = self.asks.get_mut(&price) {
          level.unreduce_front(delta);
        }
      }
    }
  }

  /// 시장 깊이 스냅샷
  ///
  /// 양쪽 최대 `max_levels`개 레벨의 (가격, 잔량 합계)를 돌려줍니다.
  pub fn depth(&self, max_levels: usize) -> DepthSnapshot {
    let bids = self
      .bids
      .iter()
      .take(max_levels)
      .map(|(price, level)| (price.0, level.total_amount))
      .collect();

    let asks = self
      .asks
      .iter()
      .take(max_levels)
      .map(|(price, level)| (*price, level.total_amount))
      .collect();

    DepthSnapshot {
      symbol: self.symbol.clone(),
      bids,
      asks,
    }
  }

  /// 매수 주문 수
  pub fn bid_count(&self) -> usize {
    self.bids.values().map(|level| level.len()).sum()
  }

  /// 매도 주문 수
  pub fn ask_count(&self) -> usize {
    self.asks.values().map(|level| level.len()).sum()
  }

  /// 총 주문 수
  pub fn order_count(&self) -> usize {
    self.bid_count() + self.ask_count()
  }
}
