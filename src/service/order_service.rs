//! 주문 생명주기 서비스
//!
//! 주문 생성(검증 → 자산 동결 → 주문 저장 → 매칭 → 정산)과 취소,
//! 조회를 담당합니다. 한 심볼의 주문장 변경과 그 정산은 전부 해당 심볼의
//! 쓰기 잠금 아래에서 순차 실행됩니다 (심볼당 단일 작성자).

use std::sync::Arc;

use chrono::Utc;
use log::{error, info};
use rust_decimal::Decimal;
use sqlx::sqlite::SqlitePool;

use crate::db::models::PairStatus;
use crate::db::repository::{BalanceRepository, OrderRepository, TradeRepository};
use crate::error::ExchangeError;
use crate::matching::engine::{self, MatchingEngine};
use crate::matching::model::{DepthSnapshot, Order, OrderSide, OrderStatus, OrderType};
use crate::service::pair_cache::PairCache;
use crate::service::settlement;
use crate::util::decimal;

/// 주문 생성 요청
#[derive(Debug)]
pub struct PlaceOrder {
    pub symbol: String,
    pub order_type: i64,
    pub side: i64,
    /// 주문 수량 (십진 문자열). 시장가 매수는 호가 통화 총 지불액.
    pub amount: String,
    /// 주문 가격 (지정가 전용)
    pub price: Option<String>,
}

/// 주문 목록 조회 조건
#[derive(Debug)]
pub struct OrderQuery {
    pub symbol: Option<String>,
    pub status: Option<i64>,
    pub page: i64,
    pub size: i64,
}

pub struct OrderService {
    pool: SqlitePool,
    engine: Arc<MatchingEngine>,
    pairs: Arc<PairCache>,
    orders: OrderRepository,
    trades: TradeRepository,
    balances: BalanceRepository,
}

impl OrderService {
    pub fn new(pool: SqlitePool, engine: Arc<MatchingEngine>, pairs: Arc<PairCache>) -> Self {
        Self {
            orders: OrderRepository::new(pool.clone()),
            trades: TradeRepository::new(pool.clone()),
            balances: BalanceRepository::new(pool.clone()),
            pool,
            engine,
            pairs,
        }
    }

    /// 주문 생성
    ///
    /// 검증이 끝나면 심볼 잠금 아래에서 (동결 + 주문 저장) 트랜잭션을
    /// 커밋하고, 매칭 후 정산까지 마친 주문을 돌려줍니다.
    /// 정산 실패 시 주문장은 제출 이전 상태로 복원됩니다.
    pub async fn place_order(
        &self,
        user_id: i64,
        req: &PlaceOrder,
    ) -> Result<Order, ExchangeError> {
        // 1. 거래쌍 확인
        let pair = self.pairs.get(&req.symbol).await?;
        if pair.status != PairStatus::Active {
            return Err(ExchangeError::TradingPairDisabled);
        }

        // 2. 파라미터 검증
        let order_type = OrderType::try_from(req.order_type)?;
        let side = OrderSide::try_from(req.side)?;

        let amount = decimal::parse(&req.amount).map_err(|_| ExchangeError::InvalidAmount)?;
        if amount <= Decimal::ZERO {
            return Err(ExchangeError::InvalidAmount);
        }
        if decimal::exceeds_scale(&amount, pair.amount_scale) {
            return Err(ExchangeError::InvalidParams(
                "수량 정밀도가 허용 자릿수를 초과합니다".to_string(),
            ));
        }
        if amount < pair.min_amount {
            return Err(ExchangeError::InvalidParams(
                "주문 수량이 최소 수량보다 작습니다".to_string(),
            ));
        }
        if pair.max_amount > Decimal::ZERO && amount > pair.max_amount {
            return Err(ExchangeError::InvalidParams(
                "주문 수량이 최대 수량을 초과합니다".to_string(),
            ));
        }

        let price = match order_type {
            OrderType::Limit => {
                let raw = req.price.as_deref().ok_or_else(|| {
                    ExchangeError::InvalidParams("지정가 주문에는 가격이 필요합니다".to_string())
                })?;
                let p = decimal::parse(raw)?;
                if p <= Decimal::ZERO {
                    return Err(ExchangeError::InvalidParams(
                        "가격은 0보다 커야 합니다".to_string(),
                    ));
                }
                if decimal::exceeds_scale(&p, pair.price_scale) {
                    return Err(ExchangeError::InvalidParams(
                        "가격 정밀도가 허용 자릿수를 초과합니다".to_string(),
                    ));
                }
                Some(p)
            }
            // 시장가 주문의 가격 입력은 무시
            OrderType::Market => None,
        };

        // 3. 동결 대상 계산
        // 매수는 호가 통화(지정가: 수량×가격, 시장가: amount가 곧 지불액),
        // 매도는 기초 통화를 수량만큼 동결
        let (freeze_currency, freeze_amount) = match side {
            OrderSide::Buy => match price {
                Some(p) => (pair.quote_currency.clone(), amount * p),
                None => (pair.quote_currency.clone(), amount),
            },
            OrderSide::Sell => (pair.base_currency.clone(), amount),
        };

        // 4. 심볼 잠금 획득 후 동결 + 주문 저장 (하나의 트랜잭션)
        let book = self.engine.book(&req.symbol);
        let mut book_guard = book.write().await;

        let now = Utc::now();
        let mut order = Order {
            id: 0,
            user_id,
            symbol: req.symbol.clone(),
            order_type,
            side,
            amount,
            price,
            filled_amount: Decimal::ZERO,
            status: OrderStatus::Pending,
            created_at: now,
            updated_at: now,
        };

        let mut txn = self.pool.begin().await?;
        self.balances
            .freeze(&mut *txn, user_id, &freeze_currency, &freeze_amount)
            .await?;
        let order_id = self.orders.insert(&mut *txn, &order).await?;
        txn.commit().await?;
        order.id = order_id;

        info!(
            "주문 생성: ID={}, 심볼={}, 유형={:?}, 방향={:?}, 수량={}, 동결 {} {}",
            order_id, order.symbol, order_type, side, amount, freeze_amount, freeze_currency
        );

        // 5. 매칭 및 정산 (같은 잠금 아래)
        let (result, undo) = engine::submit(&mut book_guard, &mut order, pair.amount_scale);

        if let Err(e) = settlement::settle(
            &self.pool,
            &self.orders,
            &self.trades,
            &self.balances,
            &pair,
            &order,
            &result,
        )
        .await
        {
            // 정산 실패: 주문장을 제출 이전 상태로 복원
            error!("주문 {} 정산 실패, 주문장 롤백: {}", order.id, e);
            engine::rollback(&mut book_guard, undo);
            return Err(ExchangeError::Internal);
        }

        Ok(order)
    }

    /// 주문 취소
    ///
    /// 소유자만 취소할 수 있고, 종결 상태의 주문은 해당 오류를 돌려줍니다.
    /// 상태 갱신과 잔여 동결 반환을 커밋한 뒤 주문장에서 제거합니다.
    pub async fn cancel_order(&self, user_id: i64, order_id: i64) -> Result<(), ExchangeError> {
        // 심볼을 알기 위한 사전 조회 및 소유권 확인
        let existing = self
            .orders
            .find_by_id(order_id)
            .await?
            .ok_or(ExchangeError::OrderNotFound)?;
        if existing.user_id != user_id {
            return Err(ExchangeError::Forbidden);
        }

        let book = self.engine.book(&existing.symbol);
        let mut book_guard = book.write().await;

        // 잠금 획득 사이에 체결/취소되었을 수 있으므로 재조회
        let order = self
            .orders
            .find_by_id(order_id)
            .await?
            .ok_or(ExchangeError::OrderNotFound)?;
        match order.status {
            OrderStatus::Canceled => return Err(ExchangeError::OrderAlreadyCanceled),
            OrderStatus::Filled => return Err(ExchangeError::OrderAlreadyFilled),
            _ => {}
        }

        let pair = self.pairs.get(&order.symbol).await?;

        // 잔여 동결 계산
        // 지정가 매수: 잔량×가격 (호가 통화), 시장가 매수: 잔량 (호가 통화, 방어적),
        // 매도: 잔량 (기초 통화)
        let remaining = order.remaining();
        let (currency, residual) = match order.side {
            OrderSide::Buy => match order.price {
                Some(p) => (pair.quote_currency.clone(), remaining * p),
                None => (pair.quote_currency.clone(), remaining),
            },
            OrderSide::Sell => (pair.base_currency.clone(), remaining),
        };

        let mut txn = self.pool.begin().await?;
        self.orders
            .update_status(&mut *txn, order_id, OrderStatus::Canceled)
            .await?;
        if residual > Decimal::ZERO {
            self.balances
                .unfreeze(&mut *txn, user_id, &currency, &residual)
                .await?;
        }
        txn.commit().await?;

        // 커밋 이후 주문장에서 제거 (잠금을 쥐고 있어 매칭과 직렬화됨)
        book_guard.remove(order_id);

        info!("주문 취소: ID={}, 반환 {} {}", order_id, residual, currency);
        Ok(())
    }

    /// 단일 주문 조회 (소유자 전용)
    pub async fn get_order(&self, user_id: i64, order_id: i64) -> Result<Order, ExchangeError> {
        let order = self
            .orders
            .find_by_id(order_id)
            .await?
            .ok_or(ExchangeError::OrderNotFound)?;
        if order.user_id != user_id {
            return Err(ExchangeError::Forbidden);
        }
        Ok(order)
    }

    /// 주문 목록 페이지 조회
    pub async fn list_orders(
        &self,
        user_id: i64,
        query: &OrderQuery,
    ) -> Result<(Vec<Order>, i64), ExchangeError> {
        if let Some(status) = query.status {
            OrderStatus::try_from(status)?;
        }

        self.orders
            .find_page(
                user_id,
                query.symbol.as_deref(),
                query.status,
                query.page,
                query.size,
            )
            .await
    }

    /// 시장 깊이 조회
    pub async fn depth(
        &self,
        symbol: &str,
        max_levels: usize,
    ) -> Result<DepthSnapshot, ExchangeError> {
        // 등록되지 않은 심볼은 조회 불가
        self.pairs.get(symbol).await?;
        Ok(self.engine.depth(symbol, max_levels).await)
    }
}
