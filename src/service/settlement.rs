//! 정산 코디네이터
//!
//! 매칭 결과를 하나의 DB 트랜잭션으로 반영합니다:
//! 체결 기록 저장 → 잔고 변동(매수자는 호가 통화 동결분 차감·기초 통화 입금,
//! 매도자는 기초 통화 동결분 차감·호가 통화 입금) → 주문 상태 갱신 →
//! 잔여 동결 반환. 어느 한 단계라도 실패하면 전체가 롤백되며, 호출자는
//! 인메모리 주문장도 제출 이전 상태로 되돌려야 합니다.
//!
//! 관측 규칙: 체결이 보이면 그 잔고 효과와 주문 갱신도 반드시 보인다.

use std::collections::HashMap;

use log::info;
use rust_decimal::Decimal;
use sqlx::sqlite::SqlitePool;

use crate::db::models::TradingPair;
use crate::db::repository::{BalanceRepository, OrderRepository, TradeRepository};
use crate::error::ExchangeError;
use crate::matching::model::{MatchResult, Order, OrderSide, OrderType};

/// (사용자, 통화) 단위로 집계된 잔고 변동
#[derive(Debug, Default)]
struct BalanceDelta {
    /// 동결 잔고 차감 (체결 대금)
    debit_frozen: Decimal,
    /// 가용 잔고 입금 (체결 수익)
    credit_available: Decimal,
    /// 동결 해제 (초과 동결분 반환)
    unfreeze: Decimal,
}

/// 매칭 결과 정산
///
/// `taker`는 매칭이 끝난 뒤의 테이커 주문 최종 상태입니다.
pub async fn settle(
    pool: &SqlitePool,
    orders: &OrderRepository,
    trades: &TradeRepository,
    balances: &BalanceRepository,
    pair: &TradingPair,
    taker: &Order,
    result: &MatchResult,
) -> Result<(), ExchangeError> {
    let mut txn = pool.begin().await?;

    // 1. 체결 기록 저장
    for trade in &result.trades {
        trades.insert(&mut *txn, trade).await?;
    }

    // 2. 잔고 변동 집계
    let mut deltas: HashMap<(i64, String), BalanceDelta> = HashMap::new();
    let taker_limit_price = match (taker.side, taker.order_type) {
        (OrderSide::Buy, OrderType::Limit) => taker.price,
        _ => None,
    };

    for trade in &result.trades {
        let total = trade.price * trade.amount;

        // 매수자: 호가 통화 동결분 차감, 기초 통화 입금
        let buyer_quote = deltas
            .entry((trade.buy_user_id, pair.quote_currency.clone()))
            .or_default();
        buyer_quote.debit_frozen += total;

        // 테이커 지정가 매수가 지정가보다 싸게 체결되면 초과 동결분을 즉시 반환
        if let Some(limit) = taker_limit_price {
            if trade.buy_order_id == taker.id && limit > trade.price {
                buyer_quote.unfreeze += (limit - trade.price) * trade.amount;
            }
        }

        deltas
            .entry((trade.buy_user_id, pair.base_currency.clone()))
            .or_default()
            .credit_available += trade.amount;

        // 매도자: 기초 통화 동결분 차감, 호가 통화 입금
        deltas
            .entry((trade.sell_user_id, pair.base_currency.clone()))
            .or_default()
            .debit_frozen += trade.amount;
        deltas
            .entry((trade.sell_user_id, pair.quote_currency.clone()))
            .or_default()
            .credit_available += total;
    }

    // 종결된 시장가 주문의 미사용 동결 잔액 반환
    // (유동성 부족 취소분 전액 또는 시장가 매수의 더스트 잔액)
    if taker.order_type == OrderType::Market && taker.status.is_terminal() {
        let residual = taker.amount - taker.filled_amount;
        if residual > Decimal::ZERO {
            let currency = match taker.side {
                OrderSide::Buy => pair.quote_currency.clone(),
                OrderSide::Sell => pair.base_currency.clone(),
            };
            deltas
                .entry((taker.user_id, currency))
                .or_default()
                .unfreeze += residual;
        }
    }

    // 3. 잔고 변동 적용
    for ((user_id, currency), delta) in &deltas {
        if delta.debit_frozen > Decimal::ZERO {
            balances
                .debit_frozen(&mut *txn, *user_id, currency, &delta.debit_frozen)
                .await?;
        }
        if delta.unfreeze > Decimal::ZERO {
            balances
                .unfreeze(&mut *txn, *user_id, currency, &delta.unfreeze)
                .await?;
        }
        if delta.credit_available > Decimal::ZERO {
            balances
                .credit_available(&mut *txn, *user_id, currency, &delta.credit_available)
                .await?;
        }
    }

    // 4. 주문 상태 갱신 (테이커 포함)
    for order in result.updated.iter().chain(result.filled.iter()) {
        orders
            .update_fill(&mut *txn, order.id, &order.filled_amount, order.status)
            .await?;
    }

    // 5. 커밋
    txn.commit().await?;

    info!(
        "주문 {} 정산 완료: 체결 {}건, 잔고 변동 {}계정",
        taker.id,
        result.trades.len(),
        deltas.len()
    );
    Ok(())
}
