//! 거래 흐름 통합 테스트
//!
//! 인메모리 SQLite 위에서 서비스 계층을 직접 구동해 주문 생성/체결/취소의
//! 전 구간을 검증합니다: 자금 동결, 정산 후 잔고, 잔여 동결 반환, 보존
//! 법칙(전체 잔고 합 = 입금 합), 종결 주문에 묶인 동결 0.

use std::sync::Arc;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sqlx::sqlite::SqlitePool;

use xchange::db;
use xchange::db::models::{PairStatus, TradingPair};
use xchange::db::repository::{
    AssetTransactionRepository, BalanceRepository, TradeRepository, TradingPairRepository,
};
use xchange::error::ExchangeError;
use xchange::matching::engine::MatchingEngine;
use xchange::matching::model::OrderStatus;
use xchange::service::asset_service::AssetService;
use xchange::service::order_service::{OrderQuery, OrderService, PlaceOrder};
use xchange::service::pair_cache::PairCache;

const BUY: i64 = 1;
const SELL: i64 = 2;

struct TestEnv {
    pool: SqlitePool,
    orders: OrderService,
    assets: AssetService,
}

/// 인메모리 DB + BTC/USDT 거래쌍으로 테스트 환경 구성
async fn setup() -> TestEnv {
    let pool = db::init_database("sqlite::memory:").await.unwrap();

    let pair_repo = TradingPairRepository::new(pool.clone());
    pair_repo
        .insert(&TradingPair {
            id: 0,
            symbol: "BTC/USDT".to_string(),
            base_currency: "BTC".to_string(),
            quote_currency: "USDT".to_string(),
            min_amount: dec!(0.0001),
            max_amount: dec!(1000),
            price_scale: 2,
            amount_scale: 8,
            status: PairStatus::Active,
        })
        .await
        .unwrap();

    let engine = Arc::new(MatchingEngine::new());
    let pairs = Arc::new(PairCache::new(TradingPairRepository::new(pool.clone())));
    let orders = OrderService::new(pool.clone(), engine, pairs);
    let assets = AssetService::new(pool.clone());

    TestEnv {
        pool,
        orders,
        assets,
    }
}

fn limit(side: i64, amount: &str, price: &str) -> PlaceOrder {
    PlaceOrder {
        symbol: "BTC/USDT".to_string(),
        order_type: 1,
        side,
        amount: amount.to_string(),
        price: Some(price.to_string()),
    }
}

fn market(side: i64, amount: &str) -> PlaceOrder {
    PlaceOrder {
        symbol: "BTC/USDT".to_string(),
        order_type: 2,
        side,
        amount: amount.to_string(),
        price: None,
    }
}

async fn deposit(env: &TestEnv, user_id: i64, currency: &str, amount: &str) {
    env.assets.deposit(user_id, currency, amount).await.unwrap();
}

/// (가용, 동결) 잔고 조회, 행이 없으면 (0, 0)
async fn balance(env: &TestEnv, user_id: i64, currency: &str) -> (Decimal, Decimal) {
    let repo = BalanceRepository::new(env.pool.clone());
    match repo.find(user_id, currency).await.unwrap() {
        Some(b) => (b.available, b.frozen),
        None => (Decimal::ZERO, Decimal::ZERO),
    }
}

/// 사용자들의 (가용 + 동결) 총합
async fn total_holdings(env: &TestEnv, users: &[i64], currency: &str) -> Decimal {
    let mut sum = Decimal::ZERO;
    for &user_id in users {
        let (available, frozen) = balance(env, user_id, currency).await;
        sum += available + frozen;
    }
    sum
}

#[tokio::test]
async fn test_limit_buy_rests_and_freezes() {
    let env = setup().await;
    deposit(&env, 1, "USDT", "100000").await;

    // 지정가 매수 1 BTC @ 50000
    let order = env.orders.place_order(1, &limit(BUY, "1", "50000")).await.unwrap();

    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.filled_amount, Decimal::ZERO);
    assert!(order.id > 0);

    // 50000 USDT 동결
    let (available, frozen) = balance(&env, 1, "USDT").await;
    assert_eq!(available, dec!(50000));
    assert_eq!(frozen, dec!(50000));

    // 주문장에 매수 호가 50000×1
    let depth = env.orders.depth("BTC/USDT", 10).await.unwrap();
    assert_eq!(depth.bids, vec![(dec!(50000), dec!(1))]);
    assert!(depth.asks.is_empty());
}

#[tokio::test]
async fn test_partial_fill_settlement() {
    let env = setup().await;
    deposit(&env, 1, "USDT", "100000").await;
    deposit(&env, 2, "BTC", "2").await;

    let buy = env.orders.place_order(1, &limit(BUY, "1", "50000")).await.unwrap();

    // B가 0.4 BTC를 같은 가격에 매도 - 부분 체결
    let sell = env.orders.place_order(2, &limit(SELL, "0.4", "50000")).await.unwrap();
    assert_eq!(sell.status, OrderStatus::Filled);
    assert_eq!(sell.filled_amount, dec!(0.4));

    // 체결 기록: 1건, 메이커 가격 50000
    let trades = TradeRepository::new(env.pool.clone())
        .find_by_symbol("BTC/USDT", 10)
        .await
        .unwrap();
    assert_eq!(trades.len(), 1);
    assert_eq!(trades[0].price, dec!(50000));
    assert_eq!(trades[0].amount, dec!(0.4));
    assert_eq!(trades[0].buy_user_id, 1);
    assert_eq!(trades[0].sell_user_id, 2);

    // 매수자: 동결 30000 남음, BTC 0.4 입금
    let (usdt_available, usdt_frozen) = balance(&env, 1, "USDT").await;
    assert_eq!(usdt_available, dec!(50000));
    assert_eq!(usdt_frozen, dec!(30000));
    let (btc_available, btc_frozen) = balance(&env, 1, "BTC").await;
    assert_eq!(btc_available, dec!(0.4));
    assert_eq!(btc_frozen, Decimal::ZERO);

    // 매도자: BTC 동결 0, USDT 20000 입금
    let (b_btc_available, b_btc_frozen) = balance(&env, 2, "BTC").await;
    assert_eq!(b_btc_available, dec!(1.6));
    assert_eq!(b_btc_frozen, Decimal::ZERO);
    let (b_usdt_available, _) = balance(&env, 2, "USDT").await;
    assert_eq!(b_usdt_available, dec!(20000));

    // 매수 주문은 부분 체결 상태로 갱신
    let buy_after = env.orders.get_order(1, buy.id).await.unwrap();
    assert_eq!(buy_after.status, OrderStatus::PartiallyFilled);
    assert_eq!(buy_after.filled_amount, dec!(0.4));
}

#[tokio::test]
async fn test_cancel_releases_residual() {
    let env = setup().await;
    deposit(&env, 1, "USDT", "100000").await;
    deposit(&env, 2, "BTC", "2").await;

    let buy = env.orders.place_order(1, &limit(BUY, "1", "50000")).await.unwrap();
    env.orders.place_order(2, &limit(SELL, "0.4", "50000")).await.unwrap();

    // 부분 체결된 매수 취소 - 잔여 동결 30000 반환
    env.orders.cancel_order(1, buy.id).await.unwrap();

    let canceled = env.orders.get_order(1, buy.id).await.unwrap();
    assert_eq!(canceled.status, OrderStatus::Canceled);

    let (available, frozen) = balance(&env, 1, "USDT").await;
    assert_eq!(available, dec!(70000));
    assert_eq!(frozen, Decimal::ZERO);

    // 주문장 매수 호가 비어 있음
    let depth = env.orders.depth("BTC/USDT", 10).await.unwrap();
    assert!(depth.bids.is_empty());
}

#[tokio::test]
async fn test_price_time_priority_across_users() {
    let env = setup().await;
    deposit(&env, 10, "USDT", "50000").await;
    deposit(&env, 20, "USDT", "100000").await;
    deposit(&env, 30, "USDT", "245000").await;
    deposit(&env, 40, "BTC", "3").await;

    // 매수 호가: 50000×1 (X, 먼저), 50000×2 (Y, 나중), 49000×5 (Z)
    env.orders.place_order(10, &limit(BUY, "1", "50000")).await.unwrap();
    let y = env.orders.place_order(20, &limit(BUY, "2", "50000")).await.unwrap();
    let z = env.orders.place_order(30, &limit(BUY, "5", "49000")).await.unwrap();

    // 지정가 매도 2.5 @ 48000
    let sell = env.orders.place_order(40, &limit(SELL, "2.5", "48000")).await.unwrap();
    assert_eq!(sell.status, OrderStatus::Filled);

    // 체결 순서: (50000, 1, X) → (50000, 1.5, Y)
    let mut trades = TradeRepository::new(env.pool.clone())
        .find_by_symbol("BTC/USDT", 10)
        .await
        .unwrap();
    trades.sort_by_key(|t| t.id);
    assert_eq!(trades.len(), 2);
    assert_eq!(trades[0].price, dec!(50000));
    assert_eq!(trades[0].amount, dec!(1));
    assert_eq!(trades[0].buy_user_id, 10);
    assert_eq!(trades[1].price, dec!(50000));
    assert_eq!(trades[1].amount, dec!(1.5));
    assert_eq!(trades[1].buy_user_id, 20);

    // Y는 0.5 잔량, Z는 그대로
    let y_after = env.orders.get_order(20, y.id).await.unwrap();
    assert_eq!(y_after.status, OrderStatus::PartiallyFilled);
    assert_eq!(y_after.filled_amount, dec!(1.5));
    let z_after = env.orders.get_order(30, z.id).await.unwrap();
    assert_eq!(z_after.status, OrderStatus::Pending);
    assert_eq!(z_after.filled_amount, Decimal::ZERO);
}

#[tokio::test]
async fn test_market_buy_insufficient_balance() {
    let env = setup().await;
    deposit(&env, 1, "BTC", "1.5").await;
    deposit(&env, 3, "USDT", "100").await;

    env.orders.place_order(1, &limit(SELL, "0.5", "51000")).await.unwrap();
    env.orders.place_order(1, &limit(SELL, "1", "52000")).await.unwrap();

    // 잔고 100 USDT로 30000 지불 시장가 매수 - 동결 실패, 상태 변화 없음
    let result = env.orders.place_order(3, &market(BUY, "30000")).await;
    assert!(matches!(result, Err(ExchangeError::InsufficientBalance)));

    let (available, frozen) = balance(&env, 3, "USDT").await;
    assert_eq!(available, dec!(100));
    assert_eq!(frozen, Decimal::ZERO);

    // 주문도 생성되지 않음
    let (list, total) = env
        .orders
        .list_orders(
            3,
            &OrderQuery {
                symbol: None,
                status: None,
                page: 1,
                size: 20,
            },
        )
        .await
        .unwrap();
    assert!(list.is_empty());
    assert_eq!(total, 0);

    // 주문장도 그대로
    let depth = env.orders.depth("BTC/USDT", 10).await.unwrap();
    assert_eq!(depth.asks.len(), 2);
}

#[tokio::test]
async fn test_market_buy_spends_quote_and_returns_dust() {
    let env = setup().await;
    deposit(&env, 1, "BTC", "0.5").await;
    deposit(&env, 2, "BTC", "1").await;
    deposit(&env, 3, "USDT", "30000").await;

    env.orders.place_order(1, &limit(SELL, "0.5", "51000")).await.unwrap();
    env.orders.place_order(2, &limit(SELL, "1", "52000")).await.unwrap();

    // 시장가 매수 30000 (호가 통화 지불액)
    let order = env.orders.place_order(3, &market(BUY, "30000")).await.unwrap();
    assert_eq!(order.status, OrderStatus::Filled);

    // 체결: 0.5 @ 51000 (25500 지불) → 0.08653846 @ 52000 (4499.99992 지불)
    let mut trades = TradeRepository::new(env.pool.clone())
        .find_by_symbol("BTC/USDT", 10)
        .await
        .unwrap();
    trades.sort_by_key(|t| t.id);
    assert_eq!(trades[0].price, dec!(51000));
    assert_eq!(trades[0].amount, dec!(0.5));
    assert_eq!(trades[1].price, dec!(52000));
    assert_eq!(trades[1].amount, dec!(0.08653846));

    // 매수자: BTC 0.58653846 취득, 더스트 0.00008 USDT는 가용으로 반환, 동결 0
    let (btc_available, _) = balance(&env, 3, "BTC").await;
    assert_eq!(btc_available, dec!(0.58653846));
    let (usdt_available, usdt_frozen) = balance(&env, 3, "USDT").await;
    assert_eq!(usdt_available, dec!(0.00008));
    assert_eq!(usdt_frozen, Decimal::ZERO);

    // 매도자들 정산 확인
    let (s1_usdt, _) = balance(&env, 1, "USDT").await;
    assert_eq!(s1_usdt, dec!(25500));
    let (s2_usdt, _) = balance(&env, 2, "USDT").await;
    assert_eq!(s2_usdt, dec!(4499.99992));

    // 보존 법칙: 통화별 총합 = 입금 합
    assert_eq!(total_holdings(&env, &[1, 2, 3], "BTC").await, dec!(1.5));
    assert_eq!(total_holdings(&env, &[1, 2, 3], "USDT").await, dec!(30000));
}

#[tokio::test]
async fn test_market_sell_remainder_released() {
    let env = setup().await;
    deposit(&env, 1, "USDT", "50000").await;
    deposit(&env, 2, "BTC", "2").await;

    env.orders.place_order(1, &limit(BUY, "1", "50000")).await.unwrap();

    // 시장가 매도 2 BTC - 유동성은 1 BTC뿐이므로 잔량은 취소되고 동결 해제
    let sell = env.orders.place_order(2, &market(SELL, "2")).await.unwrap();
    assert_eq!(sell.status, OrderStatus::Canceled);
    assert_eq!(sell.filled_amount, dec!(1));

    let (btc_available, btc_frozen) = balance(&env, 2, "BTC").await;
    assert_eq!(btc_available, dec!(1));
    assert_eq!(btc_frozen, Decimal::ZERO);
    let (usdt_available, _) = balance(&env, 2, "USDT").await;
    assert_eq!(usdt_available, dec!(50000));

    // 취소된 시장가 주문 재취소는 오류
    let result = env.orders.cancel_order(2, sell.id).await;
    assert!(matches!(result, Err(ExchangeError::OrderAlreadyCanceled)));
}

#[tokio::test]
async fn test_limit_buy_overpay_released_on_fill() {
    let env = setup().await;
    deposit(&env, 1, "USDT", "60000").await;
    deposit(&env, 2, "BTC", "1").await;

    // 매도 호가 50000이 먼저 대기
    env.orders.place_order(2, &limit(SELL, "1", "50000")).await.unwrap();

    // 52000 지정가 매수 - 동결은 52000이지만 체결은 50000
    let buy = env.orders.place_order(1, &limit(BUY, "1", "52000")).await.unwrap();
    assert_eq!(buy.status, OrderStatus::Filled);

    // 초과 동결분 2000은 정산에서 즉시 반환 - 묶인 자금 없음
    let (usdt_available, usdt_frozen) = balance(&env, 1, "USDT").await;
    assert_eq!(usdt_available, dec!(10000));
    assert_eq!(usdt_frozen, Decimal::ZERO);
    let (btc_available, _) = balance(&env, 1, "BTC").await;
    assert_eq!(btc_available, dec!(1));
}

#[tokio::test]
async fn test_cancel_idempotence_and_ownership() {
    let env = setup().await;
    deposit(&env, 1, "USDT", "100000").await;
    deposit(&env, 2, "BTC", "1").await;

    let buy = env.orders.place_order(1, &limit(BUY, "1", "50000")).await.unwrap();

    // 남의 주문 취소는 금지
    let result = env.orders.cancel_order(2, buy.id).await;
    assert!(matches!(result, Err(ExchangeError::Forbidden)));

    // 정상 취소 후 재취소는 부수효과 없이 오류
    env.orders.cancel_order(1, buy.id).await.unwrap();
    let before = balance(&env, 1, "USDT").await;
    let result = env.orders.cancel_order(1, buy.id).await;
    assert!(matches!(result, Err(ExchangeError::OrderAlreadyCanceled)));
    assert_eq!(balance(&env, 1, "USDT").await, before);

    // 완전 체결된 주문 취소도 오류
    let buy2 = env.orders.place_order(1, &limit(BUY, "1", "50000")).await.unwrap();
    env.orders.place_order(2, &limit(SELL, "1", "50000")).await.unwrap();
    let result = env.orders.cancel_order(1, buy2.id).await;
    assert!(matches!(result, Err(ExchangeError::OrderAlreadyFilled)));

    // 없는 주문
    let result = env.orders.cancel_order(1, 99999).await;
    assert!(matches!(result, Err(ExchangeError::OrderNotFound)));
}

#[tokio::test]
async fn test_conservation_and_no_stranded_funds() {
    let env = setup().await;
    deposit(&env, 1, "USDT", "200000").await;
    deposit(&env, 2, "BTC", "3").await;
    deposit(&env, 3, "USDT", "80000").await;

    // 일련의 주문: 부분 체결, 교차 체결, 시장가, 취소가 뒤섞임
    let b1 = env.orders.place_order(1, &limit(BUY, "1", "50000")).await.unwrap();
    env.orders.place_order(2, &limit(SELL, "0.4", "50000")).await.unwrap();
    env.orders.place_order(2, &limit(SELL, "1", "51000")).await.unwrap();
    env.orders.place_order(3, &limit(BUY, "0.5", "51000")).await.unwrap();
    env.orders.place_order(3, &market(BUY, "20000")).await.unwrap();
    env.orders.cancel_order(1, b1.id).await.unwrap();

    // 보존 법칙: 통화별 (가용+동결) 총합은 입금 총합과 같다
    let users = [1, 2, 3];
    assert_eq!(total_holdings(&env, &users, "USDT").await, dec!(280000));
    assert_eq!(total_holdings(&env, &users, "BTC").await, dec!(3));

    // 종결 상태 주문만 남기고 모두 취소
    for user_id in users {
        let (list, _) = env
            .orders
            .list_orders(
                user_id,
                &OrderQuery {
                    symbol: None,
                    status: None,
                    page: 1,
                    size: 100,
                },
            )
            .await
            .unwrap();
        for order in list {
            if !order.status.is_terminal() {
                env.orders.cancel_order(user_id, order.id).await.unwrap();
            }
        }
    }

    // 모든 주문이 종결된 뒤에는 어떤 사용자도 동결 잔고가 없어야 함
    for user_id in users {
        for currency in ["USDT", "BTC"] {
            let (_, frozen) = balance(&env, user_id, currency).await;
            assert_eq!(frozen, Decimal::ZERO, "사용자 {} {} 동결 잔량", user_id, currency);
        }
    }

    // 취소 이후에도 보존 법칙 유지
    assert_eq!(total_holdings(&env, &users, "USDT").await, dec!(280000));
    assert_eq!(total_holdings(&env, &users, "BTC").await, dec!(3));
}

#[tokio::test]
async fn test_validation_rejections() {
    let env = setup().await;
    deposit(&env, 1, "USDT", "100000").await;

    // 없는 거래쌍
    let mut req = limit(BUY, "1", "50000");
    req.symbol = "ETH/USDT".to_string();
    assert!(matches!(
        env.orders.place_order(1, &req).await,
        Err(ExchangeError::TradingPairNotFound)
    ));

    // 잘못된 주문 유형/방향
    let mut req = limit(BUY, "1", "50000");
    req.order_type = 9;
    assert!(matches!(
        env.orders.place_order(1, &req).await,
        Err(ExchangeError::InvalidOrderType)
    ));
    let mut req = limit(BUY, "1", "50000");
    req.side = 0;
    assert!(matches!(
        env.orders.place_order(1, &req).await,
        Err(ExchangeError::InvalidOrderSide)
    ));

    // 수량 오류: 파싱 불가, 0 이하, 최소 미만, 정밀도 초과
    assert!(matches!(
        env.orders.place_order(1, &limit(BUY, "abc", "50000")).await,
        Err(ExchangeError::InvalidAmount)
    ));
    assert!(matches!(
        env.orders.place_order(1, &limit(BUY, "0", "50000")).await,
        Err(ExchangeError::InvalidAmount)
    ));
    assert!(matches!(
        env.orders.place_order(1, &limit(BUY, "0.00001", "50000")).await,
        Err(ExchangeError::InvalidParams(_))
    ));
    assert!(matches!(
        env.orders.place_order(1, &limit(BUY, "0.123456789", "50000")).await,
        Err(ExchangeError::InvalidParams(_))
    ));

    // 가격 오류: 누락, 0, 정밀도 초과
    let mut req = limit(BUY, "1", "50000");
    req.price = None;
    assert!(matches!(
        env.orders.place_order(1, &req).await,
        Err(ExchangeError::InvalidParams(_))
    ));
    assert!(matches!(
        env.orders.place_order(1, &limit(BUY, "1", "0")).await,
        Err(ExchangeError::InvalidParams(_))
    ));
    assert!(matches!(
        env.orders.place_order(1, &limit(BUY, "1", "50000.123")).await,
        Err(ExchangeError::InvalidParams(_))
    ));

    // 검증 실패는 상태를 전혀 바꾸지 않음
    let (available, frozen) = balance(&env, 1, "USDT").await;
    assert_eq!(available, dec!(100000));
    assert_eq!(frozen, Decimal::ZERO);
}

#[tokio::test]
async fn test_disabled_pair_rejected() {
    let env = setup().await;

    TradingPairRepository::new(env.pool.clone())
        .insert(&TradingPair {
            id: 0,
            symbol: "ETH/USDT".to_string(),
            base_currency: "ETH".to_string(),
            quote_currency: "USDT".to_string(),
            min_amount: dec!(0.001),
            max_amount: dec!(10000),
            price_scale: 2,
            amount_scale: 8,
            status: PairStatus::Disabled,
        })
        .await
        .unwrap();

    deposit(&env, 1, "USDT", "10000").await;

    let mut req = limit(BUY, "1", "3000");
    req.symbol = "ETH/USDT".to_string();
    assert!(matches!(
        env.orders.place_order(1, &req).await,
        Err(ExchangeError::TradingPairDisabled)
    ));
}

#[tokio::test]
async fn test_order_listing_and_pagination() {
    let env = setup().await;
    deposit(&env, 1, "USDT", "500000").await;

    for i in 0..5 {
        let price = format!("{}", 40000 + i * 100);
        env.orders.place_order(1, &limit(BUY, "1", &price)).await.unwrap();
    }

    // 전체 목록
    let (list, total) = env
        .orders
        .list_orders(
            1,
            &OrderQuery {
                symbol: None,
                status: None,
                page: 1,
                size: 20,
            },
        )
        .await
        .unwrap();
    assert_eq!(total, 5);
    assert_eq!(list.len(), 5);

    // 페이지 크기 제한
    let (page1, total) = env
        .orders
        .list_orders(
            1,
            &OrderQuery {
                symbol: Some("BTC/USDT".to_string()),
                status: Some(1),
                page: 1,
                size: 2,
            },
        )
        .await
        .unwrap();
    assert_eq!(total, 5);
    assert_eq!(page1.len(), 2);

    let (page3, _) = env
        .orders
        .list_orders(
            1,
            &OrderQuery {
                symbol: Some("BTC/USDT".to_string()),
                status: Some(1),
                page: 3,
                size: 2,
            },
        )
        .await
        .unwrap();
    assert_eq!(page3.len(), 1);

    // 다른 사용자에게는 보이지 않음
    let (other, total_other) = env
        .orders
        .list_orders(
            2,
            &OrderQuery {
                symbol: None,
                status: None,
                page: 1,
                size: 20,
            },
        )
        .await
        .unwrap();
    assert!(other.is_empty());
    assert_eq!(total_other, 0);
}

#[tokio::test]
async fn test_get_order_ownership() {
    let env = setup().await;
    deposit(&env, 1, "USDT", "100000").await;

    let order = env.orders.place_order(1, &limit(BUY, "1", "50000")).await.unwrap();

    // 소유자는 조회 가능
    let fetched = env.orders.get_order(1, order.id).await.unwrap();
    assert_eq!(fetched.id, order.id);

    // 타인 주문은 Forbidden, 없는 주문은 NotFound
    assert!(matches!(
        env.orders.get_order(2, order.id).await,
        Err(ExchangeError::Forbidden)
    ));
    assert!(matches!(
        env.orders.get_order(1, 99999).await,
        Err(ExchangeError::OrderNotFound)
    ));
}

#[tokio::test]
async fn test_deposit_creates_balance_and_record() {
    let env = setup().await;

    let receipt = env.assets.deposit(7, "usdt", "1234.5").await.unwrap();
    assert_eq!(receipt.currency, "USDT");
    assert_eq!(receipt.amount, dec!(1234.5));
    assert_eq!(receipt.status, 2);
    assert!(!receipt.transaction_id.is_empty());

    // 최초 입금으로 잔고 행 생성, 이후 입금은 누적
    env.assets.deposit(7, "USDT", "0.5").await.unwrap();
    let balances = env.assets.list_balances(7).await.unwrap();
    assert_eq!(balances.len(), 1);
    assert_eq!(balances[0].available, dec!(1235));
    assert_eq!(balances[0].frozen, Decimal::ZERO);

    // 트랜잭션 기록 2건
    let records = AssetTransactionRepository::new(env.pool.clone())
        .find_by_user(7, 10)
        .await
        .unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].tx_type, 1);
    assert_eq!(records[0].status, 2);

    // 금액 오류
    assert!(matches!(
        env.assets.deposit(7, "USDT", "-5").await,
        Err(ExchangeError::InvalidAmount)
    ));
    assert!(matches!(
        env.assets.deposit(7, "", "5").await,
        Err(ExchangeError::InvalidParams(_))
    ));
}

#[tokio::test]
async fn test_filled_amount_monotonicity() {
    let env = setup().await;
    deposit(&env, 1, "USDT", "200000").await;
    deposit(&env, 2, "BTC", "3").await;

    let buy = env.orders.place_order(1, &limit(BUY, "2", "50000")).await.unwrap();

    // 세 번에 나눠 체결되는 동안 체결량은 단조 증가
    let mut last_filled = Decimal::ZERO;
    for amount in ["0.5", "0.7", "0.8"] {
        env.orders.place_order(2, &limit(SELL, amount, "50000")).await.unwrap();
        let current = env.orders.get_order(1, buy.id).await.unwrap();
        assert!(current.filled_amount > last_filled);
        assert!(current.filled_amount <= current.amount);
        last_filled = current.filled_amount;
    }

    let final_order = env.orders.get_order(1, buy.id).await.unwrap();
    assert_eq!(final_order.status, OrderStatus::Filled);
    assert_eq!(final_order.filled_amount, dec!(2));
}
