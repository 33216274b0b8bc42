//! 테이블별 저장소
//!
//! 읽기 전용 조회는 연결 풀을 그대로 쓰고, 트랜잭션에 묶여야 하는 변경은
//! `&mut SqliteConnection`을 받아 호출자의 트랜잭션 안에서 실행됩니다.
//! 잔고 원장(동결/해제/차감/입금)의 계정 단위 직렬화는 SQLite의
//! 단일 작성자 트랜잭션이 보장합니다.

use chrono::Utc;
use log::debug;
use rust_decimal::Decimal;
use sqlx::sqlite::SqlitePool;
use sqlx::SqliteConnection;

use super::models::{
    AssetTransaction, Balance, BalanceRecord, OrderRecord, TradeRecord, TradingPair,
    TradingPairRecord, User,
};
use crate::error::ExchangeError;
use crate::matching::model::{Order, OrderStatus, Trade};
use crate::util::decimal;

/// 사용자 저장소
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// 사용자 생성, 생성된 ID 반환
    pub async fn insert(
        &self,
        email: &str,
        password_hash: &str,
        nickname: &str,
    ) -> Result<i64, ExchangeError> {
        let result = sqlx::query(
            "INSERT INTO users (email, password, nickname, status, created_at)
             VALUES (?, ?, ?, 1, ?)",
        )
        .bind(email)
        .bind(password_hash)
        .bind(nickname)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, ExchangeError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, email, password, nickname, status, created_at
             FROM users WHERE email = ? LIMIT 1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<User>, ExchangeError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, email, password, nickname, status, created_at
             FROM users WHERE id = ? LIMIT 1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }
}

/// 거래쌍 저장소
pub struct TradingPairRepository {
    pool: SqlitePool,
}

impl TradingPairRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// 거래쌍 등록 (초기 데이터 적재용)
    pub async fn insert(&self, pair: &TradingPair) -> Result<i64, ExchangeError> {
        let result = sqlx::query(
            "INSERT INTO trading_pairs
             (symbol, base_currency, quote_currency, min_amount, max_amount,
              price_scale, amount_scale, status, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&pair.symbol)
        .bind(&pair.base_currency)
        .bind(&pair.quote_currency)
        .bind(decimal::to_canonical(&pair.min_amount))
        .bind(decimal::to_canonical(&pair.max_amount))
        .bind(pair.price_scale as i64)
        .bind(pair.amount_scale as i64)
        .bind(pair.status.as_i64())
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    pub async fn find_by_symbol(&self, symbol: &str) -> Result<Option<TradingPair>, ExchangeError> {
        let record = sqlx::query_as::<_, TradingPairRecord>(
            "SELECT id, symbol, base_currency, quote_currency, min_amount, max_amount,
                    price_scale, amount_scale, status
             FROM trading_pairs WHERE symbol = ? LIMIT 1",
        )
        .bind(symbol)
        .fetch_optional(&self.pool)
        .await?;

        record.map(|r| r.into_pair()).transpose()
    }
}

/// 잔고 원장
///
/// (사용자, 통화) 계정의 `available`/`frozen` 두 잔고를 관리합니다.
/// 변경 연산은 전부 호출자의 트랜잭션 안에서 실행되어야 합니다.
pub struct BalanceRepository {
    pool: SqlitePool,
}

impl BalanceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// 잔고 조회
    pub async fn find(
        &self,
        user_id: i64,
        currency: &str,
    ) -> Result<Option<Balance>, ExchangeError> {
        let record = sqlx::query_as::<_, BalanceRecord>(
            "SELECT user_id, currency, available, frozen
             FROM balances WHERE user_id = ? AND currency = ? LIMIT 1",
        )
        .bind(user_id)
        .bind(currency)
        .fetch_optional(&self.pool)
        .await?;

        record.map(|r| r.into_balance()).transpose()
    }

    /// 사용자의 전체 잔고 조회
    pub async fn find_by_user(&self, user_id: i64) -> Result<Vec<Balance>, ExchangeError> {
        let records = sqlx::query_as::<_, BalanceRecord>(
            "SELECT user_id, currency, available, frozen
             FROM balances WHERE user_id = ? ORDER BY currency",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        records.into_iter().map(|r| r.into_balance()).collect()
    }

    /// 트랜잭션 내 잔고 조회
    async fn find_on(
        conn: &mut SqliteConnection,
        user_id: i64,
        currency: &str,
    ) -> Result<Option<Balance>, ExchangeError> {
        let record = sqlx::query_as::<_, BalanceRecord>(
            "SELECT user_id, currency, available, frozen
             FROM balances WHERE user_id = ? AND currency = ? LIMIT 1",
        )
        .bind(user_id)
        .bind(currency)
        .fetch_optional(&mut *conn)
        .await?;

        record.map(|r| r.into_balance()).transpose()
    }

    /// 잔고 갱신
    async fn update_on(
        conn: &mut SqliteConnection,
        user_id: i64,
        currency: &str,
        available: &Decimal,
        frozen: &Decimal,
    ) -> Result<(), ExchangeError> {
        sqlx::query(
            "UPDATE balances SET available = ?, frozen = ?, updated_at = ?
             WHERE user_id = ? AND currency = ?",
        )
        .bind(decimal::to_canonical(available))
        .bind(decimal::to_canonical(frozen))
        .bind(Utc::now())
        .bind(user_id)
        .bind(currency)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// 잔고 동결: available → frozen
    ///
    /// 사용 가능 잔고가 부족하면 `InsufficientBalance`.
    pub async fn freeze(
        &self,
        conn: &mut SqliteConnection,
        user_id: i64,
        currency: &str,
        amount: &Decimal,
    ) -> Result<(), ExchangeError> {
        if *amount <= Decimal::ZERO {
            return Err(ExchangeError::InvalidAmount);
        }

        let balance = Self::find_on(conn, user_id, currency)
            .await?
            .ok_or(ExchangeError::BalanceNotFound)?;

        if balance.available < *amount {
            return Err(ExchangeError::InsufficientBalance);
        }

        let new_available = balance.available - amount;
        let new_frozen = balance.frozen + amount;
        Self::update_on(conn, user_id, currency, &new_available, &new_frozen).await?;

        debug!(
            "잔고 동결: 사용자 {} {} {} (가용 {} → {})",
            user_id, currency, amount, balance.available, new_available
        );
        Ok(())
    }

    /// 잔고 동결 해제: frozen → available
    ///
    /// 동결 잔고가 부족하면 `InsufficientFrozen`.
    pub async fn unfreeze(
        &self,
        conn: &mut SqliteConnection,
        user_id: i64,
        currency: &str,
        amount: &Decimal,
    ) -> Result<(), ExchangeError> {
        if *amount <= Decimal::ZERO {
            return Err(ExchangeError::InvalidAmount);
        }

        let balance = Self::find_on(conn, user_id, currency)
            .await?
            .ok_or(ExchangeError::BalanceNotFound)?;

        if balance.frozen < *amount {
            return Err(ExchangeError::InsufficientFrozen);
        }

        let new_available = balance.available + amount;
        let new_frozen = balance.frozen - amount;
        Self::update_on(conn, user_id, currency, &new_available, &new_frozen).await?;

        debug!("잔고 동결 해제: 사용자 {} {} {}", user_id, currency, amount);
        Ok(())
    }

    /// 동결 잔고 차감 (정산 전용)
    pub async fn debit_frozen(
        &self,
        conn: &mut SqliteConnection,
        user_id: i64,
        currency: &str,
        amount: &Decimal,
    ) -> Result<(), ExchangeError> {
        if amount.is_zero() {
            return Ok(());
        }
        if *amount < Decimal::ZERO {
            return Err(ExchangeError::InvalidAmount);
        }

        let balance = Self::find_on(conn, user_id, currency)
            .await?
            .ok_or(ExchangeError::BalanceNotFound)?;

        if balance.frozen < *amount {
            return Err(ExchangeError::InsufficientFrozen);
        }

        let new_frozen = balance.frozen - amount;
        Self::update_on(conn, user_id, currency, &balance.available, &new_frozen).await?;

        debug!("동결 잔고 차감: 사용자 {} {} {}", user_id, currency, amount);
        Ok(())
    }

    /// 가용 잔고 입금 (정산/입금 전용)
    ///
    /// 잔고 행이 없으면 새로 만듭니다 (최초 입금 시 생성).
    pub async fn credit_available(
        &self,
        conn: &mut SqliteConnection,
        user_id: i64,
        currency: &str,
        amount: &Decimal,
    ) -> Result<(), ExchangeError> {
        if amount.is_zero() {
            return Ok(());
        }
        if *amount < Decimal::ZERO {
            return Err(ExchangeError::InvalidAmount);
        }

        match Self::find_on(conn, user_id, currency).await? {
            Some(balance) => {
                let new_available = balance.available + amount;
                Self::update_on(conn, user_id, currency, &new_available, &balance.frozen).await?;
            }
            None => {
                sqlx::query(
                    "INSERT INTO balances (user_id, currency, available, frozen, updated_at)
                     VALUES (?, ?, ?, '0', ?)",
                )
                .bind(user_id)
                .bind(currency)
                .bind(decimal::to_canonical(amount))
                .bind(Utc::now())
                .execute(&mut *conn)
                .await?;
            }
        }

        debug!("가용 잔고 입금: 사용자 {} {} {}", user_id, currency, amount);
        Ok(())
    }
}

/// 주문 저장소
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// 주문 저장, 생성된 ID 반환 (트랜잭션 내)
    pub async fn insert(
        &self,
        conn: &mut SqliteConnection,
        order: &Order,
    ) -> Result<i64, ExchangeError> {
        let result = sqlx::query(
            "INSERT INTO orders
             (user_id, symbol, type, side, amount, price, filled_amount, status,
              created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(order.user_id)
        .bind(&order.symbol)
        .bind(order.order_type.as_i64())
        .bind(order.side.as_i64())
        .bind(decimal::to_canonical(&order.amount))
        .bind(order.price.as_ref().map(decimal::to_canonical))
        .bind(decimal::to_canonical(&order.filled_amount))
        .bind(order.status.as_i64())
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut *conn)
        .await?;

        Ok(result.last_insert_rowid())
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<Order>, ExchangeError> {
        let record = sqlx::query_as::<_, OrderRecord>(
            "SELECT id, user_id, symbol, type, side, amount, price, filled_amount, status,
                    created_at, updated_at
             FROM orders WHERE id = ? LIMIT 1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        record.map(|r| r.into_order()).transpose()
    }

    /// 체결량/상태 갱신 (트랜잭션 내)
    pub async fn update_fill(
        &self,
        conn: &mut SqliteConnection,
        id: i64,
        filled_amount: &Decimal,
        status: OrderStatus,
    ) -> Result<(), ExchangeError> {
        sqlx::query("UPDATE orders SET filled_amount = ?, status = ?, updated_at = ? WHERE id = ?")
            .bind(decimal::to_canonical(filled_amount))
            .bind(status.as_i64())
            .bind(Utc::now())
            .bind(id)
            .execute(&mut *conn)
            .await?;

        Ok(())
    }

    /// 상태만 갱신 (트랜잭션 내)
    pub async fn update_status(
        &self,
        conn: &mut SqliteConnection,
        id: i64,
        status: OrderStatus,
    ) -> Result<(), ExchangeError> {
        sqlx::query("UPDATE orders SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status.as_i64())
            .bind(Utc::now())
            .bind(id)
            .execute(&mut *conn)
            .await?;

        Ok(())
    }

    /// 사용자 주문 페이지 조회
    ///
    /// 심볼/상태 필터는 선택적이며, 페이지는 1부터, 크기는 최대 100으로
    /// 제한합니다. (주문 목록, 총 개수)를 돌려줍니다.
    pub async fn find_page(
        &self,
        user_id: i64,
        symbol: Option<&str>,
        status: Option<i64>,
        page: i64,
        size: i64,
    ) -> Result<(Vec<Order>, i64), ExchangeError> {
        let page = page.max(1);
        let size = size.clamp(1, 100);
        let offset = (page - 1) * size;

        let mut where_clause = String::from("WHERE user_id = ?");
        if symbol.is_some() {
            where_clause.push_str(" AND symbol = ?");
        }
        if status.is_some() {
            where_clause.push_str(" AND status = ?");
        }

        // 총 개수
        let count_sql = format!("SELECT COUNT(*) FROM orders {}", where_clause);
        let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql).bind(user_id);
        if let Some(s) = symbol {
            count_query = count_query.bind(s);
        }
        if let Some(st) = status {
            count_query = count_query.bind(st);
        }
        let total = count_query.fetch_one(&self.pool).await?;

        // 페이지 데이터
        let data_sql = format!(
            "SELECT id, user_id, symbol, type, side, amount, price, filled_amount, status,
                    created_at, updated_at
             FROM orders {} ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
            where_clause
        );
        let mut data_query = sqlx::query_as::<_, OrderRecord>(&data_sql).bind(user_id);
        if let Some(s) = symbol {
            data_query = data_query.bind(s);
        }
        if let Some(st) = status {
            data_query = data_query.bind(st);
        }
        let records = data_query
            .bind(size)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        let orders = records
            .into_iter()
            .map(|r| r.into_order())
            .collect::<Result<Vec<_>, _>>()?;

        Ok((orders, total))
    }
}

/// 체결 저장소 (추가 전용)
pub struct TradeRepository {
    pool: SqlitePool,
}

impl TradeRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// 체결 기록 저장, 생성된 ID 반환 (트랜잭션 내)
    pub async fn insert(
        &self,
        conn: &mut SqliteConnection,
        trade: &Trade,
    ) -> Result<i64, ExchangeError> {
        let result = sqlx::query(
            "INSERT INTO trades
             (symbol, buy_order_id, sell_order_id, buy_user_id, sell_user_id, price, amount,
              created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&trade.symbol)
        .bind(trade.buy_order_id)
        .bind(trade.sell_order_id)
        .bind(trade.buy_user_id)
        .bind(trade.sell_user_id)
        .bind(decimal::to_canonical(&trade.price))
        .bind(decimal::to_canonical(&trade.amount))
        .bind(trade.created_at)
        .execute(&mut *conn)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// 심볼별 최근 체결 조회
    pub async fn find_by_symbol(
        &self,
        symbol: &str,
        limit: i64,
    ) -> Result<Vec<Trade>, ExchangeError> {
        let records = sqlx::query_as::<_, TradeRecord>(
            "SELECT id, symbol, buy_order_id, sell_order_id, buy_user_id, sell_user_id,
                    price, amount, created_at
             FROM trades WHERE symbol = ? ORDER BY created_at DESC, id DESC LIMIT ?",
        )
        .bind(symbol)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        records.into_iter().map(|r| r.into_trade()).collect()
    }
}

/// 자산 트랜잭션 저장소
pub struct AssetTransactionRepository {
    pool: SqlitePool,
}

impl AssetTransactionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// 입금 기록 저장 (트랜잭션 내)
    pub async fn insert_deposit(
        &self,
        conn: &mut SqliteConnection,
        user_id: i64,
        transaction_id: &str,
        currency: &str,
        amount: &Decimal,
    ) -> Result<i64, ExchangeError> {
        let now = Utc::now();
        let remark = format!("Deposit {} {}", decimal::to_canonical(amount), currency);
        let result = sqlx::query(
            "INSERT INTO asset_transactions
             (user_id, transaction_id, currency, type, amount, fee, status, remark, created_at,
              updated_at)
             VALUES (?, ?, ?, 1, ?, '0', 2, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(transaction_id)
        .bind(currency)
        .bind(decimal::to_canonical(amount))
        .bind(remark)
        .bind(now)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// 사용자별 최근 트랜잭션 조회
    pub async fn find_by_user(
        &self,
        user_id: i64,
        limit: i64,
    ) -> Result<Vec<AssetTransaction>, ExchangeError> {
        let records = sqlx::query_as::<_, AssetTransaction>(
            "SELECT id, user_id, transaction_id, currency, type, amount, fee, status, remark,
                    created_at, updated_at
             FROM asset_transactions WHERE user_id = ? ORDER BY created_at DESC, id DESC LIMIT ?",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }
}
