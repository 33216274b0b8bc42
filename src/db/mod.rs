pub mod models;
pub mod repository;

use log::info;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::Error as SqlxError;

/// SQLite 데이터베이스 초기화 및 연결
pub async fn init_database(database_url: &str) -> Result<SqlitePool, SqlxError> {
    info!("데이터베이스 초기화 중: {}", database_url);

    // 연결 풀 생성
    // 인메모리 DB는 연결마다 별도 DB가 되므로 단일 연결로 제한
    let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };
    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;

    create_tables(&pool).await?;

    info!("데이터베이스 초기화 완료");
    Ok(pool)
}

/// 필요한 테이블 생성
async fn create_tables(pool: &SqlitePool) -> Result<(), SqlxError> {
    // 사용자 테이블
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            email TEXT NOT NULL UNIQUE,
            password TEXT NOT NULL,
            nickname TEXT NOT NULL,
            status INTEGER NOT NULL DEFAULT 1,
            created_at DATETIME NOT NULL
        )",
    )
    .execute(pool)
    .await?;

    // 잔고 테이블
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS balances (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            currency TEXT NOT NULL,
            available TEXT NOT NULL,
            frozen TEXT NOT NULL,
            updated_at DATETIME NOT NULL,
            UNIQUE (user_id, currency)
        )",
    )
    .execute(pool)
    .await?;

    // 거래쌍 테이블
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS trading_pairs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            symbol TEXT NOT NULL UNIQUE,
            base_currency TEXT NOT NULL,
            quote_currency TEXT NOT NULL,
            min_amount TEXT NOT NULL,
            max_amount TEXT NOT NULL,
            price_scale INTEGER NOT NULL,
            amount_scale INTEGER NOT NULL,
            status INTEGER NOT NULL DEFAULT 1,
            created_at DATETIME NOT NULL
        )",
    )
    .execute(pool)
    .await?;

    // 주문 테이블
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS orders (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            symbol TEXT NOT NULL,
            type INTEGER NOT NULL,
            side INTEGER NOT NULL,
            amount TEXT NOT NULL,
            price TEXT,
            filled_amount TEXT NOT NULL DEFAULT '0',
            status INTEGER NOT NULL DEFAULT 1,
            created_at DATETIME NOT NULL,
            updated_at DATETIME NOT NULL
        )",
    )
    .execute(pool)
    .await?;

    // 체결 테이블 (추가 전용)
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS trades (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            symbol TEXT NOT NULL,
            buy_order_id INTEGER NOT NULL,
            sell_order_id INTEGER NOT NULL,
            buy_user_id INTEGER NOT NULL,
            sell_user_id INTEGER NOT NULL,
            price TEXT NOT NULL,
            amount TEXT NOT NULL,
            created_at DATETIME NOT NULL
        )",
    )
    .execute(pool)
    .await?;

    // 자산 트랜잭션 테이블
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS asset_transactions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            transaction_id TEXT NOT NULL UNIQUE,
            currency TEXT NOT NULL,
            type INTEGER NOT NULL,
            amount TEXT NOT NULL,
            fee TEXT NOT NULL DEFAULT '0',
            status INTEGER NOT NULL,
            remark TEXT NOT NULL DEFAULT '',
            created_at DATETIME NOT NULL,
            updated_at DATETIME NOT NULL
        )",
    )
    .execute(pool)
    .await?;

    // 인덱스 생성
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_orders_symbol_side_status
         ON orders(symbol, side, status)",
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_orders_user ON orders(user_id)")
        .execute(pool)
        .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_trades_symbol_time ON trades(symbol, created_at)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
