//! 자산 서비스
//!
//! 입금(신뢰된 자금 유입)과 잔고 조회를 담당합니다. 입금은 가용 잔고 입금과
//! 자산 트랜잭션 기록을 하나의 트랜잭션으로 묶습니다.

use chrono::{DateTime, Utc};
use log::info;
use rust_decimal::Decimal;
use sqlx::sqlite::SqlitePool;
use uuid::Uuid;

use crate::db::models::Balance;
use crate::db::repository::{AssetTransactionRepository, BalanceRepository};
use crate::error::ExchangeError;
use crate::util::decimal;

/// 입금 처리 결과
#[derive(Debug)]
pub struct DepositReceipt {
    pub transaction_id: String,
    pub currency: String,
    pub amount: Decimal,
    /// 2-성공 (실서비스라면 체인 확인 전까지 1-처리중)
    pub status: i64,
    pub created_at: DateTime<Utc>,
}

pub struct AssetService {
    pool: SqlitePool,
    balances: BalanceRepository,
    transactions: AssetTransactionRepository,
}

impl AssetService {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            balances: BalanceRepository::new(pool.clone()),
            transactions: AssetTransactionRepository::new(pool.clone()),
            pool,
        }
    }

    /// 입금 처리
    ///
    /// 최초 입금이면 잔고 행이 생성됩니다.
    pub async fn deposit(
        &self,
        user_id: i64,
        currency: &str,
        amount_raw: &str,
    ) -> Result<DepositReceipt, ExchangeError> {
        let currency = currency.trim().to_uppercase();
        if currency.is_empty() {
            return Err(ExchangeError::InvalidParams(
                "통화를 지정해야 합니다".to_string(),
            ));
        }

        let amount = decimal::parse(amount_raw).map_err(|_| ExchangeError::InvalidAmount)?;
        if amount <= Decimal::ZERO {
            return Err(ExchangeError::InvalidAmount);
        }

        let transaction_id = Uuid::new_v4().to_string();

        let mut txn = self.pool.begin().await?;
        self.balances
            .credit_available(&mut *txn, user_id, &currency, &amount)
            .await?;
        self.transactions
            .insert_deposit(&mut *txn, user_id, &transaction_id, &currency, &amount)
            .await?;
        txn.commit().await?;

        info!(
            "입금 완료: 사용자 {} {} {}, 트랜잭션 ID {}",
            user_id, amount, currency, transaction_id
        );

        Ok(DepositReceipt {
            transaction_id,
            currency,
            amount,
            status: 2,
            created_at: Utc::now(),
        })
    }

    /// 사용자의 전체 잔고 조회
    pub async fn list_balances(&self, user_id: i64) -> Result<Vec<Balance>, ExchangeError> {
        self.balances.find_by_user(user_id).await
    }
}
