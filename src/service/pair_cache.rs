//! 거래쌍 설정 캐시
//!
//! 거래쌍 설정은 읽기 위주이므로 최초 조회 시 DB에서 읽어 캐시합니다.

use dashmap::DashMap;

use crate::db::models::TradingPair;
use crate::db::repository::TradingPairRepository;
use crate::error::ExchangeError;

pub struct PairCache {
    repo: TradingPairRepository,
    cache: DashMap<String, TradingPair>,
}

impl PairCache {
    pub fn new(repo: TradingPairRepository) -> Self {
        Self {
            repo,
            cache: DashMap::new(),
        }
    }

    /// 심볼의 거래쌍 설정 조회
    ///
    /// 존재하지 않으면 `TradingPairNotFound`.
    pub async fn get(&self, symbol: &str) -> Result<TradingPair, ExchangeError> {
        if let Some(pair) = self.cache.get(symbol) {
            return Ok(pair.value().clone());
        }

        let pair = self
            .repo
            .find_by_symbol(symbol)
            .await?
            .ok_or(ExchangeError::TradingPairNotFound)?;

        self.cache.insert(symbol.to_string(), pair.clone());
        Ok(pair)
    }
}
