//! 고정 소수점 금액 유틸리티
//!
//! 금액, 가격, 잔고는 전부 `rust_decimal::Decimal`로 다룹니다.
//! 문자열 파싱과 정규화(후행 0 제거) 포맷만 여기서 담당하고,
//! 사칙연산은 Decimal 연산자를 그대로 사용합니다.

use rust_decimal::Decimal;
use std::str::FromStr;

use crate::error::ExchangeError;

/// 문자열을 Decimal로 파싱
///
/// 파싱 불가능한 입력은 `InvalidDecimal`로 반환합니다.
pub fn parse(s: &str) -> Result<Decimal, ExchangeError> {
  Decimal::from_str(s.trim()).map_err(|_| ExchangeError::InvalidDecimal)
}

/// 정규화된 문자열 표현
///
/// 후행 0 없이, 지수 표기 없이 출력합니다. 0은 "0"으로 출력됩니다.
pub fn to_canonical(d: &Decimal) -> String {
  d.normalize().to_string()
}

/// 소수점 이하 자릿수 (정규화 기준)
///
/// "1.50"은 1.5로 정규화된 뒤 1을 반환합니다.
pub fn scale(d: &Decimal) -> u32 {
  d.normalize().scale()
}

/// 허용 자릿수 초과 여부
pub fn exceeds_scale(d: &Decimal, max_scale: u32) -> bool {
  scale(d) > max_scale
}

/// 지정 자릿수로 내림 (버림)
pub fn trunc_to_scale(d: &Decimal, s: u32) -> Decimal {
  d.trunc_with_scale(s)
}
