//! 비즈니스 로직 계층
//!
//! HTTP 핸들러와 저장소 사이에서 검증, 트랜잭션 경계, 매칭/정산 조율을
//! 담당합니다.

pub mod asset_service;
pub mod auth_service;
pub mod order_service;
pub mod pair_cache;
pub mod settlement;
