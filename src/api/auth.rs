//! 인증 추출기
//!
//! `Authorization: Bearer <token>` 헤더에서 JWT를 꺼내 검증하고,
//! `userId` 클레임을 요청 핸들러에 넘깁니다. 헤더가 없거나 토큰이
//! 유효하지 않으면 `Unauthorized`.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use crate::error::ExchangeError;
use crate::server::ServerState;

/// 인증된 사용자
pub struct AuthUser {
    pub user_id: i64,
}

#[async_trait]
impl FromRequestParts<ServerState> for AuthUser {
    type Rejection = ExchangeError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &ServerState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or(ExchangeError::Unauthorized)?;
        let value = header.to_str().map_err(|_| ExchangeError::Unauthorized)?;
        let token = value
            .strip_prefix("Bearer ")
            .ok_or(ExchangeError::Unauthorized)?;

        let claims = state.auth_service.verify_token(token)?;
        Ok(AuthUser {
            user_id: claims.user_id,
        })
    }
}
