//! 요청 속도 제한 미들웨어
//!
//! Redis INCR + EXPIRE 기반의 고정 윈도우 카운터입니다. 키는
//! (경로, 클라이언트)별로 나뉘며, 클라이언트는 Authorization 헤더가 있으면
//! 그 값, 없으면 익명으로 식별합니다. Redis가 연결되어 있지 않거나
//! 일시적으로 실패하면 제한 없이 통과시킵니다.

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use log::warn;
use redis::AsyncCommands;

use crate::error::ExchangeError;
use crate::server::ServerState;

pub async fn rate_limit(
    State(state): State<ServerState>,
    req: Request,
    next: Next,
) -> Result<Response, ExchangeError> {
    let Some(mut conn) = state.redis.clone() else {
        return Ok(next.run(req).await);
    };

    let client = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("anonymous");
    let key = format!("rate:{}:{}", req.uri().path(), client);

    match conn.incr::<_, _, i64>(&key, 1i64).await {
        Ok(count) => {
            if count == 1 {
                let _: redis::RedisResult<i64> =
                    conn.expire(&key, state.config.rate_limit.seconds as i64).await;
            }
            if count > state.config.rate_limit.quota as i64 {
                return Err(ExchangeError::RateLimited);
            }
        }
        Err(e) => {
            // 카운터 장애가 서비스 장애로 번지지 않도록 통과
            warn!("속도 제한 카운터 갱신 실패: {}", e);
        }
    }

    Ok(next.run(req).await)
}
