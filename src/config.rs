//! 서버 설정
//!
//! 환경 변수에서 설정을 읽어옵니다. 값이 없으면 개발용 기본값을 사용합니다.

use std::env;

/// JWT 인증 설정
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// 토큰 서명 비밀키
    pub access_secret: String,
    /// 토큰 유효 기간 (초)
    pub access_expire_seconds: i64,
}

/// 요청 속도 제한 설정 (고정 윈도우)
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// 윈도우 길이 (초)
    pub seconds: u64,
    /// 윈도우당 허용 요청 수
    pub quota: u32,
}

/// 애플리케이션 설정
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// 데이터베이스 연결 문자열
    pub data_source: String,
    /// Redis 연결 URL (없으면 속도 제한 비활성화)
    pub redis_url: Option<String>,
    pub auth: AuthConfig,
    pub rate_limit: RateLimitConfig,
}

impl AppConfig {
    /// 환경 변수에서 설정 로드
    pub fn load() -> Self {
        let host = env::var("XCHANGE_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("XCHANGE_PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(8888);
        let data_source =
            env::var("XCHANGE_DATA_SOURCE").unwrap_or_else(|_| "sqlite://xchange.db".to_string());
        let redis_url = env::var("XCHANGE_REDIS_URL").ok();

        let auth = AuthConfig {
            access_secret: env::var("XCHANGE_ACCESS_SECRET")
                .unwrap_or_else(|_| "dev-access-secret".to_string()),
            access_expire_seconds: env::var("XCHANGE_ACCESS_EXPIRE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(86400),
        };

        let rate_limit = RateLimitConfig {
            seconds: env::var("XCHANGE_RATE_LIMIT_SECONDS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(1),
            quota: env::var("XCHANGE_RATE_LIMIT_QUOTA")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(100),
        };

        Self {
            host,
            port,
            data_source,
            redis_url,
            auth,
            rate_limit,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8888,
            data_source: "sqlite::memory:".to_string(),
            redis_url: None,
            auth: AuthConfig {
                access_secret: "dev-access-secret".to_string(),
                access_expire_seconds: 86400,
            },
            rate_limit: RateLimitConfig {
                seconds: 1,
                quota: 100,
            },
        }
    }
}
