//! 인증 서비스
//!
//! 회원 가입(이메일/비밀번호 검증, bcrypt 해시)과 로그인(JWT 발급),
//! 토큰 검증을 담당합니다. 토큰 클레임의 `userId`로 요청 사용자를
//! 식별합니다.
//!
//! 로그인은 이메일별 실패 횟수를 Redis 카운터로 제한합니다
//! (15분 창에서 5회). Redis가 없거나 오류면 제한 없이 통과시킵니다.

use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use log::{error, info};
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};

use crate::config::AuthConfig;
use crate::db::models::User;
use crate::db::repository::UserRepository;
use crate::error::ExchangeError;

/// 로그인 실패 허용 횟수
const MAX_LOGIN_ATTEMPTS: i64 = 5;
/// 실패 카운터 유지 시간 (초)
const LOGIN_ATTEMPT_TTL_SECONDS: i64 = 15 * 60;

/// JWT 클레임
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    #[serde(rename = "userId")]
    pub user_id: i64,
    pub email: String,
    pub iat: i64,
    pub exp: i64,
}

pub struct AuthService {
    users: UserRepository,
    config: AuthConfig,
    redis: Option<MultiplexedConnection>,
}

impl AuthService {
    pub fn new(
        users: UserRepository,
        config: AuthConfig,
        redis: Option<MultiplexedConnection>,
    ) -> Self {
        Self {
            users,
            config,
            redis,
        }
    }

    /// 회원 가입
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        nickname: &str,
    ) -> Result<User, ExchangeError> {
        // 1. 이메일/비밀번호 검증
        if !is_valid_email(email) {
            return Err(ExchangeError::InvalidEmail);
        }
        validate_password(password)?;

        // 2. 중복 확인
        if self.users.find_by_email(email).await?.is_some() {
            return Err(ExchangeError::UserExists);
        }

        // 3. 비밀번호 해시 후 저장
        let hashed =
            bcrypt::hash(password, bcrypt::DEFAULT_COST).map_err(|_| ExchangeError::Internal)?;
        let user_id = self.users.insert(email, &hashed, nickname).await?;

        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(ExchangeError::Internal)?;

        info!("회원 가입 완료: {} (ID={})", email, user_id);
        Ok(user)
    }

    /// 로그인, (토큰, 사용자) 반환
    ///
    /// 실패할 때마다 이메일별 실패 횟수를 누적하고, 허용 횟수를 넘기면
    /// `TooManyLoginAttempts`. 성공하면 실패 기록을 지웁니다.
    pub async fn login(&self, email: &str, password: &str) -> Result<(String, User), ExchangeError> {
        // 1. 실패 횟수 제한 확인
        self.check_login_attempts(email).await?;

        // 2. 사용자 조회 및 상태 확인
        let user = match self.users.find_by_email(email).await? {
            Some(user) => user,
            None => {
                self.record_failed_login(email).await;
                return Err(ExchangeError::UserNotFound);
            }
        };

        if user.status != 1 {
            self.record_failed_login(email).await;
            return Err(ExchangeError::UserDisabled);
        }

        // 3. 비밀번호 검증
        let matches =
            bcrypt::verify(password, &user.password).map_err(|_| ExchangeError::Internal)?;
        if !matches {
            self.record_failed_login(email).await;
            return Err(ExchangeError::InvalidPassword);
        }

        // 4. 토큰 발급 후 실패 기록 삭제
        let token = self.issue_token(&user)?;
        self.clear_failed_login(email).await;

        info!("로그인 성공: {} (ID={})", email, user.id);
        Ok((token, user))
    }

    /// 실패 횟수 제한 확인 (Redis 미연결/오류 시 제한 없이 통과)
    async fn check_login_attempts(&self, email: &str) -> Result<(), ExchangeError> {
        let Some(mut conn) = self.redis.clone() else {
            return Ok(());
        };
        let key = format!("login_attempts:{}", email);

        match conn.get::<_, Option<i64>>(&key).await {
            Ok(Some(attempts)) if attempts >= MAX_LOGIN_ATTEMPTS => {
                Err(ExchangeError::TooManyLoginAttempts)
            }
            Ok(_) => Ok(()),
            Err(e) => {
                error!("로그인 실패 횟수 조회 실패: {}", e);
                Ok(())
            }
        }
    }

    /// 실패 횟수 누적 및 만료 설정
    async fn record_failed_login(&self, email: &str) {
        let Some(mut conn) = self.redis.clone() else {
            return;
        };
        let key = format!("login_attempts:{}", email);

        match conn.incr::<_, _, i64>(&key, 1i64).await {
            Ok(_) => {
                let _: redis::RedisResult<i64> =
                    conn.expire(&key, LOGIN_ATTEMPT_TTL_SECONDS).await;
            }
            Err(e) => error!("로그인 실패 횟수 기록 실패: {}", e),
        }
    }

    /// 실패 기록 삭제
    async fn clear_failed_login(&self, email: &str) {
        let Some(mut conn) = self.redis.clone() else {
            return;
        };
        let key = format!("login_attempts:{}", email);

        if let Err(e) = conn.del::<_, i64>(&key).await {
            error!("로그인 실패 기록 삭제 실패: {}", e);
        }
    }

    /// JWT 발급
    fn issue_token(&self, user: &User) -> Result<String, ExchangeError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            user_id: user.id,
            email: user.email.clone(),
            iat: now,
            exp: now + self.config.access_expire_seconds,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.config.access_secret.as_bytes()),
        )
        .map_err(|_| ExchangeError::Internal)
    }

    /// 토큰 검증 및 클레임 반환
    ///
    /// 서명 불일치, 만료, 형식 오류는 전부 `Unauthorized`.
    pub fn verify_token(&self, token: &str) -> Result<Claims, ExchangeError> {
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.access_secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|_| ExchangeError::Unauthorized)?;

        Ok(data.claims)
    }
}

/// 이메일 형식 검증 (local@domain.tld)
fn is_valid_email(email: &str) -> bool {
    if email.is_empty() || email.contains(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.is_empty() {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && tld.len() >= 2,
        None => false,
    }
}

/// 비밀번호 강도 검증: 6자 이상, 영문자와 숫자 포함
fn validate_password(password: &str) -> Result<(), ExchangeError> {
    if password.len() < 6 {
        return Err(ExchangeError::InvalidParams(
            "비밀번호는 6자 이상이어야 합니다".to_string(),
        ));
    }
    let has_letter = password.chars().any(|c| c.is_ascii_alphabetic());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    if !has_letter || !has_digit {
        return Err(ExchangeError::InvalidParams(
            "비밀번호는 영문자와 숫자를 모두 포함해야 합니다".to_string(),
        ));
    }
    Ok(())
}
