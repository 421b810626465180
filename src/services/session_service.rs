use axum::http::header::COOKIE;
use axum::http::HeaderMap;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::session_queries;
use crate::errors::AppError;

pub const SESSION_COOKIE: &str = "stocksim_session";

/// Claims of the session cookie. `jti` names the server-side session row,
/// so revoking the row invalidates the cookie even before `exp`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: Uuid,
    pub jti: Uuid,
    pub iat: i64,
    pub exp: i64,
}

/// The authenticated caller of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser {
    pub user_id: Uuid,
    pub session_id: Uuid,
}

pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl SessionKeys {
    pub fn new(secret: &str, ttl_hours: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::hours(ttl_hours),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issue(
        &self,
        user_id: Uuid,
        session_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<String, AppError> {
        let claims = SessionClaims {
            sub: user_id,
            jti: session_id,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AppError::Internal(format!("failed to sign session token: {}", e)))
    }

    pub fn verify(&self, token: &str) -> Result<SessionClaims, AppError> {
        let validation = Validation::new(Algorithm::HS256);
        decode::<SessionClaims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|_| AppError::Unauthenticated)
    }
}

/// Creates a session row and returns the signed cookie value.
pub async fn start(pool: &PgPool, keys: &SessionKeys, user_id: Uuid) -> Result<String, AppError> {
    let now = Utc::now();
    let session_id = Uuid::new_v4();

    let purged = session_queries::delete_expired(pool).await?;
    if purged > 0 {
        info!("Purged {} expired sessions", purged);
    }
    session_queries::insert(pool, session_id, user_id, now + keys.ttl()).await?;
    info!("Session {} started for user {}", session_id, user_id);

    keys.issue(user_id, session_id, now)
}

/// Resolves a cookie value to its user. Fails with `Unauthenticated` when the
/// token is forged, expired or revoked.
pub async fn resolve(pool: &PgPool, keys: &SessionKeys, token: &str) -> Result<CurrentUser, AppError> {
    let claims = keys.verify(token)?;
    if !session_queries::is_active(pool, claims.jti, claims.sub).await? {
        return Err(AppError::Unauthenticated);
    }
    Ok(CurrentUser {
        user_id: claims.sub,
        session_id: claims.jti,
    })
}

/// Revokes the session behind a cookie value. Unknown or invalid tokens are
/// already logged out, so this never fails on them.
pub async fn end(pool: &PgPool, keys: &SessionKeys, token: &str) -> Result<(), AppError> {
    match keys.verify(token) {
        Ok(claims) => {
            let removed = session_queries::delete(pool, claims.jti).await?;
            if removed > 0 {
                info!("Session {} ended for user {}", claims.jti, claims.sub);
            }
            Ok(())
        }
        Err(_) => {
            warn!("Ignoring logout with an invalid session token");
            Ok(())
        }
    }
}

pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty())
}

pub fn session_cookie(token: &str, ttl: Duration) -> String {
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE,
        token,
        ttl.num_seconds()
    )
}

pub fn cleared_cookie() -> String {
    format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", SESSION_COOKIE)
}
