use bigdecimal::BigDecimal;
use serde::Serialize;
use sqlx::FromRow;

use crate::models::money::serialize_usd;

// A registered account; `cash` is the simulated balance.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: uuid::Uuid,
    pub username: String,
    pub hash: String,
    pub cash: BigDecimal,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize)]
pub struct UserSummary {
    pub id: uuid::Uuid,
    pub username: String,
    #[serde(serialize_with = "serialize_usd")]
    pub cash: BigDecimal,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<User> for UserSummary {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            cash: user.cash,
            created_at: user.created_at,
        }
    }
}
