use serde::Serialize;
use sqlx::FromRow;

// Current share count of one symbol for one user.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Holding {
    pub user_id: uuid::Uuid,
    pub symbol: String,
    pub name: String,
    pub shares: i64,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}
