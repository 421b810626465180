use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::models::money::serialize_usd;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "buy",
            Side::Sell => "sell",
        }
    }
}

// One executed trade. Rows are never updated or deleted.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Order {
    pub id: i64,
    #[serde(skip_serializing)]
    pub user_id: uuid::Uuid,
    pub symbol: String,
    pub name: String,
    pub shares: i64,
    #[serde(serialize_with = "serialize_usd")]
    pub price: BigDecimal,
    #[serde(serialize_with = "serialize_usd")]
    pub total: BigDecimal,
    pub side: String, // "buy" | "sell", see Side::as_str
    pub executed_at: chrono::DateTime<chrono::Utc>,
}

/// Order row about to be appended; `total` is frozen at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrder {
    pub symbol: String,
    pub name: String,
    pub shares: i64,
    pub price: BigDecimal,
    pub total: BigDecimal,
    pub side: Side,
}

impl NewOrder {
    pub fn new(symbol: String, name: String, shares: i64, price: BigDecimal, side: Side) -> Self {
        let total = &price * &BigDecimal::from(shares);
        Self {
            symbol,
            name,
            shares,
            price,
            total,
            side,
        }
    }
}
