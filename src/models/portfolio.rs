use bigdecimal::BigDecimal;
use serde::Serialize;

use crate::models::money::serialize_usd;

#[derive(Debug, Serialize)]
pub struct HoldingLine {
    pub symbol: String,
    pub name: String,
    pub shares: i64,
    #[serde(serialize_with = "serialize_usd")]
    pub price: BigDecimal,
    #[serde(serialize_with = "serialize_usd")]
    pub total: BigDecimal,
}

/// Response of `GET /`. Amounts keep full precision until serialized.
#[derive(Debug, Serialize)]
pub struct PortfolioView {
    pub holdings: Vec<HoldingLine>,
    #[serde(serialize_with = "serialize_usd")]
    pub cash: BigDecimal,
    #[serde(serialize_with = "serialize_usd")]
    pub net_worth: BigDecimal,
}

#[derive(Debug, Serialize)]
pub struct QuoteView {
    pub symbol: String,
    pub name: String,
    #[serde(serialize_with = "serialize_usd")]
    pub price: BigDecimal,
}
