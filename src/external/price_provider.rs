use async_trait::async_trait;
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Current price of one security as reported by the quote service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: String,
    pub name: String,
    pub price: BigDecimal,
}

#[derive(Debug, Error)]
pub enum QuoteProviderError {
    #[error("symbol not found: {0}")]
    NotFound(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("quote request timed out")]
    Timeout,

    #[error("bad response: {0}")]
    BadResponse(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("rate limited")]
    RateLimited,
}

#[async_trait]
pub trait QuoteProvider: Send + Sync {
    async fn fetch_quote(&self, symbol: &str) -> Result<Quote, QuoteProviderError>;
}
