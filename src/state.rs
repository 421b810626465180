use std::sync::Arc;
use bigdecimal::BigDecimal;
use sqlx::PgPool;
use crate::external::price_provider::QuoteProvider;
use crate::services::session_service::SessionKeys;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub quote_provider: Arc<dyn QuoteProvider>,
    pub session_keys: Arc<SessionKeys>,
    pub starting_cash: BigDecimal,
}
