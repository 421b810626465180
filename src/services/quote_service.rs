use crate::errors::AppError;
use crate::external::price_provider::QuoteProvider;
use crate::models::{QuoteForm, QuoteView};
use crate::services::trade_service::normalize_symbol;

pub async fn lookup(provider: &dyn QuoteProvider, form: QuoteForm) -> Result<QuoteView, AppError> {
    let symbol = form
        .symbol
        .as_deref()
        .map(normalize_symbol)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::Validation("missing symbol".into()))?;

    let quote = provider.fetch_quote(&symbol).await?;
    Ok(QuoteView {
        symbol: quote.symbol,
        name: quote.name,
        price: quote.price,
    })
}
