use bigdecimal::BigDecimal;
use futures::future::try_join_all;
use sqlx::PgPool;
use tracing::{error, info};
use uuid::Uuid;

use crate::db::{holding_queries, order_queries, user_queries};
use crate::errors::AppError;
use crate::external::price_provider::{Quote, QuoteProvider};
use crate::models::{CashForm, Holding, Order, PortfolioView};
use crate::services::ledger;

/// Prices every holding concurrently. Any failed lookup fails the whole call;
/// a holding is never shown with a stale or zero price.
pub async fn price_holdings(
    provider: &dyn QuoteProvider,
    holdings: Vec<Holding>,
) -> Result<Vec<(Holding, Quote)>, AppError> {
    let lookups = holdings.into_iter().map(|holding| async move {
        match provider.fetch_quote(&holding.symbol).await {
            Ok(quote) => Ok((holding, quote)),
            Err(e) => {
                error!("Price lookup failed for held symbol {}: {}", holding.symbol, e);
                Err(AppError::Upstream(format!("{}: {}", holding.symbol, e)))
            }
        }
    });
    try_join_all(lookups).await
}

/// Portfolio at current prices.
///
/// Part of the contract: the caller's holdings at zero or fewer shares are
/// deleted before anything is valued.
pub async fn view(
    pool: &PgPool,
    provider: &dyn QuoteProvider,
    user_id: Uuid,
) -> Result<PortfolioView, AppError> {
    let pruned = holding_queries::prune_empty(pool, user_id).await?;
    if pruned > 0 {
        info!("Pruned {} empty holdings for user {}", pruned, user_id);
    }

    let cash = user_queries::fetch_cash(pool, user_id)
        .await?
        .ok_or(AppError::Unauthenticated)?;
    let holdings = holding_queries::fetch_all(pool, user_id).await?;

    let priced = price_holdings(provider, holdings).await?;
    Ok(ledger::value_portfolio(cash, priced))
}

pub fn parse_deposit(form: &CashForm) -> Result<BigDecimal, AppError> {
    form.cash
        .as_deref()
        .and_then(ledger::parse_count)
        .filter(|amount| *amount > 0)
        .map(BigDecimal::from)
        .ok_or_else(|| AppError::Validation("must add a positive amount".into()))
}

pub async fn deposit(pool: &PgPool, user_id: Uuid, form: CashForm) -> Result<BigDecimal, AppError> {
    let amount = parse_deposit(&form)?;
    let cash = user_queries::add_cash(pool, user_id, &amount)
        .await?
        .ok_or(AppError::Unauthenticated)?;
    info!("User {} deposited {}", user_id, amount);
    Ok(cash)
}

pub async fn history(pool: &PgPool, user_id: Uuid) -> Result<Vec<Order>, AppError> {
    let orders = order_queries::fetch_all(pool, user_id).await?;
    Ok(orders)
}

pub async fn sellable_symbols(pool: &PgPool, user_id: Uuid) -> Result<Vec<String>, AppError> {
    let symbols = holding_queries::fetch_symbols(pool, user_id).await?;
    Ok(symbols)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::stub::StubProvider;
    use crate::models::TradeForm;
    use crate::services::trade_service;

    fn holding(symbol: &str, shares: i64) -> Holding {
        Holding {
            user_id: Uuid::nil(),
            symbol: symbol.to_string(),
            name: format!("{} Inc", symbol),
            shares,
            updated_at: chrono::Utc::now(),
        }
    }

    fn cash(raw: Option<&str>) -> CashForm {
        CashForm {
            cash: raw.map(String::from),
        }
    }

    #[tokio::test]
    async fn test_price_holdings_pairs_each_holding_with_its_quote() {
        let provider = StubProvider::with(&[("X", "60"), ("Y", "10")]);
        let priced = price_holdings(&provider, vec![holding("X", 6), holding("Y", 2)])
            .await
            .unwrap();

        assert_eq!(priced.len(), 2);
        assert_eq!(priced[0].0.symbol, "X");
        assert_eq!(priced[0].1.price, "60".parse::<BigDecimal>().unwrap());
        assert_eq!(priced[1].0.symbol, "Y");
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_price_holdings_fails_loudly_on_unknown_symbol() {
        let provider = StubProvider::with(&[("X", "60")]);
        let err = price_holdings(&provider, vec![holding("X", 6), holding("GONE", 1)])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Upstream(ref m) if m.starts_with("GONE")));
    }

    #[tokio::test]
    async fn test_price_holdings_fails_when_service_down() {
        let provider = StubProvider::unavailable();
        let err = price_holdings(&provider, vec![holding("X", 1)]).await.unwrap_err();
        assert!(matches!(err, AppError::Upstream(_)));
    }

    #[tokio::test]
    async fn test_empty_portfolio_needs_no_lookups() {
        let provider = StubProvider::unavailable();
        let priced = price_holdings(&provider, Vec::new()).await.unwrap();
        assert!(priced.is_empty());
        assert_eq!(provider.calls(), 0);
    }

    #[test]
    fn test_deposit_accepts_positive_integer() {
        assert_eq!(parse_deposit(&cash(Some(" 250 "))).unwrap(), BigDecimal::from(250));
    }

    #[test]
    fn test_deposit_rejects_everything_else() {
        for raw in [None, Some(""), Some("0"), Some("-10"), Some("12.5"), Some("lots")] {
            let err = parse_deposit(&cash(raw)).unwrap_err();
            assert!(matches!(err, AppError::Validation(ref m) if m == "must add a positive amount"));
        }
    }

    fn dec(s: &str) -> BigDecimal {
        s.parse().unwrap()
    }

    fn trade(symbol: &str, shares: &str) -> TradeForm {
        TradeForm {
            symbol: Some(symbol.to_string()),
            shares: Some(shares.to_string()),
        }
    }

    async fn user(pool: &PgPool) -> Uuid {
        user_queries::insert(pool, "alice", "hash", &BigDecimal::from(10000))
            .await
            .unwrap()
            .id
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_view_after_trades(pool: PgPool) {
        let alice = user(&pool).await;
        trade_service::buy(&pool, &StubProvider::with(&[("X", "50")]), alice, trade("X", "10"))
            .await
            .unwrap();
        trade_service::sell(&pool, &StubProvider::with(&[("X", "60")]), alice, trade("X", "4"))
            .await
            .unwrap();

        let view = view(&pool, &StubProvider::with(&[("X", "60")]), alice).await.unwrap();
        assert_eq!(view.holdings.len(), 1);
        assert_eq!(view.holdings[0].shares, 6);
        assert_eq!(view.holdings[0].total, dec("360"));
        assert_eq!(view.cash, dec("9740"));
        assert_eq!(view.net_worth, dec("10100"));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_view_after_full_sell_shows_no_row(pool: PgPool) {
        let alice = user(&pool).await;
        let provider = StubProvider::with(&[("X", "50")]);
        trade_service::buy(&pool, &provider, alice, trade("X", "10")).await.unwrap();
        trade_service::sell(&pool, &provider, alice, trade("X", "10")).await.unwrap();

        let view = view(&pool, &StubProvider::unavailable(), alice).await.unwrap();
        assert!(view.holdings.is_empty());
        assert_eq!(view.net_worth, dec("10000"));
        assert!(sellable_symbols(&pool, alice).await.unwrap().is_empty());
        assert_eq!(history(&pool, alice).await.unwrap().len(), 2);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_view_prunes_empty_rows(pool: PgPool) {
        let alice = user(&pool).await;
        let mut conn = pool.acquire().await.unwrap();
        holding_queries::upsert(&mut *conn, alice, "Z", "Z Inc", 0).await.unwrap();
        drop(conn);

        let view = view(&pool, &StubProvider::unavailable(), alice).await.unwrap();
        assert!(view.holdings.is_empty());
        assert!(holding_queries::fetch_all(&pool, alice).await.unwrap().is_empty());
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_deposit_adds_to_balance(pool: PgPool) {
        let alice = user(&pool).await;
        let cash = deposit(&pool, alice, CashForm { cash: Some("250".into()) }).await.unwrap();
        assert_eq!(cash, dec("10250"));

        let err = deposit(&pool, alice, CashForm { cash: Some("-1".into()) }).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(user_queries::fetch_cash(&pool, alice).await.unwrap(), Some(dec("10250")));
    }
}

