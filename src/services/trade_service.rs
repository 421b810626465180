use sqlx::{PgConnection, PgPool};
use tracing::{error, info};
use uuid::Uuid;

use crate::db::{holding_queries, order_queries, user_queries};
use crate::errors::AppError;
use crate::external::price_provider::{Quote, QuoteProvider};
use crate::models::{Order, TradeForm};
use crate::services::ledger::{self, TradePlan};

/// A buy that passed every check that does not need the user's balance.
#[derive(Debug)]
pub struct BuyRequest {
    pub quote: Quote,
    pub shares: i64,
}

/// A sell that passed the form checks.
#[derive(Debug, PartialEq)]
pub struct SellRequest {
    pub symbol: String,
    pub shares: i64,
}

pub fn normalize_symbol(raw: &str) -> String {
    raw.trim().to_uppercase()
}

fn required<'a>(value: &'a Option<String>, message: &str) -> Result<&'a str, AppError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::Validation(message.to_string()))
}

/// Runs the buy preconditions in order: symbol present, shares present,
/// symbol known to the quote service, shares a positive integer.
pub async fn prepare_buy(
    provider: &dyn QuoteProvider,
    form: &TradeForm,
) -> Result<BuyRequest, AppError> {
    let symbol = normalize_symbol(required(&form.symbol, "missing symbol")?);
    let raw_shares = required(&form.shares, "missing shares")?;

    let mut quote = provider.fetch_quote(&symbol).await.map_err(|e| match AppError::from(e) {
        AppError::UnknownSymbol(_) => AppError::Validation("unknown symbol".into()),
        other => other,
    })?;
    // holdings are keyed by the normalized request symbol
    quote.symbol = symbol;

    let shares = ledger::parse_count(raw_shares)
        .filter(|s| *s > 0)
        .ok_or_else(|| AppError::Validation("shares must be positive".into()))?;

    Ok(BuyRequest { quote, shares })
}

pub fn prepare_sell(form: &TradeForm) -> Result<SellRequest, AppError> {
    let symbol = normalize_symbol(required(&form.symbol, "missing symbol")?);
    let raw_shares = required(&form.shares, "missing shares")?;

    let shares = ledger::parse_count(raw_shares)
        .ok_or_else(|| AppError::Validation("shares must be non-negative".into()))?;
    ledger::check_sell_count(shares)?;

    Ok(SellRequest { symbol, shares })
}

async fn apply(conn: &mut PgConnection, user_id: Uuid, plan: &TradePlan) -> Result<Order, AppError> {
    user_queries::set_cash(conn, user_id, &plan.cash_after).await?;

    if plan.shares_after > 0 {
        holding_queries::upsert(conn, user_id, &plan.order.symbol, &plan.order.name, plan.shares_after).await?;
    } else {
        holding_queries::delete(conn, user_id, &plan.order.symbol).await?;
    }

    let order = order_queries::insert(conn, user_id, &plan.order).await?;
    Ok(order)
}

/// Executes a market buy. Cash, holding and order log change together or not
/// at all.
pub async fn buy(
    pool: &PgPool,
    provider: &dyn QuoteProvider,
    user_id: Uuid,
    form: TradeForm,
) -> Result<Order, AppError> {
    let request = prepare_buy(provider, &form).await?;

    let mut tx = pool.begin().await?;

    let cash = user_queries::lock_cash(&mut *tx, user_id)
        .await?
        .ok_or(AppError::Unauthenticated)?;
    let held = holding_queries::fetch_shares(&mut *tx, user_id, &request.quote.symbol)
        .await?
        .unwrap_or(0);

    let plan = ledger::plan_buy(&cash, held, &request.quote, request.shares)?;
    let order = apply(&mut *tx, user_id, &plan).await?;

    tx.commit().await.map_err(|e| {
        error!("Failed to commit buy of {} for user {}: {}", order.symbol, user_id, e);
        e
    })?;

    info!(
        "User {} bought {} {} at {} (total {})",
        user_id, order.shares, order.symbol, order.price, order.total
    );
    Ok(order)
}

/// Executes a market sell at the price quoted now, not the purchase price.
pub async fn sell(
    pool: &PgPool,
    provider: &dyn QuoteProvider,
    user_id: Uuid,
    form: TradeForm,
) -> Result<Order, AppError> {
    let request = prepare_sell(&form)?;

    // Early answer for the common case. The authoritative check is repeated
    // below under the row lock.
    let mut conn = pool.acquire().await?;
    let held = holding_queries::fetch_shares(&mut *conn, user_id, &request.symbol).await?;
    ledger::check_sell_holdings(held, request.shares)?;
    drop(conn);

    let quote = provider.fetch_quote(&request.symbol).await?;

    let mut tx = pool.begin().await?;

    let cash = user_queries::lock_cash(&mut *tx, user_id)
        .await?
        .ok_or(AppError::Unauthenticated)?;
    let held = holding_queries::fetch_shares(&mut *tx, user_id, &request.symbol).await?;

    let plan = ledger::plan_sell(&cash, held, &request.symbol, &quote, request.shares)?;
    let order = apply(&mut *tx, user_id, &plan).await?;

    tx.commit().await.map_err(|e| {
        error!("Failed to commit sell of {} for user {}: {}", order.symbol, user_id, e);
        e
    })?;

    info!(
        "User {} sold {} {} at {} (total {})",
        user_id, order.shares, order.symbol, order.price, order.total
    );
    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;

    use crate::external::stub::StubProvider;

    fn trade(symbol: Option<&str>, shares: Option<&str>) -> TradeForm {
        TradeForm {
            symbol: symbol.map(String::from),
            shares: shares.map(String::from),
        }
    }

    fn validation_message(err: AppError) -> String {
        match err {
            AppError::Validation(m) => m,
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_buy_missing_symbol_checked_first() {
        let provider = StubProvider::with(&[("X", "50")]);
        let err = prepare_buy(&provider, &trade(None, None)).await.unwrap_err();
        assert_eq!(validation_message(err), "missing symbol");

        let err = prepare_buy(&provider, &trade(Some("   "), Some("1"))).await.unwrap_err();
        assert_eq!(validation_message(err), "missing symbol");
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_buy_missing_shares_checked_before_lookup() {
        let provider = StubProvider::with(&[("X", "50")]);
        let err = prepare_buy(&provider, &trade(Some("X"), Some(""))).await.unwrap_err();
        assert_eq!(validation_message(err), "missing shares");
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_buy_unknown_symbol_before_share_sign() {
        let provider = StubProvider::with(&[("X", "50")]);
        let err = prepare_buy(&provider, &trade(Some("NOPE"), Some("-3"))).await.unwrap_err();
        assert_eq!(validation_message(err), "unknown symbol");
    }

    #[tokio::test]
    async fn test_buy_rejects_non_positive_or_non_integer_shares() {
        let provider = StubProvider::with(&[("X", "50")]);
        for raw in ["0", "-1", "2.5", "many"] {
            let err = prepare_buy(&provider, &trade(Some("X"), Some(raw))).await.unwrap_err();
            assert_eq!(validation_message(err), "shares must be positive");
        }
    }

    #[tokio::test]
    async fn test_buy_normalizes_symbol() {
        let provider = StubProvider::with(&[("X", "50")]);
        let req = prepare_buy(&provider, &trade(Some(" x "), Some("10"))).await.unwrap();
        assert_eq!(req.quote.symbol, "X");
        assert_eq!(req.shares, 10);
    }

    #[tokio::test]
    async fn test_buy_with_quote_service_down_is_upstream_error() {
        let provider = StubProvider::unavailable();
        let err = prepare_buy(&provider, &trade(Some("X"), Some("1"))).await.unwrap_err();
        assert!(matches!(err, AppError::Upstream(_)));
    }

    #[test]
    fn test_sell_form_checks_in_order() {
        assert_eq!(
            validation_message(prepare_sell(&trade(None, Some("1"))).unwrap_err()),
            "missing symbol"
        );
        assert_eq!(
            validation_message(prepare_sell(&trade(Some("X"), None)).unwrap_err()),
            "missing shares"
        );
        assert_eq!(
            validation_message(prepare_sell(&trade(Some("X"), Some("-2"))).unwrap_err()),
            "shares must be non-negative"
        );
        assert_eq!(
            validation_message(prepare_sell(&trade(Some("X"), Some("0"))).unwrap_err()),
            "shares must be positive"
        );
    }

    #[test]
    fn test_sell_form_accepted() {
        let req = prepare_sell(&trade(Some("aapl"), Some(" 4 "))).unwrap();
        assert_eq!(
            req,
            SellRequest {
                symbol: "AAPL".into(),
                shares: 4
            }
        );
    }

    async fn user(pool: &PgPool) -> Uuid {
        user_queries::insert(pool, "alice", "hash", &BigDecimal::from(10000))
            .await
            .unwrap()
            .id
    }

    /// Cash, shares of X and order count, as stored.
    async fn stored(pool: &PgPool, user_id: Uuid) -> (BigDecimal, Option<i64>, usize) {
        let cash = user_queries::fetch_cash(pool, user_id).await.unwrap().unwrap();
        let mut conn = pool.acquire().await.unwrap();
        let shares = holding_queries::fetch_shares(&mut *conn, user_id, "X").await.unwrap();
        let orders = order_queries::fetch_all(pool, user_id).await.unwrap().len();
        (cash, shares, orders)
    }

    fn dec(s: &str) -> BigDecimal {
        s.parse().unwrap()
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_buy_then_sell_updates_all_three_stores(pool: PgPool) {
        let alice = user(&pool).await;

        let bought = buy(&pool, &StubProvider::with(&[("X", "50")]), alice, trade(Some("x"), Some("10")))
            .await
            .unwrap();
        assert_eq!(bought.side, "buy");
        assert_eq!(stored(&pool, alice).await, (dec("9500"), Some(10), 1));

        let sold = sell(&pool, &StubProvider::with(&[("X", "60")]), alice, trade(Some("X"), Some("4")))
            .await
            .unwrap();
        assert_eq!(sold.side, "sell");
        assert_eq!(sold.total, dec("240"));
        assert_eq!(stored(&pool, alice).await, (dec("9740"), Some(6), 2));

        let history = order_queries::fetch_all(&pool, alice).await.unwrap();
        assert_eq!(history[0].id, bought.id);
        assert_eq!(history[1].id, sold.id);
        assert_eq!(history[1].price, dec("60"));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_rejected_trades_leave_storage_unchanged(pool: PgPool) {
        let alice = user(&pool).await;
        let provider = StubProvider::with(&[("X", "50")]);
        buy(&pool, &provider, alice, trade(Some("X"), Some("10"))).await.unwrap();
        let before = stored(&pool, alice).await;

        let err = sell(&pool, &provider, alice, trade(Some("X"), Some("11"))).await.unwrap_err();
        assert!(matches!(err, AppError::InsufficientHoldings));
        assert_eq!(stored(&pool, alice).await, before);

        let err = buy(&pool, &provider, alice, trade(Some("X"), Some("300"))).await.unwrap_err();
        assert!(matches!(err, AppError::InsufficientFunds));
        assert_eq!(stored(&pool, alice).await, before);

        let err = sell(&pool, &provider, alice, trade(Some("NOPE"), Some("1"))).await.unwrap_err();
        assert!(matches!(err, AppError::InsufficientHoldings));
        assert_eq!(stored(&pool, alice).await, before);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_uncommitted_trade_rolls_back(pool: PgPool) {
        let alice = user(&pool).await;
        let before = stored(&pool, alice).await;

        let quote = Quote {
            symbol: "X".into(),
            name: "X Inc".into(),
            price: dec("50"),
        };
        let plan = ledger::plan_buy(&before.0, 0, &quote, 10).unwrap();

        let mut tx = pool.begin().await.unwrap();
        apply(&mut *tx, alice, &plan).await.unwrap();
        drop(tx);

        assert_eq!(stored(&pool, alice).await, before);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_full_sell_removes_holding(pool: PgPool) {
        let alice = user(&pool).await;
        let provider = StubProvider::with(&[("X", "50")]);
        buy(&pool, &provider, alice, trade(Some("X"), Some("10"))).await.unwrap();
        sell(&pool, &provider, alice, trade(Some("X"), Some("10"))).await.unwrap();

        assert_eq!(stored(&pool, alice).await, (dec("10000"), None, 2));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_overlapping_sells_never_oversell(pool: PgPool) {
        let alice = user(&pool).await;
        let provider = StubProvider::with(&[("X", "10")]);
        buy(&pool, &provider, alice, trade(Some("X"), Some("10"))).await.unwrap();

        let (first, second) = tokio::join!(
            sell(&pool, &provider, alice, trade(Some("X"), Some("6"))),
            sell(&pool, &provider, alice, trade(Some("X"), Some("6"))),
        );
        let results = [first, second];
        let succeeded = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(succeeded, 1);
        assert!(results
            .iter()
            .any(|r| matches!(r, Err(AppError::InsufficientHoldings))));

        assert_eq!(stored(&pool, alice).await, (dec("9960"), Some(4), 2));
    }
}

