//! Portfolio consistency rules.
//!
//! Every function here is pure: it takes the state read under the user's row
//! lock, and either rejects the request or returns the complete set of effects
//! a trade must apply (new cash balance, new share count, the order row). The
//! caller writes all three inside one transaction, so a rejection never
//! produces a partial effect.

use bigdecimal::BigDecimal;

use crate::errors::AppError;
use crate::external::price_provider::Quote;
use crate::models::{Holding, HoldingLine, NewOrder, PortfolioView, Side};

/// Effects of one executed trade.
#[derive(Debug, Clone, PartialEq)]
pub struct TradePlan {
    pub cash_after: BigDecimal,
    /// Share count of the holding after the trade. Zero means the row goes away.
    pub shares_after: i64,
    pub order: NewOrder,
}

fn check_price(quote: &Quote) -> Result<(), AppError> {
    if quote.price <= BigDecimal::from(0) {
        return Err(AppError::Upstream(format!(
            "{}: non-positive price {}",
            quote.symbol, quote.price
        )));
    }
    Ok(())
}

/// Parses a share count or cash amount typed into a form.
pub fn parse_count(raw: &str) -> Option<i64> {
    raw.trim().parse::<i64>().ok()
}

pub fn plan_buy(
    cash: &BigDecimal,
    held: i64,
    quote: &Quote,
    shares: i64,
) -> Result<TradePlan, AppError> {
    if shares <= 0 {
        return Err(AppError::Validation("shares must be positive".into()));
    }
    check_price(quote)?;

    let order = NewOrder::new(
        quote.symbol.clone(),
        quote.name.clone(),
        shares,
        quote.price.clone(),
        Side::Buy,
    );

    if &order.total > cash {
        return Err(AppError::InsufficientFunds);
    }

    let shares_after = held
        .max(0)
        .checked_add(shares)
        .ok_or_else(|| AppError::Validation("share count too large".into()))?;

    Ok(TradePlan {
        cash_after: cash - &order.total,
        shares_after,
        order,
    })
}

/// `held` is `None` when the user has never owned the symbol.
pub fn plan_sell(
    cash: &BigDecimal,
    held: Option<i64>,
    symbol: &str,
    quote: &Quote,
    shares: i64,
) -> Result<TradePlan, AppError> {
    check_sell_count(shares)?;
    check_sell_holdings(held, shares)?;
    check_price(quote)?;

    let held = held.unwrap_or(0);
    let order = NewOrder::new(
        symbol.to_string(),
        quote.name.clone(),
        shares,
        quote.price.clone(),
        Side::Sell,
    );

    Ok(TradePlan {
        cash_after: cash + &order.total,
        shares_after: held - shares,
        order,
    })
}

pub fn check_sell_count(shares: i64) -> Result<(), AppError> {
    if shares < 0 {
        return Err(AppError::Validation("shares must be non-negative".into()));
    }
    if shares == 0 {
        return Err(AppError::Validation("shares must be positive".into()));
    }
    Ok(())
}

pub fn check_sell_holdings(held: Option<i64>, shares: i64) -> Result<(), AppError> {
    match held {
        Some(h) if shares <= h => Ok(()),
        _ => Err(AppError::InsufficientHoldings),
    }
}

/// Values every holding at its quote. Totals are accumulated at full
/// precision; rounding happens when the view is serialized.
pub fn value_portfolio(cash: BigDecimal, priced: Vec<(Holding, Quote)>) -> PortfolioView {
    let mut net_worth = cash.clone();
    let mut holdings = Vec::with_capacity(priced.len());

    for (holding, quote) in priced {
        if holding.shares <= 0 {
            continue;
        }
        let total = &quote.price * &BigDecimal::from(holding.shares);
        net_worth += &total;
        holdings.push(HoldingLine {
            symbol: holding.symbol,
            name: holding.name,
            shares: holding.shares,
            price: quote.price,
            total,
        });
    }

    PortfolioView {
        holdings,
        cash,
        net_worth,
    }
}
