use axum::extract::rejection::FormRejection;
use axum::extract::State;
use axum::response::Redirect;
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use tracing::{info, warn};

use crate::errors::AppError;
use crate::models::TradeForm;
use crate::routes::accept_form;
use crate::services::{portfolio_service, session_service::CurrentUser, trade_service};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/buy", post(buy))
        .route("/sell", get(sellable).post(sell))
}

pub async fn buy(
    State(state): State<AppState>,
    user: CurrentUser,
    form: Result<Form<TradeForm>, FormRejection>,
) -> Result<Redirect, AppError> {
    info!("POST /buy - Buy for user {}", user.user_id);
    let form = accept_form(form)?;
    trade_service::buy(&state.pool, state.quote_provider.as_ref(), user.user_id, form)
        .await
        .map_err(|e| {
            warn!("Buy rejected for user {}: {}", user.user_id, e);
            e
        })?;
    Ok(Redirect::to("/"))
}

pub async fn sell(
    State(state): State<AppState>,
    user: CurrentUser,
    form: Result<Form<TradeForm>, FormRejection>,
) -> Result<Redirect, AppError> {
    info!("POST /sell - Sell for user {}", user.user_id);
    let form = accept_form(form)?;
    trade_service::sell(&state.pool, state.quote_provider.as_ref(), user.user_id, form)
        .await
        .map_err(|e| {
            warn!("Sell rejected for user {}: {}", user.user_id, e);
            e
        })?;
    Ok(Redirect::to("/"))
}

/// Symbols the user can currently sell.
pub async fn sellable(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<String>>, AppError> {
    info!("GET /sell - Sellable symbols for user {}", user.user_id);
    let symbols = portfolio_service::sellable_symbols(&state.pool, user.user_id).await?;
    Ok(Json(symbols))
}
