use axum::extract::rejection::FormRejection;
use axum::extract::State;
use axum::response::Redirect;
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use tracing::{error, info, warn};

use crate::errors::AppError;
use crate::models::{CashForm, Order, PortfolioView};
use crate::routes::accept_form;
use crate::services::{portfolio_service, session_service::CurrentUser};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/cash", post(add_cash))
        .route("/history", get(history))
}

pub async fn index(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<PortfolioView>, AppError> {
    info!("GET / - Portfolio for user {}", user.user_id);
    let view = portfolio_service::view(&state.pool, state.quote_provider.as_ref(), user.user_id)
        .await
        .map_err(|e| {
            error!("Failed to build portfolio for user {}: {}", user.user_id, e);
            e
        })?;
    Ok(Json(view))
}

pub async fn add_cash(
    State(state): State<AppState>,
    user: CurrentUser,
    form: Result<Form<CashForm>, FormRejection>,
) -> Result<Redirect, AppError> {
    info!("POST /cash - Deposit for user {}", user.user_id);
    let form = accept_form(form)?;
    portfolio_service::deposit(&state.pool, user.user_id, form)
        .await
        .map_err(|e| {
            warn!("Deposit rejected for user {}: {}", user.user_id, e);
            e
        })?;
    Ok(Redirect::to("/"))
}

pub async fn history(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<Order>>, AppError> {
    info!("GET /history - Order history for user {}", user.user_id);
    let orders = portfolio_service::history(&state.pool, user.user_id).await?;
    Ok(Json(orders))
}
