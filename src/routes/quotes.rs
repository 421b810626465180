use axum::extract::rejection::FormRejection;
use axum::extract::State;
use axum::routing::post;
use axum::{Form, Json, Router};
use tracing::{info, warn};

use crate::errors::AppError;
use crate::models::{QuoteForm, QuoteView};
use crate::routes::accept_form;
use crate::services::{quote_service, session_service::CurrentUser};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/quote", post(quote))
}

pub async fn quote(
    State(state): State<AppState>,
    user: CurrentUser,
    form: Result<Form<QuoteForm>, FormRejection>,
) -> Result<Json<QuoteView>, AppError> {
    info!("POST /quote - Quote lookup for user {}", user.user_id);
    let form = accept_form(form)?;
    let quote = quote_service::lookup(state.quote_provider.as_ref(), form)
        .await
        .map_err(|e| {
            warn!("Quote lookup failed: {}", e);
            e
        })?;
    Ok(Json(quote))
}
