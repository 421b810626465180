use axum::extract::rejection::FormRejection;
use axum::extract::State;
use axum::http::header::{LOCATION, SET_COOKIE};
use axum::http::HeaderMap;
use http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use tracing::{error, info};

use crate::errors::ForbiddenOnInvalid;
use crate::models::{LoginForm, RegisterForm, UserSummary};
use crate::routes::accept_form;
use crate::services::{auth_service, session_service};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", get(logout))
}

pub async fn register(
    State(state): State<AppState>,
    form: Result<Form<RegisterForm>, FormRejection>,
) -> Result<(StatusCode, Json<UserSummary>), ForbiddenOnInvalid> {
    info!("POST /register - Registering user");
    let form = accept_form(form)?;
    let user = auth_service::register(&state.pool, &state.starting_cash, form)
        .await
        .map_err(|e| {
            error!("Registration failed: {}", e);
            e.into_forbidden()
        })?;
    Ok((StatusCode::CREATED, Json(UserSummary::from(user))))
}

pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    form: Result<Form<LoginForm>, FormRejection>,
) -> Result<Response, ForbiddenOnInvalid> {
    info!("POST /login - Logging in");

    // any session this browser already had is dropped first
    if let Some(token) = session_service::token_from_headers(&headers) {
        session_service::end(&state.pool, &state.session_keys, &token).await?;
    }

    let form = accept_form(form)?;
    let user = auth_service::login(&state.pool, form)
        .await
        .map_err(|e| {
            error!("Login failed: {}", e);
            e.into_forbidden()
        })?;

    let token = session_service::start(&state.pool, &state.session_keys, user.id).await?;
    let cookie = session_service::session_cookie(&token, state.session_keys.ttl());

    Ok((
        StatusCode::SEE_OTHER,
        [(LOCATION, "/".to_string()), (SET_COOKIE, cookie)],
    )
        .into_response())
}

/// Always succeeds: revokes the session if there is one and clears the cookie.
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    info!("GET /logout - Logging out");
    if let Some(token) = session_service::token_from_headers(&headers) {
        if let Err(e) = session_service::end(&state.pool, &state.session_keys, &token).await {
            error!("Failed to revoke session on logout: {}", e);
        }
    }

    (
        StatusCode::SEE_OTHER,
        [
            (LOCATION, "/login".to_string()),
            (SET_COOKIE, session_service::cleared_cookie()),
        ],
    )
        .into_response()
}
