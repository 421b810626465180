use std::any::Any;

use axum::http::header::{CACHE_CONTROL, EXPIRES, PRAGMA};
use axum::http::{HeaderValue, StatusCode};
use axum::response::Response;
use axum::{middleware, Router};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::errors::apology;
use crate::middleware::require_session;
use crate::routes::{auth, health, portfolio, quotes, trades};
use crate::state::AppState;

pub fn create_app(state: AppState) -> Router {
    let protected = Router::<AppState>::new()
        .merge(portfolio::router())
        .merge(trades::router())
        .merge(quotes::router())
        .route_layer(middleware::from_fn_with_state(state.clone(), require_session));

    let routes = Router::<AppState>::new()
        .nest("/health", health::router())
        .merge(auth::router())
        .merge(protected)
        .with_state(state);

    with_response_layers(routes)
}

/// Layers shared by every response. The panic handler sits innermost so its
/// apology still gets the no-cache headers.
fn with_response_layers(router: Router) -> Router {
    router
        .layer(CatchPanicLayer::custom(panic_apology))
        .layer(SetResponseHeaderLayer::overriding(
            CACHE_CONTROL,
            HeaderValue::from_static("no-cache, no-store, must-revalidate"),
        ))
        .layer(SetResponseHeaderLayer::overriding(EXPIRES, HeaderValue::from_static("0")))
        .layer(SetResponseHeaderLayer::overriding(PRAGMA, HeaderValue::from_static("no-cache")))
        .layer(TraceLayer::new_for_http())
}

fn panic_apology(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    error!("Handler panicked: {}", detail);
    apology(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
}
