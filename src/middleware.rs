use async_trait::async_trait;
use axum::body::Body;
use axum::extract::{FromRequestParts, State};
use axum::http::request::Parts;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::debug;

use crate::errors::AppError;
use crate::services::session_service::{self, CurrentUser};
use crate::state::AppState;

/// Guards routes that need a logged-in user. Requests without a live session
/// are sent to `/login`; otherwise the caller is stored in the request
/// extensions for the `CurrentUser` extractor.
pub async fn require_session(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let Some(token) = session_service::token_from_headers(request.headers()) else {
        debug!("No session cookie on {}", request.uri().path());
        return AppError::Unauthenticated.into_response();
    };

    match session_service::resolve(&state.pool, &state.session_keys, &token).await {
        Ok(user) => {
            debug!("Session {} resolved to user {}", user.session_id, user.user_id);
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .copied()
            .ok_or(AppError::Unauthenticated)
    }
}
