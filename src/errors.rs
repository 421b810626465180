use axum::http::header::LOCATION;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use sqlx::Error;
use thiserror::Error;

use crate::external::price_provider::QuoteProviderError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Db(sqlx::Error),
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Auth(String),
    #[error("can't afford")]
    InsufficientFunds,
    #[error("not enough shares")]
    InsufficientHoldings,
    #[error("unknown symbol: {0}")]
    UnknownSymbol(String),
    #[error("Quote service error: {0}")]
    Upstream(String),
    #[error("Internal error: {0}")]
    Internal(String),
    #[error("Not logged in")]
    Unauthenticated,
}

/// Body of every error response.
#[derive(Debug, Serialize)]
pub struct Apology {
    pub status: u16,
    pub message: String,
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_)
            | AppError::InsufficientFunds
            | AppError::InsufficientHoldings
            | AppError::UnknownSymbol(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) | AppError::Auth(_) => StatusCode::FORBIDDEN,
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
            AppError::Db(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Unauthenticated => StatusCode::SEE_OTHER,
        }
    }

    /// Message safe to show to the user. Server-side detail stays in the logs.
    pub fn public_message(&self) -> String {
        match self {
            AppError::Db(_) | AppError::Internal(_) => "internal server error".to_string(),
            AppError::Upstream(_) => "quote service unavailable".to_string(),
            AppError::UnknownSymbol(_) => "unknown symbol".to_string(),
            other => other.to_string(),
        }
    }

    /// The login and registration forms answer 403 for any rejected input.
    pub fn into_forbidden(self) -> ForbiddenOnInvalid {
        ForbiddenOnInvalid(self)
    }
}

pub fn apology(status: StatusCode, message: impl Into<String>) -> axum::response::Response {
    let body = Apology {
        status: status.as_u16(),
        message: message.into(),
    };
    (status, Json(body)).into_response()
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        match self {
            AppError::Unauthenticated => {
                (StatusCode::SEE_OTHER, [(LOCATION, "/login")]).into_response()
            }
            other => apology(other.status_code(), other.public_message()),
        }
    }
}

/// Wrapper used by the auth routes: validation failures render as 403.
#[derive(Debug)]
pub struct ForbiddenOnInvalid(pub AppError);

impl IntoResponse for ForbiddenOnInvalid {
    fn into_response(self) -> axum::response::Response {
        match self.0 {
            AppError::Validation(msg) => apology(StatusCode::FORBIDDEN, msg),
            other => other.into_response(),
        }
    }
}

impl From<AppError> for ForbiddenOnInvalid {
    fn from(value: AppError) -> Self {
        ForbiddenOnInvalid(value)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(value: Error) -> Self {
        AppError::Db(value)
    }
}

impl From<QuoteProviderError> for AppError {
    fn from(value: QuoteProviderError) -> Self {
        match value {
            QuoteProviderError::NotFound(symbol) => AppError::UnknownSymbol(symbol),
            other => AppError::Upstream(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_business_rejections_are_bad_request() {
        assert_eq!(AppError::InsufficientFunds.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::InsufficientHoldings.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::Validation("missing symbol".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_conflict_and_auth_are_forbidden() {
        assert_eq!(AppError::Conflict("username exists".into()).status_code(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::Auth("invalid".into()).status_code(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_internal_errors_hide_detail() {
        let err = AppError::Internal("argon2 exploded at line 42".into());
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.public_message(), "internal server error");

        let err = AppError::Db(sqlx::Error::RowNotFound);
        assert_eq!(err.public_message(), "internal server error");
    }

    #[test]
    fn test_quote_errors_map_to_unknown_or_upstream() {
        let unknown: AppError = QuoteProviderError::NotFound("ZZZZ".into()).into();
        assert!(matches!(unknown, AppError::UnknownSymbol(ref s) if s == "ZZZZ"));
        assert_eq!(unknown.status_code(), StatusCode::BAD_REQUEST);

        let timeout: AppError = QuoteProviderError::Timeout.into();
        assert_eq!(timeout.status_code(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_validation_on_auth_forms_renders_forbidden() {
        let resp = AppError::Validation("must provide username".into())
            .into_forbidden()
            .into_response();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let resp = AppError::InsufficientFunds.into_forbidden().into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_unauthenticated_redirects_to_login() {
        let resp = AppError::Unauthenticated.into_response();
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(resp.headers().get(LOCATION).unwrap(), "/login");
    }
}
