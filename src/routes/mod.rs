pub(crate) mod auth;
pub(crate) mod health;
pub(crate) mod portfolio;
pub(crate) mod quotes;
pub(crate) mod trades;

use axum::extract::rejection::FormRejection;
use axum::Form;
use tracing::warn;

use crate::errors::AppError;

/// Turns an undecodable form body into a validation error instead of axum's
/// plain-text rejection.
pub(crate) fn accept_form<T>(form: Result<Form<T>, FormRejection>) -> Result<T, AppError> {
    match form {
        Ok(Form(value)) => Ok(value),
        Err(rejection) => {
            warn!("Rejected form body: {}", rejection.body_text());
            Err(AppError::Validation("malformed form".into()))
        }
    }
}
