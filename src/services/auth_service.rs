use std::sync::OnceLock;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use bigdecimal::BigDecimal;
use sqlx::PgPool;
use tracing::{error, info, warn};

use crate::db::user_queries;
use crate::errors::AppError;
use crate::models::{LoginForm, RegisterForm, User};

const INVALID_CREDENTIALS: &str = "invalid username and/or password";

/// Returns the trimmed value, or `None` when the field is absent or blank.
fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

pub struct Registration {
    pub username: String,
    pub password: String,
}

pub fn validate_registration(form: &RegisterForm) -> Result<Registration, AppError> {
    let username = present(&form.username)
        .ok_or_else(|| AppError::Validation("must provide username".into()))?;
    let password = form
        .password
        .as_deref()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::Validation("must provide password".into()))?;
    let confirmation = form
        .confirmation
        .as_deref()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::Validation("must provide password confirmation".into()))?;

    if password != confirmation {
        return Err(AppError::Validation("passwords do not match".into()));
    }

    Ok(Registration {
        username: username.to_string(),
        password: password.to_string(),
    })
}

pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("password hashing failed: {}", e)))
}

/// Constant-time check of a password against a stored PHC string. A malformed
/// stored hash counts as a mismatch.
pub fn verify_password(password: &str, stored: &str) -> bool {
    match PasswordHash::new(stored) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            error!("Stored password hash is malformed: {}", e);
            false
        }
    }
}

/// Hash verified when the username does not exist, so both failure paths cost
/// the same.
fn dummy_hash() -> &'static str {
    static DUMMY: OnceLock<String> = OnceLock::new();
    DUMMY.get_or_init(|| {
        hash_password("stocksim-dummy-password").unwrap_or_default()
    })
}

async fn run_blocking<T, F>(f: F) -> Result<T, AppError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AppError::Internal(format!("blocking task failed: {}", e)))
}

pub async fn register(
    pool: &PgPool,
    starting_cash: &BigDecimal,
    form: RegisterForm,
) -> Result<User, AppError> {
    let registration = validate_registration(&form)?;

    if user_queries::exists_by_username(pool, &registration.username).await? {
        return Err(AppError::Conflict("username exists".into()));
    }

    let password = registration.password;
    let hash = run_blocking(move || hash_password(&password)).await??;

    match user_queries::insert(pool, &registration.username, &hash, starting_cash).await {
        Ok(user) => {
            info!("Registered user {} ({})", user.username, user.id);
            Ok(user)
        }
        // a concurrent registration won the unique index
        Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
            Err(AppError::Conflict("username exists".into()))
        }
        Err(e) => Err(AppError::Db(e)),
    }
}

pub async fn login(pool: &PgPool, form: LoginForm) -> Result<User, AppError> {
    let username = present(&form.username)
        .ok_or_else(|| AppError::Validation("must provide username".into()))?
        .to_string();
    let password = form
        .password
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::Validation("must provide password".into()))?;

    let user = user_queries::fetch_by_username(pool, &username).await?;

    let stored = user
        .as_ref()
        .map(|u| u.hash.clone())
        .unwrap_or_else(|| dummy_hash().to_string());
    let verified = run_blocking(move || verify_password(&password, &stored)).await?;

    match user {
        Some(user) if verified => Ok(user),
        _ => {
            warn!("Failed login attempt for username {}", username);
            Err(AppError::Auth(INVALID_CREDENTIALS.into()))
        }
    }
}
