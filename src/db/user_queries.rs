use bigdecimal::BigDecimal;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;
use crate::models::User;

pub async fn insert(
    pool: &PgPool,
    username: &str,
    hash: &str,
    starting_cash: &BigDecimal,
) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(
        "INSERT INTO users (id, username, hash, cash)
         VALUES ($1, $2, $3, $4)
         RETURNING id, username, hash, cash, created_at",
    )
        .bind(Uuid::new_v4())
        .bind(username)
        .bind(hash)
        .bind(starting_cash)
        .fetch_one(pool)
        .await
}

pub async fn fetch_by_username(pool: &PgPool, username: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        "SELECT id, username, hash, cash, created_at
         FROM users
         WHERE username = $1",
    )
        .bind(username)
        .fetch_optional(pool)
        .await
}

pub async fn exists_by_username(pool: &PgPool, username: &str) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE username = $1)")
        .bind(username)
        .fetch_one(pool)
        .await
}

pub async fn fetch_cash(pool: &PgPool, id: Uuid) -> Result<Option<BigDecimal>, sqlx::Error> {
    sqlx::query_scalar::<_, BigDecimal>("SELECT cash FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Reads the balance and holds the user row lock until the transaction ends.
/// Every trade for a user takes this lock first.
pub async fn lock_cash(conn: &mut PgConnection, id: Uuid) -> Result<Option<BigDecimal>, sqlx::Error> {
    sqlx::query_scalar::<_, BigDecimal>("SELECT cash FROM users WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
}

pub async fn set_cash(conn: &mut PgConnection, id: Uuid, cash: &BigDecimal) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("UPDATE users SET cash = $1 WHERE id = $2")
        .bind(cash)
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected())
}

pub async fn add_cash(pool: &PgPool, id: Uuid, amount: &BigDecimal) -> Result<Option<BigDecimal>, sqlx::Error> {
    sqlx::query_scalar::<_, BigDecimal>(
        "UPDATE users SET cash = cash + $1 WHERE id = $2 RETURNING cash",
    )
        .bind(amount)
        .bind(id)
        .fetch_optional(pool)
        .await
}
