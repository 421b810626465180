use sqlx::{PgConnection, PgPool};
use uuid::Uuid;
use crate::models::Holding;

pub async fn fetch_all(pool: &PgPool, user_id: Uuid) -> Result<Vec<Holding>, sqlx::Error> {
    sqlx::query_as::<_, Holding>(
        "SELECT user_id, symbol, name, shares, updated_at
         FROM holdings
         WHERE user_id = $1
         ORDER BY symbol ASC",
    )
        .bind(user_id)
        .fetch_all(pool)
        .await
}

pub async fn fetch_symbols(pool: &PgPool, user_id: Uuid) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>(
        "SELECT symbol FROM holdings
         WHERE user_id = $1 AND shares > 0
         ORDER BY symbol ASC",
    )
        .bind(user_id)
        .fetch_all(pool)
        .await
}

pub async fn fetch_shares(
    conn: &mut PgConnection,
    user_id: Uuid,
    symbol: &str,
) -> Result<Option<i64>, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        "SELECT shares FROM holdings WHERE user_id = $1 AND symbol = $2",
    )
        .bind(user_id)
        .bind(symbol)
        .fetch_optional(&mut *conn)
        .await
}

pub async fn upsert(
    conn: &mut PgConnection,
    user_id: Uuid,
    symbol: &str,
    name: &str,
    shares: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO holdings (user_id, symbol, name, shares)
         VALUES ($1, $2, $3, $4)
         ON CONFLICT (user_id, symbol)
         DO UPDATE SET shares = EXCLUDED.shares, name = EXCLUDED.name, updated_at = now()",
    )
        .bind(user_id)
        .bind(symbol)
        .bind(name)
        .bind(shares)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub async fn delete(conn: &mut PgConnection, user_id: Uuid, symbol: &str) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM holdings WHERE user_id = $1 AND symbol = $2")
        .bind(user_id)
        .bind(symbol)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected())
}

/// Removes rows left at zero or below. Scoped to one user.
pub async fn prune_empty(pool: &PgPool, user_id: Uuid) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM holdings WHERE user_id = $1 AND shares <= 0")
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
