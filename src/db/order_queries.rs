use sqlx::{PgConnection, PgPool};
use uuid::Uuid;
use crate::models::{NewOrder, Order};

pub async fn insert(
    conn: &mut PgConnection,
    user_id: Uuid,
    order: &NewOrder,
) -> Result<Order, sqlx::Error> {
    sqlx::query_as::<_, Order>(
        "INSERT INTO orders (user_id, symbol, name, shares, price, total, side)
         VALUES ($1, $2, $3, $4, $5, $6, $7)
         RETURNING id, user_id, symbol, name, shares, price, total, side, executed_at",
    )
        .bind(user_id)
        .bind(&order.symbol)
        .bind(&order.name)
        .bind(order.shares)
        .bind(&order.price)
        .bind(&order.total)
        .bind(order.side.as_str())
        .fetch_one(&mut *conn)
        .await
}

/// Full history in the order rows were written.
pub async fn fetch_all(pool: &PgPool, user_id: Uuid) -> Result<Vec<Order>, sqlx::Error> {
    sqlx::query_as::<_, Order>(
        "SELECT id, user_id, symbol, name, shares, price, total, side, executed_at
         FROM orders
         WHERE user_id = $1
         ORDER BY id ASC",
    )
        .bind(user_id)
        .fetch_all(pool)
        .await
}
