use chrono::{DateTime, Utc};
use log::{debug, trace};
use sqlx::SqliteConnection;

use crate::{
    db::sqlite::SqliteDatabaseError,
    db_types::{NewOrder, Order, OrderId, OrderItem, OrderPaymentStatus, PaymentId},
};

const ORDER_COLUMNS: &str = "id, user_id, item_id, total_amount, discount, final_amount, payment_id, payment_status, \
                             created_at, updated_at";

/// Inserts the order item and then the order. This is not atomic. Embed the call in a transaction and pass `&mut *tx`
/// as the connection if you need both rows or neither.
pub async fn insert_order_with_item(order: NewOrder, conn: &mut SqliteConnection) -> Result<Order, SqliteDatabaseError> {
    if fetch_order(&order.id, conn).await?.is_some() {
        return Err(SqliteDatabaseError::DuplicateOrder(order.id));
    }
    sqlx::query(
        r#"
            INSERT INTO order_items (item_id, product_id, quantity, unit_price, created_at)
            VALUES ($1, $2, $3, $4, $5);
        "#,
    )
    .bind(&order.item_id)
    .bind(&order.product_id)
    .bind(order.quantity)
    .bind(order.unit_price)
    .bind(order.created_at)
    .execute(&mut *conn)
    .await?;
    let sql = format!(
        r#"
            INSERT INTO orders (id, user_id, item_id, total_amount, discount, final_amount, payment_status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
            RETURNING {ORDER_COLUMNS};
        "#
    );
    let record = sqlx::query_as::<_, Order>(&sql)
        .bind(&order.id)
        .bind(&order.user_id)
        .bind(&order.item_id)
        .bind(order.total_amount)
        .bind(order.discount)
        .bind(order.final_amount)
        .bind(OrderPaymentStatus::ToPay)
        .bind(order.created_at)
        .fetch_one(conn)
        .await?;
    debug!("🗃️ Order {} for user {} saved, final amount {}", record.id, record.user_id, record.final_amount);
    Ok(record)
}

pub async fn fetch_order(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<Option<Order>, SqliteDatabaseError> {
    let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1");
    let order = sqlx::query_as::<_, Order>(&sql).bind(order_id).fetch_optional(conn).await?;
    Ok(order)
}

pub async fn fetch_order_for_user(
    user_id: &str,
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, SqliteDatabaseError> {
    let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 AND user_id = $2");
    let order = sqlx::query_as::<_, Order>(&sql).bind(order_id).bind(user_id).fetch_optional(conn).await?;
    Ok(order)
}

pub async fn fetch_order_items(item_id: &str, conn: &mut SqliteConnection) -> Result<Vec<OrderItem>, SqliteDatabaseError> {
    let items = sqlx::query_as::<_, OrderItem>(
        "SELECT id, item_id, product_id, quantity, unit_price, created_at FROM order_items WHERE item_id = $1 ORDER BY id",
    )
    .bind(item_id)
    .fetch_all(conn)
    .await?;
    trace!("🗃️ Item batch {item_id} has {} items", items.len());
    Ok(items)
}

/// Links the payment to the order and mirrors the payment status onto it.
pub async fn link_payment(
    order_id: &OrderId,
    payment_id: &PaymentId,
    status: OrderPaymentStatus,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Order, SqliteDatabaseError> {
    let sql = format!(
        "UPDATE orders SET payment_id = $1, payment_status = $2, updated_at = $3 WHERE id = $4 RETURNING {ORDER_COLUMNS}"
    );
    sqlx::query_as::<_, Order>(&sql)
        .bind(payment_id)
        .bind(status)
        .bind(now)
        .bind(order_id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| SqliteDatabaseError::OrderNotFound(order_id.clone()))
}

pub async fn update_payment_status(
    order_id: &OrderId,
    status: OrderPaymentStatus,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Order, SqliteDatabaseError> {
    let sql = format!("UPDATE orders SET payment_status = $1, updated_at = $2 WHERE id = $3 RETURNING {ORDER_COLUMNS}");
    let order = sqlx::query_as::<_, Order>(&sql)
        .bind(status)
        .bind(now)
        .bind(order_id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| SqliteDatabaseError::OrderNotFound(order_id.clone()))?;
    trace!("🗃️ Order {order_id} payment status is now {status}");
    Ok(order)
}

/// Brings the mirrored status of every order in line with a `Payed` payment.
pub async fn repair_settled_orders(now: DateTime<Utc>, conn: &mut SqliteConnection) -> Result<u64, SqliteDatabaseError> {
    let result = sqlx::query(
        r#"
            UPDATE orders SET payment_status = $1, updated_at = $2
            WHERE payment_status <> $1
              AND EXISTS (SELECT 1 FROM payments p WHERE p.id = orders.payment_id AND p.status = $3)
        "#,
    )
    .bind(OrderPaymentStatus::Payed)
    .bind(now)
    .bind(crate::db_types::PaymentStatus::Payed)
    .execute(conn)
    .await?;
    Ok(result.rows_affected())
}
