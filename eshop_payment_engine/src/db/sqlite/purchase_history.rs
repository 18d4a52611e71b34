use log::trace;
use sqlx::SqliteConnection;

use crate::{
    db::sqlite::SqliteDatabaseError,
    db_types::{Order, OrderItem, Payment, PurchaseHistory},
};

/// Inserts an entitlement for the item unless one already exists for `(user_id, product_id, payment_id)`.
///
/// Returns `true` if a new row was written.
pub async fn insert_if_absent(
    order: &Order,
    item: &OrderItem,
    payment: &Payment,
    conn: &mut SqliteConnection,
) -> Result<bool, SqliteDatabaseError> {
    let purchased_at = payment.purchased_at.unwrap_or(payment.updated_at);
    let result = sqlx::query(
        r#"
            INSERT INTO purchase_history (user_id, product_id, quantity, order_id, payment_id, purchased_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (user_id, product_id, payment_id) DO NOTHING
        "#,
    )
    .bind(&order.user_id)
    .bind(&item.product_id)
    .bind(item.quantity)
    .bind(&order.id)
    .bind(&payment.id)
    .bind(purchased_at)
    .execute(conn)
    .await?;
    let inserted = result.rows_affected() > 0;
    trace!(
        "🗃️ Entitlement to {} for user {} via payment {}: {}",
        item.product_id,
        order.user_id,
        payment.id,
        if inserted { "created" } else { "already present" }
    );
    Ok(inserted)
}

pub async fn fetch_for_user(user_id: &str, conn: &mut SqliteConnection) -> Result<Vec<PurchaseHistory>, SqliteDatabaseError> {
    let rows = sqlx::query_as::<_, PurchaseHistory>(
        r#"
            SELECT id, user_id, product_id, quantity, order_id, payment_id, purchased_at
            FROM purchase_history
            WHERE user_id = $1
            ORDER BY purchased_at DESC, id DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(conn)
    .await?;
    Ok(rows)
}
