use log::trace;
use sqlx::SqliteConnection;

use crate::{db::sqlite::SqliteDatabaseError, db_types::SellableProduct};

pub async fn fetch_sellable_product(
    product_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<SellableProduct>, SqliteDatabaseError> {
    let product = sqlx::query_as::<_, SellableProduct>(
        "SELECT id, price, external_id FROM products WHERE id = $1 AND on_sale = TRUE",
    )
    .bind(product_id)
    .fetch_optional(conn)
    .await?;
    Ok(product)
}

pub async fn remove_cart_item(
    user_id: &str,
    product_id: &str,
    conn: &mut SqliteConnection,
) -> Result<bool, SqliteDatabaseError> {
    let result = sqlx::query("DELETE FROM cart_items WHERE user_id = $1 AND product_id = $2")
        .bind(user_id)
        .bind(product_id)
        .execute(conn)
        .await?;
    trace!("🗃️ Removed {} cart entries of {product_id} for user {user_id}", result.rows_affected());
    Ok(result.rows_affected() > 0)
}
