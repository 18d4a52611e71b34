use std::path::Path;

use eshop_common::Cents;
use log::*;
use sqlx::{migrate::MigrateDatabase, Sqlite};

use crate::{db_types::PaymentId, SqliteDatabase};

pub async fn prepare_test_env(url: &str) {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    debug!("🚀️ Logging initialised");
    create_database(url).await;
    run_migrations(url).await;
}

pub fn random_db_path() -> String {
    let dir = std::env::temp_dir();
    format!("sqlite://{}/eshop_test_store_{}.db", dir.display(), rand::random::<u64>())
}

/// Creates a fresh, migrated database at a random location.
pub async fn new_test_database() -> (String, SqliteDatabase) {
    let url = random_db_path();
    prepare_test_env(&url).await;
    let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating connection to database");
    (url, db)
}

pub async fn run_migrations(url: &str) {
    let db = SqliteDatabase::new_with_url(url, 1).await.expect("Error creating connection to database");
    db.migrate().await.expect("Error running DB migrations");
    info!("🚀️ Migrations complete");
}

pub async fn create_database<P: AsRef<Path>>(path: P) {
    let p = path.as_ref().as_os_str().to_str().unwrap();
    if let Err(e) = Sqlite::drop_database(p).await {
        trace!("Could not drop database {p}: {e:?}");
    }
    Sqlite::create_database(p).await.expect("Error creating database");
    info!("Created Sqlite database {p}");
}

pub async fn drop_database(url: &str) {
    if let Err(e) = Sqlite::drop_database(url).await {
        warn!("Error dropping database {url}: {e:?}");
    }
}

pub async fn seed_product(db: &SqliteDatabase, id: &str, price: Cents, external_id: &str) {
    sqlx::query("INSERT INTO products (id, name, price, external_id) VALUES ($1, $1, $2, $3)")
        .bind(id)
        .bind(price)
        .bind(external_id)
        .execute(db.pool())
        .await
        .expect("Error inserting product");
}

pub async fn withdraw_product(db: &SqliteDatabase, id: &str) {
    sqlx::query("UPDATE products SET on_sale = FALSE WHERE id = $1")
        .bind(id)
        .execute(db.pool())
        .await
        .expect("Error updating product");
}

pub async fn seed_cart_item(db: &SqliteDatabase, user_id: &str, product_id: &str) {
    sqlx::query("INSERT INTO cart_items (user_id, product_id) VALUES ($1, $2)")
        .bind(user_id)
        .bind(product_id)
        .execute(db.pool())
        .await
        .expect("Error inserting cart item");
}

pub async fn count_cart_items(db: &SqliteDatabase, user_id: &str) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM cart_items WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(db.pool())
        .await
        .expect("Error counting cart items")
}

pub async fn count_purchase_rows(db: &SqliteDatabase, payment_id: &PaymentId) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM purchase_history WHERE payment_id = $1")
        .bind(payment_id)
        .fetch_one(db.pool())
        .await
        .expect("Error counting purchase history")
}

/// Forces an order's status, bypassing the engine. Used to simulate a crash between settlement steps.
pub async fn force_order_status(db: &SqliteDatabase, payment_id: &PaymentId, status: &str) {
    sqlx::query("UPDATE orders SET payment_status = $1 WHERE payment_id = $2")
        .bind(status)
        .bind(payment_id)
        .execute(db.pool())
        .await
        .expect("Error updating order");
}
