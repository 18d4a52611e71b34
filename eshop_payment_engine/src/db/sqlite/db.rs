use std::fmt::Debug;

use chrono::{DateTime, Utc};
use log::*;
use sqlx::SqlitePool;

use super::{catalog, db_url, new_pool, orders, payments, purchase_history, SqliteDatabaseError};
use crate::{
    db_types::{
        NewOrder,
        NewPayment,
        Order,
        OrderId,
        OrderItem,
        OrderPaymentStatus,
        Payment,
        PaymentId,
        PaymentStatus,
        PurchaseHistory,
        SellableProduct,
    },
    traits::{
        CartManagement,
        PaymentStore,
        PaymentStoreError,
        ProductCatalog,
        SettlementOutcome,
        SettlementRecord,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object using the URL in `EPS_DATABASE_URL`.
    pub async fn new(max_connections: u32) -> Result<Self, SqliteDatabaseError> {
        let url = db_url();
        SqliteDatabase::new_with_url(&url, max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, SqliteDatabaseError> {
        let pool = new_pool(url, max_connections).await?;
        Ok(Self { url: url.to_string(), pool })
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Applies any outstanding schema migrations.
    pub async fn migrate(&self) -> Result<(), SqliteDatabaseError> {
        sqlx::migrate!("./src/db/sqlite/migrations").run(&self.pool).await?;
        info!("🗃️ Database migrations are up to date");
        Ok(())
    }

    pub async fn close(&mut self) -> Result<(), SqliteDatabaseError> {
        self.pool.close().await;
        Ok(())
    }

    async fn apply_settlement(
        &self,
        payment_id: &PaymentId,
        now: DateTime<Utc>,
    ) -> Result<SettlementRecord, SqliteDatabaseError> {
        let mut tx = self.pool.begin().await?;
        // Write first, so that the transaction holds the write lock before anything is read.
        let moved = payments::transition_status(payment_id, PaymentStatus::Paying, PaymentStatus::Payed, now, &mut tx).await?;
        let fresh = moved.is_some();
        let payment = match moved {
            Some(p) => p,
            None => payments::fetch_payment(payment_id, &mut tx)
                .await?
                .ok_or_else(|| SqliteDatabaseError::PaymentNotFound(payment_id.clone()))?,
        };
        let status = payment.status;
        match status {
            PaymentStatus::Payed => {},
            PaymentStatus::TimeOut => {
                tx.rollback().await?;
                return Ok(SettlementRecord { payment, outcome: SettlementOutcome::RejectedTimedOut });
            },
            status => {
                tx.rollback().await?;
                return Ok(SettlementRecord { payment, outcome: SettlementOutcome::RejectedStatus(status) });
            },
        }
        let order = orders::update_payment_status(&payment.order_id, OrderPaymentStatus::Payed, now, &mut tx).await?;
        let items = orders::fetch_order_items(&order.item_id, &mut tx).await?;
        let mut entitlements_created = 0;
        for item in &items {
            if purchase_history::insert_if_absent(&order, item, &payment, &mut tx).await? {
                entitlements_created += 1;
            }
        }
        tx.commit().await?;
        debug!(
            "🗃️ Payment {payment_id} settled for order {}. {entitlements_created} of {} entitlements were new",
            order.id,
            items.len()
        );
        let outcome = if fresh {
            SettlementOutcome::Settled { entitlements_created }
        } else {
            SettlementOutcome::AlreadySettled { entitlements_created }
        };
        Ok(SettlementRecord { payment, outcome })
    }
}

impl PaymentStore for SqliteDatabase {
    async fn insert_order_with_item(&self, order: NewOrder) -> Result<Order, PaymentStoreError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::insert_order_with_item(order, &mut tx).await?;
        tx.commit().await?;
        Ok(order)
    }

    async fn attach_payment(&self, payment: NewPayment) -> Result<Payment, PaymentStoreError> {
        let mut tx = self.pool.begin().await?;
        let order_id = payment.order_id.clone();
        let now = payment.created_at;
        let payment = payments::insert_payment(payment, &mut tx).await?;
        orders::link_payment(&order_id, &payment.id, OrderPaymentStatus::from(payment.status), now, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Payment {} attached to order {order_id}", payment.id);
        Ok(payment)
    }

    async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<Order>, PaymentStoreError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order(order_id, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_order_for_user(&self, user_id: &str, order_id: &OrderId) -> Result<Option<Order>, PaymentStoreError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order_for_user(user_id, order_id, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_order_items(&self, item_id: &str) -> Result<Vec<OrderItem>, PaymentStoreError> {
        let mut conn = self.pool.acquire().await?;
        let items = orders::fetch_order_items(item_id, &mut conn).await?;
        Ok(items)
    }

    async fn fetch_payment(&self, payment_id: &PaymentId) -> Result<Option<Payment>, PaymentStoreError> {
        let mut conn = self.pool.acquire().await?;
        let payment = payments::fetch_payment(payment_id, &mut conn).await?;
        Ok(payment)
    }

    async fn fetch_payments_by_status(&self, status: PaymentStatus) -> Result<Vec<Payment>, PaymentStoreError> {
        let mut conn = self.pool.acquire().await?;
        let payments = payments::fetch_payments_by_status(status, &mut conn).await?;
        Ok(payments)
    }

    async fn mark_payment_timed_out(
        &self,
        payment_id: &PaymentId,
        now: DateTime<Utc>,
    ) -> Result<Option<Payment>, PaymentStoreError> {
        let mut tx = self.pool.begin().await?;
        let payment =
            payments::transition_status(payment_id, PaymentStatus::Paying, PaymentStatus::TimeOut, now, &mut tx).await?;
        if let Some(p) = &payment {
            orders::update_payment_status(&p.order_id, OrderPaymentStatus::TimeOut, now, &mut tx).await?;
        }
        tx.commit().await?;
        Ok(payment)
    }

    async fn settle_payment(&self, payment_id: &PaymentId, now: DateTime<Utc>) -> Result<SettlementRecord, PaymentStoreError> {
        let record = self.apply_settlement(payment_id, now).await?;
        Ok(record)
    }

    async fn fetch_purchase_history(&self, user_id: &str) -> Result<Vec<PurchaseHistory>, PaymentStoreError> {
        let mut conn = self.pool.acquire().await?;
        let rows = purchase_history::fetch_for_user(user_id, &mut conn).await?;
        Ok(rows)
    }

    async fn repair_settled_orders(&self, now: DateTime<Utc>) -> Result<u64, PaymentStoreError> {
        let mut conn = self.pool.acquire().await?;
        let repaired = orders::repair_settled_orders(now, &mut conn).await?;
        if repaired > 0 {
            warn!("🗃️ Repaired the payment status of {repaired} settled orders");
        }
        Ok(repaired)
    }
}

impl ProductCatalog for SqliteDatabase {
    async fn fetch_sellable_product(&self, product_id: &str) -> Result<Option<SellableProduct>, PaymentStoreError> {
        let mut conn = self.pool.acquire().await?;
        let product = catalog::fetch_sellable_product(product_id, &mut conn).await?;
        Ok(product)
    }
}

impl CartManagement for SqliteDatabase {
    async fn remove_cart_item(&self, user_id: &str, product_id: &str) -> Result<bool, PaymentStoreError> {
        let mut conn = self.pool.acquire().await?;
        let removed = catalog::remove_cart_item(user_id, product_id, &mut conn).await?;
        Ok(removed)
    }
}
