use std::future::Future;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::{
    db_types::{NewOrder, NewPayment, Order, OrderId, OrderItem, Payment, PaymentId, PaymentStatus, PurchaseHistory},
    traits::SettlementRecord,
};

/// The Order & Payment store.
///
/// Methods that are called from spawned reconciliation tasks return `Send` futures. Implementors can simply write
/// `async fn`.
pub trait PaymentStore: Clone + Send + Sync + 'static {
    /// Stores the order and its single item in one transaction. The order starts out in `ToPay` with no payment.
    fn insert_order_with_item(&self, order: NewOrder) -> impl Future<Output = Result<Order, PaymentStoreError>> + Send;

    /// Stores a new payment in `Paying` state and links it to its order, in one transaction.
    ///
    /// Fails with [`PaymentStoreError::OrderNotFound`] if the order does not exist.
    fn attach_payment(&self, payment: NewPayment) -> impl Future<Output = Result<Payment, PaymentStoreError>> + Send;

    fn fetch_order(&self, order_id: &OrderId) -> impl Future<Output = Result<Option<Order>, PaymentStoreError>> + Send;

    /// Fetches the order only if it belongs to `user_id`.
    fn fetch_order_for_user(
        &self,
        user_id: &str,
        order_id: &OrderId,
    ) -> impl Future<Output = Result<Option<Order>, PaymentStoreError>> + Send;

    fn fetch_order_items(&self, item_id: &str) -> impl Future<Output = Result<Vec<OrderItem>, PaymentStoreError>> + Send;

    fn fetch_payment(
        &self,
        payment_id: &PaymentId,
    ) -> impl Future<Output = Result<Option<Payment>, PaymentStoreError>> + Send;

    /// All payments in the given state, oldest first.
    fn fetch_payments_by_status(
        &self,
        status: PaymentStatus,
    ) -> impl Future<Output = Result<Vec<Payment>, PaymentStoreError>> + Send;

    /// Moves a `Paying` payment, and the status mirrored on its order, to `TimeOut`.
    ///
    /// Returns the updated payment, or `None` if the payment was no longer `Paying` (e.g. it was settled in the
    /// meantime), in which case nothing is changed.
    fn mark_payment_timed_out(
        &self,
        payment_id: &PaymentId,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<Option<Payment>, PaymentStoreError>> + Send;

    /// Applies a confirmed remote payment in a single transaction:
    /// * `Paying` payments move to `Payed` with `purchased_at = now`. `Payed` payments are left alone.
    /// * the order's payment status becomes `Payed`.
    /// * one purchase history row per order item is inserted, unless it already exists.
    ///
    /// A `TimeOut` payment (or any other state) is not touched, and the rejection is reported in the outcome.
    fn settle_payment(
        &self,
        payment_id: &PaymentId,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<SettlementRecord, PaymentStoreError>> + Send;

    fn fetch_purchase_history(
        &self,
        user_id: &str,
    ) -> impl Future<Output = Result<Vec<PurchaseHistory>, PaymentStoreError>> + Send;

    /// Sets the payment status of every order whose payment is `Payed` but whose mirrored status disagrees.
    /// Returns the number of orders repaired.
    fn repair_settled_orders(&self, now: DateTime<Utc>) -> impl Future<Output = Result<u64, PaymentStoreError>> + Send;
}

#[derive(Debug, Clone, Error)]
pub enum PaymentStoreError {
    #[error("Internal database error: {0}")]
    DatabaseError(String),
    #[error("The requested order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("The requested payment {0} does not exist")]
    PaymentNotFound(PaymentId),
    #[error("Cannot insert order, since it already exists with id {0}")]
    OrderAlreadyExists(OrderId),
    #[error("Cannot insert payment, since it already exists with id {0}")]
    PaymentAlreadyExists(PaymentId),
}

impl From<sqlx::Error> for PaymentStoreError {
    fn from(e: sqlx::Error) -> Self {
        PaymentStoreError::DatabaseError(e.to_string())
    }
}
