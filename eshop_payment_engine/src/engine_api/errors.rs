use thiserror::Error;

use crate::{
    db_types::{OrderId, PaymentId},
    traits::PaymentStoreError,
};

/// Checkout failures. Only the coarse [`CheckoutError::code`] and message are meant for the customer.
#[derive(Debug, Clone, Error)]
pub enum CheckoutError {
    #[error("Invalid checkout request: {0}")]
    InvalidRequest(String),
    #[error("Product {0} does not exist or is not on sale")]
    ProductUnavailable(String),
    #[error("The payment service is busy. Please try again later or contact support. Order {order_id} was not paid.")]
    GatewayBusy { order_id: OrderId, attempts: usize, last_error: String },
    #[error("Database error: {0}")]
    Database(#[from] PaymentStoreError),
}

impl CheckoutError {
    pub fn code(&self) -> i32 {
        match self {
            Self::InvalidRequest(_) => 30002,
            Self::ProductUnavailable(_) => 30012,
            Self::GatewayBusy { .. } => 32001,
            Self::Database(_) => 30014,
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum OrderStatusError {
    #[error("Order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("Database error: {0}")]
    Database(#[from] PaymentStoreError),
}

#[derive(Debug, Clone, Error)]
pub enum SettlementError {
    #[error("Payment {0} does not exist")]
    PaymentNotFound(PaymentId),
    #[error("Could not persist the settlement of payment {payment_id}: {source}")]
    Persistence { payment_id: PaymentId, source: PaymentStoreError },
}

#[derive(Debug, Clone, Error)]
pub enum ReconciliationError {
    #[error("Could not load pending payments: {0}")]
    Database(#[from] PaymentStoreError),
}
