use thiserror::Error;

use crate::{
    db_types::{OrderId, PaymentId},
    traits::PaymentStoreError,
};

#[derive(Debug, Error)]
pub enum SqliteDatabaseError {
    #[error("Database connection error: {0}")]
    DriverError(#[from] sqlx::Error),
    #[error("Database migration error: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),
    #[error("Database query error: {0}")]
    QueryError(String),
    #[error("Order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("Payment {0} does not exist")]
    PaymentNotFound(PaymentId),
    #[error("Cannot process duplicate order {0}")]
    DuplicateOrder(OrderId),
    #[error("Cannot process duplicate payment {0}")]
    DuplicatePayment(PaymentId),
}

impl From<SqliteDatabaseError> for PaymentStoreError {
    fn from(e: SqliteDatabaseError) -> Self {
        match e {
            SqliteDatabaseError::OrderNotFound(id) => PaymentStoreError::OrderNotFound(id),
            SqliteDatabaseError::PaymentNotFound(id) => PaymentStoreError::PaymentNotFound(id),
            SqliteDatabaseError::DuplicateOrder(id) => PaymentStoreError::OrderAlreadyExists(id),
            SqliteDatabaseError::DuplicatePayment(id) => PaymentStoreError::PaymentAlreadyExists(id),
            e => PaymentStoreError::DatabaseError(e.to_string()),
        }
    }
}
