//! eshop Payment Engine
//!
//! The payment engine takes customers from checkout to a confirmed purchase on top of a payment gateway that offers
//! no callbacks. This library contains the core logic. It knows nothing about HTTP or about the gateway's wire
//! format; both are plugged in through the traits in [`mod@traits`].
//!
//! The library is divided into these sections:
//! 1. Storage ([`mod@db`]). SQLite is the supported backend. You should never need to access the database directly.
//!    Use the public API instead. The exception is the data types used in the database, which are defined in
//!    [`mod@db_types`] and are public.
//! 2. Gateway accounts ([`mod@agents`]). A pool of gateway logins with cached, expiring sessions.
//! 3. The public API ([`mod@engine_api`]): checkout, order status queries, settlement and the reconciliation pass.
//!
//! The engine also emits events when a checkout completes, a payment settles or times out, or something looks wrong.
//! A simple Actor framework is used so that you can hook into these events, e.g. to clear a customer's cart or raise
//! an alarm.
mod db;

pub mod agents;
pub mod db_types;
pub mod engine_api;
pub mod events;
pub mod traits;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

#[cfg(feature = "sqlite")]
pub use db::sqlite::{db_url, SqliteDatabase, SqliteDatabaseError};
pub use engine_api::{
    checkout_api::{CheckoutApi, MAX_ORDER_ATTEMPTS},
    checkout_objects,
    errors::{CheckoutError, OrderStatusError, ReconciliationError, SettlementError},
    order_status_api::{CustomerPaymentStatus, OrderStatusApi, OrderStatusView},
    reconciler::{CheckOutcome, PassSummary, ReconcilerConfig, Reconciler, ReconciliationPass},
    settlement_api::SettlementApi,
};
