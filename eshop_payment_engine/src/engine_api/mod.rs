//! # Payment engine public API
//!
//! Each API is created by handing it the backends it needs, so that the checkout path, the reconciliation loop and
//! the status queries can each be wired up (and tested) on their own.
//!
//! * [`checkout_api`] turns a checkout request into a local order, a remote gateway order and a payment.
//! * [`order_status_api`] is the read-only projection that customers poll while paying.
//! * [`reconciler`] periodically compares pending payments with the remote gateway and times them out.
//! * [`settlement_api`] applies a confirmed remote payment to the local state, any number of times.
//!
//! ```rust,ignore
//! let db = SqliteDatabase::new_with_url(&url, 25).await?;
//! let pool = AccountPool::new(agents, gateway, Arc::new(MemorySessionCache::default()));
//! let checkout = CheckoutApi::new(db.clone(), pool.clone(), Arc::new(SystemClock), producers.clone());
//! let receipt = checkout.initiate_payment("user-1", CheckoutRequest::single("P1")).await?;
//! ```
pub mod checkout_api;
pub mod checkout_objects;
pub mod errors;
pub mod order_status_api;
pub mod reconciler;
pub mod settlement_api;
