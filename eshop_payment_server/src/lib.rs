//! # eshop payment service
//! This crate hosts the long-running service around the payment engine. It is responsible for:
//! * keeping a logged-in session for every configured gateway account ([`workers::session_refresh_worker`]),
//! * running the reconciliation pass on a fixed interval ([`workers::reconciliation_worker`]),
//! * raising alarms on payment anomalies ([`alarm`]),
//! * connecting the engine to the YLT gateway ([`integrations::ylt`]).
//!
//! The checkout and order status APIs are built by [`server::EngineServices`] for whatever transport layer embeds
//! them.
//!
//! ## Configuration
//! The service is configured via environment variables. See [config](config/index.html) for more information.
pub mod alarm;
pub mod cli;
pub mod config;
pub mod errors;
pub mod integrations;
pub mod server;
pub mod workers;
