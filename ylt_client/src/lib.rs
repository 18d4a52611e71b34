//! Client for the YLT payment gateway.
//!
//! The gateway has no public API and no webhooks. What it does have is the JSON backend behind its web shop, which
//! gives us three useful calls: log in with a phone number and password, create an order for a product (which returns a
//! QR code to pay with), and check whether an order has been paid.
//!
//! Every call here is a single HTTP request. There is no retry logic in this crate; callers decide how many attempts
//! to make and with which account.
mod api;
mod config;
mod error;

mod data_objects;

pub use api::YltApi;
pub use config::YltConfig;
pub use data_objects::{RemoteOrder, YltEnvelope, YltSession};
pub use error::YltApiError;
