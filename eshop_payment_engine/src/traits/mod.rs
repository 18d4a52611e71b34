//! # Engine seams
//!
//! The reconciliation engine talks to the outside world exclusively through the traits in this module, so that every
//! collaborator can be replaced in tests.
//!
//! * [`PaymentStore`] persists orders, payments and purchase history. Backends must be able to apply a settlement
//!   atomically.
//! * [`ProductCatalog`] and [`CartManagement`] are the narrow views the engine needs of the product and cart services.
//! * [`RemoteGateway`] wraps the three calls the remote payment gateway supports.
//! * [`SessionCache`] holds authenticated gateway sessions per agent, with expiry.
//! * [`Clock`] lets tests move time forward without sleeping.
mod catalog;
mod clock;
mod data_objects;
mod payment_store;
mod remote_gateway;
mod session_cache;

pub use catalog::{CartManagement, ProductCatalog};
pub use clock::{Clock, ManualClock, SystemClock};
pub use data_objects::{AgentCredentials, AgentSession, RemoteOrderRef, SettlementOutcome, SettlementRecord};
pub use payment_store::{PaymentStore, PaymentStoreError};
pub use remote_gateway::{GatewayError, RemoteGateway};
pub use session_cache::SessionCache;
