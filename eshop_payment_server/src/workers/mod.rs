//! Background workers. Each one runs on its own fixed-interval timer until the runtime shuts down.
pub mod reconciliation_worker;
pub mod session_refresh_worker;

pub use reconciliation_worker::start_reconciliation_worker;
pub use session_refresh_worker::start_session_refresh_worker;
