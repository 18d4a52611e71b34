//! The pool of shared gateway accounts ("agents") and their cached sessions.
mod account_pool;
mod errors;
mod session_cache;

pub use account_pool::{AccountPool, RefreshReport, SessionTtl, DEFAULT_REFRESH_PAUSE};
pub use errors::AgentError;
pub use session_cache::MemorySessionCache;
