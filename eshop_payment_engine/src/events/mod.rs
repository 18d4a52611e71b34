mod cart_cleanup;
mod channel;
mod event_types;
mod hooks;

pub use cart_cleanup::cart_cleanup_hook;
pub use channel::{EventHandler, EventProducer, Handler};
pub use event_types::*;
pub use hooks::{EventHandlers, EventHooks, EventProducers};
