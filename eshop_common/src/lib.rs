mod cents;
mod helpers;

pub mod op;
mod secret;

pub use cents::{Cents, CentsConversionError};
pub use helpers::{parse_boolean_flag, parse_key_value_list};
pub use secret::Secret;
