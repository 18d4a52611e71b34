//! Helpers for tests of the engine and of crates that build on it. Only compiled with the `test_utils` feature.
pub mod fakes;
pub mod prepare_env;
