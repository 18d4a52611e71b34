use std::future::Future;

use eshop_common::Cents;
use thiserror::Error;

use crate::traits::{AgentCredentials, AgentSession, RemoteOrderRef};

/// The remote payment gateway.
///
/// Each method is a single round trip. Implementations must not retry; the callers own the retry policy.
pub trait RemoteGateway: Clone + Send + Sync + 'static {
    fn authenticate(
        &self,
        agent: &AgentCredentials,
    ) -> impl Future<Output = Result<AgentSession, GatewayError>> + Send;

    /// Creates a remote order for the product with the given gateway-side id. Both fields of the returned reference
    /// must be non-empty, otherwise the call fails with [`GatewayError::Order`].
    fn create_remote_order(
        &self,
        session: &AgentSession,
        external_id: &str,
        price: Cents,
    ) -> impl Future<Output = Result<RemoteOrderRef, GatewayError>> + Send;

    /// `true` once the customer has paid. A missing or ambiguous answer is reported as `false`.
    fn check_remote_order(
        &self,
        session: &AgentSession,
        remote_id: &str,
    ) -> impl Future<Output = Result<bool, GatewayError>> + Send;
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    #[error("Gateway authentication failed: {0}")]
    Auth(String),
    #[error("Gateway order creation failed: {0}")]
    Order(String),
    #[error("Gateway order query failed: {0}")]
    Query(String),
}
