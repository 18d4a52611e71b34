use eshop_common::Secret;
use serde::Serialize;

use crate::db_types::{Payment, PaymentStatus};

/// Login details for one of the pooled gateway accounts.
#[derive(Debug, Clone)]
pub struct AgentCredentials {
    /// The account identifier. For YLT this is the phone number.
    pub agent_id: String,
    pub secret: Secret<String>,
}

impl AgentCredentials {
    pub fn new<S: Into<String>>(agent_id: S, secret: S) -> Self {
        Self { agent_id: agent_id.into(), secret: Secret::new(secret.into()) }
    }
}

/// An authenticated gateway session. Opaque to the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgentSession {
    pub token: Secret<String>,
    pub cookie: Secret<String>,
}

impl AgentSession {
    pub fn new<S: Into<String>>(token: S, cookie: S) -> Self {
        Self { token: Secret::new(token.into()), cookie: Secret::new(cookie.into()) }
    }
}

/// The handle to an order created on the remote gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteOrderRef {
    pub remote_id: String,
    /// What the customer scans to pay, e.g. a base64 QR code image
    pub payment_artifact: String,
}

impl RemoteOrderRef {
    pub fn is_complete(&self) -> bool {
        !self.remote_id.is_empty() && !self.payment_artifact.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SettlementOutcome {
    /// The payment moved from `Paying` to `Payed` during this call.
    Settled { entitlements_created: u64 },
    /// The payment was already `Payed`. Any missing order state or entitlements have been filled in.
    AlreadySettled { entitlements_created: u64 },
    /// The payment had timed out. A timed-out payment is never re-opened.
    RejectedTimedOut,
    /// The payment is in a state that settlement does not apply to.
    RejectedStatus(PaymentStatus),
}

impl SettlementOutcome {
    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::RejectedTimedOut | Self::RejectedStatus(_))
    }
}

/// The result of applying a settlement in the store, with the payment as it stands afterwards.
#[derive(Debug, Clone)]
pub struct SettlementRecord {
    pub payment: Payment,
    pub outcome: SettlementOutcome,
}
