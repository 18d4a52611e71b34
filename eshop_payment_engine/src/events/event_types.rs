use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    db_types::{OrderId, Payment, PaymentId},
    traits::SettlementOutcome,
};

/// A checkout produced an order, a remote order and a payment. The customer has not paid yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckoutCompletedEvent {
    pub user_id: String,
    pub product_id: String,
    pub order_id: OrderId,
    pub payment_id: PaymentId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentSettledEvent {
    pub payment: Payment,
    pub entitlements_created: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentTimedOutEvent {
    pub payment: Payment,
    pub timed_out_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AnomalyLevel {
    Warning,
    Error,
}

impl std::fmt::Display for AnomalyLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Warning => write!(f, "WARN"),
            Self::Error => write!(f, "ERROR"),
        }
    }
}

/// Something happened that an operator should look at, e.g. a settled remote payment for an order that had already
/// timed out locally, or a settlement that could not be persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentAnomalyEvent {
    pub level: AnomalyLevel,
    pub payment_id: PaymentId,
    pub order_id: Option<OrderId>,
    pub message: String,
}

impl PaymentAnomalyEvent {
    pub fn error<S: Into<String>>(payment_id: PaymentId, order_id: Option<OrderId>, message: S) -> Self {
        Self { level: AnomalyLevel::Error, payment_id, order_id, message: message.into() }
    }

    pub fn warning<S: Into<String>>(payment_id: PaymentId, order_id: Option<OrderId>, message: S) -> Self {
        Self { level: AnomalyLevel::Warning, payment_id, order_id, message: message.into() }
    }

    pub fn from_rejection(payment: &Payment, outcome: SettlementOutcome) -> Self {
        let message = match outcome {
            SettlementOutcome::RejectedTimedOut => format!(
                "Remote order {} (agent {}) reports as paid, but payment {} had already timed out. The customer may \
                 need a refund or a manual settlement.",
                payment.gateway_id, payment.agent, payment.id
            ),
            SettlementOutcome::RejectedStatus(status) => format!(
                "Remote order {} reports as paid, but payment {} is in state {status} and was not settled.",
                payment.gateway_id, payment.id
            ),
            other => format!("Unexpected settlement outcome for payment {}: {other:?}", payment.id),
        };
        Self::error(payment.id.clone(), Some(payment.order_id.clone()), message)
    }
}

impl std::fmt::Display for PaymentAnomalyEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.level, self.message)
    }
}
