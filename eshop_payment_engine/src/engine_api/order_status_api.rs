use std::fmt::Debug;

use serde::Serialize;

use crate::{
    db_types::{OrderId, OrderPaymentStatus, PurchaseHistory},
    engine_api::errors::OrderStatusError,
    traits::PaymentStore,
};

/// What the customer is told about their order while polling. Gateway details never leak through here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CustomerPaymentStatus {
    TimedOut,
    PayFailed,
    NotPaid,
    Paid,
}

impl CustomerPaymentStatus {
    pub fn code(&self) -> i32 {
        match self {
            Self::TimedOut => 32004,
            Self::PayFailed => 32003,
            Self::NotPaid => 32002,
            Self::Paid => 0,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::TimedOut => "Payment timed out. Please place a new order.",
            Self::PayFailed => "Payment failed. Please contact support if you have been charged.",
            Self::NotPaid => "The order has not been paid yet.",
            Self::Paid => "ok",
        }
    }
}

impl From<OrderPaymentStatus> for CustomerPaymentStatus {
    fn from(status: OrderPaymentStatus) -> Self {
        match status {
            OrderPaymentStatus::TimeOut => Self::TimedOut,
            OrderPaymentStatus::PayFail => Self::PayFailed,
            OrderPaymentStatus::Payed => Self::Paid,
            OrderPaymentStatus::Created | OrderPaymentStatus::ToPay | OrderPaymentStatus::PayCancel => Self::NotPaid,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderStatusView {
    pub order_id: OrderId,
    pub status: CustomerPaymentStatus,
    pub code: i32,
    pub description: String,
}

pub struct OrderStatusApi<B> {
    db: B,
}

impl<B> Debug for OrderStatusApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderStatusApi")
    }
}

impl<B> OrderStatusApi<B>
where B: PaymentStore
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    /// The payment status of one of the user's orders. Orders of other users are reported as not found.
    pub async fn order_status(&self, user_id: &str, order_id: &OrderId) -> Result<OrderStatusView, OrderStatusError> {
        let order = self
            .db
            .fetch_order_for_user(user_id, order_id)
            .await?
            .ok_or_else(|| OrderStatusError::OrderNotFound(order_id.clone()))?;
        let status = CustomerPaymentStatus::from(order.payment_status);
        Ok(OrderStatusView {
            order_id: order.id,
            status,
            code: status.code(),
            description: status.description().to_string(),
        })
    }

    /// Everything the user has bought, most recent first.
    pub async fn purchase_history(&self, user_id: &str) -> Result<Vec<PurchaseHistory>, OrderStatusError> {
        let history = self.db.fetch_purchase_history(user_id).await?;
        Ok(history)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn projection() {
        use OrderPaymentStatus::*;
        let cases = [
            (Created, CustomerPaymentStatus::NotPaid),
            (ToPay, CustomerPaymentStatus::NotPaid),
            (PayCancel, CustomerPaymentStatus::NotPaid),
            (Payed, CustomerPaymentStatus::Paid),
            (TimeOut, CustomerPaymentStatus::TimedOut),
            (PayFail, CustomerPaymentStatus::PayFailed),
        ];
        for (status, expected) in cases {
            assert_eq!(CustomerPaymentStatus::from(status), expected, "{status}");
        }
        assert_eq!(CustomerPaymentStatus::TimedOut.code(), 32004);
        assert_eq!(CustomerPaymentStatus::Paid.code(), 0);
    }
}
