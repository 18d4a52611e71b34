use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
pub use eshop_common::Cents;
use log::error;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

pub const PAYMENT_METHOD_QRCODE: &str = "qrcode";
pub const GATEWAY_TYPE_YLT: &str = "ylt";

#[derive(Debug, Clone, Error)]
#[error("Invalid status: {0}")]
pub struct ConversionError(String);

//--------------------------------------        OrderId        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct OrderId(pub String);

impl OrderId {
    pub fn random() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for OrderId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

//--------------------------------------       PaymentId       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct PaymentId(pub String);

impl PaymentId {
    pub fn random() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for PaymentId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for PaymentId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Display for PaymentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

//--------------------------------------    PaymentStatus      ---------------------------------------------------------
/// Lifecycle of a payment collected through the remote gateway.
///
/// `Paying` is the only state the reconciliation loop acts on. From there a payment moves to exactly one of `Payed` or
/// `TimeOut`. `PayFail` and `PayCancel` are only ever set by an operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
pub enum PaymentStatus {
    Created,
    Paying,
    Payed,
    TimeOut,
    PayFail,
    PayCancel,
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Created => write!(f, "Created"),
            Self::Paying => write!(f, "Paying"),
            Self::Payed => write!(f, "Payed"),
            Self::TimeOut => write!(f, "TimeOut"),
            Self::PayFail => write!(f, "PayFail"),
            Self::PayCancel => write!(f, "PayCancel"),
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Created" => Ok(Self::Created),
            "Paying" => Ok(Self::Paying),
            "Payed" => Ok(Self::Payed),
            "TimeOut" => Ok(Self::TimeOut),
            "PayFail" => Ok(Self::PayFail),
            "PayCancel" => Ok(Self::PayCancel),
            s => Err(ConversionError(format!("Invalid payment status: {s}"))),
        }
    }
}

impl From<String> for PaymentStatus {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid payment status: {value}. But this conversion cannot fail. Defaulting to Created");
            PaymentStatus::Created
        })
    }
}

//--------------------------------------  OrderPaymentStatus   ---------------------------------------------------------
/// The payment status as mirrored on the order row. It follows [`PaymentStatus`], except that a payment in flight
/// shows up as `ToPay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
pub enum OrderPaymentStatus {
    Created,
    ToPay,
    Payed,
    TimeOut,
    PayFail,
    PayCancel,
}

impl From<PaymentStatus> for OrderPaymentStatus {
    fn from(value: PaymentStatus) -> Self {
        match value {
            PaymentStatus::Created => Self::Created,
            PaymentStatus::Paying => Self::ToPay,
            PaymentStatus::Payed => Self::Payed,
            PaymentStatus::TimeOut => Self::TimeOut,
            PaymentStatus::PayFail => Self::PayFail,
            PaymentStatus::PayCancel => Self::PayCancel,
        }
    }
}

impl Display for OrderPaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Created => write!(f, "Created"),
            Self::ToPay => write!(f, "ToPay"),
            Self::Payed => write!(f, "Payed"),
            Self::TimeOut => write!(f, "TimeOut"),
            Self::PayFail => write!(f, "PayFail"),
            Self::PayCancel => write!(f, "PayCancel"),
        }
    }
}

impl FromStr for OrderPaymentStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Created" => Ok(Self::Created),
            "ToPay" => Ok(Self::ToPay),
            "Payed" => Ok(Self::Payed),
            "TimeOut" => Ok(Self::TimeOut),
            "PayFail" => Ok(Self::PayFail),
            "PayCancel" => Ok(Self::PayCancel),
            s => Err(ConversionError(format!("Invalid order payment status: {s}"))),
        }
    }
}

//--------------------------------------        Order          ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: String,
    /// Batch id shared by all the order's [`OrderItem`]s
    pub item_id: String,
    pub total_amount: Cents,
    pub discount: Cents,
    pub final_amount: Cents,
    /// Empty until the remote order has been created
    pub payment_id: Option<PaymentId>,
    pub payment_status: OrderPaymentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------       NewOrder        ---------------------------------------------------------
/// A priced order for a single product, ready to be stored along with its item.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub id: OrderId,
    pub user_id: String,
    pub item_id: String,
    pub product_id: String,
    pub quantity: i64,
    /// Product price at the time of ordering. Later price changes never touch stored orders.
    pub unit_price: Cents,
    pub total_amount: Cents,
    pub discount: Cents,
    pub final_amount: Cents,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------      OrderItem        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct OrderItem {
    pub id: i64,
    pub item_id: String,
    pub product_id: String,
    pub quantity: i64,
    pub unit_price: Cents,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------       Payment         ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct Payment {
    pub id: PaymentId,
    pub order_id: OrderId,
    pub final_amount: Cents,
    pub method: String,
    pub gateway_type: String,
    pub status: PaymentStatus,
    /// The order number assigned by the remote gateway
    pub gateway_id: String,
    /// The gateway account that created the remote order. Its session is needed to query the order later.
    pub agent: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub purchased_at: Option<DateTime<Utc>>,
}

//--------------------------------------      NewPayment       ---------------------------------------------------------
#[derive(Debug, Clone)]
pub struct NewPayment {
    pub id: PaymentId,
    pub order_id: OrderId,
    pub final_amount: Cents,
    pub method: String,
    pub gateway_type: String,
    pub gateway_id: String,
    pub agent: String,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------   PurchaseHistory     ---------------------------------------------------------
/// One entitlement: the user owns `product_id` by virtue of `payment_id`.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct PurchaseHistory {
    pub id: i64,
    pub user_id: String,
    pub product_id: String,
    pub quantity: i64,
    pub order_id: OrderId,
    pub payment_id: PaymentId,
    pub purchased_at: DateTime<Utc>,
}

//--------------------------------------   SellableProduct     ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct SellableProduct {
    pub id: String,
    pub price: Cents,
    /// The product id on the remote gateway
    pub external_id: String,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn status_round_trips_and_mirrors() {
        for status in [
            PaymentStatus::Created,
            PaymentStatus::Paying,
            PaymentStatus::Payed,
            PaymentStatus::TimeOut,
            PaymentStatus::PayFail,
            PaymentStatus::PayCancel,
        ] {
            assert_eq!(status.to_string().parse::<PaymentStatus>().unwrap(), status);
        }
        assert_eq!(OrderPaymentStatus::from(PaymentStatus::Paying), OrderPaymentStatus::ToPay);
        assert_eq!(OrderPaymentStatus::from(PaymentStatus::TimeOut), OrderPaymentStatus::TimeOut);
        assert_eq!(PaymentStatus::from("bogus".to_string()), PaymentStatus::Created);
    }

    #[test]
    fn ids_are_unique() {
        assert_ne!(OrderId::random(), OrderId::random());
        assert_eq!(PaymentId::from("abc").to_string(), "abc");
        assert_eq!(OrderId::from("abc").to_string(), "#abc");
    }
}
