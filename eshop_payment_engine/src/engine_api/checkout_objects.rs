use eshop_common::Cents;
use serde::{Deserialize, Serialize};

use crate::{
    db_types::{OrderId, PaymentId, GATEWAY_TYPE_YLT, PAYMENT_METHOD_QRCODE},
    engine_api::errors::CheckoutError,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutItem {
    pub product_id: String,
    pub quantity: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub items: Vec<CheckoutItem>,
    pub payment_method: String,
    pub gateway_type: String,
}

impl CheckoutRequest {
    /// The only kind of request the shop currently accepts: one unit of one product, paid by QR code through YLT.
    pub fn single<S: Into<String>>(product_id: S) -> Self {
        Self {
            items: vec![CheckoutItem { product_id: product_id.into(), quantity: 1 }],
            payment_method: PAYMENT_METHOD_QRCODE.to_string(),
            gateway_type: GATEWAY_TYPE_YLT.to_string(),
        }
    }

    /// Checks the request against the current business rules and returns the single item being bought.
    pub fn validate(&self) -> Result<&CheckoutItem, CheckoutError> {
        if self.payment_method != PAYMENT_METHOD_QRCODE {
            return Err(CheckoutError::InvalidRequest(format!("Unsupported payment method '{}'", self.payment_method)));
        }
        if self.gateway_type != GATEWAY_TYPE_YLT {
            return Err(CheckoutError::InvalidRequest(format!("Unsupported payment gateway '{}'", self.gateway_type)));
        }
        let item = match self.items.as_slice() {
            [] => return Err(CheckoutError::InvalidRequest("The checkout contains no items".into())),
            [item] => item,
            _ => return Err(CheckoutError::InvalidRequest("Only a single item can be checked out at a time".into())),
        };
        if item.product_id.trim().is_empty() {
            return Err(CheckoutError::InvalidRequest("The product id is missing".into()));
        }
        if item.quantity != 1 {
            return Err(CheckoutError::InvalidRequest(format!(
                "Only a quantity of 1 can be checked out, not {}",
                item.quantity
            )));
        }
        Ok(item)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckoutReceipt {
    pub order_id: OrderId,
    pub payment_id: PaymentId,
    /// The QR code the customer scans to pay
    pub payment_artifact: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderPricing {
    pub total_amount: Cents,
    pub discount: Cents,
    pub final_amount: Cents,
}

/// `final = unit_price × quantity − discount`, floored at zero.
pub fn price_order(unit_price: Cents, quantity: i64, discount: Cents) -> OrderPricing {
    let total_amount = unit_price * quantity;
    let final_amount = (total_amount - discount).clamp_non_negative();
    OrderPricing { total_amount, discount, final_amount }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn pricing() {
        let p = price_order(Cents::from(1000), 1, Cents::default());
        assert_eq!(p.final_amount, Cents::from(1000));
        assert_eq!(p.total_amount, Cents::from(1000));
        let p = price_order(Cents::from(1000), 1, Cents::from(1500));
        assert_eq!(p.final_amount, Cents::default());
        assert_eq!(p.discount, Cents::from(1500));
        let p = price_order(Cents::from(250), 2, Cents::from(100));
        assert_eq!(p.final_amount, Cents::from(400));
    }

    #[test]
    fn request_validation() {
        assert_eq!(CheckoutRequest::single("P1").validate().unwrap().product_id, "P1");

        let mut req = CheckoutRequest::single("P1");
        req.items.clear();
        assert!(matches!(req.validate(), Err(CheckoutError::InvalidRequest(_))));

        let mut req = CheckoutRequest::single("P1");
        req.items.push(CheckoutItem { product_id: "P2".into(), quantity: 1 });
        assert!(matches!(req.validate(), Err(CheckoutError::InvalidRequest(_))));

        let mut req = CheckoutRequest::single("P1");
        req.items[0].quantity = 2;
        assert!(matches!(req.validate(), Err(CheckoutError::InvalidRequest(_))));

        let req = CheckoutRequest::single("  ");
        assert!(matches!(req.validate(), Err(CheckoutError::InvalidRequest(_))));

        let mut req = CheckoutRequest::single("P1");
        req.payment_method = "card".into();
        assert!(matches!(req.validate(), Err(CheckoutError::InvalidRequest(_))));

        let mut req = CheckoutRequest::single("P1");
        req.gateway_type = "stripe".into();
        let err = req.validate().unwrap_err();
        assert_eq!(err.code(), 30002);
    }
}
