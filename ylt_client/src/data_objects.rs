use eshop_common::{Cents, Secret};
use serde::{Deserialize, Serialize};

/// Every response from the gateway is wrapped in this envelope.
///
/// `s` is the success flag, `c` mirrors an HTTP-ish status code, `m` carries an error message and `d` the payload.
#[derive(Debug, Clone, Deserialize)]
pub struct YltEnvelope<T> {
    #[serde(default)]
    pub s: bool,
    #[serde(default)]
    pub c: i64,
    #[serde(default)]
    pub m: Option<String>,
    pub d: Option<T>,
}

impl<T> YltEnvelope<T> {
    pub fn error_message(&self) -> String {
        match &self.m {
            Some(m) if !m.is_empty() => format!("{m} (code {})", self.c),
            _ => format!("gateway returned code {}", self.c),
        }
    }
}

/// An authenticated gateway session. Both halves must be sent with every authenticated call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct YltSession {
    pub token: Secret<String>,
    pub cookie: Secret<String>,
}

impl YltSession {
    pub fn new<S: Into<String>>(token: S, cookie: S) -> Self {
        Self { token: Secret::new(token.into()), cookie: Secret::new(cookie.into()) }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteOrder {
    pub order_no: String,
    /// Base64-encoded QR code image that the customer scans to pay.
    pub pay_obj: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LoginRequest<'a> {
    pub phone_number: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LoginData {
    pub token: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateOrderRequest<'a> {
    pub product_id: &'a str,
    pub pay_type: &'static str,
    pub affiliate: &'static str,
    pub scene_type: &'static str,
    pub customer_price: f64,
}

impl<'a> CreateOrderRequest<'a> {
    pub fn new(product_id: &'a str, price: Cents) -> Self {
        Self { product_id, pay_type: "alipay", affiliate: "", scene_type: "pc", customer_price: price.as_decimal() }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateOrderData {
    pub order_no: Option<String>,
    pub pay_obj: Option<String>,
}
