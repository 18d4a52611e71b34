use std::sync::Arc;

use eshop_common::{Cents, Secret};
use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue, COOKIE, SET_COOKIE},
    Client,
    RequestBuilder,
};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{
    config::YltConfig,
    data_objects::{CreateOrderData, CreateOrderRequest, LoginData, LoginRequest, RemoteOrder, YltEnvelope, YltSession},
    YltApiError,
};

const LOGIN_PATH: &str = "/api/login/phoneNumberPassLogin";
const CREATE_ORDER_PATH: &str = "/api/order/createOrder";
const CHECK_ORDER_PATH: &str = "/api/order/checkProductOrder";

#[derive(Clone)]
pub struct YltApi {
    config: YltConfig,
    client: Arc<Client>,
}

struct RawResponse<T> {
    headers: HeaderMap,
    envelope: YltEnvelope<T>,
}

impl YltApi {
    pub fn new(config: YltConfig) -> Result<Self, YltApiError> {
        let init_err = |e: reqwest::header::InvalidHeaderValue| YltApiError::Initialization(e.to_string());
        let mut headers = HeaderMap::with_capacity(12);
        headers.insert("Content-Type", HeaderValue::from_static("application/json;charset=utf-8"));
        headers.insert("Accept", HeaderValue::from_static("application/json"));
        headers.insert("Accept-Language", HeaderValue::from_static("zh-CN,zh;q=0.9"));
        headers.insert("Cache-Control", HeaderValue::from_static("no-cache"));
        headers.insert("sec-ch-ua-mobile", HeaderValue::from_static("?0"));
        headers.insert("sec-ch-ua-platform", HeaderValue::from_static("\"Windows\""));
        headers.insert("Sec-Fetch-Dest", HeaderValue::from_static("empty"));
        headers.insert("Sec-Fetch-Mode", HeaderValue::from_static("cors"));
        headers.insert("Sec-Fetch-Site", HeaderValue::from_static("same-origin"));
        headers.insert("Origin", HeaderValue::from_str(&config.base_url).map_err(init_err)?);
        headers.insert("Referer", HeaderValue::from_str(&format!("{}/", config.base_url)).map_err(init_err)?);
        let client = Client::builder()
            .default_headers(headers)
            .user_agent(config.user_agent.as_str())
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| YltApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url)
    }

    pub fn config(&self) -> &YltConfig {
        &self.config
    }

    /// Sends the request and unpacks the gateway envelope. Every failure is reported through `fail`, so that each
    /// endpoint surfaces its own error category.
    async fn rest_query<T: DeserializeOwned>(
        &self,
        req: RequestBuilder,
        fail: fn(String) -> YltApiError,
    ) -> Result<RawResponse<T>, YltApiError> {
        let response = req.send().await.map_err(|e| fail(format!("Request failed. {e}")))?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(fail(format!("HTTP {}. {message}", status.as_u16())));
        }
        trace!("Gateway query successful. {status}");
        let headers = response.headers().clone();
        let envelope = response
            .json::<YltEnvelope<T>>()
            .await
            .map_err(|e| fail(format!("Could not deserialize response. {e}")))?;
        if !envelope.s {
            return Err(fail(envelope.error_message()));
        }
        Ok(RawResponse { headers, envelope })
    }

    fn with_session(&self, req: RequestBuilder, session: &YltSession) -> RequestBuilder {
        req.header("gt-token", session.token.reveal().as_str()).header(COOKIE, session.cookie.reveal().as_str())
    }

    /// Logs in with the phone number and password of a gateway account.
    ///
    /// The gateway hands out two credentials: a token in the response body and a cookie in the `set-cookie` header.
    /// The login only counts as successful if both are present.
    pub async fn login(&self, phone: &str, password: &Secret<String>) -> Result<YltSession, YltApiError> {
        debug!("Logging in to the gateway as {phone}");
        let body = LoginRequest { phone_number: phone, password: password.reveal() };
        let req = self.client.post(self.url(LOGIN_PATH)).json(&body);
        let response = self.rest_query::<LoginData>(req, YltApiError::AuthError).await?;
        let cookie = response
            .headers
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or(v).trim())
            .filter(|v| !v.is_empty())
            .collect::<Vec<&str>>()
            .join("; ");
        if cookie.is_empty() {
            return Err(YltApiError::AuthError("The login response did not set a cookie".into()));
        }
        let token = response
            .envelope
            .d
            .and_then(|d| d.token)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| YltApiError::AuthError("The login response did not contain a token".into()))?;
        info!("Logged in to the gateway as {phone}");
        Ok(YltSession::new(token, cookie))
    }

    /// Creates an order for the gateway product `product_id`, to be paid at `price`.
    pub async fn create_order(
        &self,
        session: &YltSession,
        product_id: &str,
        price: Cents,
    ) -> Result<RemoteOrder, YltApiError> {
        debug!("Creating remote order for product {product_id} at {price}");
        let body = CreateOrderRequest::new(product_id, price);
        let req = self.with_session(self.client.post(self.url(CREATE_ORDER_PATH)), session).json(&body);
        let response = self.rest_query::<CreateOrderData>(req, YltApiError::OrderError).await?;
        let data =
            response.envelope.d.ok_or_else(|| YltApiError::OrderError("The response contained no order data".into()))?;
        let order_no = data
            .order_no
            .filter(|s| !s.is_empty())
            .ok_or_else(|| YltApiError::OrderError("The response did not contain an order number".into()))?;
        let pay_obj = data
            .pay_obj
            .filter(|s| !s.is_empty())
            .ok_or_else(|| YltApiError::OrderError(format!("Order {order_no} came back without a payment QR code")))?;
        info!("Remote order {order_no} created for product {product_id}");
        Ok(RemoteOrder { order_no, pay_obj })
    }

    /// Asks the gateway whether the order has been paid.
    ///
    /// The gateway answers with a bare boolean. Anything other than `true` (including a missing or null payload) means
    /// "not paid yet".
    pub async fn check_order(&self, session: &YltSession, order_no: &str) -> Result<bool, YltApiError> {
        if order_no.is_empty() {
            return Err(YltApiError::QueryError("Cannot check an order without an order number".into()));
        }
        let req = self.with_session(self.client.get(self.url(CHECK_ORDER_PATH)), session).query(&[("orderNo", order_no)]);
        let response = self.rest_query::<Value>(req, YltApiError::QueryError).await?;
        let paid = matches!(response.envelope.d, Some(Value::Bool(true)));
        trace!("Remote order {order_no} paid: {paid}");
        Ok(paid)
    }
}
