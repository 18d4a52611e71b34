//! Connects the engine's [`RemoteGateway`] seam to the YLT REST client.
use eshop_common::Cents;
use eshop_payment_engine::traits::{AgentCredentials, AgentSession, GatewayError, RemoteGateway, RemoteOrderRef};
use log::*;
use ylt_client::{YltApi, YltApiError, YltSession};

#[derive(Clone)]
pub struct YltGateway {
    api: YltApi,
}

impl YltGateway {
    pub fn new(api: YltApi) -> Self {
        Self { api }
    }

    pub fn api(&self) -> &YltApi {
        &self.api
    }
}

fn to_ylt_session(session: &AgentSession) -> YltSession {
    YltSession { token: session.token.clone(), cookie: session.cookie.clone() }
}

/// Maps client errors onto the engine's categories. A rejected session during an order or status call is reported as
/// an authentication failure, so that the engine drops the cached session.
fn to_gateway_error(e: YltApiError) -> GatewayError {
    match e {
        YltApiError::AuthError(msg) => GatewayError::Auth(msg),
        YltApiError::OrderError(msg) if is_unauthorized(&msg) => GatewayError::Auth(msg),
        YltApiError::QueryError(msg) if is_unauthorized(&msg) => GatewayError::Auth(msg),
        YltApiError::OrderError(msg) => GatewayError::Order(msg),
        YltApiError::QueryError(msg) => GatewayError::Query(msg),
        YltApiError::Initialization(msg) => GatewayError::Query(msg),
    }
}

fn is_unauthorized(msg: &str) -> bool {
    msg.starts_with("HTTP 401") || msg.starts_with("HTTP 403")
}

impl RemoteGateway for YltGateway {
    async fn authenticate(&self, agent: &AgentCredentials) -> Result<AgentSession, GatewayError> {
        let session = self.api.login(&agent.agent_id, &agent.secret).await.map_err(to_gateway_error)?;
        trace!("🔑️ Gateway session issued for {}", agent.agent_id);
        Ok(AgentSession { token: session.token, cookie: session.cookie })
    }

    async fn create_remote_order(
        &self,
        session: &AgentSession,
        external_id: &str,
        price: Cents,
    ) -> Result<RemoteOrderRef, GatewayError> {
        let order = self
            .api
            .create_order(&to_ylt_session(session), external_id, price)
            .await
            .map_err(to_gateway_error)?;
        Ok(RemoteOrderRef { remote_id: order.order_no, payment_artifact: order.pay_obj })
    }

    async fn check_remote_order(&self, session: &AgentSession, remote_id: &str) -> Result<bool, GatewayError> {
        self.api.check_order(&to_ylt_session(session), remote_id).await.map_err(to_gateway_error)
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use serde_json::json;
    use wiremock::{
        matchers::{method, path},
        Mock,
        MockServer,
        ResponseTemplate,
    };
    use ylt_client::YltConfig;

    use super::*;

    async fn gateway_for(server: &MockServer) -> YltGateway {
        let _ = env_logger::try_init();
        let config =
            YltConfig { request_timeout: Duration::from_secs(2), ..YltConfig::default() }.with_base_url(server.uri());
        YltGateway::new(YltApi::new(config).expect("Failed to create client"))
    }

    #[tokio::test]
    async fn login_and_order() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/login/phoneNumberPassLogin"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("set-cookie", "SESSION=abc; Path=/")
                    .set_body_json(json!({"s": true, "c": 200, "d": {"token": "tok"}})),
            )
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/order/createOrder"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"s": true, "c": 200, "d": {"orderNo": "YLT9", "payObj": "qr"}})),
            )
            .mount(&server)
            .await;
        let gateway = gateway_for(&server).await;
        let agent = AgentCredentials::new("13800000001", "pw");
        let session = gateway.authenticate(&agent).await.unwrap();
        assert_eq!(session, AgentSession::new("tok", "SESSION=abc"));
        let remote = gateway.create_remote_order(&session, "5517", Cents::from(1000)).await.unwrap();
        assert_eq!(remote, RemoteOrderRef { remote_id: "YLT9".into(), payment_artifact: "qr".into() });
    }

    #[tokio::test]
    async fn expired_sessions_are_reported_as_auth_failures() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/order/checkProductOrder"))
            .respond_with(ResponseTemplate::new(401).set_body_string("login required"))
            .mount(&server)
            .await;
        let gateway = gateway_for(&server).await;
        let err = gateway.check_remote_order(&AgentSession::new("tok", "c"), "YLT9").await.unwrap_err();
        assert!(matches!(err, GatewayError::Auth(_)), "{err:?}");
    }

    #[test]
    fn error_mapping() {
        assert_eq!(to_gateway_error(YltApiError::OrderError("busy".into())), GatewayError::Order("busy".into()));
        assert_eq!(to_gateway_error(YltApiError::QueryError("HTTP 500".into())), GatewayError::Query("HTTP 500".into()));
        assert_eq!(
            to_gateway_error(YltApiError::OrderError("HTTP 401. nope".into())),
            GatewayError::Auth("HTTP 401. nope".into())
        );
    }
}
