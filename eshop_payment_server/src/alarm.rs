//! Operator alarms, posted as text messages to a chat webhook.
use std::{future::Future, pin::Pin, time::Duration};

use eshop_common::Secret;
use eshop_payment_engine::events::{Handler, PaymentAnomalyEvent};
use log::*;
use rand::Rng;
use reqwest::Client;
use serde::Serialize;

use crate::errors::AlarmError;

/// Retries after the first attempt fails.
pub const ALARM_RETRIES: usize = 3;

#[derive(Debug, Serialize)]
struct TextMessage<'a> {
    msg_type: &'static str,
    content: TextContent<'a>,
}

#[derive(Debug, Serialize)]
struct TextContent<'a> {
    text: &'a str,
}

#[derive(Clone)]
pub struct AlarmNotifier {
    url: Secret<String>,
    client: Client,
    min_pause: Duration,
    max_pause: Duration,
}

impl AlarmNotifier {
    pub fn new(url: Secret<String>) -> Self {
        Self { url, client: Client::new(), min_pause: Duration::from_secs(3), max_pause: Duration::from_secs(5) }
    }

    /// Sets the range of the random pause between attempts.
    pub fn with_retry_pause(mut self, min: Duration, max: Duration) -> Self {
        self.min_pause = min.min(max);
        self.max_pause = max.max(min);
        self
    }

    /// Posts `text` to the webhook. Failed attempts are retried up to [`ALARM_RETRIES`] times after a random pause.
    pub async fn send(&self, text: &str) -> Result<(), AlarmError> {
        let message = TextMessage { msg_type: "text", content: TextContent { text } };
        for attempt in 0..=ALARM_RETRIES {
            match self.post(&message).await {
                Ok(()) => {
                    debug!("🚨️ Alarm delivered: {text}");
                    return Ok(());
                },
                Err(e) => warn!("🚨️ Alarm delivery attempt {} failed. {e}", attempt + 1),
            }
            if attempt < ALARM_RETRIES {
                tokio::time::sleep(self.pause()).await;
            }
        }
        Err(AlarmError::GaveUp(ALARM_RETRIES + 1))
    }

    async fn post(&self, message: &TextMessage<'_>) -> Result<(), AlarmError> {
        let response = self
            .client
            .post(self.url.reveal())
            .json(message)
            .send()
            .await
            .map_err(|e| AlarmError::Transport(e.to_string()))?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(AlarmError::Rejected(status.as_u16()))
        }
    }

    fn pause(&self) -> Duration {
        let lo = self.min_pause.as_millis() as u64;
        let hi = self.max_pause.as_millis() as u64;
        if hi == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::thread_rng().gen_range(lo..=hi))
    }

    /// A hook that forwards payment anomalies as alarms.
    pub fn anomaly_hook(self) -> Handler<PaymentAnomalyEvent> {
        std::sync::Arc::new(move |ev: PaymentAnomalyEvent| {
            let notifier = self.clone();
            Box::pin(async move {
                if let Err(e) = notifier.send(&ev.to_string()).await {
                    error!("🚨️ Could not raise an alarm for payment {}. {e}. The alarm was: {ev}", ev.payment_id);
                }
            }) as Pin<Box<dyn Future<Output = ()> + Send>>
        })
    }
}

#[cfg(test)]
mod test {
    use serde_json::json;
    use wiremock::{
        matchers::{body_json, method},
        Mock,
        MockServer,
        ResponseTemplate,
    };

    use super::*;

    fn notifier(server: &MockServer) -> AlarmNotifier {
        let _ = env_logger::try_init();
        AlarmNotifier::new(Secret::new(format!("{}/hook", server.uri())))
            .with_retry_pause(Duration::from_millis(1), Duration::from_millis(5))
    }

    #[tokio::test]
    async fn posts_a_text_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_json(json!({"msg_type": "text", "content": {"text": "[ERROR] payment stuck"}})))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
        notifier(&server).send("[ERROR] payment stuck").await.unwrap();
    }

    #[tokio::test]
    async fn gives_up_after_the_retries() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(ALARM_RETRIES as u64 + 1)
            .mount(&server)
            .await;
        let err = notifier(&server).send("hello").await.unwrap_err();
        assert!(matches!(err, AlarmError::GaveUp(4)));
    }

    #[tokio::test]
    async fn recovers_on_a_retry() {
        let server = MockServer::start().await;
        Mock::given(method("POST")).respond_with(ResponseTemplate::new(503)).up_to_n_times(1).mount(&server).await;
        Mock::given(method("POST")).respond_with(ResponseTemplate::new(200)).expect(1).mount(&server).await;
        notifier(&server).send("hello").await.unwrap();
    }
}
