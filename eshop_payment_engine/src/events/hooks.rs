use std::{future::Future, pin::Pin, sync::Arc};

use crate::events::{
    CheckoutCompletedEvent,
    EventHandler,
    EventProducer,
    Handler,
    PaymentAnomalyEvent,
    PaymentSettledEvent,
    PaymentTimedOutEvent,
};

#[derive(Default, Clone)]
pub struct EventProducers {
    pub checkout_completed_producer: Vec<EventProducer<CheckoutCompletedEvent>>,
    pub payment_settled_producer: Vec<EventProducer<PaymentSettledEvent>>,
    pub payment_timed_out_producer: Vec<EventProducer<PaymentTimedOutEvent>>,
    pub payment_anomaly_producer: Vec<EventProducer<PaymentAnomalyEvent>>,
}

impl EventProducers {
    pub async fn publish_checkout_completed(&self, event: CheckoutCompletedEvent) {
        for p in &self.checkout_completed_producer {
            p.publish_event(event.clone()).await;
        }
    }

    pub async fn publish_payment_settled(&self, event: PaymentSettledEvent) {
        for p in &self.payment_settled_producer {
            p.publish_event(event.clone()).await;
        }
    }

    pub async fn publish_payment_timed_out(&self, event: PaymentTimedOutEvent) {
        for p in &self.payment_timed_out_producer {
            p.publish_event(event.clone()).await;
        }
    }

    pub async fn publish_payment_anomaly(&self, event: PaymentAnomalyEvent) {
        for p in &self.payment_anomaly_producer {
            p.publish_event(event.clone()).await;
        }
    }
}

pub struct EventHandlers {
    pub on_checkout_completed: Option<EventHandler<CheckoutCompletedEvent>>,
    pub on_payment_settled: Option<EventHandler<PaymentSettledEvent>>,
    pub on_payment_timed_out: Option<EventHandler<PaymentTimedOutEvent>>,
    pub on_payment_anomaly: Option<EventHandler<PaymentAnomalyEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_checkout_completed =
            hooks.on_checkout_completed.map(|f| EventHandler::new("checkout_completed", buffer_size, f));
        let on_payment_settled = hooks.on_payment_settled.map(|f| EventHandler::new("payment_settled", buffer_size, f));
        let on_payment_timed_out =
            hooks.on_payment_timed_out.map(|f| EventHandler::new("payment_timed_out", buffer_size, f));
        let on_payment_anomaly = hooks.on_payment_anomaly.map(|f| EventHandler::new("payment_anomaly", buffer_size, f));
        Self { on_checkout_completed, on_payment_settled, on_payment_timed_out, on_payment_anomaly }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_checkout_completed {
            result.checkout_completed_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_payment_settled {
            result.payment_settled_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_payment_timed_out {
            result.payment_timed_out_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_payment_anomaly {
            result.payment_anomaly_producer.push(handler.subscribe());
        }
        result
    }

    /// Spawns every configured handler onto the runtime. Each one stops once all of its producers are dropped.
    pub async fn start_handlers(self) {
        if let Some(handler) = self.on_checkout_completed {
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_payment_settled {
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_payment_timed_out {
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_payment_anomaly {
            tokio::spawn(handler.start_handler());
        }
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_checkout_completed: Option<Handler<CheckoutCompletedEvent>>,
    pub on_payment_settled: Option<Handler<PaymentSettledEvent>>,
    pub on_payment_timed_out: Option<Handler<PaymentTimedOutEvent>>,
    pub on_payment_anomaly: Option<Handler<PaymentAnomalyEvent>>,
}

impl EventHooks {
    pub fn on_checkout_completed<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(CheckoutCompletedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_checkout_completed = Some(Arc::new(f));
        self
    }

    pub fn on_payment_settled<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(PaymentSettledEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_payment_settled = Some(Arc::new(f));
        self
    }

    pub fn on_payment_timed_out<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(PaymentTimedOutEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_payment_timed_out = Some(Arc::new(f));
        self
    }

    pub fn on_payment_anomaly<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(PaymentAnomalyEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_payment_anomaly = Some(Arc::new(f));
        self
    }
}
