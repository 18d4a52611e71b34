use std::{fmt::Debug, sync::Arc};

use eshop_common::Cents;
use log::*;

use crate::{
    agents::{AccountPool, AgentError},
    db_types::{NewOrder, NewPayment, Order, OrderId, PaymentId, SellableProduct},
    engine_api::{
        checkout_objects::{price_order, CheckoutReceipt, CheckoutRequest},
        errors::CheckoutError,
    },
    events::{CheckoutCompletedEvent, EventProducers},
    traits::{Clock, GatewayError, PaymentStore, ProductCatalog, RemoteGateway, RemoteOrderRef, SessionCache},
};

/// The number of times checkout tries to create a remote order before giving up.
pub const MAX_ORDER_ATTEMPTS: usize = 3;

/// `CheckoutApi` is the payment initiation service. It turns a checkout request into an order, a remote order on the
/// payment gateway and a local payment, and hands the customer something to pay with.
pub struct CheckoutApi<B, G, C> {
    db: B,
    agents: AccountPool<G, C>,
    clock: Arc<dyn Clock>,
    producers: EventProducers,
    max_attempts: usize,
}

impl<B, G, C> Debug for CheckoutApi<B, G, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CheckoutApi ({:?}, {} attempts)", self.agents, self.max_attempts)
    }
}

impl<B, G, C> CheckoutApi<B, G, C>
where
    B: PaymentStore + ProductCatalog,
    G: RemoteGateway,
    C: SessionCache,
{
    pub fn new(db: B, agents: AccountPool<G, C>, clock: Arc<dyn Clock>, producers: EventProducers) -> Self {
        Self { db, agents, clock, producers, max_attempts: MAX_ORDER_ATTEMPTS }
    }

    pub fn with_max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    /// Starts the payment of a single product for an already authenticated user.
    ///
    /// Steps:
    /// * the request is validated and the product looked up. Nothing is stored if either fails.
    /// * the order and its item are stored, in state `ToPay`.
    /// * a remote order is created via a randomly chosen gateway account, with up to [`MAX_ORDER_ATTEMPTS`] tries.
    /// * a `Paying` payment is stored and linked to the order.
    ///
    /// If every remote attempt fails the order stays behind without a payment and [`CheckoutError::GatewayBusy`] is
    /// returned.
    pub async fn initiate_payment(
        &self,
        user_id: &str,
        request: CheckoutRequest,
    ) -> Result<CheckoutReceipt, CheckoutError> {
        let item = request.validate()?;
        let product = self
            .db
            .fetch_sellable_product(&item.product_id)
            .await?
            .ok_or_else(|| CheckoutError::ProductUnavailable(item.product_id.clone()))?;
        let pricing = price_order(product.price, item.quantity, Cents::default());
        let new_order = NewOrder {
            id: OrderId::random(),
            user_id: user_id.to_string(),
            item_id: uuid::Uuid::new_v4().to_string(),
            product_id: product.id.clone(),
            quantity: item.quantity,
            unit_price: product.price,
            total_amount: pricing.total_amount,
            discount: pricing.discount,
            final_amount: pricing.final_amount,
            created_at: self.clock.now(),
        };
        let order = self.db.insert_order_with_item(new_order).await?;
        debug!("🔄️🛒️ Order {} created for user {user_id}. Amount due: {}", order.id, order.final_amount);

        let (agent, remote) = self.create_remote_order(&order, &product).await?;
        let new_payment = NewPayment {
            id: PaymentId::random(),
            order_id: order.id.clone(),
            final_amount: order.final_amount,
            method: request.payment_method.clone(),
            gateway_type: request.gateway_type.clone(),
            gateway_id: remote.remote_id.clone(),
            agent,
            created_at: self.clock.now(),
        };
        let payment = self.db.attach_payment(new_payment).await?;
        info!(
            "🔄️🛒️ Payment {} started for order {} (remote order {} via {})",
            payment.id, order.id, payment.gateway_id, payment.agent
        );
        let event = CheckoutCompletedEvent {
            user_id: user_id.to_string(),
            product_id: product.id.clone(),
            order_id: order.id.clone(),
            payment_id: payment.id.clone(),
        };
        self.producers.publish_checkout_completed(event).await;
        Ok(CheckoutReceipt { order_id: order.id, payment_id: payment.id, payment_artifact: remote.payment_artifact })
    }

    async fn create_remote_order(
        &self,
        order: &Order,
        product: &SellableProduct,
    ) -> Result<(String, RemoteOrderRef), CheckoutError> {
        let mut last_error = String::new();
        for attempt in 1..=self.max_attempts {
            match self.try_create_remote_order(product, order.final_amount).await {
                Ok(result) => {
                    trace!("🔄️🛒️ Remote order for {} created on attempt {attempt}", order.id);
                    return Ok(result);
                },
                Err(e) => {
                    warn!("🔄️🛒️ Attempt {attempt}/{} to create a remote order for {} failed. {e}", self.max_attempts, order.id);
                    last_error = e.to_string();
                },
            }
        }
        error!(
            "🔄️🛒️ Giving up on a remote order for {} after {} attempts. The order is left without a payment.",
            order.id, self.max_attempts
        );
        Err(CheckoutError::GatewayBusy { order_id: order.id.clone(), attempts: self.max_attempts, last_error })
    }

    async fn try_create_remote_order(
        &self,
        product: &SellableProduct,
        price: Cents,
    ) -> Result<(String, RemoteOrderRef), AgentError> {
        let (agent_id, session) = self.agents.acquire().await?;
        match self.agents.gateway().create_remote_order(&session, &product.external_id, price).await {
            Ok(remote) if remote.is_complete() => Ok((agent_id, remote)),
            Ok(remote) => Err(GatewayError::Order(format!(
                "Remote order '{}' via {agent_id} came back incomplete",
                remote.remote_id
            ))
            .into()),
            Err(GatewayError::Auth(msg)) => {
                // The cached session has gone stale. Make the next attempt log in again.
                self.agents.invalidate(&agent_id);
                Err(GatewayError::Auth(msg).into())
            },
            Err(e) => Err(e.into()),
        }
    }
}
