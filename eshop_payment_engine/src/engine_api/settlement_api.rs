use std::{fmt::Debug, sync::Arc};

use log::*;

use crate::{
    db_types::Payment,
    engine_api::errors::SettlementError,
    events::{EventProducers, PaymentAnomalyEvent, PaymentSettledEvent},
    traits::{Clock, PaymentStore, PaymentStoreError, SettlementOutcome},
};

/// Applies confirmed remote payments to the local state.
///
/// Settling is idempotent. Calling [`SettlementApi::settle`] again for a payment that is already `Payed` fills in
/// anything that is missing and otherwise changes nothing.
#[derive(Clone)]
pub struct SettlementApi<B> {
    db: B,
    clock: Arc<dyn Clock>,
    producers: EventProducers,
}

impl<B> Debug for SettlementApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SettlementApi")
    }
}

impl<B> SettlementApi<B>
where B: PaymentStore
{
    pub fn new(db: B, clock: Arc<dyn Clock>, producers: EventProducers) -> Self {
        Self { db, clock, producers }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub async fn settle(&self, payment: &Payment) -> Result<SettlementOutcome, SettlementError> {
        let now = self.clock.now();
        let record = match self.db.settle_payment(&payment.id, now).await {
            Ok(record) => record,
            Err(PaymentStoreError::PaymentNotFound(id)) => return Err(SettlementError::PaymentNotFound(id)),
            Err(e) => {
                error!("🔄️💰️ Payment {} was paid remotely, but the settlement could not be saved. {e}", payment.id);
                let msg = format!(
                    "Remote order {} is paid, but settling payment {} failed: {e}. It will be retried on the next pass.",
                    payment.gateway_id, payment.id
                );
                let event = PaymentAnomalyEvent::error(payment.id.clone(), Some(payment.order_id.clone()), msg);
                self.producers.publish_payment_anomaly(event).await;
                return Err(SettlementError::Persistence { payment_id: payment.id.clone(), source: e });
            },
        };
        match record.outcome {
            SettlementOutcome::Settled { entitlements_created } => {
                info!(
                    "🔄️💰️ Payment {} for order {} settled. {entitlements_created} entitlements granted.",
                    record.payment.id, record.payment.order_id
                );
                let event = PaymentSettledEvent { payment: record.payment, entitlements_created };
                self.producers.publish_payment_settled(event).await;
            },
            SettlementOutcome::AlreadySettled { entitlements_created: 0 } => {
                debug!("🔄️💰️ Payment {} was already settled. Nothing to do.", record.payment.id);
            },
            SettlementOutcome::AlreadySettled { entitlements_created } => {
                warn!(
                    "🔄️💰️ Payment {} was already settled, but {entitlements_created} entitlements were missing and have \
                     been granted now.",
                    record.payment.id
                );
            },
            outcome => {
                error!(
                    "🔄️💰️ Payment {} is {} locally but reported as paid by the gateway. It will not be settled.",
                    record.payment.id, record.payment.status
                );
                let event = PaymentAnomalyEvent::from_rejection(&record.payment, outcome);
                self.producers.publish_payment_anomaly(event).await;
            },
        }
        Ok(record.outcome)
    }
}
