use std::time::Duration;

use eshop_payment_engine::{
    traits::{PaymentStore, RemoteGateway, SessionCache},
    Reconciler,
};
use log::*;
use tokio::{task::JoinHandle, time::MissedTickBehavior};

/// Starts the reconciliation worker. Do not await the returned JoinHandle, as it will run indefinitely.
///
/// The checks dispatched by a pass are detached, so a slow gateway never delays the next tick. Payments whose check
/// is still running are skipped by later passes until it finishes.
pub fn start_reconciliation_worker<B, G, C>(reconciler: Reconciler<B, G, C>, interval: Duration) -> JoinHandle<()>
where
    B: PaymentStore,
    G: RemoteGateway,
    C: SessionCache,
{
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!("🕰️ Reconciliation worker started. Passes run every {}ms", interval.as_millis());
        loop {
            timer.tick().await;
            trace!("🕰️ Running reconciliation pass");
            match reconciler.run_pass().await {
                Ok(pass) => {
                    let summary = pass.detach();
                    if summary.pending > 0 {
                        debug!(
                            "🕰️ Reconciliation pass done. {} checks dispatched, {} payments timed out, {} checks in \
                             flight",
                            summary.dispatched,
                            summary.timed_out,
                            reconciler.in_flight()
                        );
                    }
                },
                Err(e) => {
                    error!("🕰️ Error running reconciliation pass. Will try again on the next tick. {e}");
                },
            }
        }
    })
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use eshop_payment_engine::{
        agents::{AccountPool, MemorySessionCache},
        checkout_objects::CheckoutRequest,
        db_types::PaymentStatus,
        events::EventProducers,
        test_utils::{
            fakes::ScriptedGateway,
            prepare_env::{drop_database, new_test_database, seed_product},
        },
        traits::{AgentCredentials, PaymentStore, SystemClock},
        CheckoutApi,
        ReconcilerConfig,
    };
    use eshop_common::Cents;

    use super::*;

    #[tokio::test]
    async fn worker_settles_paid_orders() {
        let (url, db) = new_test_database().await;
        seed_product(&db, "P1", Cents::from(1000), "5517").await;
        let gateway = ScriptedGateway::new();
        let pool = AccountPool::new(
            vec![AgentCredentials::new("13800000001", "pw")],
            gateway.clone(),
            Arc::new(MemorySessionCache::default()),
        );
        let clock = Arc::new(SystemClock);
        let checkout = CheckoutApi::new(db.clone(), pool.clone(), clock.clone(), EventProducers::default());
        let receipt = checkout.initiate_payment("alice", CheckoutRequest::single("P1")).await.unwrap();
        let payment = db.fetch_payment(&receipt.payment_id).await.unwrap().unwrap();
        gateway.mark_paid(&payment.gateway_id);

        let config = ReconcilerConfig { dispatch_stagger: Duration::ZERO, ..Default::default() };
        let reconciler = Reconciler::new(db.clone(), pool, clock, EventProducers::default(), config);
        let handle = start_reconciliation_worker(reconciler, Duration::from_millis(20));
        let mut status = PaymentStatus::Paying;
        for _ in 0..100 {
            status = db.fetch_payment(&receipt.payment_id).await.unwrap().unwrap().status;
            if status == PaymentStatus::Payed {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        handle.abort();
        assert_eq!(status, PaymentStatus::Payed);
        drop_database(&url).await;
    }
}
