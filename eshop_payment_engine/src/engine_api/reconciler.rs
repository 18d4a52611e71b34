//! The reconciliation pass.
//!
//! The remote gateway has no webhooks, so the only way to find out that a customer has paid is to ask. A pass loads
//! every `Paying` payment and
//! * times it out if it is older than the payment timeout. Timed-out payments are never checked remotely again.
//! * skips it if the agent that created it has no cached session. The session refresh worker will log that agent in
//!   again, and the next pass picks the payment up.
//! * skips it if a check dispatched by an earlier pass is still running.
//! * otherwise dispatches a remote status check, which settles the payment if it has been paid.
//!
//! Dispatched checks run concurrently (bounded by a semaphore) and a short stagger between dispatches limits the
//! request rate against the gateway. The pass hands back its checks in a [`ReconciliationPass`], which the caller can
//! either join or detach.
use std::{fmt::Debug, sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use dashmap::DashSet;
use log::*;
use tokio::{sync::Semaphore, task::JoinSet};

use crate::{
    agents::AccountPool,
    db_types::{Payment, PaymentId, PaymentStatus},
    engine_api::{errors::ReconciliationError, settlement_api::SettlementApi},
    events::{EventProducers, PaymentTimedOutEvent},
    traits::{AgentSession, Clock, GatewayError, PaymentStore, RemoteGateway, SessionCache, SettlementOutcome},
};

pub const DEFAULT_PAYMENT_TIMEOUT: Duration = Duration::from_secs(3 * 60);
pub const DEFAULT_DISPATCH_STAGGER: Duration = Duration::from_millis(200);
pub const DEFAULT_MAX_IN_FLIGHT: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcilerConfig {
    /// Payments still unpaid this long after creation are timed out.
    pub payment_timeout: Duration,
    /// Pause between dispatching two remote checks in the same pass.
    pub dispatch_stagger: Duration,
    /// Upper bound on concurrently running remote checks, across passes.
    pub max_in_flight: usize,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            payment_timeout: DEFAULT_PAYMENT_TIMEOUT,
            dispatch_stagger: DEFAULT_DISPATCH_STAGGER,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
        }
    }
}

/// What a pass did with the pending payments it found.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassSummary {
    pub pending: usize,
    pub timed_out: usize,
    pub dispatched: usize,
    pub skipped_no_session: usize,
    pub skipped_in_flight: usize,
}

/// How a single dispatched check ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    NotYetPaid,
    Settled(SettlementOutcome),
    CheckFailed(GatewayError),
    SettlementFailed(String),
}

/// The checks dispatched by one pass.
///
/// Dropping this value aborts any checks that are still running. Call [`ReconciliationPass::join`] to wait for them,
/// or [`ReconciliationPass::detach`] to let them run on in the background.
pub struct ReconciliationPass {
    pub summary: PassSummary,
    checks: JoinSet<(PaymentId, CheckOutcome)>,
}

impl ReconciliationPass {
    pub fn running(&self) -> usize {
        self.checks.len()
    }

    /// Waits for every dispatched check and returns their outcomes in completion order.
    pub async fn join(mut self) -> Vec<(PaymentId, CheckOutcome)> {
        let mut results = Vec::with_capacity(self.checks.len());
        while let Some(res) = self.checks.join_next().await {
            match res {
                Ok(outcome) => results.push(outcome),
                Err(e) => error!("🔄️🔍️ A payment check task failed: {e}"),
            }
        }
        results
    }

    /// Lets the checks finish in the background. Their results are only logged.
    pub fn detach(mut self) -> PassSummary {
        self.checks.detach_all();
        self.summary
    }
}

/// Removes the payment from the in-flight set when the check ends, however it ends.
struct InFlightGuard {
    in_flight: Arc<DashSet<PaymentId>>,
    payment_id: PaymentId,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.in_flight.remove(&self.payment_id);
    }
}

pub struct Reconciler<B, G, C> {
    db: B,
    agents: AccountPool<G, C>,
    settlement: SettlementApi<B>,
    clock: Arc<dyn Clock>,
    producers: EventProducers,
    config: ReconcilerConfig,
    permits: Arc<Semaphore>,
    in_flight: Arc<DashSet<PaymentId>>,
}

impl<B, G, C> Debug for Reconciler<B, G, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Reconciler ({:?}, {:?})", self.agents, self.config)
    }
}

impl<B, G, C> Reconciler<B, G, C>
where
    B: PaymentStore,
    G: RemoteGateway,
    C: SessionCache,
{
    pub fn new(
        db: B,
        agents: AccountPool<G, C>,
        clock: Arc<dyn Clock>,
        producers: EventProducers,
        config: ReconcilerConfig,
    ) -> Self {
        let settlement = SettlementApi::new(db.clone(), Arc::clone(&clock), producers.clone());
        let permits = Arc::new(Semaphore::new(config.max_in_flight.max(1)));
        Self { db, agents, settlement, clock, producers, config, permits, in_flight: Arc::new(DashSet::new()) }
    }

    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    /// The number of payments with a remote check currently running.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    pub fn is_timed_out(&self, payment: &Payment, now: DateTime<Utc>) -> bool {
        let elapsed = now.signed_duration_since(payment.created_at);
        elapsed.to_std().map(|e| e > self.config.payment_timeout).unwrap_or(false)
    }

    /// Runs one reconciliation pass. See the module docs for what happens to each payment.
    pub async fn run_pass(&self) -> Result<ReconciliationPass, ReconciliationError> {
        let pending = self.db.fetch_payments_by_status(PaymentStatus::Paying).await?;
        let mut summary = PassSummary { pending: pending.len(), ..Default::default() };
        let mut checks = JoinSet::new();
        if pending.is_empty() {
            trace!("🔄️🔍️ No payments awaiting confirmation");
            return Ok(ReconciliationPass { summary, checks });
        }
        debug!("🔄️🔍️ {} payments awaiting confirmation", pending.len());
        let now = self.clock.now();
        for payment in pending {
            if self.is_timed_out(&payment, now) {
                self.time_out(&payment, now).await;
                summary.timed_out += 1;
                continue;
            }
            if self.in_flight.contains(&payment.id) {
                trace!("🔄️🔍️ A check for payment {} is still running. Skipping it this time.", payment.id);
                summary.skipped_in_flight += 1;
                continue;
            }
            let Some(session) = self.agents.cached_session(&payment.agent) else {
                warn!(
                    "🔄️🔍️ No session cached for agent {}. Payment {} will be checked on a later pass.",
                    payment.agent, payment.id
                );
                summary.skipped_no_session += 1;
                continue;
            };
            if summary.dispatched > 0 && !self.config.dispatch_stagger.is_zero() {
                tokio::time::sleep(self.config.dispatch_stagger).await;
            }
            self.dispatch(&mut checks, payment, session);
            summary.dispatched += 1;
        }
        info!(
            "🔄️🔍️ Reconciliation pass: {} pending, {} timed out, {} checks dispatched, {} without session, {} still in \
             flight",
            summary.pending, summary.timed_out, summary.dispatched, summary.skipped_no_session, summary.skipped_in_flight
        );
        Ok(ReconciliationPass { summary, checks })
    }

    /// Re-derives the order status for payments that are `Payed` but whose orders say otherwise.
    pub async fn repair_pass(&self) -> Result<u64, ReconciliationError> {
        let repaired = self.db.repair_settled_orders(self.clock.now()).await?;
        Ok(repaired)
    }

    async fn time_out(&self, payment: &Payment, now: DateTime<Utc>) {
        match self.db.mark_payment_timed_out(&payment.id, now).await {
            Ok(Some(payment)) => {
                info!(
                    "🔄️⏰️ Payment {} for order {} timed out (created {})",
                    payment.id, payment.order_id, payment.created_at
                );
                let event = PaymentTimedOutEvent { payment, timed_out_at: now };
                self.producers.publish_payment_timed_out(event).await;
            },
            Ok(None) => debug!("🔄️⏰️ Payment {} changed state before it could be timed out", payment.id),
            Err(e) => error!("🔄️⏰️ Could not time out payment {}. Will try again on the next pass. {e}", payment.id),
        }
    }

    fn dispatch(&self, checks: &mut JoinSet<(PaymentId, CheckOutcome)>, payment: Payment, session: AgentSession) {
        self.in_flight.insert(payment.id.clone());
        let guard = InFlightGuard { in_flight: Arc::clone(&self.in_flight), payment_id: payment.id.clone() };
        let permits = Arc::clone(&self.permits);
        let agents = self.agents.clone();
        let settlement = self.settlement.clone();
        checks.spawn(async move {
            let _guard = guard;
            let id = payment.id.clone();
            let Ok(_permit) = permits.acquire_owned().await else {
                return (id, CheckOutcome::CheckFailed(GatewayError::Query("Check pool has shut down".into())));
            };
            let outcome = check_and_settle(&agents, &settlement, &session, &payment).await;
            (id, outcome)
        });
    }
}

async fn check_and_settle<B, G, C>(
    agents: &AccountPool<G, C>,
    settlement: &SettlementApi<B>,
    session: &AgentSession,
    payment: &Payment,
) -> CheckOutcome
where
    B: PaymentStore,
    G: RemoteGateway,
    C: SessionCache,
{
    match agents.gateway().check_remote_order(session, &payment.gateway_id).await {
        Ok(false) => {
            trace!("🔄️🔍️ Remote order {} for payment {} is not paid yet", payment.gateway_id, payment.id);
            CheckOutcome::NotYetPaid
        },
        Ok(true) => {
            debug!("🔄️🔍️ Remote order {} for payment {} has been paid", payment.gateway_id, payment.id);
            match settlement.settle(payment).await {
                Ok(outcome) => CheckOutcome::Settled(outcome),
                Err(e) => CheckOutcome::SettlementFailed(e.to_string()),
            }
        },
        Err(e) => {
            warn!("🔄️🔍️ Could not check remote order {} for payment {}. Deferring. {e}", payment.gateway_id, payment.id);
            if matches!(e, GatewayError::Auth(_)) {
                agents.invalidate(&payment.agent);
            }
            CheckOutcome::CheckFailed(e)
        },
    }
}
