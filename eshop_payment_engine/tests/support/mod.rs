#![allow(dead_code)]
use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use chrono::{DateTime, Utc};
use eshop_payment_engine::{
    agents::{AccountPool, MemorySessionCache, SessionTtl},
    db_types::{Cents, OrderId, Payment, PaymentId},
    events::{EventHandlers, EventHooks, EventProducers},
    test_utils::{
        fakes::ScriptedGateway,
        prepare_env::{drop_database, new_test_database, seed_product},
    },
    traits::{AgentCredentials, ManualClock, PaymentStore},
    CheckoutApi,
    OrderStatusApi,
    ReconcilerConfig,
    Reconciler,
    SettlementApi,
    SqliteDatabase,
};
use log::*;

pub const AGENT_A: &str = "13800000001";
pub const AGENT_B: &str = "13800000002";

pub type TestPool = AccountPool<ScriptedGateway, MemorySessionCache>;

/// Everything the engine needs, wired to a scratch database, a scripted gateway and a clock that only moves when
/// the test says so.
pub struct TestEngine {
    pub url: String,
    pub db: SqliteDatabase,
    pub gateway: ScriptedGateway,
    pub clock: ManualClock,
    pub pool: TestPool,
    pub checkout: CheckoutApi<SqliteDatabase, ScriptedGateway, MemorySessionCache>,
    pub status: OrderStatusApi<SqliteDatabase>,
    pub settlement: SettlementApi<SqliteDatabase>,
    pub reconciler: Reconciler<SqliteDatabase, ScriptedGateway, MemorySessionCache>,
    pub producers: EventProducers,
}

pub fn start_time() -> DateTime<Utc> {
    DateTime::from_timestamp(1_745_800_000, 0).expect("valid timestamp")
}

impl TestEngine {
    pub async fn new() -> Self {
        Self::with_agents(&[AGENT_A], EventProducers::default()).await
    }

    pub async fn with_producers(producers: EventProducers) -> Self {
        Self::with_agents(&[AGENT_A], producers).await
    }

    pub async fn with_agents(agent_ids: &[&str], producers: EventProducers) -> Self {
        let (url, db) = new_test_database().await;
        Self::build(url, db, agent_ids, producers)
    }

    /// Lets the test register event hooks, which may need the database, before the engine is wired up.
    pub async fn with_hooks<F>(register: F) -> Self
    where F: FnOnce(&SqliteDatabase, &mut EventHooks) {
        let (url, db) = new_test_database().await;
        let mut hooks = EventHooks::default();
        register(&db, &mut hooks);
        let handlers = EventHandlers::new(8, hooks);
        let producers = handlers.producers();
        handlers.start_handlers().await;
        Self::build(url, db, &[AGENT_A], producers)
    }

    fn build(url: String, db: SqliteDatabase, agent_ids: &[&str], producers: EventProducers) -> Self {
        debug!("🚀️ Test database at {url}");
        let gateway = ScriptedGateway::new();
        let clock = ManualClock::new(start_time());
        let cache = Arc::new(MemorySessionCache::new(Arc::new(clock.clone())));
        let agents = agent_ids.iter().map(|id| AgentCredentials::new(*id, "secret")).collect();
        let pool = AccountPool::new(agents, gateway.clone(), cache)
            .with_ttl(SessionTtl::fixed(Duration::from_secs(3 * 3600)))
            .with_refresh_pause(Duration::ZERO);
        let checkout = CheckoutApi::new(db.clone(), pool.clone(), Arc::new(clock.clone()), producers.clone());
        let status = OrderStatusApi::new(db.clone());
        let settlement = SettlementApi::new(db.clone(), Arc::new(clock.clone()), producers.clone());
        let config = ReconcilerConfig { dispatch_stagger: Duration::ZERO, ..Default::default() };
        let reconciler = Reconciler::new(db.clone(), pool.clone(), Arc::new(clock.clone()), producers.clone(), config);
        Self { url, db, gateway, clock, pool, checkout, status, settlement, reconciler, producers }
    }

    /// Replaces the reconciler with one using `config`.
    pub fn with_reconciler_config(mut self, config: ReconcilerConfig) -> Self {
        self.reconciler = Reconciler::new(
            self.db.clone(),
            self.pool.clone(),
            Arc::new(self.clock.clone()),
            self.producers.clone(),
            config,
        );
        self
    }

    pub async fn with_product(self, id: &str, price: i64) -> Self {
        seed_product(&self.db, id, Cents::from(price), &format!("ext-{id}")).await;
        self
    }

    pub async fn payment(&self, id: &PaymentId) -> Payment {
        self.db.fetch_payment(id).await.expect("Error fetching payment").expect("Payment does not exist")
    }

    pub async fn payment_for_order(&self, order_id: &OrderId) -> Payment {
        let order = self.db.fetch_order(order_id).await.expect("Error fetching order").expect("Order does not exist");
        let payment_id = order.payment_id.expect("Order has no payment");
        self.payment(&payment_id).await
    }

    pub async fn tear_down(mut self) {
        if let Err(e) = self.db.close().await {
            error!("🚀️ Failed to close database: {e}");
        }
        drop_database(&self.url).await;
    }
}

#[derive(Default, Clone)]
pub struct HookCalled {
    called: Arc<AtomicUsize>,
}

impl HookCalled {
    pub fn called(&self) {
        self.called.fetch_add(1, Ordering::SeqCst);
    }

    pub fn count(&self) -> usize {
        self.called.load(Ordering::SeqCst)
    }

    /// Waits up to a second for the hook to have been called `n` times.
    pub async fn wait_for(&self, n: usize) -> usize {
        for _ in 0..100 {
            if self.count() >= n {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.count()
    }
}
