use std::{future::Future, pin::Pin, sync::Arc};

use eshop_payment_engine::{
    agents::{AccountPool, MemorySessionCache},
    events::{cart_cleanup_hook, EventHandlers, EventHooks, EventProducers, PaymentAnomalyEvent},
    traits::{Clock, SystemClock},
    CheckoutApi,
    OrderStatusApi,
    Reconciler,
    SqliteDatabase,
};
use log::*;
use tokio::task::{JoinError, JoinHandle};
use ylt_client::YltApi;

use crate::{
    alarm::AlarmNotifier,
    config::ServerConfig,
    errors::ServerError,
    integrations::ylt::YltGateway,
    workers::{start_reconciliation_worker, start_session_refresh_worker},
};

pub type GatewayPool = AccountPool<YltGateway, MemorySessionCache>;

/// The engine, wired to SQLite and the YLT gateway.
///
/// Everything in here is cheap to clone. A transport layer takes [`EngineServices::checkout_api`] and
/// [`EngineServices::order_status_api`]; the workers use the pool and the reconciler.
#[derive(Clone)]
pub struct EngineServices {
    pub db: SqliteDatabase,
    pub pool: GatewayPool,
    pub clock: Arc<dyn Clock>,
    pub producers: EventProducers,
}

impl EngineServices {
    pub fn checkout_api(&self) -> CheckoutApi<SqliteDatabase, YltGateway, MemorySessionCache> {
        CheckoutApi::new(self.db.clone(), self.pool.clone(), Arc::clone(&self.clock), self.producers.clone())
    }

    pub fn order_status_api(&self) -> OrderStatusApi<SqliteDatabase> {
        OrderStatusApi::new(self.db.clone())
    }

    pub fn reconciler(&self, config: &ServerConfig) -> Reconciler<SqliteDatabase, YltGateway, MemorySessionCache> {
        Reconciler::new(
            self.db.clone(),
            self.pool.clone(),
            Arc::clone(&self.clock),
            self.producers.clone(),
            config.reconciler,
        )
    }
}

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    config.validate()?;
    let services = create_services(&config).await?;
    if config.run_repair_pass {
        let repaired = services.reconciler(&config).repair_pass().await?;
        info!("🚀️ Repair pass complete. {repaired} orders repaired.");
    }
    let report = services.pool.refresh_missing().await;
    info!(
        "🚀️ {} of {} gateway accounts logged in",
        report.warmed.len() + report.already_cached.len(),
        services.pool.agents().len()
    );
    let refresh = start_session_refresh_worker(services.pool.clone(), config.session_refresh_interval);
    let reconcile = start_reconciliation_worker(services.reconciler(&config), config.reconcile_interval);

    supervise_workers(refresh, reconcile, tokio::signal::ctrl_c()).await
}

/// Runs until `shutdown` resolves or either worker stops. A worker only ever stops if it has failed, and the service
/// is useless without it, so that ends the service with an error.
pub async fn supervise_workers<F>(
    mut refresh: JoinHandle<()>,
    mut reconcile: JoinHandle<()>,
    shutdown: F,
) -> Result<(), ServerError>
where
    F: Future<Output = std::io::Result<()>>,
{
    let result = tokio::select! {
        res = shutdown => {
            info!("🚀️ Shutting down");
            res.map_err(ServerError::from)
        },
        res = &mut refresh => Err(worker_stopped("session refresh", res)),
        res = &mut reconcile => Err(worker_stopped("reconciliation", res)),
    };
    refresh.abort();
    reconcile.abort();
    result
}

fn worker_stopped(name: &str, res: Result<(), JoinError>) -> ServerError {
    let reason = match res {
        Ok(()) => "it exited".to_string(),
        Err(e) => e.to_string(),
    };
    error!("🚀️ The {name} worker has stopped ({reason}). Shutting down.");
    ServerError::BackendError(format!("The {name} worker stopped: {reason}"))
}

pub async fn create_services(config: &ServerConfig) -> Result<EngineServices, ServerError> {
    if config.accounts.is_empty() {
        warn!("🚀️ No gateway accounts are configured. Every checkout will fail.");
    }
    let db = SqliteDatabase::new_with_url(&config.database_url, 25).await?;
    db.migrate().await?;
    let producers = start_event_handlers(config, &db).await;
    let gateway = YltGateway::new(YltApi::new(config.ylt.clone())?);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let cache = Arc::new(MemorySessionCache::new(Arc::clone(&clock)));
    let pool = AccountPool::new(config.accounts.clone(), gateway, cache).with_ttl(config.session_ttl);
    Ok(EngineServices { db, pool, clock, producers })
}

async fn start_event_handlers(config: &ServerConfig, db: &SqliteDatabase) -> EventProducers {
    let mut hooks = EventHooks::default();
    hooks.on_checkout_completed = Some(cart_cleanup_hook(db.clone()));
    match &config.alarm_webhook_url {
        Some(url) => {
            hooks.on_payment_anomaly = Some(AlarmNotifier::new(url.clone()).anomaly_hook());
        },
        None => {
            hooks.on_payment_anomaly(|ev: PaymentAnomalyEvent| {
                Box::pin(async move { warn!("📬️ Payment anomaly (no alarm configured): {ev}") })
                    as Pin<Box<dyn Future<Output = ()> + Send>>
            });
        },
    }
    let handlers = EventHandlers::new(config.event_buffer_size, hooks);
    let producers = handlers.producers();
    handlers.start_handlers().await;
    producers
}

#[cfg(test)]
mod test {
    use eshop_payment_engine::{
        db_types::OrderId,
        test_utils::prepare_env::{create_database, drop_database, random_db_path},
        OrderStatusError,
    };

    use super::*;

    #[tokio::test]
    async fn services_start_on_an_empty_database() {
        let _ = env_logger::try_init();
        let url = random_db_path();
        create_database(&url).await;
        let config = ServerConfig { database_url: url.clone(), ..ServerConfig::default() };
        let services = create_services(&config).await.unwrap();
        let err = services.order_status_api().order_status("alice", &OrderId::from("1")).await.unwrap_err();
        assert!(matches!(err, OrderStatusError::OrderNotFound(_)));
        assert_eq!(services.reconciler(&config).repair_pass().await.unwrap(), 0);
        let pass = services.reconciler(&config).run_pass().await.unwrap();
        assert_eq!(pass.summary.pending, 0);
        drop_database(&url).await;
    }

    #[tokio::test]
    async fn a_failed_worker_stops_the_service() {
        let _ = env_logger::try_init();
        let refresh = tokio::spawn(std::future::pending::<()>());
        let reconcile = tokio::spawn(async { panic!("`period` must be non-zero.") });
        let err = supervise_workers(refresh, reconcile, std::future::pending()).await.unwrap_err();
        assert!(matches!(err, ServerError::BackendError(ref msg) if msg.contains("reconciliation worker stopped")));
    }

    #[tokio::test]
    async fn shutdown_stops_the_workers() {
        let refresh = tokio::spawn(std::future::pending::<()>());
        let reconcile = tokio::spawn(std::future::pending::<()>());
        let result = supervise_workers(refresh, reconcile, async { Ok(()) }).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn zero_intervals_are_refused_at_startup() {
        let config = ServerConfig { session_refresh_interval: std::time::Duration::ZERO, ..ServerConfig::default() };
        let err = run_server(config).await.unwrap_err();
        assert!(matches!(err, ServerError::ConfigurationError(_)));
    }
}
