use std::time::Duration;

use eshop_payment_engine::{
    agents::AccountPool,
    traits::{RemoteGateway, SessionCache},
};
use log::*;
use tokio::{task::JoinHandle, time::MissedTickBehavior};

/// Starts the session refresh worker. Do not await the returned JoinHandle, as it will run indefinitely.
///
/// Every tick, each gateway account without a cached session is logged in, so that checkout rarely has to log in
/// itself and the reconciliation pass has a session for every account.
pub fn start_session_refresh_worker<G, C>(pool: AccountPool<G, C>, interval: Duration) -> JoinHandle<()>
where
    G: RemoteGateway,
    C: SessionCache,
{
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!("🕰️ Session refresh worker started for {} accounts", pool.agents().len());
        loop {
            timer.tick().await;
            let report = pool.refresh_missing().await;
            if !report.warmed.is_empty() {
                info!("🕰️ Logged in {} gateway accounts: {}", report.warmed.len(), report.warmed.join(", "));
            }
            for (agent, e) in &report.failed {
                error!("🕰️ Gateway account {agent} could not log in. Its payments are not being reconciled. {e}");
            }
            trace!("🕰️ {} gateway sessions were still cached", report.already_cached.len());
        }
    })
}
