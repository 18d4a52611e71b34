use std::{sync::Arc, time::Duration};

use log::*;
use rand::{seq::SliceRandom, Rng};

use crate::{
    agents::AgentError,
    traits::{AgentCredentials, AgentSession, GatewayError, RemoteGateway, SessionCache},
};

pub const DEFAULT_REFRESH_PAUSE: Duration = Duration::from_secs(2);

/// How long a freshly authenticated session is cached for.
///
/// Every session gets `base` plus a random jitter in `jitter_min..=jitter_max`, so that sessions created together do
/// not all expire at the same moment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTtl {
    pub base: Duration,
    pub jitter_min: Duration,
    pub jitter_max: Duration,
}

impl Default for SessionTtl {
    fn default() -> Self {
        Self { base: Duration::from_secs(3 * 60 * 60), jitter_min: Duration::from_secs(60), jitter_max: Duration::from_secs(600) }
    }
}

impl SessionTtl {
    pub fn fixed(ttl: Duration) -> Self {
        Self { base: ttl, jitter_min: Duration::ZERO, jitter_max: Duration::ZERO }
    }

    pub fn sample(&self) -> Duration {
        let lo = self.jitter_min.as_secs().min(self.jitter_max.as_secs());
        let hi = self.jitter_min.as_secs().max(self.jitter_max.as_secs());
        let jitter = if hi == 0 { 0 } else { rand::thread_rng().gen_range(lo..=hi) };
        self.base + Duration::from_secs(jitter)
    }
}

/// The outcome of a session pre-warming round.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshReport {
    pub warmed: Vec<String>,
    pub already_cached: Vec<String>,
    pub failed: Vec<(String, GatewayError)>,
}

/// The configured set of gateway accounts, plus their cached sessions.
///
/// Each new payment is created through an account picked uniformly at random, which spreads the load (and the rate
/// limits) of the remote gateway across all accounts.
pub struct AccountPool<G, C> {
    agents: Arc<Vec<AgentCredentials>>,
    gateway: G,
    cache: Arc<C>,
    ttl: SessionTtl,
    refresh_pause: Duration,
}

impl<G: Clone, C> Clone for AccountPool<G, C> {
    fn clone(&self) -> Self {
        Self {
            agents: Arc::clone(&self.agents),
            gateway: self.gateway.clone(),
            cache: Arc::clone(&self.cache),
            ttl: self.ttl,
            refresh_pause: self.refresh_pause,
        }
    }
}

impl<G, C> std::fmt::Debug for AccountPool<G, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ids = self.agents.iter().map(|a| a.agent_id.as_str()).collect::<Vec<_>>();
        write!(f, "AccountPool({})", ids.join(", "))
    }
}

impl<G, C> AccountPool<G, C>
where
    G: RemoteGateway,
    C: SessionCache,
{
    pub fn new(agents: Vec<AgentCredentials>, gateway: G, cache: Arc<C>) -> Self {
        Self { agents: Arc::new(agents), gateway, cache, ttl: SessionTtl::default(), refresh_pause: DEFAULT_REFRESH_PAUSE }
    }

    pub fn with_ttl(mut self, ttl: SessionTtl) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_refresh_pause(mut self, pause: Duration) -> Self {
        self.refresh_pause = pause;
        self
    }

    pub fn agents(&self) -> &[AgentCredentials] {
        self.agents.as_slice()
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn cache(&self) -> &C {
        self.cache.as_ref()
    }

    /// Picks one of the configured accounts at random.
    pub fn pick(&self) -> Result<&AgentCredentials, AgentError> {
        self.agents.choose(&mut rand::thread_rng()).ok_or(AgentError::NoAgentsConfigured)
    }

    /// Picks an account and returns a usable session for it, logging in first if necessary.
    pub async fn acquire(&self) -> Result<(String, AgentSession), AgentError> {
        let agent = self.pick()?.clone();
        let session = self.session_for(&agent).await?;
        Ok((agent.agent_id, session))
    }

    /// The cached session for `agent`, or a fresh one if nothing usable is cached. Fresh sessions are cached.
    pub async fn session_for(&self, agent: &AgentCredentials) -> Result<AgentSession, AgentError> {
        if let Some(session) = self.cache.get(&agent.agent_id) {
            trace!("🔑️ Using cached session for {}", agent.agent_id);
            return Ok(session);
        }
        debug!("🔑️ No cached session for {}. Logging in.", agent.agent_id);
        let session = self.gateway.authenticate(agent).await?;
        let ttl = self.ttl.sample();
        self.cache.store(&agent.agent_id, session.clone(), ttl);
        info!("🔑️ Logged in as {}. Session cached for {}s", agent.agent_id, ttl.as_secs());
        Ok(session)
    }

    /// The cached session for the agent. Never logs in.
    pub fn cached_session(&self, agent_id: &str) -> Option<AgentSession> {
        self.cache.get(agent_id)
    }

    /// Drops the cached session, e.g. after the gateway rejected it.
    pub fn invalidate(&self, agent_id: &str) {
        self.cache.invalidate(agent_id);
    }

    /// Logs in every account that has no cached session, pausing between logins.
    ///
    /// Failures are collected in the report rather than aborting the round.
    pub async fn refresh_missing(&self) -> RefreshReport {
        let mut report = RefreshReport::default();
        let mut first_login = true;
        for agent in self.agents.iter() {
            if !self.cache.is_expired(&agent.agent_id) {
                trace!("🔑️ Session for {} is still cached", agent.agent_id);
                report.already_cached.push(agent.agent_id.clone());
                continue;
            }
            if !first_login && !self.refresh_pause.is_zero() {
                tokio::time::sleep(self.refresh_pause).await;
            }
            first_login = false;
            match self.session_for(agent).await {
                Ok(_) => report.warmed.push(agent.agent_id.clone()),
                Err(AgentError::Gateway(e)) => {
                    warn!("🔑️ Could not log in as {}. {e}", agent.agent_id);
                    report.failed.push((agent.agent_id.clone(), e));
                },
                Err(e) => {
                    warn!("🔑️ Could not log in as {}. {e}", agent.agent_id);
                    report.failed.push((agent.agent_id.clone(), GatewayError::Auth(e.to_string())));
                },
            }
        }
        report
    }
}

#[cfg(test)]
mod test {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use eshop_common::Cents;

    use super::*;
    use crate::{
        agents::MemorySessionCache,
        traits::{ManualClock, RemoteOrderRef},
    };

    #[derive(Clone, Default)]
    struct CountingGateway {
        logins: Arc<AtomicUsize>,
        reject: Option<&'static str>,
    }

    impl RemoteGateway for CountingGateway {
        async fn authenticate(&self, agent: &AgentCredentials) -> Result<AgentSession, GatewayError> {
            self.logins.fetch_add(1, Ordering::SeqCst);
            if self.reject == Some(agent.agent_id.as_str()) {
                return Err(GatewayError::Auth("bad password".into()));
            }
            Ok(AgentSession::new(format!("token-{}", agent.agent_id), "cookie".to_string()))
        }

        async fn create_remote_order(&self, _: &AgentSession, _: &str, _: Cents) -> Result<RemoteOrderRef, GatewayError> {
            Err(GatewayError::Order("not used".into()))
        }

        async fn check_remote_order(&self, _: &AgentSession, _: &str) -> Result<bool, GatewayError> {
            Ok(false)
        }
    }

    fn pool(
        agents: &[&str],
        gateway: CountingGateway,
        clock: &ManualClock,
    ) -> AccountPool<CountingGateway, MemorySessionCache> {
        let agents = agents.iter().map(|a| AgentCredentials::new(*a, "pw")).collect();
        let cache = Arc::new(MemorySessionCache::new(Arc::new(clock.clone())));
        AccountPool::new(agents, gateway, cache)
            .with_ttl(SessionTtl::fixed(Duration::from_secs(600)))
            .with_refresh_pause(Duration::ZERO)
    }

    #[tokio::test]
    async fn acquire_reuses_cached_sessions() {
        let clock = ManualClock::default();
        let gateway = CountingGateway::default();
        let pool = pool(&["13800000001"], gateway.clone(), &clock);
        let (agent, s1) = pool.acquire().await.unwrap();
        assert_eq!(agent, "13800000001");
        let (_, s2) = pool.acquire().await.unwrap();
        assert_eq!(s1, s2);
        assert_eq!(gateway.logins.load(Ordering::SeqCst), 1);

        clock.advance(chrono::Duration::seconds(601));
        pool.acquire().await.unwrap();
        assert_eq!(gateway.logins.load(Ordering::SeqCst), 2);
        pool.acquire().await.unwrap();
        assert_eq!(gateway.logins.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn empty_pool() {
        let clock = ManualClock::default();
        let pool = pool(&[], CountingGateway::default(), &clock);
        assert!(matches!(pool.pick(), Err(AgentError::NoAgentsConfigured)));
        assert!(matches!(pool.acquire().await, Err(AgentError::NoAgentsConfigured)));
        assert_eq!(pool.refresh_missing().await, RefreshReport::default());
    }

    #[tokio::test]
    async fn refresh_warms_missing_sessions_only() {
        let clock = ManualClock::default();
        let gateway = CountingGateway { reject: Some("13800000003"), ..Default::default() };
        let pool = pool(&["13800000001", "13800000002", "13800000003"], gateway.clone(), &clock);
        pool.session_for(&pool.agents()[0].clone()).await.unwrap();

        let report = pool.refresh_missing().await;
        assert_eq!(report.already_cached, vec!["13800000001".to_string()]);
        assert_eq!(report.warmed, vec!["13800000002".to_string()]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, "13800000003");
        assert!(pool.cached_session("13800000002").is_some());
        assert!(pool.cached_session("13800000003").is_none());
        assert_eq!(gateway.logins.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn ttl_jitter_stays_in_range() {
        let ttl = SessionTtl::default();
        for _ in 0..100 {
            let sample = ttl.sample();
            assert!(sample >= Duration::from_secs(3 * 3600 + 60));
            assert!(sample <= Duration::from_secs(3 * 3600 + 600));
        }
        assert_eq!(SessionTtl::fixed(Duration::from_secs(5)).sample(), Duration::from_secs(5));
    }
}
