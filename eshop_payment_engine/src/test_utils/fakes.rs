use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
        Mutex,
    },
    time::Duration,
};

use dashmap::DashSet;
use eshop_common::Cents;

use crate::traits::{AgentCredentials, AgentSession, GatewayError, RemoteGateway, RemoteOrderRef};

/// An in-memory gateway whose answers can be scripted. Clones share state, so a test can keep a handle while the
/// engine owns another.
#[derive(Clone, Default)]
pub struct ScriptedGateway {
    state: Arc<ScriptState>,
}

#[derive(Default)]
struct ScriptState {
    logins: AtomicUsize,
    creates: AtomicUsize,
    checks: AtomicUsize,
    active_checks: AtomicUsize,
    peak_checks: AtomicUsize,
    next_remote_id: AtomicUsize,
    rejected_agents: DashSet<String>,
    paid: DashSet<String>,
    create_failures: Mutex<VecDeque<GatewayError>>,
    check_failures: Mutex<VecDeque<GatewayError>>,
    checked_ids: Mutex<Vec<String>>,
    check_delay: Mutex<Duration>,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next `n` order creations fail with `err`.
    pub fn fail_next_creates(&self, n: usize, err: GatewayError) {
        let mut failures = self.state.create_failures.lock().unwrap();
        failures.extend(std::iter::repeat(err).take(n));
    }

    /// The next `n` status checks fail with `err`.
    pub fn fail_next_checks(&self, n: usize, err: GatewayError) {
        let mut failures = self.state.check_failures.lock().unwrap();
        failures.extend(std::iter::repeat(err).take(n));
    }

    pub fn reject_logins_for(&self, agent_id: &str) {
        self.state.rejected_agents.insert(agent_id.to_string());
    }

    pub fn mark_paid(&self, remote_id: &str) {
        self.state.paid.insert(remote_id.to_string());
    }

    pub fn set_check_delay(&self, delay: Duration) {
        *self.state.check_delay.lock().unwrap() = delay;
    }

    pub fn login_count(&self) -> usize {
        self.state.logins.load(Ordering::SeqCst)
    }

    pub fn create_count(&self) -> usize {
        self.state.creates.load(Ordering::SeqCst)
    }

    pub fn check_count(&self) -> usize {
        self.state.checks.load(Ordering::SeqCst)
    }

    /// The largest number of status checks that were running at the same time.
    pub fn peak_concurrent_checks(&self) -> usize {
        self.state.peak_checks.load(Ordering::SeqCst)
    }

    /// Every remote id that has been checked, in order.
    pub fn checked_ids(&self) -> Vec<String> {
        self.state.checked_ids.lock().unwrap().clone()
    }
}

impl RemoteGateway for ScriptedGateway {
    async fn authenticate(&self, agent: &AgentCredentials) -> Result<AgentSession, GatewayError> {
        self.state.logins.fetch_add(1, Ordering::SeqCst);
        if self.state.rejected_agents.contains(&agent.agent_id) {
            return Err(GatewayError::Auth(format!("{} was refused", agent.agent_id)));
        }
        let n = self.state.logins.load(Ordering::SeqCst);
        Ok(AgentSession::new(format!("token-{}-{n}", agent.agent_id), format!("sid={n}")))
    }

    async fn create_remote_order(
        &self,
        _session: &AgentSession,
        external_id: &str,
        price: Cents,
    ) -> Result<RemoteOrderRef, GatewayError> {
        self.state.creates.fetch_add(1, Ordering::SeqCst);
        let failure = self.state.create_failures.lock().unwrap().pop_front();
        if let Some(err) = failure {
            return Err(err);
        }
        let n = self.state.next_remote_id.fetch_add(1, Ordering::SeqCst) + 1;
        let remote_id = format!("YLT{n:06}");
        let payment_artifact = format!("data:image/png;base64,{external_id}-{price}-{remote_id}");
        Ok(RemoteOrderRef { remote_id, payment_artifact })
    }

    async fn check_remote_order(&self, _session: &AgentSession, remote_id: &str) -> Result<bool, GatewayError> {
        self.state.checks.fetch_add(1, Ordering::SeqCst);
        self.state.checked_ids.lock().unwrap().push(remote_id.to_string());
        let active = self.state.active_checks.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.peak_checks.fetch_max(active, Ordering::SeqCst);
        let delay = *self.state.check_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.state.active_checks.fetch_sub(1, Ordering::SeqCst);
        let failure = self.state.check_failures.lock().unwrap().pop_front();
        if let Some(err) = failure {
            return Err(err);
        }
        Ok(self.state.paid.contains(remote_id))
    }
}
