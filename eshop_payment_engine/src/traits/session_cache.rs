use std::time::Duration;

use crate::traits::AgentSession;

/// Per-agent store of authenticated gateway sessions.
///
/// Writes replace the whole entry for a key at once, so readers never see a half-written session.
pub trait SessionCache: Send + Sync + 'static {
    /// The cached session for the agent, unless it is missing or expired.
    fn get(&self, agent_id: &str) -> Option<AgentSession>;

    fn store(&self, agent_id: &str, session: AgentSession, ttl: Duration);

    /// `true` if there is no usable session for the agent.
    fn is_expired(&self, agent_id: &str) -> bool;

    fn invalidate(&self, agent_id: &str);
}
