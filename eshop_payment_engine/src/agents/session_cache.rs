use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use log::*;

use crate::traits::{AgentSession, Clock, SessionCache, SystemClock};

#[derive(Debug, Clone)]
struct CachedSession {
    session: AgentSession,
    expires_at: DateTime<Utc>,
}

/// In-process [`SessionCache`].
///
/// Entries are replaced whole on every `store`, and expired entries are treated as absent, so a reader either gets a
/// complete live session or nothing.
pub struct MemorySessionCache {
    entries: DashMap<String, CachedSession>,
    clock: Arc<dyn Clock>,
}

impl MemorySessionCache {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { entries: DashMap::new(), clock }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for MemorySessionCache {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl SessionCache for MemorySessionCache {
    fn get(&self, agent_id: &str) -> Option<AgentSession> {
        let now = self.clock.now();
        let entry = self.entries.get(agent_id)?;
        if entry.expires_at > now {
            Some(entry.session.clone())
        } else {
            trace!("🔑️ Cached session for {agent_id} expired at {}", entry.expires_at);
            None
        }
    }

    fn store(&self, agent_id: &str, session: AgentSession, ttl: Duration) {
        let now = self.clock.now();
        let expires_at = chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|ttl| now.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        debug!("🔑️ Caching session for {agent_id} until {expires_at}");
        self.entries.insert(agent_id.to_string(), CachedSession { session, expires_at });
    }

    fn is_expired(&self, agent_id: &str) -> bool {
        self.get(agent_id).is_none()
    }

    fn invalidate(&self, agent_id: &str) {
        if self.entries.remove(agent_id).is_some() {
            debug!("🔑️ Session for {agent_id} invalidated");
        }
    }
}
