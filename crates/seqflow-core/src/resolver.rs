//! Agent name resolution against the server's agent directory.
//!
//! Agent ids are server-issued and change across server restarts, so the
//! client never persists them: names are resolved through a process-local
//! cache that is fetched lazily and re-fetched wholesale on a miss. A name
//! still absent after a fresh fetch genuinely does not exist.

use std::collections::HashMap;

use crate::error::ClientError;
use crate::transport::WorkflowService;

/// Process-local name → id cache, owned by one client instance.
#[derive(Debug, Default)]
pub struct AgentDirectory {
    /// `None` until the first fetch; replaced wholesale on refresh, never
    /// partially merged.
    cache: Option<HashMap<String, String>>,
}

impl AgentDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached names, in no particular order. Empty before the first fetch.
    pub fn known_names(&self) -> Vec<String> {
        self.cache
            .as_ref()
            .map(|cache| cache.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Drop the cache and fetch the directory again.
    pub async fn refresh(&mut self, service: &dyn WorkflowService) -> Result<(), ClientError> {
        let agents = service.list_agents().await?;
        let mapping: HashMap<String, String> = agents
            .into_iter()
            .map(|agent| (agent.name, agent.id))
            .collect();
        tracing::debug!("agent directory refreshed: {} entries", mapping.len());
        self.cache = Some(mapping);
        Ok(())
    }

    /// Resolve one name; a miss triggers exactly one wholesale refresh.
    pub async fn resolve(
        &mut self,
        service: &dyn WorkflowService,
        name: &str,
    ) -> Result<String, ClientError> {
        if let Some(id) = self.lookup(name) {
            return Ok(id);
        }
        self.refresh(service).await?;
        self.lookup(name)
            .ok_or_else(|| ClientError::AgentNotFound(name.to_string()))
    }

    /// Resolve a batch atomically: either every name maps to an id, or
    /// `AgentNotFound` for the first unresolvable one and no partial map.
    pub async fn resolve_all(
        &mut self,
        service: &dyn WorkflowService,
        names: &[&str],
    ) -> Result<HashMap<String, String>, ClientError> {
        if self.cache.is_none() || names.iter().any(|name| self.lookup(name).is_none()) {
            self.refresh(service).await?;
        }

        let mut resolved = HashMap::with_capacity(names.len());
        for name in names {
            match self.lookup(name) {
                Some(id) => {
                    resolved.insert((*name).to_string(), id);
                }
                None => return Err(ClientError::AgentNotFound((*name).to_string())),
            }
        }
        Ok(resolved)
    }

    fn lookup(&self, name: &str) -> Option<String> {
        self.cache.as_ref().and_then(|cache| cache.get(name).cloned())
    }
}
