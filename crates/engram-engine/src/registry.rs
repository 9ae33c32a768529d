//! Session registry: session id → owning memory server.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use engram_graph::{LtmAdapter, TripleStore};
use engram_types::SessionId;

use crate::config::MemoryConfig;
use crate::error::EngineError;
use crate::observability::MemoryEvent;
use crate::server::{SessionHandle, SessionServer};

/// Maps session ids to running memory servers and supervises their
/// lifecycle. The table is the only cross-session mutable state besides the
/// shared adapter; servers deregister themselves when they terminate.
pub struct SessionRegistry<S: TripleStore> {
    sessions: Arc<RwLock<HashMap<SessionId, SessionHandle>>>,
    adapter: LtmAdapter<S>,
    config: MemoryConfig,
}

impl<S: TripleStore + 'static> SessionRegistry<S> {
    /// Create an empty registry sharing `adapter` across its sessions.
    #[must_use]
    pub fn new(adapter: LtmAdapter<S>, config: MemoryConfig) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            adapter,
            config,
        }
    }

    /// Handle of a running session, if any.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::SessionNotFound`] when no live server owns the
    /// id. A handle whose server already terminated counts as not found.
    pub async fn lookup(&self, session_id: &SessionId) -> Result<SessionHandle, EngineError> {
        let sessions = self.sessions.read().await;
        match sessions.get(session_id) {
            Some(handle) if !handle.is_closed() => Ok(handle.clone()),
            _ => Err(EngineError::SessionNotFound(session_id.to_string())),
        }
    }

    /// Handle of a running session, starting one when absent.
    ///
    /// Idempotent under concurrent calls: the double check under the write
    /// lock guarantees a single server per id.
    ///
    /// # Errors
    ///
    /// Currently infallible in practice; kept fallible because server
    /// construction surfaces startup failures through this path.
    pub async fn get_or_start(&self, session_id: &SessionId) -> Result<SessionHandle, EngineError> {
        {
            let sessions = self.sessions.read().await;
            if let Some(handle) = sessions.get(session_id)
                && !handle.is_closed()
            {
                return Ok(handle.clone());
            }
        }

        let mut sessions = self.sessions.write().await;
        if let Some(handle) = sessions.get(session_id)
            && !handle.is_closed()
        {
            return Ok(handle.clone());
        }

        let handle = SessionServer::spawn(
            session_id.clone(),
            &self.config,
            self.adapter.clone(),
            Arc::clone(&self.sessions),
        );
        sessions.insert(session_id.clone(), handle.clone());
        Ok(handle)
    }

    /// Stop a session's server and drop its handle; the ephemeral STM is
    /// discarded with it.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::SessionNotFound`] when the id owns no server.
    pub async fn stop(&self, session_id: &SessionId, reason: &str) -> Result<(), EngineError> {
        let handle = {
            let mut sessions = self.sessions.write().await;
            sessions.remove(session_id)
        };
        let Some(handle) = handle else {
            return Err(EngineError::SessionNotFound(session_id.to_string()));
        };
        tracing::info!(
            event = MemoryEvent::SessionStopRequested.as_str(),
            session_id = %session_id,
            reason = %reason,
            "session stop requested"
        );
        handle.stop().await;
        Ok(())
    }

    /// Ids of currently registered sessions.
    pub async fn active_sessions(&self) -> Vec<SessionId> {
        let sessions = self.sessions.read().await;
        sessions
            .iter()
            .filter(|(_, handle)| !handle.is_closed())
            .map(|(id, _)| id.clone())
            .collect()
    }
}
