//! In-memory registry of running verification sessions.

use crate::error::SessionError;
use crate::types::*;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};

/// Per-requester session tallies, shared by every check task of a run.
///
/// Each mutation takes the write lock for the duration of a single append,
/// so snapshots never see a partially recorded outcome.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<String, SessionRecord>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a session. Fails if the requester already has a run in progress.
    #[instrument(skip(self))]
    pub async fn open(&self, session_id: &str) -> Result<(), SessionError> {
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(session_id) {
            return Err(SessionError::AlreadyRunning(session_id.to_string()));
        }

        sessions.insert(session_id.to_string(), SessionRecord::new(session_id));
        info!("Opened session {}", session_id);
        Ok(())
    }

    /// Record the outcome for one number.
    ///
    /// Returns `Ok(false)` when the number was already recorded for this session.
    pub async fn record(
        &self,
        session_id: &str,
        phone: &str,
        outcome: CheckOutcome,
    ) -> Result<bool, SessionError> {
        let mut sessions = self.sessions.write().await;
        let record = sessions
            .get_mut(session_id)
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))?;

        let inserted = record.record(phone, outcome);
        if inserted {
            debug!(
                "Session {}: {} -> {} ({} processed)",
                session_id,
                phone,
                outcome.label(),
                record.processed()
            );
        } else {
            debug!("Session {}: {} already recorded", session_id, phone);
        }
        Ok(inserted)
    }

    pub async fn record_registered(&self, session_id: &str, phone: &str) -> Result<bool, SessionError> {
        self.record(session_id, phone, CheckOutcome::Registered).await
    }

    pub async fn record_unregistered(
        &self,
        session_id: &str,
        phone: &str,
    ) -> Result<bool, SessionError> {
        self.record(session_id, phone, CheckOutcome::Unregistered).await
    }

    /// Current counts for a session.
    pub async fn snapshot(&self, session_id: &str) -> Option<SessionSnapshot> {
        let sessions = self.sessions.read().await;
        sessions.get(session_id).map(SessionRecord::snapshot)
    }

    /// Full copy of a session's record.
    pub async fn get(&self, session_id: &str) -> Option<SessionRecord> {
        let sessions = self.sessions.read().await;
        sessions.get(session_id).cloned()
    }

    /// End a session and hand back its final record.
    #[instrument(skip(self))]
    pub async fn close(&self, session_id: &str) -> Option<SessionRecord> {
        let mut sessions = self.sessions.write().await;
        let record = sessions.remove(session_id);

        if let Some(record) = &record {
            info!(
                "Closed session {} ({} processed)",
                session_id,
                record.processed()
            );
        }

        record
    }

    pub async fn is_active(&self, session_id: &str) -> bool {
        self.sessions.read().await.contains_key(session_id)
    }

    /// Number of sessions with a run in progress.
    pub async fn active_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}
