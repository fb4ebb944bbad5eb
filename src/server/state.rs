//! Shared application state for the server

use super::error::ApiError;
use super::ServerConfig;
use crate::dataset::Dataset;
use crate::shell::{FormState, ShellConfig};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Active sessions, each owning its dataset and last submitted form
    pub sessions: Arc<RwLock<HashMap<Uuid, Session>>>,
    /// Server configuration
    pub config: ServerConfig,
}

/// One user's session
#[derive(Debug, Clone)]
pub struct Session {
    /// Unique session identifier
    pub id: Uuid,
    /// When session was created
    pub created_at: DateTime<Utc>,
    /// Last request that touched the session
    pub last_seen: DateTime<Utc>,
    /// Uploaded dataset, if any
    pub dataset: Option<Arc<Dataset>>,
    /// Widget values from the last interaction
    pub form: FormState,
}

impl Session {
    fn new(now: DateTime<Utc>) -> Self {
        Session {
            id: Uuid::new_v4(),
            created_at: now,
            last_seen: now,
            dataset: None,
            form: FormState::default(),
        }
    }

    fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.last_seen >= ttl
    }
}

impl AppState {
    /// Creates a new application state
    pub fn new(config: ServerConfig) -> Self {
        AppState {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            config,
        }
    }

    pub fn shell_config(&self) -> ShellConfig {
        ShellConfig {
            edge_slots: self.config.edge_slots,
            preview_rows: self.config.preview_rows,
        }
    }

    /// Opens a new, empty session, first dropping idle ones
    pub async fn create_session(&self) -> Result<Session, ApiError> {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        Self::drop_expired(&mut sessions, now, self.config.session_ttl);
        if sessions.len() >= self.config.max_sessions {
            return Err(ApiError::SessionLimitReached);
        }
        let session = Session::new(now);
        sessions.insert(session.id, session.clone());
        tracing::info!(session = %session.id, "session created");
        Ok(session)
    }

    /// Removes sessions idle for at least the configured TTL as of `now`.
    /// Returns how many were removed.
    pub async fn expire_sessions(&self, now: DateTime<Utc>) -> usize {
        let mut sessions = self.sessions.write().await;
        Self::drop_expired(&mut sessions, now, self.config.session_ttl)
    }

    fn drop_expired(
        sessions: &mut HashMap<Uuid, Session>,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> usize {
        let before = sessions.len();
        sessions.retain(|_, session| !session.is_expired(now, ttl));
        let removed = before - sessions.len();
        if removed > 0 {
            tracing::info!(removed, remaining = sessions.len(), "expired idle sessions");
        }
        removed
    }

    /// Ends a session, dropping its dataset
    pub async fn end_session(&self, id: Uuid) -> Result<(), ApiError> {
        if self.sessions.write().await.remove(&id).is_none() {
            return Err(ApiError::SessionNotFound(id));
        }
        tracing::info!(session = %id, "session ended");
        Ok(())
    }

    /// Replaces the session's dataset and resets its widgets
    pub async fn load_dataset(&self, id: Uuid, dataset: Dataset) -> Result<Arc<Dataset>, ApiError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.get_mut(&id).ok_or(ApiError::SessionNotFound(id))?;
        session.last_seen = Utc::now();
        let dataset = Arc::new(dataset);
        session.dataset = Some(dataset.clone());
        session.form = FormState::default();
        tracing::info!(
            session = %id,
            columns = dataset.columns().len(),
            rows = dataset.row_count(),
            "dataset loaded"
        );
        Ok(dataset)
    }

    /// Stores the latest widget values and returns the session's dataset
    pub async fn update_form(
        &self,
        id: Uuid,
        form: FormState,
    ) -> Result<Option<Arc<Dataset>>, ApiError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.get_mut(&id).ok_or(ApiError::SessionNotFound(id))?;
        session.last_seen = Utc::now();
        session.form = form;
        Ok(session.dataset.clone())
    }

    /// Current dataset and widget values of a session
    pub async fn snapshot(&self, id: Uuid) -> Result<(Option<Arc<Dataset>>, FormState), ApiError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.get_mut(&id).ok_or(ApiError::SessionNotFound(id))?;
        session.last_seen = Utc::now();
        Ok((session.dataset.clone(), session.form.clone()))
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}
