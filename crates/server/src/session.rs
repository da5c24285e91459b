//! Session registry
//!
//! One session object per call id, created atomically. The mutable
//! conversation record sits behind an async lock so turns within a
//! call are strictly ordered even when deliveries interleave.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use tokio::sync::{watch, Mutex};

use salescall_agent::CallSession;

use crate::ServerError;

/// A registered call session
pub struct CallSessionHandle {
    /// Call identifier
    pub id: String,
    /// Creation time
    pub created_at: Instant,
    /// Last activity
    last_activity: RwLock<Instant>,
    /// The conversation record; hold this lock for the whole turn
    convo: Mutex<CallSession>,
}

impl CallSessionHandle {
    fn new(id: &str, system_prompt: &str) -> Self {
        Self {
            id: id.to_string(),
            created_at: Instant::now(),
            last_activity: RwLock::new(Instant::now()),
            convo: Mutex::new(CallSession::new(id, system_prompt)),
        }
    }

    /// Lock the conversation for one turn
    pub async fn conversation(&self) -> tokio::sync::MutexGuard<'_, CallSession> {
        self.convo.lock().await
    }

    /// Update last activity
    pub fn touch(&self) {
        *self.last_activity.write() = Instant::now();
    }

    /// Check if the session has been idle past the timeout
    pub fn is_expired(&self, timeout: Duration) -> bool {
        self.last_activity.read().elapsed() > timeout
    }
}

/// Registry of live call sessions
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Arc<CallSessionHandle>>>,
    system_prompt: String,
    max_sessions: usize,
    session_timeout: Duration,
    cleanup_interval: Duration,
}

impl SessionRegistry {
    /// Create a registry; `system_prompt` seeds every new session.
    pub fn new(system_prompt: impl Into<String>, max_sessions: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            system_prompt: system_prompt.into(),
            max_sessions,
            session_timeout: Duration::from_secs(3600),
            cleanup_interval: Duration::from_secs(300),
        }
    }

    /// Create a registry with custom timeout and sweep interval.
    pub fn with_config(
        system_prompt: impl Into<String>,
        max_sessions: usize,
        session_timeout: Duration,
        cleanup_interval: Duration,
    ) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            system_prompt: system_prompt.into(),
            max_sessions,
            session_timeout,
            cleanup_interval,
        }
    }

    /// Fetch the session for a call id, creating it if absent.
    ///
    /// Runs entirely under one write lock: two concurrent deliveries
    /// for the same id always resolve to the same session object.
    pub fn get_or_create(&self, call_id: &str) -> Result<Arc<CallSessionHandle>, ServerError> {
        let mut sessions = self.sessions.write();

        if let Some(session) = sessions.get(call_id) {
            return Ok(session.clone());
        }

        if sessions.len() >= self.max_sessions {
            self.cleanup_expired_internal(&mut sessions);
            if sessions.len() >= self.max_sessions {
                return Err(ServerError::Session("Max sessions reached".to_string()));
            }
        }

        let session = Arc::new(CallSessionHandle::new(call_id, &self.system_prompt));
        sessions.insert(call_id.to_string(), session.clone());
        tracing::info!(call_id, "Created session");

        Ok(session)
    }

    /// Look up an existing session
    pub fn get(&self, call_id: &str) -> Option<Arc<CallSessionHandle>> {
        self.sessions.read().get(call_id).cloned()
    }

    /// Evict a session
    pub fn remove(&self, call_id: &str) {
        if self.sessions.write().remove(call_id).is_some() {
            tracing::info!(call_id, "Removed session");
        }
    }

    pub fn count(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn list(&self) -> Vec<String> {
        self.sessions.read().keys().cloned().collect()
    }

    /// Remove sessions idle past the timeout
    pub fn cleanup_expired(&self) {
        let mut sessions = self.sessions.write();
        self.cleanup_expired_internal(&mut sessions);
    }

    fn cleanup_expired_internal(&self, sessions: &mut HashMap<String, Arc<CallSessionHandle>>) {
        let timeout = self.session_timeout;
        let expired: Vec<String> = sessions
            .iter()
            .filter(|(_, s)| s.is_expired(timeout))
            .map(|(id, _)| id.clone())
            .collect();

        for id in expired {
            sessions.remove(&id);
            tracing::info!(call_id = %id, "Expired session");
        }
    }

    /// Start a background task that periodically sweeps expired
    /// sessions. Returns a shutdown sender to stop the task.
    pub fn start_cleanup_task(self: &Arc<Self>) -> watch::Sender<bool> {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let registry = Arc::clone(self);
        let interval = registry.cleanup_interval;

        tokio::spawn(async move {
            let mut interval_timer = tokio::time::interval(interval);
            interval_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = interval_timer.tick() => {
                        let before = registry.count();
                        registry.cleanup_expired();
                        let after = registry.count();
                        if before != after {
                            tracing::info!(
                                removed = before - after,
                                remaining = after,
                                "Session cleanup sweep"
                            );
                        }
                    }
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            tracing::info!("Session cleanup task shutting down");
                            break;
                        }
                    }
                }
            }
        });

        shutdown_tx
    }
}
