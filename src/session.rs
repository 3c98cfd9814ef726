//! Session lifecycle manager - the top-level orchestrator.
//!
//! Owns the "at most one active session" invariant as an explicit state
//! machine: `SessionState::Idle` or `SessionState::Active(id)`, held in one
//! authoritative lock. `start_session` and `start_session_from_template`
//! check both the local state and the store's active-session lookup before
//! creating anything; a failed template start discards the partially
//! created session rather than leaving it active with a short ledger.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::ledger::SetLedger;
use crate::models::{SessionRow, SessionView};
use crate::store::WorkoutStore;
use crate::template::TemplateEngine;

/// How many finished sessions the recent-history read-model keeps.
pub const RECENT_SESSIONS_LIMIT: i64 = 10;

/// The active-session pointer, modeled as a closed state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Active(Uuid),
}

#[derive(Default)]
struct ManagerState {
    active: Option<Uuid>,
    recent: Vec<SessionRow>,
}

/// Orchestrates session lifecycle, the set ledger and template expansion.
#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn WorkoutStore>,
    templates: TemplateEngine,
    ledger: SetLedger,
    state: Arc<RwLock<ManagerState>>,
}

impl SessionManager {
    pub fn new(store: Arc<dyn WorkoutStore>) -> Self {
        Self {
            templates: TemplateEngine::new(store.clone()),
            ledger: SetLedger::new(store.clone()),
            store,
            state: Arc::new(RwLock::new(ManagerState::default())),
        }
    }

    /// The ledger of the active session; bound and cleared by this manager.
    pub fn ledger(&self) -> &SetLedger {
        &self.ledger
    }

    /// Current state of the active-session pointer.
    pub async fn active(&self) -> SessionState {
        match self.state.read().await.active {
            Some(id) => SessionState::Active(id),
            None => SessionState::Idle,
        }
    }

    /// Adopt a persisted active session after a restart, if one exists.
    /// Read failures are logged and leave the manager idle.
    pub async fn bootstrap(&self) {
        let session = match self.store.find_active_session().await {
            Ok(Some(session)) => session,
            Ok(None) => return,
            Err(e) => {
                warn!(error = %e, "active-session lookup failed during bootstrap");
                return;
            }
        };
        let sets = match self.store.sets_for_session(session.id).await {
            Ok(sets) => sets,
            Err(e) => {
                warn!(session_id = %session.id, error = %e, "ledger load failed during bootstrap");
                return;
            }
        };
        info!(session_id = %session.id, name = %session.name, "adopted persisted active session");
        self.ledger.bind(session.id, sets).await;
        self.state.write().await.active = Some(session.id);
    }

    /// Start a fresh, empty session. Errors with `SessionAlreadyActive`
    /// when the pointer (or the store) already shows an open session.
    ///
    /// The state lock is held from the guard check through the insert, so
    /// concurrent starts on this manager serialize instead of both passing
    /// the check.
    pub async fn start_session(&self, name: &str) -> CoreResult<SessionRow> {
        let mut state = self.state.write().await;
        self.ensure_no_active(&state).await?;
        let row = SessionRow {
            id: Uuid::new_v4(),
            name: name.to_string(),
            started_at: Utc::now(),
            ended_at: None,
        };
        self.store.insert_session(row.clone()).await?;
        info!(session_id = %row.id, name, "started session");

        self.ledger.bind(row.id, Vec::new()).await;
        state.active = Some(row.id);
        Ok(row)
    }

    /// Start a session pre-populated from a template. If expansion or the
    /// ledger reload fails after the session row was created, the session
    /// is discarded and the pointer stays idle. The state lock is held for
    /// the whole creation, as in `start_session`.
    pub async fn start_session_from_template(&self, template_id: Uuid) -> CoreResult<SessionRow> {
        let mut state = self.state.write().await;
        self.ensure_no_active(&state).await?;
        let template = self
            .templates
            .get_template(template_id)
            .await?
            .ok_or(CoreError::TemplateNotFound(template_id))?;

        let row = SessionRow {
            id: Uuid::new_v4(),
            name: template.row.name.clone(),
            started_at: Utc::now(),
            ended_at: None,
        };
        self.store.insert_session(row.clone()).await?;

        if let Err(e) = self.templates.expand_into(&template, row.id).await {
            self.discard_partial_session(row.id).await;
            return Err(e);
        }
        let sets = match self.store.sets_for_session(row.id).await {
            Ok(sets) => sets,
            Err(e) => {
                self.discard_partial_session(row.id).await;
                return Err(e.into());
            }
        };
        info!(session_id = %row.id, template_id = %template_id, sets = sets.len(), "started session from template");

        self.ledger.bind(row.id, sets).await;
        state.active = Some(row.id);
        Ok(row)
    }

    /// Load an existing session and its full ledger for review.
    ///
    /// A still-active session is adopted as the working session; a finished
    /// one is returned read-only and the active pointer is untouched.
    pub async fn open_session(&self, id: Uuid) -> CoreResult<SessionView> {
        let session = self
            .store
            .get_session(id)
            .await?
            .ok_or(CoreError::SessionNotFound(id))?;
        let sets = self.store.sets_for_session(id).await?;

        if session.is_active() {
            self.ledger.bind(id, sets.clone()).await;
            self.state.write().await.active = Some(id);
        }
        Ok(SessionView { session, sets })
    }

    /// Finish the active session: stamp `ended_at`, clear the pointer and
    /// ledger, refresh the recent-history read-model.
    pub async fn finish_session(&self) -> CoreResult<SessionRow> {
        let id = match self.state.read().await.active {
            Some(id) => id,
            None => return Err(CoreError::NoActiveSession),
        };
        let mut session = self
            .store
            .get_session(id)
            .await?
            .ok_or(CoreError::SessionNotFound(id))?;

        if session.ended_at.is_none() {
            let ended_at = Utc::now();
            if !self.store.finish_session(id, ended_at).await? {
                return Err(CoreError::SessionNotFound(id));
            }
            session.ended_at = Some(ended_at);
        }
        info!(session_id = %id, "finished session");

        self.state.write().await.active = None;
        self.ledger.clear().await;
        self.refresh_recent().await;
        Ok(session)
    }

    /// Delete a session outright. Set rows go with it (store cascade). If
    /// it was the active session, the pointer and ledger are cleared.
    pub async fn delete_session(&self, id: Uuid) -> CoreResult<()> {
        if !self.store.delete_session(id).await? {
            return Err(CoreError::SessionNotFound(id));
        }
        info!(session_id = %id, "deleted session");

        let was_active = {
            let mut state = self.state.write().await;
            if state.active == Some(id) {
                state.active = None;
                true
            } else {
                false
            }
        };
        if was_active {
            self.ledger.clear().await;
        }
        self.refresh_recent().await;
        Ok(())
    }

    /// Cached recent-history read-model, most recently ended first.
    pub async fn recent_sessions(&self) -> Vec<SessionRow> {
        self.state.read().await.recent.clone()
    }

    /// Reload the recent-history read-model. A read failure is logged and
    /// the previous value kept.
    pub async fn refresh_recent(&self) {
        match self
            .store
            .recent_finished_sessions(RECENT_SESSIONS_LIMIT)
            .await
        {
            Ok(rows) => self.state.write().await.recent = rows,
            Err(e) => warn!(error = %e, "recent-sessions refresh failed, keeping previous list"),
        }
    }

    /// Guard for session creation. The caller holds the state write lock;
    /// the local pointer can still be stale (fresh process, second
    /// client), so the store's lookup is checked as the authority. Across
    /// processes the store's one-active-per-owner constraint is what
    /// closes the remaining window.
    async fn ensure_no_active(&self, state: &ManagerState) -> CoreResult<()> {
        if let Some(id) = state.active {
            return Err(CoreError::SessionAlreadyActive(id));
        }
        if let Some(existing) = self.store.find_active_session().await? {
            return Err(CoreError::SessionAlreadyActive(existing.id));
        }
        Ok(())
    }

    async fn discard_partial_session(&self, id: Uuid) {
        warn!(session_id = %id, "discarding partially created session");
        if let Err(e) = self.store.delete_session(id).await {
            warn!(session_id = %id, error = %e, "failed to discard partial session");
        }
    }
}
