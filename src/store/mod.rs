//! Record-store port consumed by the workout core.
//!
//! The core never talks to a backend directly; every read and write goes
//! through the `WorkoutStore` trait. Methods map one-to-one onto the query
//! patterns the core needs: active-session lookup, recent-finished history,
//! sets joined with exercise names, templates joined with their ordered
//! items. Implementations own durability, cascading deletes and the
//! per-session `set_order` sequence.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{
    ExerciseRow, NewSetFields, SessionRow, SetPatch, SetRow, SetView, TemplateItemRow, TemplateRow,
    TemplateView,
};

pub mod memory;
#[cfg(feature = "database")]
pub mod postgres;

pub use memory::MemoryStore;
#[cfg(feature = "database")]
pub use postgres::PgStore;

/// Asynchronous record store for all workout tables.
///
/// Update and delete methods return `Ok(false)` when no row matched, so
/// callers can translate a miss into their own not-found error.
#[async_trait]
pub trait WorkoutStore: Send + Sync {
    // --- exercises ---

    async fn insert_exercise(&self, row: ExerciseRow) -> Result<(), StoreError>;

    async fn get_exercise(&self, id: Uuid) -> Result<Option<ExerciseRow>, StoreError>;

    async fn list_exercises(&self) -> Result<Vec<ExerciseRow>, StoreError>;

    async fn update_exercise(
        &self,
        id: Uuid,
        name: Option<&str>,
        muscle_group: Option<&str>,
    ) -> Result<bool, StoreError>;

    async fn delete_exercise(&self, id: Uuid) -> Result<bool, StoreError>;

    // --- sessions ---

    async fn insert_session(&self, row: SessionRow) -> Result<(), StoreError>;

    async fn get_session(&self, id: Uuid) -> Result<Option<SessionRow>, StoreError>;

    /// Set `ended_at` on a session.
    async fn finish_session(&self, id: Uuid, ended_at: DateTime<Utc>) -> Result<bool, StoreError>;

    /// Delete a session; its sets go with it.
    async fn delete_session(&self, id: Uuid) -> Result<bool, StoreError>;

    /// The session with `ended_at` null, if any. At most one row is
    /// expected; implementations return the most recently started match.
    async fn find_active_session(&self) -> Result<Option<SessionRow>, StoreError>;

    /// Finished sessions, most recently ended first, limited to `limit`.
    async fn recent_finished_sessions(&self, limit: i64) -> Result<Vec<SessionRow>, StoreError>;

    // --- sets ---

    /// Insert a set. The store assigns `set_order` as the next value in the
    /// session's sequence and stamps `created_at`; the full row comes back.
    async fn insert_set(&self, fields: NewSetFields) -> Result<SetRow, StoreError>;

    async fn update_set(&self, id: Uuid, patch: &SetPatch) -> Result<bool, StoreError>;

    async fn delete_set(&self, id: Uuid) -> Result<bool, StoreError>;

    /// All sets of a session joined with exercise names, ordered by
    /// `set_order`.
    async fn sets_for_session(&self, session_id: Uuid) -> Result<Vec<SetView>, StoreError>;

    /// Most recently created set for an exercise, optionally excluding one
    /// session (the active one). Feeds the History Oracle.
    async fn latest_set_for_exercise(
        &self,
        exercise_id: Uuid,
        exclude_session: Option<Uuid>,
    ) -> Result<Option<SetRow>, StoreError>;

    // --- templates ---

    async fn insert_template(
        &self,
        row: TemplateRow,
        items: Vec<TemplateItemRow>,
    ) -> Result<(), StoreError>;

    async fn get_template(&self, id: Uuid) -> Result<Option<TemplateView>, StoreError>;

    async fn list_templates(&self) -> Result<Vec<TemplateView>, StoreError>;

    async fn delete_template(&self, id: Uuid) -> Result<bool, StoreError>;
}
