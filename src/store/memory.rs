//! In-memory `WorkoutStore`.
//!
//! Backs the test suite and any embedding that does not need durability.
//! Every operation still goes through an async round trip so callers
//! exercise the same code paths as against a remote backend, and failures
//! can be injected per operation with `fail_once` to drive the error-path
//! tests (optimistic rollback, partial-expansion discard, delete recovery).

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{
    ExerciseRow, NewSetFields, SessionRow, SetPatch, SetRow, SetView, TemplateItemRow, TemplateRow,
    TemplateItemView, TemplateView,
};
use crate::store::WorkoutStore;

#[derive(Default)]
struct Inner {
    exercises: HashMap<Uuid, ExerciseRow>,
    sessions: HashMap<Uuid, SessionRow>,
    // Insertion order doubles as creation order for "latest" queries.
    sets: Vec<SetRow>,
    templates: HashMap<Uuid, TemplateRow>,
    template_items: Vec<TemplateItemRow>,
}

/// In-memory store; cheap to create per test.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
    fail_ops: Mutex<HashSet<&'static str>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm a one-shot failure for the named store operation. The next call
    /// to that operation errors; later calls succeed again.
    pub fn fail_once(&self, op: &'static str) {
        self.fail_ops.lock().unwrap().insert(op);
    }

    fn gate(&self, op: &'static str) -> Result<(), StoreError> {
        if self.fail_ops.lock().unwrap().remove(op) {
            return Err(StoreError::new(op, "injected failure"));
        }
        Ok(())
    }

    fn exercise_name(inner: &Inner, exercise_id: Uuid) -> String {
        inner
            .exercises
            .get(&exercise_id)
            .map(|e| e.name.clone())
            .unwrap_or_else(|| "unknown exercise".to_string())
    }
}

#[async_trait]
impl WorkoutStore for MemoryStore {
    async fn insert_exercise(&self, row: ExerciseRow) -> Result<(), StoreError> {
        self.gate("insert_exercise")?;
        self.inner.write().await.exercises.insert(row.id, row);
        Ok(())
    }

    async fn get_exercise(&self, id: Uuid) -> Result<Option<ExerciseRow>, StoreError> {
        self.gate("get_exercise")?;
        Ok(self.inner.read().await.exercises.get(&id).cloned())
    }

    async fn list_exercises(&self) -> Result<Vec<ExerciseRow>, StoreError> {
        self.gate("list_exercises")?;
        let mut rows: Vec<_> = self.inner.read().await.exercises.values().cloned().collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rows)
    }

    async fn update_exercise(
        &self,
        id: Uuid,
        name: Option<&str>,
        muscle_group: Option<&str>,
    ) -> Result<bool, StoreError> {
        self.gate("update_exercise")?;
        let mut inner = self.inner.write().await;
        match inner.exercises.get_mut(&id) {
            Some(row) => {
                if let Some(name) = name {
                    row.name = name.to_string();
                }
                if let Some(muscle_group) = muscle_group {
                    row.muscle_group = muscle_group.to_string();
                }
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_exercise(&self, id: Uuid) -> Result<bool, StoreError> {
        self.gate("delete_exercise")?;
        Ok(self.inner.write().await.exercises.remove(&id).is_some())
    }

    async fn insert_session(&self, row: SessionRow) -> Result<(), StoreError> {
        self.gate("insert_session")?;
        self.inner.write().await.sessions.insert(row.id, row);
        Ok(())
    }

    async fn get_session(&self, id: Uuid) -> Result<Option<SessionRow>, StoreError> {
        self.gate("get_session")?;
        Ok(self.inner.read().await.sessions.get(&id).cloned())
    }

    async fn finish_session(&self, id: Uuid, ended_at: DateTime<Utc>) -> Result<bool, StoreError> {
        self.gate("finish_session")?;
        let mut inner = self.inner.write().await;
        match inner.sessions.get_mut(&id) {
            Some(row) => {
                row.ended_at = Some(ended_at);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_session(&self, id: Uuid) -> Result<bool, StoreError> {
        self.gate("delete_session")?;
        let mut inner = self.inner.write().await;
        let existed = inner.sessions.remove(&id).is_some();
        if existed {
            inner.sets.retain(|s| s.session_id != id);
        }
        Ok(existed)
    }

    async fn find_active_session(&self) -> Result<Option<SessionRow>, StoreError> {
        self.gate("find_active_session")?;
        let inner = self.inner.read().await;
        Ok(inner
            .sessions
            .values()
            .filter(|s| s.ended_at.is_none())
            .max_by_key(|s| s.started_at)
            .cloned())
    }

    async fn recent_finished_sessions(&self, limit: i64) -> Result<Vec<SessionRow>, StoreError> {
        self.gate("recent_finished_sessions")?;
        let inner = self.inner.read().await;
        let mut rows: Vec<_> = inner
            .sessions
            .values()
            .filter(|s| s.ended_at.is_some())
            .cloned()
            .collect();
        rows.sort_by_key(|s| std::cmp::Reverse(s.ended_at));
        rows.truncate(limit.max(0) as usize);
        Ok(rows)
    }

    async fn insert_set(&self, fields: NewSetFields) -> Result<SetRow, StoreError> {
        self.gate("insert_set")?;
        let mut inner = self.inner.write().await;
        // Sequence assignment and insert happen under one lock, so
        // concurrent inserts into the same session get distinct orders.
        let next_order = inner
            .sets
            .iter()
            .filter(|s| s.session_id == fields.session_id)
            .map(|s| s.set_order)
            .max()
            .unwrap_or(0)
            + 1;
        let row = SetRow {
            id: fields.id,
            session_id: fields.session_id,
            exercise_id: fields.exercise_id,
            weight: fields.weight,
            reps: fields.reps,
            set_order: next_order,
            completed: fields.completed,
            created_at: Utc::now(),
        };
        inner.sets.push(row.clone());
        Ok(row)
    }

    async fn update_set(&self, id: Uuid, patch: &SetPatch) -> Result<bool, StoreError> {
        self.gate("update_set")?;
        let mut inner = self.inner.write().await;
        match inner.sets.iter_mut().find(|s| s.id == id) {
            Some(row) => {
                patch.apply(row);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_set(&self, id: Uuid) -> Result<bool, StoreError> {
        self.gate("delete_set")?;
        let mut inner = self.inner.write().await;
        let before = inner.sets.len();
        inner.sets.retain(|s| s.id != id);
        Ok(inner.sets.len() < before)
    }

    async fn sets_for_session(&self, session_id: Uuid) -> Result<Vec<SetView>, StoreError> {
        self.gate("sets_for_session")?;
        let inner = self.inner.read().await;
        let mut rows: Vec<_> = inner
            .sets
            .iter()
            .filter(|s| s.session_id == session_id)
            .cloned()
            .collect();
        rows.sort_by_key(|s| s.set_order);
        Ok(rows
            .into_iter()
            .map(|row| {
                let exercise_name = Self::exercise_name(&inner, row.exercise_id);
                SetView { row, exercise_name }
            })
            .collect())
    }

    async fn latest_set_for_exercise(
        &self,
        exercise_id: Uuid,
        exclude_session: Option<Uuid>,
    ) -> Result<Option<SetRow>, StoreError> {
        self.gate("latest_set_for_exercise")?;
        let inner = self.inner.read().await;
        Ok(inner
            .sets
            .iter()
            .rev()
            .find(|s| s.exercise_id == exercise_id && Some(s.session_id) != exclude_session)
            .cloned())
    }

    async fn insert_template(
        &self,
        row: TemplateRow,
        items: Vec<TemplateItemRow>,
    ) -> Result<(), StoreError> {
        self.gate("insert_template")?;
        let mut inner = self.inner.write().await;
        inner.templates.insert(row.id, row);
        inner.template_items.extend(items);
        Ok(())
    }

    async fn get_template(&self, id: Uuid) -> Result<Option<TemplateView>, StoreError> {
        self.gate("get_template")?;
        let inner = self.inner.read().await;
        let Some(row) = inner.templates.get(&id).cloned() else {
            return Ok(None);
        };
        let mut items: Vec<_> = inner
            .template_items
            .iter()
            .filter(|i| i.template_id == id)
            .cloned()
            .collect();
        items.sort_by_key(|i| i.order_index);
        let items = items
            .into_iter()
            .map(|item| {
                let exercise_name = inner.exercises.get(&item.exercise_id).map(|e| e.name.clone());
                TemplateItemView {
                    row: item,
                    exercise_name,
                }
            })
            .collect();
        Ok(Some(TemplateView { row, items }))
    }

    async fn list_templates(&self) -> Result<Vec<TemplateView>, StoreError> {
        self.gate("list_templates")?;
        let ids: Vec<Uuid> = {
            let inner = self.inner.read().await;
            let mut rows: Vec<_> = inner.templates.values().cloned().collect();
            rows.sort_by(|a, b| a.name.cmp(&b.name));
            rows.into_iter().map(|r| r.id).collect()
        };
        let mut views = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(view) = self.get_template(id).await? {
                views.push(view);
            }
        }
        Ok(views)
    }

    async fn delete_template(&self, id: Uuid) -> Result<bool, StoreError> {
        self.gate("delete_template")?;
        let mut inner = self.inner.write().await;
        let existed = inner.templates.remove(&id).is_some();
        if existed {
            inner.template_items.retain(|i| i.template_id != id);
        }
        Ok(existed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exercise(name: &str) -> ExerciseRow {
        ExerciseRow {
            id: Uuid::new_v4(),
            name: name.to_string(),
            muscle_group: "chest".to_string(),
        }
    }

    fn session(name: &str) -> SessionRow {
        SessionRow {
            id: Uuid::new_v4(),
            name: name.to_string(),
            started_at: Utc::now(),
            ended_at: None,
        }
    }

    fn new_set(session_id: Uuid, exercise_id: Uuid) -> NewSetFields {
        NewSetFields {
            id: Uuid::new_v4(),
            session_id,
            exercise_id,
            weight: 0.0,
            reps: 0,
            completed: false,
        }
    }

    #[tokio::test]
    async fn set_order_is_assigned_per_session() {
        let store = MemoryStore::new();
        let bench = exercise("Bench Press");
        let sess_a = session("A");
        let sess_b = session("B");
        store.insert_exercise(bench.clone()).await.unwrap();
        store.insert_session(sess_a.clone()).await.unwrap();
        store.insert_session(sess_b.clone()).await.unwrap();

        let one = store.insert_set(new_set(sess_a.id, bench.id)).await.unwrap();
        let two = store.insert_set(new_set(sess_a.id, bench.id)).await.unwrap();
        let other = store.insert_set(new_set(sess_b.id, bench.id)).await.unwrap();

        assert_eq!(one.set_order, 1);
        assert_eq!(two.set_order, 2);
        assert_eq!(other.set_order, 1);
    }

    #[tokio::test]
    async fn latest_set_skips_excluded_session() {
        let store = MemoryStore::new();
        let bench = exercise("Bench Press");
        let old = session("old");
        let current = session("current");
        store.insert_exercise(bench.clone()).await.unwrap();
        store.insert_session(old.clone()).await.unwrap();
        store.insert_session(current.clone()).await.unwrap();

        let mut fields = new_set(old.id, bench.id);
        fields.weight = 60.0;
        store.insert_set(fields).await.unwrap();
        let mut fields = new_set(current.id, bench.id);
        fields.weight = 80.0;
        store.insert_set(fields).await.unwrap();

        let hit = store
            .latest_set_for_exercise(bench.id, Some(current.id))
            .await
            .unwrap()
            .expect("history row");
        assert_eq!(hit.weight, 60.0);
        assert_eq!(hit.session_id, old.id);
    }

    #[tokio::test]
    async fn fail_once_is_one_shot() {
        let store = MemoryStore::new();
        store.fail_once("insert_exercise");
        assert!(store.insert_exercise(exercise("Row")).await.is_err());
        assert!(store.insert_exercise(exercise("Row")).await.is_ok());
    }
}
