//! Set ledger - the ordered collection of sets belonging to the session
//! being worked on.
//!
//! Mutations are optimistic: the in-memory ledger changes first, then the
//! store call goes out. `update_set` captures the pre-mutation row and puts
//! it back if the write fails; `delete_set` has no granular rollback and
//! recovers by reloading the whole ledger from the store.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::models::{ExerciseGroup, NewSetFields, SetPatch, SetRow, SetView};
use crate::store::WorkoutStore;

#[derive(Default)]
struct LedgerState {
    session: Option<Uuid>,
    sets: Vec<SetView>,
}

/// Ordered ledger of the bound session's sets. Bound and cleared by the
/// session lifecycle manager; every mutation requires a bound session.
#[derive(Clone)]
pub struct SetLedger {
    store: Arc<dyn WorkoutStore>,
    state: Arc<RwLock<LedgerState>>,
}

impl SetLedger {
    pub fn new(store: Arc<dyn WorkoutStore>) -> Self {
        Self {
            store,
            state: Arc::new(RwLock::new(LedgerState::default())),
        }
    }

    /// Attach the ledger to a session, replacing any previous contents.
    pub(crate) async fn bind(&self, session_id: Uuid, sets: Vec<SetView>) {
        let mut state = self.state.write().await;
        state.session = Some(session_id);
        state.sets = sets;
    }

    pub(crate) async fn clear(&self) {
        let mut state = self.state.write().await;
        state.session = None;
        state.sets.clear();
    }

    /// Session the ledger is currently bound to.
    pub async fn session(&self) -> Option<Uuid> {
        self.state.read().await.session
    }

    /// Snapshot of the ledger in insertion order.
    pub async fn sets(&self) -> Vec<SetView> {
        self.state.read().await.sets.clone()
    }

    /// Display grouping: sets sorted by `set_order`, grouped by exercise in
    /// order of first appearance.
    pub async fn grouped(&self) -> Vec<ExerciseGroup> {
        group_by_exercise(&self.state.read().await.sets)
    }

    /// Append a new set for `exercise_id` to the bound session.
    ///
    /// Weight defaults to the most recently added set of the same exercise
    /// within this session (reverse insertion scan), else 0. Reps default
    /// to 0. The store assigns `set_order`.
    pub async fn add_set(&self, exercise_id: Uuid) -> CoreResult<SetView> {
        let session_id = self.session().await.ok_or(CoreError::NoActiveSession)?;
        let exercise = self
            .store
            .get_exercise(exercise_id)
            .await?
            .ok_or(CoreError::ExerciseNotFound(exercise_id))?;

        let default_weight = {
            let state = self.state.read().await;
            state
                .sets
                .iter()
                .rev()
                .find(|s| s.row.exercise_id == exercise_id)
                .map(|s| s.row.weight)
                .unwrap_or(0.0)
        };
        debug!(%exercise_id, default_weight, "defaulting weight for new set");

        let row = self
            .store
            .insert_set(NewSetFields {
                id: Uuid::new_v4(),
                session_id,
                exercise_id,
                weight: default_weight,
                reps: 0,
                completed: false,
            })
            .await?;
        info!(set_id = %row.id, set_order = row.set_order, exercise = %exercise.name, "added set");

        let view = SetView {
            row,
            exercise_name: exercise.name,
        };
        self.state.write().await.sets.push(view.clone());
        Ok(view)
    }

    /// Apply a partial update optimistically, then persist it. On a failed
    /// write the captured original row is restored before the error is
    /// returned.
    pub async fn update_set(&self, id: Uuid, patch: SetPatch) -> CoreResult<SetView> {
        let original = {
            let mut state = self.state.write().await;
            let entry = state
                .sets
                .iter_mut()
                .find(|s| s.row.id == id)
                .ok_or(CoreError::SetNotFound(id))?;
            let original = entry.row.clone();
            patch.apply(&mut entry.row);
            original
        };

        let persisted = match self.store.update_set(id, &patch).await {
            Ok(found) => found,
            Err(e) => {
                self.restore(id, original).await;
                return Err(e.into());
            }
        };
        if !persisted {
            self.restore(id, original).await;
            return Err(CoreError::SetNotFound(id));
        }

        let state = self.state.read().await;
        let view = state
            .sets
            .iter()
            .find(|s| s.row.id == id)
            .cloned()
            .ok_or(CoreError::SetNotFound(id))?;
        Ok(view)
    }

    /// Remove a set optimistically, then persist the delete. On a failed
    /// write the ledger is reloaded from the store, discarding any other
    /// unsaved local edits.
    pub async fn delete_set(&self, id: Uuid) -> CoreResult<()> {
        {
            let mut state = self.state.write().await;
            let before = state.sets.len();
            state.sets.retain(|s| s.row.id != id);
            if state.sets.len() == before {
                return Err(CoreError::SetNotFound(id));
            }
        }

        match self.store.delete_set(id).await {
            Ok(_) => {
                info!(set_id = %id, "deleted set");
                Ok(())
            }
            Err(e) => {
                warn!(set_id = %id, error = %e, "delete failed, reloading ledger");
                if let Err(reload) = self.reload().await {
                    warn!(error = %reload, "ledger reload after failed delete also failed");
                }
                Err(e.into())
            }
        }
    }

    /// Replace the in-memory ledger with the store's view of the bound
    /// session.
    pub async fn reload(&self) -> CoreResult<()> {
        let session_id = self.session().await.ok_or(CoreError::NoActiveSession)?;
        let sets = self.store.sets_for_session(session_id).await?;
        self.state.write().await.sets = sets;
        Ok(())
    }

    async fn restore(&self, id: Uuid, original: SetRow) {
        let mut state = self.state.write().await;
        if let Some(entry) = state.sets.iter_mut().find(|s| s.row.id == id) {
            entry.row = original;
        }
    }
}

/// Group sets by exercise, preserving the order in which each exercise
/// first appears among sets sorted by `set_order`. Numbering within a group
/// is the caller's 1-based index, not the global `set_order`.
pub fn group_by_exercise(sets: &[SetView]) -> Vec<ExerciseGroup> {
    let mut ordered: Vec<&SetView> = sets.iter().collect();
    ordered.sort_by_key(|s| s.row.set_order);

    let mut groups: Vec<ExerciseGroup> = Vec::new();
    for set in ordered {
        match groups
            .iter_mut()
            .find(|g| g.exercise_id == set.row.exercise_id)
        {
            Some(group) => group.sets.push(set.clone()),
            None => groups.push(ExerciseGroup {
                exercise_id: set.row.exercise_id,
                exercise_name: set.exercise_name.clone(),
                sets: vec![set.clone()],
            }),
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SetRow;
    use chrono::Utc;

    fn view(exercise: (&str, Uuid), set_order: i32) -> SetView {
        SetView {
            row: SetRow {
                id: Uuid::new_v4(),
                session_id: Uuid::new_v4(),
                exercise_id: exercise.1,
                weight: 0.0,
                reps: 0,
                set_order,
                completed: false,
                created_at: Utc::now(),
            },
            exercise_name: exercise.0.to_string(),
        }
    }

    #[test]
    fn grouping_preserves_first_appearance_order() {
        let bench = ("Bench Press", Uuid::new_v4());
        let squat = ("Squat", Uuid::new_v4());
        // Interleaved: bench, squat, bench again.
        let sets = vec![view(bench, 1), view(squat, 2), view(bench, 3)];

        let groups = group_by_exercise(&sets);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].exercise_name, "Bench Press");
        assert_eq!(groups[0].sets.len(), 2);
        assert_eq!(groups[1].exercise_name, "Squat");
        assert_eq!(groups[1].sets.len(), 1);
    }

    #[test]
    fn grouping_sorts_by_set_order_before_walking() {
        let bench = ("Bench Press", Uuid::new_v4());
        let squat = ("Squat", Uuid::new_v4());
        // Out of insertion order: squat holds the lowest set_order.
        let sets = vec![view(bench, 2), view(bench, 3), view(squat, 1)];

        let groups = group_by_exercise(&sets);
        assert_eq!(groups[0].exercise_name, "Squat");
        assert_eq!(groups[1].exercise_name, "Bench Press");
        let orders: Vec<i32> = groups[1].sets.iter().map(|s| s.row.set_order).collect();
        assert_eq!(orders, vec![2, 3]);
    }

    #[test]
    fn grouping_empty_ledger_is_empty() {
        assert!(group_by_exercise(&[]).is_empty());
    }
}
