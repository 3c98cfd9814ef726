//! History oracle - cross-session lookup of an exercise's last recorded
//! weight/reps pair.
//!
//! Distinct from the in-session default copy that `add_set` performs: the
//! oracle looks across *other* sessions and is used as a reference hint
//! when priming a new entry. The two mechanisms coexist on purpose.

use std::sync::Arc;

use uuid::Uuid;

use crate::error::CoreResult;
use crate::models::ExerciseHistory;
use crate::store::WorkoutStore;

#[derive(Clone)]
pub struct HistoryOracle {
    store: Arc<dyn WorkoutStore>,
}

impl HistoryOracle {
    pub fn new(store: Arc<dyn WorkoutStore>) -> Self {
        Self { store }
    }

    /// Most recent recorded pair for `exercise_id`, never taken from
    /// `exclude_session` (the currently active session). `None` when the
    /// exercise has no history outside that session.
    pub async fn exercise_history(
        &self,
        exercise_id: Uuid,
        exclude_session: Option<Uuid>,
    ) -> CoreResult<Option<ExerciseHistory>> {
        let hit = self
            .store
            .latest_set_for_exercise(exercise_id, exclude_session)
            .await?;
        Ok(hit.map(|row| ExerciseHistory {
            weight: row.weight,
            reps: row.reps,
        }))
    }
}
