//! Exercise catalog - plain CRUD over the record store.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::models::ExerciseRow;
use crate::store::WorkoutStore;

/// CRUD service for named exercises. No special logic; sets and template
/// items reference these rows by id only.
#[derive(Clone)]
pub struct ExerciseCatalog {
    store: Arc<dyn WorkoutStore>,
}

impl ExerciseCatalog {
    pub fn new(store: Arc<dyn WorkoutStore>) -> Self {
        Self { store }
    }

    pub async fn create(&self, name: &str, muscle_group: &str) -> CoreResult<ExerciseRow> {
        let row = ExerciseRow {
            id: Uuid::new_v4(),
            name: name.to_string(),
            muscle_group: muscle_group.to_string(),
        };
        self.store.insert_exercise(row.clone()).await?;
        info!(exercise_id = %row.id, name, "created exercise");
        Ok(row)
    }

    pub async fn get(&self, id: Uuid) -> CoreResult<Option<ExerciseRow>> {
        Ok(self.store.get_exercise(id).await?)
    }

    pub async fn list(&self) -> CoreResult<Vec<ExerciseRow>> {
        Ok(self.store.list_exercises().await?)
    }

    pub async fn update(
        &self,
        id: Uuid,
        name: Option<&str>,
        muscle_group: Option<&str>,
    ) -> CoreResult<()> {
        if !self.store.update_exercise(id, name, muscle_group).await? {
            return Err(CoreError::ExerciseNotFound(id));
        }
        Ok(())
    }

    pub async fn delete(&self, id: Uuid) -> CoreResult<()> {
        if !self.store.delete_exercise(id).await? {
            return Err(CoreError::ExerciseNotFound(id));
        }
        info!(exercise_id = %id, "deleted exercise");
        Ok(())
    }
}
