//! Data model for the workout core.
//!
//! Two families of types live here and are kept deliberately separate:
//! persisted rows (what travels to the record store) and view-models (rows
//! joined with display data such as exercise names). Conversion between the
//! two is explicit, and the only update payload (`SetPatch`) can express
//! literal persisted fields exclusively, so joined or derived data can never
//! leak into a write.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Exercise row - owned by the catalog, referenced everywhere else by id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "database", derive(sqlx::FromRow))]
pub struct ExerciseRow {
    pub id: Uuid,
    pub name: String,
    pub muscle_group: String,
}

/// Workout session row. `ended_at == None` defines "active".
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "database", derive(sqlx::FromRow))]
pub struct SessionRow {
    pub id: Uuid,
    pub name: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl SessionRow {
    pub fn is_active(&self) -> bool {
        self.ended_at.is_none()
    }
}

/// Workout set row. `set_order` is unique within a session and assigned by
/// the store at insert time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "database", derive(sqlx::FromRow))]
pub struct SetRow {
    pub id: Uuid,
    pub session_id: Uuid,
    pub exercise_id: Uuid,
    pub weight: f64,
    pub reps: i32,
    pub set_order: i32,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

/// Fields for creating a new set. The store assigns `set_order` (next in
/// the session's sequence) and `created_at`.
#[derive(Debug, Clone)]
pub struct NewSetFields {
    pub id: Uuid,
    pub session_id: Uuid,
    pub exercise_id: Uuid,
    pub weight: f64,
    pub reps: i32,
    pub completed: bool,
}

/// Partial update for a set. Only literal persisted fields appear here;
/// ids, foreign keys and joined data are not expressible, and absent
/// fields stay out of the serialized payload entirely.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SetPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reps: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub set_order: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

impl SetPatch {
    pub fn is_empty(&self) -> bool {
        self.weight.is_none()
            && self.reps.is_none()
            && self.set_order.is_none()
            && self.completed.is_none()
    }

    /// Merge the patch into a row in place.
    pub fn apply(&self, row: &mut SetRow) {
        if let Some(weight) = self.weight {
            row.weight = weight;
        }
        if let Some(reps) = self.reps {
            row.reps = reps;
        }
        if let Some(set_order) = self.set_order {
            row.set_order = set_order;
        }
        if let Some(completed) = self.completed {
            row.completed = completed;
        }
    }
}

/// A set joined with its exercise name, as shown in the ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetView {
    pub row: SetRow,
    pub exercise_name: String,
}

/// Ledger grouping output: one group per exercise, ordered by the first
/// appearance of that exercise among sets sorted by `set_order`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExerciseGroup {
    pub exercise_id: Uuid,
    pub exercise_name: String,
    pub sets: Vec<SetView>,
}

/// A session together with its full set ledger, as loaded for review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionView {
    pub session: SessionRow,
    pub sets: Vec<SetView>,
}

/// Workout template row.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "database", derive(sqlx::FromRow))]
pub struct TemplateRow {
    pub id: Uuid,
    pub name: String,
}

/// One ordered item of a template.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "database", derive(sqlx::FromRow))]
pub struct TemplateItemRow {
    pub id: Uuid,
    pub template_id: Uuid,
    pub exercise_id: Uuid,
    pub order_index: i32,
    pub sets_target: i32,
}

/// Template item joined with its exercise name. `exercise_name` is `None`
/// when the referenced exercise no longer exists; expansion skips such
/// items.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateItemView {
    pub row: TemplateItemRow,
    pub exercise_name: Option<String>,
}

/// A template joined with its items, ordered by `order_index`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateView {
    pub row: TemplateRow,
    pub items: Vec<TemplateItemView>,
}

/// History Oracle result: the most recent recorded pair for an exercise
/// across finished history.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExerciseHistory {
    pub weight: f64,
    pub reps: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_row() -> SetRow {
        SetRow {
            id: Uuid::new_v4(),
            session_id: Uuid::new_v4(),
            exercise_id: Uuid::new_v4(),
            weight: 20.0,
            reps: 8,
            set_order: 3,
            completed: false,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn patch_applies_only_given_fields() {
        let mut row = sample_row();
        let before = row.clone();
        let patch = SetPatch {
            weight: Some(22.5),
            completed: Some(true),
            ..Default::default()
        };
        patch.apply(&mut row);
        assert_eq!(row.weight, 22.5);
        assert!(row.completed);
        assert_eq!(row.reps, before.reps);
        assert_eq!(row.set_order, before.set_order);
        assert_eq!(row.id, before.id);
    }

    #[test]
    fn patch_payload_carries_only_given_literal_fields() {
        let patch = SetPatch {
            weight: Some(12.5),
            ..Default::default()
        };
        let payload = serde_json::to_value(&patch).unwrap();
        let keys: Vec<&str> = payload
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(keys, vec!["weight"]);
    }

    #[test]
    fn empty_patch_is_detectable() {
        assert!(SetPatch::default().is_empty());
        let patch = SetPatch {
            reps: Some(10),
            ..Default::default()
        };
        assert!(!patch.is_empty());
    }
}
