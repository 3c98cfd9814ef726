//! Workout templates and their expansion into concrete set stubs.
//!
//! A template is a named, ordered list of exercise references. Expansion
//! walks the items strictly in `order_index` order and emits `sets_target`
//! stub sets per item, numbered by one global counter that never resets
//! between items. Items whose exercise no longer resolves are skipped.

use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::models::{NewSetFields, TemplateItemRow, TemplateRow, TemplateView};
use crate::store::WorkoutStore;

/// Sets emitted per item when a template does not say otherwise.
pub const DEFAULT_SETS_TARGET: i32 = 3;

/// One planned stub set: which exercise, and which `set_order` slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannedSet {
    pub exercise_id: Uuid,
    pub set_order: i32,
}

/// Pure expansion: template items to planned stub sets.
///
/// The counter starts at 1 and increments after every emitted entry,
/// across all items. Items with an unresolvable exercise are skipped
/// without consuming counter values; a non-positive `sets_target` falls
/// back to the default.
pub fn expansion_plan(template: &TemplateView) -> Vec<PlannedSet> {
    let mut planned = Vec::new();
    let mut counter = 1;
    for item in &template.items {
        if item.exercise_name.is_none() {
            warn!(
                template_id = %template.row.id,
                exercise_id = %item.row.exercise_id,
                "skipping template item with unresolvable exercise"
            );
            continue;
        }
        let target = if item.row.sets_target > 0 {
            item.row.sets_target
        } else {
            DEFAULT_SETS_TARGET
        };
        for _ in 0..target {
            planned.push(PlannedSet {
                exercise_id: item.row.exercise_id,
                set_order: counter,
            });
            counter += 1;
        }
    }
    planned
}

/// Template persistence and expansion service.
#[derive(Clone)]
pub struct TemplateEngine {
    store: Arc<dyn WorkoutStore>,
}

impl TemplateEngine {
    pub fn new(store: Arc<dyn WorkoutStore>) -> Self {
        Self { store }
    }

    /// Persist a template whose items follow the caller-supplied exercise
    /// order. `order_index` is 1-based; `sets_target` stays at the default
    /// (per-item targets are stored but not exposed for creation).
    pub async fn save_template(&self, name: &str, exercise_ids: &[Uuid]) -> CoreResult<TemplateView> {
        let row = TemplateRow {
            id: Uuid::new_v4(),
            name: name.to_string(),
        };
        let items = exercise_ids
            .iter()
            .enumerate()
            .map(|(position, &exercise_id)| TemplateItemRow {
                id: Uuid::new_v4(),
                template_id: row.id,
                exercise_id,
                order_index: position as i32 + 1,
                sets_target: DEFAULT_SETS_TARGET,
            })
            .collect();
        self.store.insert_template(row.clone(), items).await?;
        info!(template_id = %row.id, name, items = exercise_ids.len(), "saved template");

        self.get_template(row.id)
            .await?
            .ok_or(CoreError::TemplateNotFound(row.id))
    }

    pub async fn get_template(&self, id: Uuid) -> CoreResult<Option<TemplateView>> {
        Ok(self.store.get_template(id).await?)
    }

    pub async fn list_templates(&self) -> CoreResult<Vec<TemplateView>> {
        Ok(self.store.list_templates().await?)
    }

    pub async fn delete_template(&self, id: Uuid) -> CoreResult<()> {
        if !self.store.delete_template(id).await? {
            return Err(CoreError::TemplateNotFound(id));
        }
        info!(template_id = %id, "deleted template");
        Ok(())
    }

    /// Materialize a template into stub sets for `session_id`, which must
    /// be freshly created and empty. Returns how many sets were inserted.
    /// Any insert failure propagates; the caller owns discarding the
    /// partially populated session.
    pub async fn expand_into(
        &self,
        template: &TemplateView,
        session_id: Uuid,
    ) -> CoreResult<usize> {
        let plan = expansion_plan(template);
        // Inserted in plan order into a fresh session, so the store's
        // sequence reproduces the planned orders 1..=n.
        for planned in &plan {
            self.store
                .insert_set(NewSetFields {
                    id: Uuid::new_v4(),
                    session_id,
                    exercise_id: planned.exercise_id,
                    weight: 0.0,
                    reps: 0,
                    completed: false,
                })
                .await?;
        }
        info!(
            template_id = %template.row.id,
            %session_id,
            sets = plan.len(),
            "expanded template into session"
        );
        Ok(plan.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TemplateItemView;

    fn template(items: Vec<(Uuid, i32, Option<&str>)>) -> TemplateView {
        let template_id = Uuid::new_v4();
        TemplateView {
            row: TemplateRow {
                id: template_id,
                name: "Push Day".to_string(),
            },
            items: items
                .into_iter()
                .enumerate()
                .map(|(i, (exercise_id, sets_target, name))| TemplateItemView {
                    row: TemplateItemRow {
                        id: Uuid::new_v4(),
                        template_id,
                        exercise_id,
                        order_index: i as i32 + 1,
                        sets_target,
                    },
                    exercise_name: name.map(str::to_string),
                })
                .collect(),
        }
    }

    #[test]
    fn counter_runs_globally_across_items() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let plan = expansion_plan(&template(vec![
            (a, 3, Some("Bench Press")),
            (b, 2, Some("Squat")),
        ]));

        assert_eq!(plan.len(), 5);
        let orders: Vec<i32> = plan.iter().map(|p| p.set_order).collect();
        assert_eq!(orders, vec![1, 2, 3, 4, 5]);
        assert!(plan[..3].iter().all(|p| p.exercise_id == a));
        assert!(plan[3..].iter().all(|p| p.exercise_id == b));
    }

    #[test]
    fn non_positive_target_falls_back_to_default() {
        let a = Uuid::new_v4();
        let plan = expansion_plan(&template(vec![(a, 0, Some("Deadlift"))]));
        assert_eq!(plan.len(), DEFAULT_SETS_TARGET as usize);
    }

    #[test]
    fn unresolvable_items_are_skipped_without_consuming_orders() {
        let a = Uuid::new_v4();
        let gone = Uuid::new_v4();
        let plan = expansion_plan(&template(vec![
            (gone, 2, None),
            (a, 2, Some("Overhead Press")),
        ]));

        assert_eq!(plan.len(), 2);
        let orders: Vec<i32> = plan.iter().map(|p| p.set_order).collect();
        assert_eq!(orders, vec![1, 2]);
        assert!(plan.iter().all(|p| p.exercise_id == a));
    }

    #[test]
    fn empty_template_expands_to_nothing() {
        assert!(expansion_plan(&template(vec![])).is_empty());
    }
}
