//! Postgres-backed `WorkoutStore` (feature `database`).
//!
//! All rows are scoped to a single `owner`; the core never sees that
//! column. Schema lives in `migrations/0001_workout.sql`. The per-session
//! `set_order` sequence is assigned inside the insert statement, and the
//! unique index on `(session_id, set_order)` rejects the remaining
//! collision window between concurrent writers.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{
    ExerciseRow, NewSetFields, SessionRow, SetPatch, SetRow, SetView, TemplateItemRow,
    TemplateItemView, TemplateRow, TemplateView,
};
use crate::store::WorkoutStore;

/// Postgres store scoped to one owner.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
    owner: String,
}

impl PgStore {
    pub fn new(pool: PgPool, owner: impl Into<String>) -> Self {
        Self {
            pool,
            owner: owner.into(),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn store_err(op: &'static str) -> impl FnOnce(sqlx::Error) -> StoreError {
    move |e| StoreError::new(op, e.to_string())
}

#[derive(sqlx::FromRow)]
struct SetJoinRow {
    id: Uuid,
    session_id: Uuid,
    exercise_id: Uuid,
    weight: f64,
    reps: i32,
    set_order: i32,
    completed: bool,
    created_at: DateTime<Utc>,
    exercise_name: String,
}

impl From<SetJoinRow> for SetView {
    fn from(r: SetJoinRow) -> Self {
        SetView {
            row: SetRow {
                id: r.id,
                session_id: r.session_id,
                exercise_id: r.exercise_id,
                weight: r.weight,
                reps: r.reps,
                set_order: r.set_order,
                completed: r.completed,
                created_at: r.created_at,
            },
            exercise_name: r.exercise_name,
        }
    }
}

#[derive(sqlx::FromRow)]
struct TemplateItemJoinRow {
    id: Uuid,
    template_id: Uuid,
    exercise_id: Uuid,
    order_index: i32,
    sets_target: i32,
    exercise_name: Option<String>,
}

impl From<TemplateItemJoinRow> for TemplateItemView {
    fn from(r: TemplateItemJoinRow) -> Self {
        TemplateItemView {
            row: TemplateItemRow {
                id: r.id,
                template_id: r.template_id,
                exercise_id: r.exercise_id,
                order_index: r.order_index,
                sets_target: r.sets_target,
            },
            exercise_name: r.exercise_name,
        }
    }
}

#[async_trait]
impl WorkoutStore for PgStore {
    async fn insert_exercise(&self, row: ExerciseRow) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO exercises (id, name, muscle_group, owner)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(row.id)
        .bind(&row.name)
        .bind(&row.muscle_group)
        .bind(&self.owner)
        .execute(&self.pool)
        .await
        .map_err(store_err("insert_exercise"))?;
        Ok(())
    }

    async fn get_exercise(&self, id: Uuid) -> Result<Option<ExerciseRow>, StoreError> {
        sqlx::query_as::<_, ExerciseRow>(
            r#"
            SELECT id, name, muscle_group
            FROM exercises
            WHERE id = $1 AND owner = $2
            "#,
        )
        .bind(id)
        .bind(&self.owner)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err("get_exercise"))
    }

    async fn list_exercises(&self) -> Result<Vec<ExerciseRow>, StoreError> {
        sqlx::query_as::<_, ExerciseRow>(
            r#"
            SELECT id, name, muscle_group
            FROM exercises
            WHERE owner = $1
            ORDER BY name ASC
            "#,
        )
        .bind(&self.owner)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err("list_exercises"))
    }

    async fn update_exercise(
        &self,
        id: Uuid,
        name: Option<&str>,
        muscle_group: Option<&str>,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE exercises
            SET name = COALESCE($1, name),
                muscle_group = COALESCE($2, muscle_group)
            WHERE id = $3 AND owner = $4
            "#,
        )
        .bind(name)
        .bind(muscle_group)
        .bind(id)
        .bind(&self.owner)
        .execute(&self.pool)
        .await
        .map_err(store_err("update_exercise"))?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_exercise(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM exercises WHERE id = $1 AND owner = $2")
            .bind(id)
            .bind(&self.owner)
            .execute(&self.pool)
            .await
            .map_err(store_err("delete_exercise"))?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_session(&self, row: SessionRow) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO workout_sessions (id, name, started_at, ended_at, owner)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(row.id)
        .bind(&row.name)
        .bind(row.started_at)
        .bind(row.ended_at)
        .bind(&self.owner)
        .execute(&self.pool)
        .await
        .map_err(store_err("insert_session"))?;
        Ok(())
    }

    async fn get_session(&self, id: Uuid) -> Result<Option<SessionRow>, StoreError> {
        sqlx::query_as::<_, SessionRow>(
            r#"
            SELECT id, name, started_at, ended_at
            FROM workout_sessions
            WHERE id = $1 AND owner = $2
            "#,
        )
        .bind(id)
        .bind(&self.owner)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err("get_session"))
    }

    async fn finish_session(&self, id: Uuid, ended_at: DateTime<Utc>) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE workout_sessions
            SET ended_at = $1
            WHERE id = $2 AND owner = $3
            "#,
        )
        .bind(ended_at)
        .bind(id)
        .bind(&self.owner)
        .execute(&self.pool)
        .await
        .map_err(store_err("finish_session"))?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_session(&self, id: Uuid) -> Result<bool, StoreError> {
        // workout_sets.session_id is ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM workout_sessions WHERE id = $1 AND owner = $2")
            .bind(id)
            .bind(&self.owner)
            .execute(&self.pool)
            .await
            .map_err(store_err("delete_session"))?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_active_session(&self) -> Result<Option<SessionRow>, StoreError> {
        sqlx::query_as::<_, SessionRow>(
            r#"
            SELECT id, name, started_at, ended_at
            FROM workout_sessions
            WHERE ended_at IS NULL AND owner = $1
            ORDER BY started_at DESC
            LIMIT 1
            "#,
        )
        .bind(&self.owner)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err("find_active_session"))
    }

    async fn recent_finished_sessions(&self, limit: i64) -> Result<Vec<SessionRow>, StoreError> {
        sqlx::query_as::<_, SessionRow>(
            r#"
            SELECT id, name, started_at, ended_at
            FROM workout_sessions
            WHERE ended_at IS NOT NULL AND owner = $1
            ORDER BY ended_at DESC
            LIMIT $2
            "#,
        )
        .bind(&self.owner)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err("recent_finished_sessions"))
    }

    async fn insert_set(&self, fields: NewSetFields) -> Result<SetRow, StoreError> {
        sqlx::query_as::<_, SetRow>(
            r#"
            INSERT INTO workout_sets
                (id, session_id, exercise_id, weight, reps, set_order, completed, created_at, owner)
            VALUES ($1, $2, $3, $4, $5,
                    (SELECT COALESCE(MAX(set_order), 0) + 1
                     FROM workout_sets WHERE session_id = $2),
                    $6, NOW(), $7)
            RETURNING id, session_id, exercise_id, weight, reps, set_order, completed, created_at
            "#,
        )
        .bind(fields.id)
        .bind(fields.session_id)
        .bind(fields.exercise_id)
        .bind(fields.weight)
        .bind(fields.reps)
        .bind(fields.completed)
        .bind(&self.owner)
        .fetch_one(&self.pool)
        .await
        .map_err(store_err("insert_set"))
    }

    async fn update_set(&self, id: Uuid, patch: &SetPatch) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE workout_sets
            SET weight = COALESCE($1, weight),
                reps = COALESCE($2, reps),
                set_order = COALESCE($3, set_order),
                completed = COALESCE($4, completed)
            WHERE id = $5 AND owner = $6
            "#,
        )
        .bind(patch.weight)
        .bind(patch.reps)
        .bind(patch.set_order)
        .bind(patch.completed)
        .bind(id)
        .bind(&self.owner)
        .execute(&self.pool)
        .await
        .map_err(store_err("update_set"))?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_set(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM workout_sets WHERE id = $1 AND owner = $2")
            .bind(id)
            .bind(&self.owner)
            .execute(&self.pool)
            .await
            .map_err(store_err("delete_set"))?;
        Ok(result.rows_affected() > 0)
    }

    async fn sets_for_session(&self, session_id: Uuid) -> Result<Vec<SetView>, StoreError> {
        let rows = sqlx::query_as::<_, SetJoinRow>(
            r#"
            SELECT s.id, s.session_id, s.exercise_id, s.weight, s.reps,
                   s.set_order, s.completed, s.created_at,
                   COALESCE(e.name, 'unknown exercise') AS exercise_name
            FROM workout_sets s
            LEFT JOIN exercises e ON e.id = s.exercise_id
            WHERE s.session_id = $1 AND s.owner = $2
            ORDER BY s.set_order ASC
            "#,
        )
        .bind(session_id)
        .bind(&self.owner)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err("sets_for_session"))?;
        Ok(rows.into_iter().map(SetView::from).collect())
    }

    async fn latest_set_for_exercise(
        &self,
        exercise_id: Uuid,
        exclude_session: Option<Uuid>,
    ) -> Result<Option<SetRow>, StoreError> {
        sqlx::query_as::<_, SetRow>(
            r#"
            SELECT id, session_id, exercise_id, weight, reps, set_order, completed, created_at
            FROM workout_sets
            WHERE exercise_id = $1
              AND owner = $2
              AND ($3::uuid IS NULL OR session_id <> $3)
            ORDER BY created_at DESC, set_order DESC
            LIMIT 1
            "#,
        )
        .bind(exercise_id)
        .bind(&self.owner)
        .bind(exclude_session)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err("latest_set_for_exercise"))
    }

    async fn insert_template(
        &self,
        row: TemplateRow,
        items: Vec<TemplateItemRow>,
    ) -> Result<(), StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(store_err("insert_template"))?;

        sqlx::query("INSERT INTO workout_templates (id, name, owner) VALUES ($1, $2, $3)")
            .bind(row.id)
            .bind(&row.name)
            .bind(&self.owner)
            .execute(&mut *tx)
            .await
            .map_err(store_err("insert_template"))?;

        for item in &items {
            sqlx::query(
                r#"
                INSERT INTO workout_template_items
                    (id, template_id, exercise_id, order_index, sets_target)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(item.id)
            .bind(item.template_id)
            .bind(item.exercise_id)
            .bind(item.order_index)
            .bind(item.sets_target)
            .execute(&mut *tx)
            .await
            .map_err(store_err("insert_template"))?;
        }

        tx.commit().await.map_err(store_err("insert_template"))?;
        Ok(())
    }

    async fn get_template(&self, id: Uuid) -> Result<Option<TemplateView>, StoreError> {
        let Some(row) = sqlx::query_as::<_, TemplateRow>(
            r#"
            SELECT id, name
            FROM workout_templates
            WHERE id = $1 AND owner = $2
            "#,
        )
        .bind(id)
        .bind(&self.owner)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err("get_template"))?
        else {
            return Ok(None);
        };

        let items = sqlx::query_as::<_, TemplateItemJoinRow>(
            r#"
            SELECT i.id, i.template_id, i.exercise_id, i.order_index, i.sets_target,
                   e.name AS exercise_name
            FROM workout_template_items i
            LEFT JOIN exercises e ON e.id = i.exercise_id
            WHERE i.template_id = $1
            ORDER BY i.order_index ASC
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err("get_template"))?;

        Ok(Some(TemplateView {
            row,
            items: items.into_iter().map(TemplateItemView::from).collect(),
        }))
    }

    async fn list_templates(&self) -> Result<Vec<TemplateView>, StoreError> {
        let rows = sqlx::query_as::<_, TemplateRow>(
            r#"
            SELECT id, name
            FROM workout_templates
            WHERE owner = $1
            ORDER BY name ASC
            "#,
        )
        .bind(&self.owner)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err("list_templates"))?;

        let mut views = Vec::with_capacity(rows.len());
        for row in rows {
            if let Some(view) = self.get_template(row.id).await? {
                views.push(view);
            }
        }
        Ok(views)
    }

    async fn delete_template(&self, id: Uuid) -> Result<bool, StoreError> {
        // workout_template_items.template_id is ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM workout_templates WHERE id = $1 AND owner = $2")
            .bind(id)
            .bind(&self.owner)
            .execute(&self.pool)
            .await
            .map_err(store_err("delete_template"))?;
        Ok(result.rows_affected() > 0)
    }
}
