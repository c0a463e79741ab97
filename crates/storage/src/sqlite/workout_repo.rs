use chrono::{DateTime, Utc};
use lift_core::model::{Exercise, Workout, WorkoutId};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, Transaction};

use super::SqliteRepository;
use super::mapping::{conn, group_exercise_rows, id_to_i64, ser, u32_from_i64, workout_id_from_i64};
use crate::repository::{
    ExerciseQuery, ExerciseRecord, RecordOrder, StorageError, WorkoutOrder, WorkoutQuery,
    WorkoutRepository, WorkoutStatus,
};

fn status_clause(status: WorkoutStatus) -> &'static str {
    match status {
        WorkoutStatus::Any => "1 = 1",
        WorkoutStatus::Plan => "w.created_at IS NULL",
        WorkoutStatus::Logged => "w.created_at IS NOT NULL",
    }
}

fn workout_order_clause(order: WorkoutOrder) -> &'static str {
    match order {
        WorkoutOrder::PlanIndex => "w.plan_index ASC, w.id ASC",
        WorkoutOrder::NewestFirst => "w.created_at DESC, w.id DESC",
        WorkoutOrder::OldestFirst => "w.created_at ASC, w.id ASC",
    }
}

fn record_order_clause(order: RecordOrder) -> &'static str {
    match order {
        RecordOrder::OldestFirst => "created_at ASC, workout_id ASC, position ASC",
        RecordOrder::NewestFirst => "created_at DESC, workout_id DESC, position ASC",
    }
}

// SQLite treats a negative LIMIT as "no limit".
fn limit_value(limit: Option<u32>) -> i64 {
    limit.map_or(-1, i64::from)
}

async fn insert_exercises(
    tx: &mut Transaction<'_, Sqlite>,
    workout_id: i64,
    exercises: &[Exercise],
) -> Result<(), StorageError> {
    for (position, exercise) in exercises.iter().enumerate() {
        let position = i64::try_from(position).map_err(ser)?;
        let res = sqlx::query(
            r"
            INSERT INTO exercises (workout_id, position, name)
            VALUES (?1, ?2, ?3)
            ",
        )
        .bind(workout_id)
        .bind(position)
        .bind(exercise.name())
        .execute(&mut **tx)
        .await
        .map_err(conn)?;
        let exercise_id = res.last_insert_rowid();

        for set in exercise.sets() {
            sqlx::query(
                r"
                INSERT INTO exercise_sets (exercise_id, set_index, weight, reps, is_complete)
                VALUES (?1, ?2, ?3, ?4, ?5)
                ",
            )
            .bind(exercise_id)
            .bind(i64::from(set.index()))
            .bind(set.weight())
            .bind(set.reps().map(i64::from))
            .bind(i64::from(set.is_complete()))
            .execute(&mut **tx)
            .await
            .map_err(conn)?;
        }
    }
    Ok(())
}

impl SqliteRepository {
    async fn load_exercises(&self, workout_id: i64) -> Result<Vec<Exercise>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT e.id AS exercise_id, e.workout_id, e.position, e.name, w.created_at,
                   s.set_index, s.weight, s.reps, s.is_complete
            FROM exercises e
            JOIN workouts w ON w.id = e.workout_id
            LEFT JOIN exercise_sets s ON s.exercise_id = e.id
            WHERE e.workout_id = ?1
            ORDER BY e.position ASC, s.set_index ASC
            ",
        )
        .bind(workout_id)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        Ok(group_exercise_rows(&rows)?
            .into_iter()
            .map(|record| record.exercise)
            .collect())
    }

    async fn hydrate(&self, header: WorkoutHeader) -> Result<Workout, StorageError> {
        let exercises = self.load_exercises(header.raw_id).await?;
        Workout::from_persisted(
            workout_id_from_i64(header.raw_id)?,
            header.title,
            header.plan_index,
            header.created_at,
            exercises,
        )
        .map_err(ser)
    }
}

/// Workout columns read before the exercises are loaded.
struct WorkoutHeader {
    raw_id: i64,
    title: String,
    plan_index: u32,
    created_at: Option<DateTime<Utc>>,
}

fn header_from_row(row: &SqliteRow) -> Result<WorkoutHeader, StorageError> {
    Ok(WorkoutHeader {
        raw_id: row.try_get("id").map_err(ser)?,
        title: row.try_get("title").map_err(ser)?,
        plan_index: u32_from_i64("plan_index", row.try_get("plan_index").map_err(ser)?)?,
        created_at: row.try_get("created_at").map_err(ser)?,
    })
}

#[async_trait::async_trait]
impl WorkoutRepository for SqliteRepository {
    async fn insert_workout(&self, workout: &Workout) -> Result<WorkoutId, StorageError> {
        let mut tx = self.pool.begin().await.map_err(conn)?;

        let res = sqlx::query(
            r"
            INSERT INTO workouts (title, plan_index, created_at)
            VALUES (?1, ?2, ?3)
            ",
        )
        .bind(workout.title())
        .bind(i64::from(workout.index()))
        .bind(workout.created_at())
        .execute(&mut *tx)
        .await
        .map_err(conn)?;
        let raw_id = res.last_insert_rowid();

        insert_exercises(&mut tx, raw_id, workout.exercises()).await?;
        tx.commit().await.map_err(conn)?;

        workout_id_from_i64(raw_id)
    }

    async fn upsert_workout(&self, workout: &Workout) -> Result<(), StorageError> {
        let raw_id = id_to_i64(workout.id().ok_or(StorageError::MissingId)?.value())?;
        let mut tx = self.pool.begin().await.map_err(conn)?;

        let res = sqlx::query(
            r"
            UPDATE workouts
            SET title = ?2, plan_index = ?3, created_at = ?4
            WHERE id = ?1
            ",
        )
        .bind(raw_id)
        .bind(workout.title())
        .bind(i64::from(workout.index()))
        .bind(workout.created_at())
        .execute(&mut *tx)
        .await
        .map_err(conn)?;
        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }

        // Sets go with their exercises through the cascade.
        sqlx::query("DELETE FROM exercises WHERE workout_id = ?1")
            .bind(raw_id)
            .execute(&mut *tx)
            .await
            .map_err(conn)?;
        insert_exercises(&mut tx, raw_id, workout.exercises()).await?;

        tx.commit().await.map_err(conn)?;
        Ok(())
    }

    async fn get_workout(&self, id: WorkoutId) -> Result<Option<Workout>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, title, plan_index, created_at
            FROM workouts WHERE id = ?1
            ",
        )
        .bind(id_to_i64(id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        match row.as_ref().map(header_from_row).transpose()? {
            Some(header) => self.hydrate(header).await.map(Some),
            None => Ok(None),
        }
    }

    async fn query_workouts(&self, query: &WorkoutQuery) -> Result<Vec<Workout>, StorageError> {
        let sql = format!(
            r"
            SELECT w.id, w.title, w.plan_index, w.created_at
            FROM workouts w
            WHERE {}
            ORDER BY {}
            LIMIT ?1
            ",
            status_clause(query.status),
            workout_order_clause(query.order),
        );
        let rows = sqlx::query(&sql)
            .bind(limit_value(query.limit))
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;

        let headers = rows
            .iter()
            .map(header_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        let mut workouts = Vec::with_capacity(headers.len());
        for header in headers {
            workouts.push(self.hydrate(header).await?);
        }
        Ok(workouts)
    }

    async fn query_exercises(
        &self,
        query: &ExerciseQuery,
    ) -> Result<Vec<ExerciseRecord>, StorageError> {
        let order = record_order_clause(query.order);
        let sql = format!(
            r"
            WITH picked AS (
                SELECT e.id AS exercise_id, e.workout_id AS workout_id, e.position AS position,
                       e.name AS name, w.created_at AS created_at
                FROM exercises e
                JOIN workouts w ON w.id = e.workout_id
                WHERE (?1 IS NULL OR e.name = ?1)
                  AND (?2 IS NULL OR e.workout_id <> ?2)
                  AND {status}
                ORDER BY {order}
                LIMIT ?3
            )
            SELECT p.exercise_id, p.workout_id, p.position, p.name, p.created_at,
                   s.set_index, s.weight, s.reps, s.is_complete
            FROM picked p
            LEFT JOIN exercise_sets s ON s.exercise_id = p.exercise_id
            ORDER BY {order}, s.set_index ASC
            ",
            status = status_clause(query.status),
        );
        let exclude = query
            .exclude_workout
            .map(|id| id_to_i64(id.value()))
            .transpose()?;

        let rows = sqlx::query(&sql)
            .bind(query.name.as_deref())
            .bind(exclude)
            .bind(limit_value(query.limit))
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;

        group_exercise_rows(&rows)
    }

    async fn delete_workout(&self, id: WorkoutId) -> Result<(), StorageError> {
        let res = sqlx::query("DELETE FROM workouts WHERE id = ?1")
            .bind(id_to_i64(id.value())?)
            .execute(&self.pool)
            .await
            .map_err(conn)?;
        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn update_plan_indices(&self, indices: &[(WorkoutId, u32)]) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await.map_err(conn)?;
        for (id, index) in indices {
            let res = sqlx::query(
                "UPDATE workouts SET plan_index = ?2 WHERE id = ?1 AND created_at IS NULL",
            )
            .bind(id_to_i64(id.value())?)
            .bind(i64::from(*index))
            .execute(&mut *tx)
            .await
            .map_err(conn)?;
            if res.rows_affected() == 0 {
                return Err(StorageError::NotFound);
            }
        }
        tx.commit().await.map_err(conn)?;
        Ok(())
    }
}
