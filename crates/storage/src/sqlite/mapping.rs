use chrono::{DateTime, Utc};
use lift_core::model::{Exercise, ExerciseSet, TemplateId, WorkoutId};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::repository::{ExerciseRecord, StorageError};

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn id_to_i64(v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization("id overflow".into()))
}

pub(crate) fn workout_id_from_i64(v: i64) -> Result<WorkoutId, StorageError> {
    Ok(WorkoutId::new(i64_to_u64("workout_id", v)?))
}

pub(crate) fn template_id_from_i64(v: i64) -> Result<TemplateId, StorageError> {
    Ok(TemplateId::new(i64_to_u64("template_id", v)?))
}

/// Rebuilds exercises from rows of an `exercises LEFT JOIN exercise_sets`
/// query ordered by exercise, then set index.
///
/// Expected columns: `exercise_id`, `workout_id`, `position`, `name`,
/// `created_at`, `set_index`, `weight`, `reps`, `is_complete`.
pub(crate) fn group_exercise_rows(rows: &[SqliteRow]) -> Result<Vec<ExerciseRecord>, StorageError> {
    struct Pending {
        exercise_id: i64,
        workout_id: WorkoutId,
        completed_at: Option<DateTime<Utc>>,
        position: u32,
        name: String,
        sets: Vec<ExerciseSet>,
    }

    fn finish(pending: Pending) -> Result<ExerciseRecord, StorageError> {
        let exercise = Exercise::from_persisted(pending.name, pending.sets, Some(pending.workout_id))
            .map_err(ser)?;
        Ok(ExerciseRecord {
            workout_id: pending.workout_id,
            completed_at: pending.completed_at,
            position: pending.position,
            exercise,
        })
    }

    let mut records = Vec::new();
    let mut current: Option<Pending> = None;

    for row in rows {
        let exercise_id: i64 = row.try_get("exercise_id").map_err(ser)?;
        if current.as_ref().is_none_or(|p| p.exercise_id != exercise_id) {
            if let Some(done) = current.take() {
                records.push(finish(done)?);
            }
            current = Some(Pending {
                exercise_id,
                workout_id: workout_id_from_i64(row.try_get("workout_id").map_err(ser)?)?,
                completed_at: row.try_get("created_at").map_err(ser)?,
                position: u32_from_i64("position", row.try_get("position").map_err(ser)?)?,
                name: row.try_get("name").map_err(ser)?,
                sets: Vec::new(),
            });
        }

        let Some(set_index) = row.try_get::<Option<i64>, _>("set_index").map_err(ser)? else {
            continue;
        };
        let reps = row
            .try_get::<Option<i64>, _>("reps")
            .map_err(ser)?
            .map(|r| u32_from_i64("reps", r))
            .transpose()?;
        let set = ExerciseSet::from_persisted(
            u32_from_i64("set_index", set_index)?,
            row.try_get("weight").map_err(ser)?,
            reps,
            row.try_get::<i64, _>("is_complete").map_err(ser)? != 0,
        )
        .map_err(ser)?;
        if let Some(pending) = current.as_mut() {
            pending.sets.push(set);
        }
    }

    if let Some(done) = current {
        records.push(finish(done)?);
    }
    Ok(records)
}
