use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use lift_core::model::{Exercise, ExerciseSet, ProgressPoint, Workout, WorkoutId};
use storage::repository::{
    ExerciseQuery, ExerciseRecord, RecordOrder, StorageError, WorkoutQuery, WorkoutRepository,
};

use crate::Clock;
use crate::error::WorkoutServiceError;
use crate::events::{EventBus, WorkoutEvent};

/// One set from a logged session, flattened for history views.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoggedSet {
    pub workout_id: WorkoutId,
    pub completed_at: DateTime<Utc>,
    pub set_index: u32,
    pub weight: Option<f64>,
    pub reps: Option<u32>,
    pub is_complete: bool,
}

impl LoggedSet {
    fn new(workout_id: WorkoutId, completed_at: DateTime<Utc>, set: &ExerciseSet) -> Self {
        Self {
            workout_id,
            completed_at,
            set_index: set.index(),
            weight: set.weight(),
            reps: set.reps(),
            is_complete: set.is_complete(),
        }
    }
}

/// Every logged set of one exercise name, oldest first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressData {
    pub name: String,
    pub sets: Vec<LoggedSet>,
}

/// Cross-workout queries plus plan ordering and deletion.
#[derive(Clone)]
pub struct WorkoutService {
    clock: Clock,
    workouts: Arc<dyn WorkoutRepository>,
    events: EventBus,
}

impl WorkoutService {
    #[must_use]
    pub fn new(clock: Clock, workouts: Arc<dyn WorkoutRepository>, events: EventBus) -> Self {
        Self {
            clock,
            workouts,
            events,
        }
    }

    #[must_use]
    pub fn clock(&self) -> Clock {
        self.clock
    }

    #[must_use]
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Logged exercise rows, optionally restricted to one name.
    async fn logged_records(
        &self,
        name: Option<&str>,
        order: RecordOrder,
    ) -> Result<Vec<ExerciseRecord>, WorkoutServiceError> {
        let mut query = ExerciseQuery::logged().order(order);
        if let Some(name) = name {
            query = query.named(name);
        }
        Ok(self.workouts.query_exercises(&query).await?)
    }

    /// Distinct names of every exercise that appears in a logged workout.
    ///
    /// # Errors
    ///
    /// Returns `WorkoutServiceError::Storage` if repository access fails.
    pub async fn unique_exercise_names(&self) -> Result<BTreeSet<String>, WorkoutServiceError> {
        let records = self.logged_records(None, RecordOrder::OldestFirst).await?;
        Ok(records
            .into_iter()
            .map(|r| r.exercise.name().to_owned())
            .collect())
    }

    /// All recorded weights for `name`, oldest session first. Sets without a
    /// weight are skipped.
    ///
    /// # Errors
    ///
    /// Returns `WorkoutServiceError::Storage` if repository access fails.
    pub async fn weight_history(&self, name: &str) -> Result<Vec<f64>, WorkoutServiceError> {
        let records = self
            .logged_records(Some(name), RecordOrder::OldestFirst)
            .await?;
        Ok(records
            .iter()
            .flat_map(|r| r.exercise.sets().iter().filter_map(ExerciseSet::weight))
            .collect())
    }

    /// # Errors
    ///
    /// Returns `WorkoutServiceError::Storage` if repository access fails.
    pub async fn exercise_set_history(
        &self,
        name: &str,
    ) -> Result<Vec<LoggedSet>, WorkoutServiceError> {
        let records = self
            .logged_records(Some(name), RecordOrder::OldestFirst)
            .await?;
        Ok(flatten_sets(&records))
    }

    /// Heaviest weight ever logged for `name`, or 0 when it was never logged.
    ///
    /// # Errors
    ///
    /// Returns `WorkoutServiceError::Storage` if repository access fails.
    pub async fn max_weight(&self, name: &str) -> Result<f64, WorkoutServiceError> {
        let weights = self.weight_history(name).await?;
        Ok(weights.into_iter().fold(0.0, f64::max))
    }

    /// Most recent logged occurrence of the same exercise in another workout.
    ///
    /// Only persisted, logged workouts are considered; the exercise's own
    /// workout is excluded.
    ///
    /// # Errors
    ///
    /// Returns `WorkoutServiceError::Storage` if repository access fails.
    pub async fn previous_occurrence(
        &self,
        exercise: &Exercise,
    ) -> Result<Option<Exercise>, WorkoutServiceError> {
        self.previous_for_name(exercise.name(), exercise.workout_id())
            .await
    }

    /// # Errors
    ///
    /// Returns `WorkoutServiceError::Storage` if repository access fails.
    pub async fn previous_for_name(
        &self,
        name: &str,
        exclude: Option<WorkoutId>,
    ) -> Result<Option<Exercise>, WorkoutServiceError> {
        let query = ExerciseQuery::logged()
            .named(name)
            .excluding(exclude)
            .order(RecordOrder::NewestFirst)
            .limit(1);
        let records = self.workouts.query_exercises(&query).await?;
        Ok(records.into_iter().next().map(|r| r.exercise))
    }

    /// Plans ordered by their manual index.
    ///
    /// # Errors
    ///
    /// Returns `WorkoutServiceError::Storage` if repository access fails.
    pub async fn fetch_workout_plans(&self) -> Result<Vec<Workout>, WorkoutServiceError> {
        Ok(self.workouts.query_workouts(&WorkoutQuery::plans()).await?)
    }

    /// Logged sessions, newest first.
    ///
    /// # Errors
    ///
    /// Returns `WorkoutServiceError::Storage` if repository access fails.
    pub async fn fetch_logged_workouts(&self) -> Result<Vec<Workout>, WorkoutServiceError> {
        Ok(self.workouts.query_workouts(&WorkoutQuery::logged()).await?)
    }

    /// # Errors
    ///
    /// Returns `WorkoutServiceError::Storage` if repository access fails.
    pub async fn get_workout(&self, id: WorkoutId) -> Result<Option<Workout>, WorkoutServiceError> {
        Ok(self.workouts.get_workout(id).await?)
    }

    /// Insert a new plan or update an existing one, returning its id.
    /// New plans are appended after the existing ones.
    ///
    /// # Errors
    ///
    /// Returns `WorkoutServiceError::NotAPlan` for logged workouts, or
    /// `WorkoutServiceError::Storage` if persistence fails.
    pub async fn save_plan(&self, plan: &mut Workout) -> Result<WorkoutId, WorkoutServiceError> {
        if plan.is_logged() {
            return Err(WorkoutServiceError::NotAPlan);
        }
        if let Some(id) = plan.id() {
            self.workouts.upsert_workout(plan).await?;
            self.events.publish(WorkoutEvent::WorkoutUpdated { id });
            return Ok(id);
        }

        let existing = self.fetch_workout_plans().await?;
        let next_index = existing.iter().map(|w| w.index() + 1).max().unwrap_or(0);
        plan.set_index(next_index);
        let id = self.workouts.insert_workout(plan).await?;
        plan.assign_id(id);
        tracing::info!(%id, title = plan.title(), "plan created");
        self.events.publish(WorkoutEvent::WorkoutCreated { id });
        Ok(id)
    }

    /// Delete a workout and everything it owns.
    ///
    /// # Errors
    ///
    /// Returns `WorkoutServiceError::Storage` if the workout was never
    /// persisted or the delete fails.
    pub async fn delete_workout(&self, workout: &Workout) -> Result<(), WorkoutServiceError> {
        let id = workout.id().ok_or(StorageError::MissingId)?;
        if let Err(err) = self.workouts.delete_workout(id).await {
            tracing::warn!(%id, error = %err, "failed to delete workout");
            return Err(err.into());
        }

        let event = if workout.is_logged() {
            WorkoutEvent::LogDeleted { id }
        } else {
            WorkoutEvent::PlanDeleted { id }
        };
        tracing::info!(%id, logged = workout.is_logged(), "workout deleted");
        self.events.publish(event);
        Ok(())
    }

    /// Move the plan at `from` to `to` and renumber every plan index.
    ///
    /// The new order is only written back into `plans` once the store has
    /// accepted the new indices; on failure `plans` is left untouched.
    ///
    /// # Errors
    ///
    /// Returns `WorkoutServiceError::InvalidPosition` for out-of-range
    /// positions, `WorkoutServiceError::NotAPlan` if the list holds a logged
    /// workout, or `WorkoutServiceError::Storage` if persistence fails.
    pub async fn reorder_workouts(
        &self,
        plans: &mut Vec<Workout>,
        from: usize,
        to: usize,
    ) -> Result<(), WorkoutServiceError> {
        let len = plans.len();
        if from >= len || to >= len {
            return Err(WorkoutServiceError::InvalidPosition { from, to, len });
        }
        if plans.iter().any(Workout::is_logged) {
            return Err(WorkoutServiceError::NotAPlan);
        }
        if from == to {
            return Ok(());
        }

        let mut reordered = plans.clone();
        let moved = reordered.remove(from);
        reordered.insert(to, moved);

        let mut indices = Vec::with_capacity(len);
        for (position, plan) in reordered.iter_mut().enumerate() {
            let index = u32::try_from(position)
                .map_err(|_| WorkoutServiceError::InvalidPosition { from, to, len })?;
            plan.set_index(index);
            let id = plan.id().ok_or(StorageError::MissingId)?;
            indices.push((id, index));
        }

        if let Err(err) = self.workouts.update_plan_indices(&indices).await {
            tracing::warn!(error = %err, from, to, "failed to persist plan order");
            return Err(err.into());
        }
        *plans = reordered;
        Ok(())
    }

    /// Best set of every logged session containing `name`, newest first.
    ///
    /// # Errors
    ///
    /// Returns `WorkoutServiceError::Storage` if repository access fails.
    pub async fn best_set_per_session(
        &self,
        name: &str,
    ) -> Result<Vec<LoggedSet>, WorkoutServiceError> {
        let records = self
            .logged_records(Some(name), RecordOrder::NewestFirst)
            .await?;

        let mut best: Vec<LoggedSet> = Vec::new();
        for record in &records {
            let Some(completed_at) = record.completed_at else {
                continue;
            };
            let Some(set) = record.exercise.best_set() else {
                continue;
            };
            let candidate = LoggedSet::new(record.workout_id, completed_at, set);
            match best.last_mut() {
                // Same session listed twice: keep the heavier set.
                Some(last) if last.workout_id == record.workout_id => {
                    if candidate.weight > last.weight {
                        *last = candidate;
                    }
                }
                _ => best.push(candidate),
            }
        }
        Ok(best)
    }

    /// Session-best points for `name`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `WorkoutServiceError::Storage` if repository access fails.
    pub async fn progress_points(
        &self,
        name: &str,
    ) -> Result<Vec<ProgressPoint>, WorkoutServiceError> {
        let best = self.best_set_per_session(name).await?;
        Ok(best
            .into_iter()
            .rev()
            .filter_map(|set| {
                Some(ProgressPoint {
                    workout_id: Some(set.workout_id),
                    completed_at: set.completed_at,
                    weight: set.weight?,
                    reps: set.reps,
                })
            })
            .collect())
    }

    /// All logged sets grouped by exercise name, names ascending.
    ///
    /// # Errors
    ///
    /// Returns `WorkoutServiceError::Storage` if repository access fails.
    pub async fn progress_data(&self) -> Result<Vec<ProgressData>, WorkoutServiceError> {
        let records = self.logged_records(None, RecordOrder::OldestFirst).await?;
        let mut grouped: BTreeMap<String, Vec<LoggedSet>> = BTreeMap::new();
        for record in &records {
            grouped
                .entry(record.exercise.name().to_owned())
                .or_default()
                .extend(flatten_sets(std::slice::from_ref(record)));
        }
        Ok(grouped
            .into_iter()
            .map(|(name, sets)| ProgressData { name, sets })
            .collect())
    }
}

fn flatten_sets(records: &[ExerciseRecord]) -> Vec<LoggedSet> {
    records
        .iter()
        .filter_map(|r| r.completed_at.map(|at| (r, at)))
        .flat_map(|(r, at)| {
            r.exercise
                .sets()
                .iter()
                .map(move |set| LoggedSet::new(r.workout_id, at, set))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use lift_core::time::{fixed_clock, fixed_now};
    use storage::repository::{InMemoryRepository, Storage};

    fn service() -> (WorkoutService, InMemoryRepository) {
        let repo = InMemoryRepository::new();
        let storage = Storage::from_in_memory(&repo);
        (
            WorkoutService::new(fixed_clock(), storage.workouts, EventBus::new()),
            repo,
        )
    }

    fn exercise(name: &str, weights: &[f64]) -> Exercise {
        let sets = weights
            .iter()
            .enumerate()
            .map(|(i, w)| {
                ExerciseSet::from_persisted(u32::try_from(i).unwrap(), Some(*w), Some(5), true)
                    .unwrap()
            })
            .collect();
        Exercise::from_persisted(name, sets, None).unwrap()
    }

    async fn log(svc: &WorkoutService, day: i64, exercises: Vec<Exercise>) -> WorkoutId {
        let mut workout = Workout::new(format!("Day {day}")).unwrap();
        for e in exercises {
            workout.add_exercise(e).unwrap();
        }
        workout
            .mark_logged(fixed_now() + Duration::days(day))
            .unwrap();
        svc.workouts.insert_workout(&workout).await.unwrap()
    }

    #[tokio::test]
    async fn bench_press_max_weight_after_one_session() {
        let (svc, _) = service();
        log(&svc, 0, vec![exercise("Bench Press", &[135.0, 135.0])]).await;

        assert_eq!(svc.max_weight("Bench Press").await.unwrap(), 135.0);
        assert_eq!(svc.max_weight("Squat").await.unwrap(), 0.0);
        assert_eq!(
            svc.weight_history("Bench Press").await.unwrap(),
            vec![135.0, 135.0]
        );
    }

    #[tokio::test]
    async fn unique_names_ignore_plans() {
        let (svc, _) = service();
        log(&svc, 0, vec![exercise("Squat", &[200.0])]).await;
        let mut plan = Workout::new("Plan").unwrap();
        plan.add_exercise(exercise("Lunge", &[50.0])).unwrap();
        svc.save_plan(&mut plan).await.unwrap();

        let names = svc.unique_exercise_names().await.unwrap();
        assert_eq!(names.into_iter().collect::<Vec<_>>(), vec!["Squat"]);
    }

    #[tokio::test]
    async fn previous_occurrence_skips_own_workout() {
        let (svc, _) = service();
        let first = log(&svc, 0, vec![exercise("Row", &[95.0])]).await;
        let second = log(&svc, 1, vec![exercise("Row", &[105.0])]).await;

        let own = svc.get_workout(second).await.unwrap().unwrap();
        let previous = svc
            .previous_occurrence(&own.exercises()[0])
            .await
            .unwrap()
            .unwrap();
        assert_eq!(previous.workout_id(), Some(first));

        let fresh = Exercise::new("Row").unwrap();
        let latest = svc.previous_occurrence(&fresh).await.unwrap().unwrap();
        assert_eq!(latest.workout_id(), Some(second));

        let never = Exercise::new("Deadlift").unwrap();
        assert!(svc.previous_occurrence(&never).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn best_set_per_session_is_newest_first() {
        let (svc, _) = service();
        log(&svc, 0, vec![exercise("Press", &[80.0, 90.0])]).await;
        log(&svc, 2, vec![exercise("Press", &[95.0, 85.0])]).await;

        let best = svc.best_set_per_session("Press").await.unwrap();
        let weights: Vec<Option<f64>> = best.iter().map(|s| s.weight).collect();
        assert_eq!(weights, vec![Some(95.0), Some(90.0)]);

        let points = svc.progress_points("Press").await.unwrap();
        assert_eq!(points[0].weight, 90.0);
    }

    #[tokio::test]
    async fn progress_data_groups_by_name() {
        let (svc, _) = service();
        log(
            &svc,
            0,
            vec![exercise("Squat", &[200.0]), exercise("Bench", &[150.0, 155.0])],
        )
        .await;
        log(&svc, 1, vec![exercise("Squat", &[210.0])]).await;

        let data = svc.progress_data().await.unwrap();
        let names: Vec<&str> = data.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["Bench", "Squat"]);
        assert_eq!(data[0].sets.len(), 2);
        let squats: Vec<Option<f64>> = data[1].sets.iter().map(|s| s.weight).collect();
        assert_eq!(squats, vec![Some(200.0), Some(210.0)]);
    }

    async fn plans(svc: &WorkoutService, titles: &[&str]) -> Vec<Workout> {
        for title in titles {
            let mut plan = Workout::new(*title).unwrap();
            svc.save_plan(&mut plan).await.unwrap();
        }
        svc.fetch_workout_plans().await.unwrap()
    }

    #[tokio::test]
    async fn reorder_renumbers_and_persists() {
        let (svc, _) = service();
        let mut list = plans(&svc, &["A", "B", "C"]).await;

        svc.reorder_workouts(&mut list, 2, 0).await.unwrap();
        let titles: Vec<&str> = list.iter().map(Workout::title).collect();
        assert_eq!(titles, vec!["C", "A", "B"]);
        let indices: Vec<u32> = list.iter().map(Workout::index).collect();
        assert_eq!(indices, vec![0, 1, 2]);

        let stored = svc.fetch_workout_plans().await.unwrap();
        assert_eq!(stored[0].title(), "C");
    }

    #[tokio::test]
    async fn reorder_rejects_bad_positions_and_rolls_back_on_failure() {
        let (svc, repo) = service();
        let mut list = plans(&svc, &["A", "B"]).await;
        let before = list.clone();

        assert!(matches!(
            svc.reorder_workouts(&mut list, 0, 5).await,
            Err(WorkoutServiceError::InvalidPosition { from: 0, to: 5, len: 2 })
        ));
        assert_eq!(list, before);

        svc.reorder_workouts(&mut list, 1, 1).await.unwrap();
        assert_eq!(list, before);

        repo.set_fail_writes(true);
        assert!(matches!(
            svc.reorder_workouts(&mut list, 1, 0).await,
            Err(WorkoutServiceError::Storage(_))
        ));
        assert_eq!(list, before);
    }

    #[tokio::test]
    async fn reorder_refuses_logged_workouts() {
        let (svc, _) = service();
        let mut list = plans(&svc, &["A"]).await;
        let id = log(&svc, 0, vec![exercise("Squat", &[200.0])]).await;
        list.push(svc.get_workout(id).await.unwrap().unwrap());
        let before = list.clone();

        assert!(matches!(
            svc.reorder_workouts(&mut list, 1, 0).await,
            Err(WorkoutServiceError::NotAPlan)
        ));
        assert_eq!(list, before);
        assert_eq!(svc.get_workout(id).await.unwrap().unwrap().index(), 0);
    }

    #[tokio::test]
    async fn delete_publishes_matching_event() {
        let (svc, _) = service();
        let mut rx = svc.events().subscribe();
        let id = log(&svc, 0, vec![exercise("Squat", &[200.0])]).await;
        let logged = svc.get_workout(id).await.unwrap().unwrap();

        svc.delete_workout(&logged).await.unwrap();
        assert_eq!(rx.recv().await.unwrap(), WorkoutEvent::LogDeleted { id });
        assert!(svc.unique_exercise_names().await.unwrap().is_empty());

        let unsaved = Workout::new("Never saved").unwrap();
        assert!(matches!(
            svc.delete_workout(&unsaved).await,
            Err(WorkoutServiceError::Storage(StorageError::MissingId))
        ));
    }
}
