use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lift_core::model::{Exercise, Template, TemplateId, Workout, WorkoutId, WorkoutSettings};
use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("record has not been persisted yet")]
    MissingId,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

//
// ─── QUERIES ───────────────────────────────────────────────────────────────────
//

/// Which side of the plan/log split a query covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WorkoutStatus {
    #[default]
    Any,
    /// No completion timestamp.
    Plan,
    /// Completion timestamp present.
    Logged,
}

impl WorkoutStatus {
    #[must_use]
    pub fn matches(self, completed_at: Option<DateTime<Utc>>) -> bool {
        match self {
            WorkoutStatus::Any => true,
            WorkoutStatus::Plan => completed_at.is_none(),
            WorkoutStatus::Logged => completed_at.is_some(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WorkoutOrder {
    /// Plan ordinal ascending, then id.
    #[default]
    PlanIndex,
    /// Completion time descending, then id descending.
    NewestFirst,
    /// Completion time ascending, then id ascending.
    OldestFirst,
}

/// Predicate, sort and limit for workout fetches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkoutQuery {
    pub status: WorkoutStatus,
    pub order: WorkoutOrder,
    pub limit: Option<u32>,
}

impl WorkoutQuery {
    #[must_use]
    pub fn plans() -> Self {
        Self {
            status: WorkoutStatus::Plan,
            order: WorkoutOrder::PlanIndex,
            limit: None,
        }
    }

    #[must_use]
    pub fn logged() -> Self {
        Self {
            status: WorkoutStatus::Logged,
            order: WorkoutOrder::NewestFirst,
            limit: None,
        }
    }

    #[must_use]
    pub fn order(mut self, order: WorkoutOrder) -> Self {
        self.order = order;
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Order of exercise rows by their owning workout's completion time.
/// Ties fall back to the workout id in the same direction, then to the
/// exercise position inside the workout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordOrder {
    #[default]
    OldestFirst,
    NewestFirst,
}

/// Predicate, sort and limit for exercise fetches across workouts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExerciseQuery {
    pub name: Option<String>,
    pub status: WorkoutStatus,
    pub exclude_workout: Option<WorkoutId>,
    pub order: RecordOrder,
    pub limit: Option<u32>,
}

impl ExerciseQuery {
    /// Exercises of logged workouts, oldest first.
    #[must_use]
    pub fn logged() -> Self {
        Self {
            status: WorkoutStatus::Logged,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn excluding(mut self, workout: Option<WorkoutId>) -> Self {
        self.exclude_workout = workout;
        self
    }

    #[must_use]
    pub fn order(mut self, order: RecordOrder) -> Self {
        self.order = order;
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    fn matches(&self, workout_id: WorkoutId, completed_at: Option<DateTime<Utc>>) -> bool {
        self.status.matches(completed_at) && self.exclude_workout != Some(workout_id)
    }
}

/// One persisted exercise together with the workout it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct ExerciseRecord {
    pub workout_id: WorkoutId,
    pub completed_at: Option<DateTime<Utc>>,
    /// Position of the exercise inside its workout.
    pub position: u32,
    pub exercise: Exercise,
}

//
// ─── CONTRACTS ─────────────────────────────────────────────────────────────────
//

/// Repository contract for workouts (plans and logged sessions).
///
/// Every write runs as a single transaction: it is either fully durable or
/// leaves the previous state in place.
#[async_trait]
pub trait WorkoutRepository: Send + Sync {
    /// Persist a new workout with its exercises and sets, returning the
    /// assigned id. Any id already on the workout is ignored.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the workout cannot be stored.
    async fn insert_workout(&self, workout: &Workout) -> Result<WorkoutId, StorageError>;

    /// Replace a persisted workout and all of its owned rows.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::MissingId` for unsaved workouts and
    /// `StorageError::NotFound` if the id is unknown.
    async fn upsert_workout(&self, workout: &Workout) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_workout(&self, id: WorkoutId) -> Result<Option<Workout>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn query_workouts(&self, query: &WorkoutQuery) -> Result<Vec<Workout>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn query_exercises(
        &self,
        query: &ExerciseQuery,
    ) -> Result<Vec<ExerciseRecord>, StorageError>;

    /// Delete a workout together with its exercises and sets.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the workout does not exist.
    async fn delete_workout(&self, id: WorkoutId) -> Result<(), StorageError>;

    /// Write new plan ordinals in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` (and writes nothing) if any id is unknown
    /// or names a logged workout.
    async fn update_plan_indices(&self, indices: &[(WorkoutId, u32)]) -> Result<(), StorageError>;
}

#[async_trait]
pub trait TemplateRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` if the template cannot be stored.
    async fn insert_template(&self, template: &Template) -> Result<TemplateId, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::MissingId` for unsaved templates and
    /// `StorageError::NotFound` if the id is unknown.
    async fn upsert_template(&self, template: &Template) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_template(&self, id: TemplateId) -> Result<Option<Template>, StorageError>;

    /// All templates ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_templates(&self) -> Result<Vec<Template>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the template does not exist.
    async fn delete_template(&self, id: TemplateId) -> Result<(), StorageError>;
}

#[async_trait]
pub trait SettingsRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_settings(&self) -> Result<Option<WorkoutSettings>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the settings cannot be stored.
    async fn save_settings(&self, settings: &WorkoutSettings) -> Result<(), StorageError>;
}

//
// ─── IN-MEMORY ADAPTER ─────────────────────────────────────────────────────────
//

/// Simple in-memory repository implementation for testing and prototyping.
///
/// `set_fail_writes(true)` makes every write fail with
/// `StorageError::Connection`, leaving stored state untouched.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    workouts: Arc<Mutex<BTreeMap<WorkoutId, Workout>>>,
    templates: Arc<Mutex<BTreeMap<TemplateId, Template>>>,
    settings: Arc<Mutex<Option<WorkoutSettings>>>,
    next_workout_id: Arc<AtomicU64>,
    next_template_id: Arc<AtomicU64>,
    fail_writes: Arc<AtomicBool>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self) -> Result<(), StorageError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(StorageError::Connection("writes disabled".into()))
        } else {
            Ok(())
        }
    }
}

fn lock_err<E: std::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

fn truncate<T>(items: &mut Vec<T>, limit: Option<u32>) {
    if let Some(limit) = limit {
        items.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
    }
}

#[async_trait]
impl WorkoutRepository for InMemoryRepository {
    async fn insert_workout(&self, workout: &Workout) -> Result<WorkoutId, StorageError> {
        self.check_writable()?;
        let mut guard = self.workouts.lock().map_err(lock_err)?;
        let id = WorkoutId::new(self.next_workout_id.fetch_add(1, Ordering::SeqCst) + 1);
        let mut stored = workout.clone();
        stored.assign_id(id);
        guard.insert(id, stored);
        Ok(id)
    }

    async fn upsert_workout(&self, workout: &Workout) -> Result<(), StorageError> {
        self.check_writable()?;
        let id = workout.id().ok_or(StorageError::MissingId)?;
        let mut guard = self.workouts.lock().map_err(lock_err)?;
        let slot = guard.get_mut(&id).ok_or(StorageError::NotFound)?;
        *slot = workout.clone();
        Ok(())
    }

    async fn get_workout(&self, id: WorkoutId) -> Result<Option<Workout>, StorageError> {
        let guard = self.workouts.lock().map_err(lock_err)?;
        Ok(guard.get(&id).cloned())
    }

    async fn query_workouts(&self, query: &WorkoutQuery) -> Result<Vec<Workout>, StorageError> {
        let guard = self.workouts.lock().map_err(lock_err)?;
        let mut found: Vec<Workout> = guard
            .values()
            .filter(|w| query.status.matches(w.created_at()))
            .cloned()
            .collect();
        match query.order {
            WorkoutOrder::PlanIndex => found.sort_by_key(|w| (w.index(), w.id())),
            WorkoutOrder::NewestFirst => found.sort_by_key(|w| Reverse((w.created_at(), w.id()))),
            WorkoutOrder::OldestFirst => found.sort_by_key(|w| (w.created_at(), w.id())),
        }
        truncate(&mut found, query.limit);
        Ok(found)
    }

    async fn query_exercises(
        &self,
        query: &ExerciseQuery,
    ) -> Result<Vec<ExerciseRecord>, StorageError> {
        let guard = self.workouts.lock().map_err(lock_err)?;
        let mut found = Vec::new();
        for (id, workout) in guard.iter() {
            if !query.matches(*id, workout.created_at()) {
                continue;
            }
            for (position, exercise) in workout.exercises().iter().enumerate() {
                if query.name.as_deref().is_some_and(|n| n != exercise.name()) {
                    continue;
                }
                found.push(ExerciseRecord {
                    workout_id: *id,
                    completed_at: workout.created_at(),
                    position: u32::try_from(position).unwrap_or(u32::MAX),
                    exercise: exercise.clone(),
                });
            }
        }
        match query.order {
            RecordOrder::OldestFirst => {
                found.sort_by_key(|r| (r.completed_at, r.workout_id, r.position));
            }
            RecordOrder::NewestFirst => {
                found.sort_by_key(|r| (Reverse((r.completed_at, r.workout_id)), r.position));
            }
        }
        truncate(&mut found, query.limit);
        Ok(found)
    }

    async fn delete_workout(&self, id: WorkoutId) -> Result<(), StorageError> {
        self.check_writable()?;
        let mut guard = self.workouts.lock().map_err(lock_err)?;
        guard.remove(&id).map(|_| ()).ok_or(StorageError::NotFound)
    }

    async fn update_plan_indices(&self, indices: &[(WorkoutId, u32)]) -> Result<(), StorageError> {
        self.check_writable()?;
        let mut guard = self.workouts.lock().map_err(lock_err)?;
        if indices
            .iter()
            .any(|(id, _)| guard.get(id).is_none_or(Workout::is_logged))
        {
            return Err(StorageError::NotFound);
        }
        for (id, index) in indices {
            if let Some(workout) = guard.get_mut(id) {
                workout.set_index(*index);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl TemplateRepository for InMemoryRepository {
    async fn insert_template(&self, template: &Template) -> Result<TemplateId, StorageError> {
        self.check_writable()?;
        let mut guard = self.templates.lock().map_err(lock_err)?;
        let id = TemplateId::new(self.next_template_id.fetch_add(1, Ordering::SeqCst) + 1);
        let mut stored = template.clone();
        stored.assign_id(id);
        guard.insert(id, stored);
        Ok(id)
    }

    async fn upsert_template(&self, template: &Template) -> Result<(), StorageError> {
        self.check_writable()?;
        let id = template.id().ok_or(StorageError::MissingId)?;
        let mut guard = self.templates.lock().map_err(lock_err)?;
        let slot = guard.get_mut(&id).ok_or(StorageError::NotFound)?;
        *slot = template.clone();
        Ok(())
    }

    async fn get_template(&self, id: TemplateId) -> Result<Option<Template>, StorageError> {
        let guard = self.templates.lock().map_err(lock_err)?;
        Ok(guard.get(&id).cloned())
    }

    async fn list_templates(&self) -> Result<Vec<Template>, StorageError> {
        let guard = self.templates.lock().map_err(lock_err)?;
        Ok(guard.values().cloned().collect())
    }

    async fn delete_template(&self, id: TemplateId) -> Result<(), StorageError> {
        self.check_writable()?;
        let mut guard = self.templates.lock().map_err(lock_err)?;
        guard.remove(&id).map(|_| ()).ok_or(StorageError::NotFound)
    }
}

#[async_trait]
impl SettingsRepository for InMemoryRepository {
    async fn get_settings(&self) -> Result<Option<WorkoutSettings>, StorageError> {
        let guard = self.settings.lock().map_err(lock_err)?;
        Ok(*guard)
    }

    async fn save_settings(&self, settings: &WorkoutSettings) -> Result<(), StorageError> {
        self.check_writable()?;
        let mut guard = self.settings.lock().map_err(lock_err)?;
        *guard = Some(*settings);
        Ok(())
    }
}

/// Aggregates the repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub workouts: Arc<dyn WorkoutRepository>,
    pub templates: Arc<dyn TemplateRepository>,
    pub settings: Arc<dyn SettingsRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_in_memory(&InMemoryRepository::new())
    }

    /// Share one in-memory repository, e.g. to keep a handle for
    /// `set_fail_writes` in tests.
    #[must_use]
    pub fn from_in_memory(repo: &InMemoryRepository) -> Self {
        let workouts: Arc<dyn WorkoutRepository> = Arc::new(repo.clone());
        let templates: Arc<dyn TemplateRepository> = Arc::new(repo.clone());
        let settings: Arc<dyn SettingsRepository> = Arc::new(repo.clone());
        Self {
            workouts,
            templates,
            settings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use lift_core::model::ExerciseSet;
    use lift_core::time::fixed_now;

    fn logged(title: &str, name: &str, weight: f64, day: i64) -> Workout {
        let mut workout = Workout::new(title).unwrap();
        let sets = vec![ExerciseSet::from_persisted(0, Some(weight), Some(5), true).unwrap()];
        workout
            .add_exercise(Exercise::from_persisted(name, sets, None).unwrap())
            .unwrap();
        workout
            .mark_logged(fixed_now() + Duration::days(day))
            .unwrap();
        workout
    }

    #[tokio::test]
    async fn insert_assigns_ids_and_propagates_to_exercises() {
        let repo = InMemoryRepository::new();
        let id = repo
            .insert_workout(&logged("A", "Bench Press", 135.0, 0))
            .await
            .unwrap();
        let stored = repo.get_workout(id).await.unwrap().unwrap();
        assert_eq!(stored.id(), Some(id));
        assert_eq!(stored.exercises()[0].workout_id(), Some(id));
    }

    #[tokio::test]
    async fn exercise_query_filters_and_orders() {
        let repo = InMemoryRepository::new();
        let first = repo
            .insert_workout(&logged("A", "Squat", 200.0, 0))
            .await
            .unwrap();
        let second = repo
            .insert_workout(&logged("B", "Squat", 210.0, 1))
            .await
            .unwrap();
        let plan = Workout::new("Plan").unwrap();
        repo.insert_workout(&plan).await.unwrap();

        let newest = repo
            .query_exercises(
                &ExerciseQuery::logged()
                    .named("Squat")
                    .order(RecordOrder::NewestFirst)
                    .limit(1),
            )
            .await
            .unwrap();
        assert_eq!(newest.len(), 1);
        assert_eq!(newest[0].workout_id, second);

        let excluding = repo
            .query_exercises(&ExerciseQuery::logged().named("Squat").excluding(Some(second)))
            .await
            .unwrap();
        assert_eq!(excluding.len(), 1);
        assert_eq!(excluding[0].workout_id, first);
    }

    #[tokio::test]
    async fn failed_writes_leave_state_untouched() {
        let repo = InMemoryRepository::new();
        let id = repo
            .insert_workout(&Workout::new("Plan").unwrap())
            .await
            .unwrap();

        repo.set_fail_writes(true);
        assert!(matches!(
            repo.delete_workout(id).await,
            Err(StorageError::Connection(_))
        ));
        assert!(repo.get_workout(id).await.unwrap().is_some());

        repo.set_fail_writes(false);
        repo.delete_workout(id).await.unwrap();
        assert!(matches!(
            repo.delete_workout(id).await,
            Err(StorageError::NotFound)
        ));
    }

    #[tokio::test]
    async fn plan_indices_are_all_or_nothing() {
        let repo = InMemoryRepository::new();
        let id = repo
            .insert_workout(&Workout::new("Plan").unwrap())
            .await
            .unwrap();
        let result = repo
            .update_plan_indices(&[(id, 3), (WorkoutId::new(99), 0)])
            .await;
        assert!(matches!(result, Err(StorageError::NotFound)));
        assert_eq!(repo.get_workout(id).await.unwrap().unwrap().index(), 0);
    }

    #[tokio::test]
    async fn plan_indices_skip_logged_workouts() {
        let repo = InMemoryRepository::new();
        let plan = repo
            .insert_workout(&Workout::new("Plan").unwrap())
            .await
            .unwrap();
        let done = repo
            .insert_workout(&logged("Done", "Squat", 225.0, 0))
            .await
            .unwrap();

        let result = repo.update_plan_indices(&[(plan, 1), (done, 0)]).await;
        assert!(matches!(result, Err(StorageError::NotFound)));
        assert_eq!(repo.get_workout(plan).await.unwrap().unwrap().index(), 0);
    }
}
