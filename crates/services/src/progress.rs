use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;

use lift_core::model::{ExerciseProgress, ProgressPoint, ProgressSort, Workout};

use crate::error::WorkoutServiceError;
use crate::events::WorkoutEvent;
use crate::workout_service::WorkoutService;

/// Full rebuild of the progress map from persisted logs.
///
/// Kept free of tracker state so it can run off the interactive path; apply
/// the result with `ProgressTracker::replace`.
///
/// # Errors
///
/// Returns `WorkoutServiceError::Storage` if any history query fails.
pub async fn compute_progress(
    service: &WorkoutService,
    now: DateTime<Utc>,
) -> Result<BTreeMap<String, ExerciseProgress>, WorkoutServiceError> {
    let mut entries = BTreeMap::new();
    for name in service.unique_exercise_names().await? {
        let best_lift = service.max_weight(&name).await?;
        let points = service.progress_points(&name).await?;
        let progress = ExerciseProgress::from_history(name.clone(), best_lift, &points, now);
        entries.insert(name, progress);
    }
    Ok(entries)
}

/// Per-exercise progress view kept in sync with finished and deleted sessions.
pub struct ProgressTracker {
    workouts: Arc<WorkoutService>,
    entries: BTreeMap<String, ExerciseProgress>,
}

impl ProgressTracker {
    #[must_use]
    pub fn new(workouts: Arc<WorkoutService>) -> Self {
        Self {
            workouts,
            entries: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ExerciseProgress> {
        self.entries.get(name)
    }

    #[must_use]
    pub fn snapshot(&self) -> &BTreeMap<String, ExerciseProgress> {
        &self.entries
    }

    /// Entries ordered for display.
    #[must_use]
    pub fn sorted(&self, sort: ProgressSort) -> Vec<&ExerciseProgress> {
        let mut rows: Vec<&ExerciseProgress> = self.entries.values().collect();
        rows.sort_by(|a, b| sort.compare(a, b));
        rows
    }

    pub fn replace(&mut self, entries: BTreeMap<String, ExerciseProgress>) {
        self.entries = entries;
    }

    /// Rebuild every entry. On failure the previous entries stay in place.
    ///
    /// # Errors
    ///
    /// Returns `WorkoutServiceError::Storage` if any history query fails.
    pub async fn recompute(
        &mut self,
    ) -> Result<&BTreeMap<String, ExerciseProgress>, WorkoutServiceError> {
        let now = self.workouts.clock().now();
        match compute_progress(&self.workouts, now).await {
            Ok(entries) => {
                tracing::debug!(exercises = entries.len(), "progress recomputed");
                self.entries = entries;
                Ok(&self.entries)
            }
            Err(err) => {
                tracing::warn!(error = %err, "progress recompute failed; keeping previous view");
                Err(err)
            }
        }
    }

    /// Fold one finished session into the affected entries only.
    ///
    /// Plans are ignored. An exercise listed twice in the session contributes
    /// its heavier occurrence. Sessions a rebuild already picked up are
    /// skipped.
    pub fn apply_session(&mut self, workout: &Workout) {
        let Some(completed_at) = workout.created_at() else {
            return;
        };

        let mut session_best: BTreeMap<&str, Option<ProgressPoint>> = BTreeMap::new();
        for exercise in workout.exercises() {
            let point = ProgressPoint::from_exercise(exercise, completed_at);
            let slot = session_best.entry(exercise.name()).or_insert(None);
            if point.map(|p| p.weight) > slot.map(|p| p.weight) {
                *slot = point;
            }
        }

        for (name, point) in session_best {
            let entry = self
                .entries
                .entry(name.to_owned())
                .or_insert_with(|| ExerciseProgress::new(name, completed_at));
            match point {
                Some(point) => {
                    if !entry.push(point) {
                        tracing::debug!(exercise = name, "session already in progress window");
                    }
                }
                None => entry.touch(completed_at),
            }
        }
    }

    /// React to a bus event: incremental update on finish, full rebuild on
    /// log deletion.
    ///
    /// # Errors
    ///
    /// Returns `WorkoutServiceError::Storage` if a rebuild fails.
    pub async fn handle_event(&mut self, event: &WorkoutEvent) -> Result<(), WorkoutServiceError> {
        match event {
            WorkoutEvent::SessionFinished { workout } => {
                self.apply_session(workout);
                Ok(())
            }
            WorkoutEvent::LogDeleted { .. } => self.recompute().await.map(|_| ()),
            _ => Ok(()),
        }
    }

    /// Process events until the bus closes. Falling behind triggers a full
    /// rebuild since the skipped events are unknown.
    pub async fn follow(&mut self, rx: &mut broadcast::Receiver<WorkoutEvent>) {
        loop {
            let result = match rx.recv().await {
                Ok(event) => self.handle_event(&event).await,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "progress tracker lagged behind events");
                    self.recompute().await.map(|_| ())
                }
                Err(broadcast::error::RecvError::Closed) => break,
            };
            if let Err(err) = result {
                tracing::warn!(error = %err, "progress update failed");
            }
        }
    }
}
