use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::exercise::{Exercise, ExerciseError};
use crate::model::ids::WorkoutId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum WorkoutError {
    #[error("workout title cannot be empty")]
    EmptyTitle,

    #[error("workout is already logged and cannot be edited")]
    AlreadyLogged,

    #[error("exercise {index} does not exist (workout has {len} exercises)")]
    ExerciseOutOfRange { index: usize, len: usize },

    #[error(transparent)]
    Exercise(#[from] ExerciseError),
}

//
// ─── WORKOUT ───────────────────────────────────────────────────────────────────
//

/// An ordered list of exercises.
///
/// The completion timestamp is the only thing that separates a plan
/// (`created_at == None`) from a logged session. Logged sessions are history:
/// every structural or value edit is rejected with `WorkoutError::AlreadyLogged`.
#[derive(Debug, Clone, PartialEq)]
pub struct Workout {
    id: Option<WorkoutId>,
    title: String,
    index: u32,
    created_at: Option<DateTime<Utc>>,
    exercises: Vec<Exercise>,
}

impl Workout {
    /// Creates an unsaved plan with no exercises.
    ///
    /// # Errors
    ///
    /// Returns `WorkoutError::EmptyTitle` if the title is empty or whitespace-only.
    pub fn new(title: impl Into<String>) -> Result<Self, WorkoutError> {
        Ok(Self {
            id: None,
            title: normalize_title(title.into())?,
            index: 0,
            created_at: None,
            exercises: Vec::new(),
        })
    }

    /// Rehydrate a workout from storage.
    ///
    /// # Errors
    ///
    /// Returns `WorkoutError::EmptyTitle` if the stored title is empty.
    pub fn from_persisted(
        id: WorkoutId,
        title: impl Into<String>,
        index: u32,
        created_at: Option<DateTime<Utc>>,
        exercises: Vec<Exercise>,
    ) -> Result<Self, WorkoutError> {
        let mut workout = Self {
            id: Some(id),
            title: normalize_title(title.into())?,
            index,
            created_at,
            exercises,
        };
        workout.assign_id(id);
        Ok(workout)
    }

    #[must_use]
    pub fn id(&self) -> Option<WorkoutId> {
        self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Ordinal among plans, used for manual ordering.
    #[must_use]
    pub fn index(&self) -> u32 {
        self.index
    }

    #[must_use]
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    #[must_use]
    pub fn is_logged(&self) -> bool {
        self.created_at.is_some()
    }

    #[must_use]
    pub fn is_plan(&self) -> bool {
        self.created_at.is_none()
    }

    #[must_use]
    pub fn exercises(&self) -> &[Exercise] {
        &self.exercises
    }

    #[must_use]
    pub fn exercise(&self, index: usize) -> Option<&Exercise> {
        self.exercises.get(index)
    }

    /// Record the store-assigned id on the workout and its exercises.
    pub fn assign_id(&mut self, id: WorkoutId) {
        self.id = Some(id);
        for exercise in &mut self.exercises {
            exercise.set_workout_id(Some(id));
        }
    }

    pub fn set_index(&mut self, index: u32) {
        self.index = index;
    }

    /// # Errors
    ///
    /// Returns `WorkoutError::EmptyTitle` or `WorkoutError::AlreadyLogged`.
    pub fn rename(&mut self, title: impl Into<String>) -> Result<(), WorkoutError> {
        self.ensure_editable()?;
        self.title = normalize_title(title.into())?;
        Ok(())
    }

    /// Stamp the completion time, turning the workout into a logged session.
    ///
    /// # Errors
    ///
    /// Returns `WorkoutError::AlreadyLogged` if it already has a timestamp.
    pub fn mark_logged(&mut self, at: DateTime<Utc>) -> Result<(), WorkoutError> {
        self.ensure_editable()?;
        self.created_at = Some(at);
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `WorkoutError::AlreadyLogged` for logged sessions.
    pub fn add_exercise(&mut self, mut exercise: Exercise) -> Result<(), WorkoutError> {
        self.ensure_editable()?;
        exercise.set_workout_id(self.id);
        self.exercises.push(exercise);
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `WorkoutError::AlreadyLogged` for logged sessions, or
    /// `WorkoutError::ExerciseOutOfRange` if there is no such exercise.
    pub fn remove_exercise(&mut self, index: usize) -> Result<Exercise, WorkoutError> {
        self.ensure_editable()?;
        self.check_index(index)?;
        let mut removed = self.exercises.remove(index);
        removed.set_workout_id(None);
        Ok(removed)
    }

    /// # Errors
    ///
    /// Returns `WorkoutError::AlreadyLogged` for logged sessions, or
    /// `WorkoutError::ExerciseOutOfRange` if either position is invalid.
    pub fn move_exercise(&mut self, from: usize, to: usize) -> Result<(), WorkoutError> {
        self.ensure_editable()?;
        self.check_index(from)?;
        self.check_index(to)?;
        if from != to {
            let exercise = self.exercises.remove(from);
            self.exercises.insert(to, exercise);
        }
        Ok(())
    }

    /// Mutable access to one exercise of an editable workout.
    ///
    /// # Errors
    ///
    /// Returns `WorkoutError::AlreadyLogged` for logged sessions, or
    /// `WorkoutError::ExerciseOutOfRange` if there is no such exercise.
    pub fn exercise_mut(&mut self, index: usize) -> Result<&mut Exercise, WorkoutError> {
        self.ensure_editable()?;
        self.check_index(index)?;
        Ok(&mut self.exercises[index])
    }

    /// Copy this workout into a fresh, unsaved session: no id, no timestamp,
    /// every set incomplete. Weights and reps are kept.
    #[must_use]
    pub fn clone_as_session(&self) -> Self {
        let mut session = self.clone();
        session.id = None;
        session.created_at = None;
        for exercise in &mut session.exercises {
            exercise.set_workout_id(None);
            exercise.reset_completion();
        }
        session
    }

    fn ensure_editable(&self) -> Result<(), WorkoutError> {
        if self.is_logged() {
            Err(WorkoutError::AlreadyLogged)
        } else {
            Ok(())
        }
    }

    fn check_index(&self, index: usize) -> Result<(), WorkoutError> {
        if index < self.exercises.len() {
            Ok(())
        } else {
            Err(WorkoutError::ExerciseOutOfRange {
                index,
                len: self.exercises.len(),
            })
        }
    }
}

fn normalize_title(title: String) -> Result<String, WorkoutError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(WorkoutError::EmptyTitle);
    }
    Ok(trimmed.to_owned())
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn push_day() -> Workout {
        let mut workout = Workout::new("Push Day").unwrap();
        workout
            .add_exercise(Exercise::planned("Bench Press", 3, Some(5)).unwrap())
            .unwrap();
        workout
            .add_exercise(Exercise::planned("Overhead Press", 3, Some(8)).unwrap())
            .unwrap();
        workout
    }

    #[test]
    fn new_workout_is_plan() {
        let workout = Workout::new("  Legs ").unwrap();
        assert_eq!(workout.title(), "Legs");
        assert!(workout.is_plan());
        assert!(!workout.is_logged());
        assert_eq!(workout.id(), None);
    }

    #[test]
    fn rejects_empty_title() {
        assert_eq!(Workout::new("").unwrap_err(), WorkoutError::EmptyTitle);
    }

    #[test]
    fn logged_workout_rejects_edits() {
        let mut workout = push_day();
        workout.mark_logged(fixed_now()).unwrap();

        assert!(workout.is_logged());
        assert_eq!(
            workout.mark_logged(fixed_now()).unwrap_err(),
            WorkoutError::AlreadyLogged
        );
        assert_eq!(
            workout.remove_exercise(0).unwrap_err(),
            WorkoutError::AlreadyLogged
        );
        assert!(workout.exercise_mut(0).is_err());
        assert_eq!(workout.exercises().len(), 2);
    }

    #[test]
    fn assign_id_propagates_to_exercises() {
        let mut workout = push_day();
        workout.assign_id(WorkoutId::new(9));
        assert!(
            workout
                .exercises()
                .iter()
                .all(|e| e.workout_id() == Some(WorkoutId::new(9)))
        );
    }

    #[test]
    fn clone_as_session_resets_identity_and_completion() {
        let mut workout = push_day();
        workout.exercise_mut(0).unwrap().toggle_set(0).unwrap();
        workout.assign_id(WorkoutId::new(3));

        let session = workout.clone_as_session();
        assert_eq!(session.id(), None);
        assert!(session.is_plan());
        assert!(session.exercises().iter().all(|e| e.workout_id().is_none()));
        assert_eq!(session.exercises()[0].current_set_index(), Some(0));
    }

    #[test]
    fn move_exercise_validates_positions() {
        let mut workout = push_day();
        workout.move_exercise(1, 0).unwrap();
        assert_eq!(workout.exercises()[0].name(), "Overhead Press");
        assert_eq!(
            workout.move_exercise(0, 7).unwrap_err(),
            WorkoutError::ExerciseOutOfRange { index: 7, len: 2 }
        );
    }
}
