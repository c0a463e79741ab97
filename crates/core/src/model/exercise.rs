use thiserror::Error;

use crate::model::exercise_set::ExerciseSet;
use crate::model::ids::WorkoutId;
use crate::model::settings::WeightUnit;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ExerciseError {
    #[error("exercise name cannot be empty")]
    EmptyName,

    #[error("set {index} does not exist (exercise has {len} sets)")]
    SetOutOfRange { index: usize, len: usize },

    #[error("invalid weight: {0}")]
    InvalidWeight(String),

    #[error("invalid reps: {0}")]
    InvalidReps(String),

    #[error("too many sets for a single exercise: {0}")]
    TooManySets(usize),
}

//
// ─── EXERCISE ──────────────────────────────────────────────────────────────────
//

/// An exercise performed within a workout: a name plus its ordered sets.
///
/// Set indices are kept contiguous (`0..len`) after every structural edit.
/// The owning workout is referenced by id only, and only once it has been
/// persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct Exercise {
    name: String,
    sets: Vec<ExerciseSet>,
    workout_id: Option<WorkoutId>,
}

impl Exercise {
    /// Creates an exercise with no sets.
    ///
    /// # Errors
    ///
    /// Returns `ExerciseError::EmptyName` if the name is empty or whitespace-only.
    pub fn new(name: impl Into<String>) -> Result<Self, ExerciseError> {
        Ok(Self {
            name: normalize_name(name.into())?,
            sets: Vec::new(),
            workout_id: None,
        })
    }

    /// Creates an exercise with `set_count` incomplete sets, each targeting `reps`.
    ///
    /// # Errors
    ///
    /// Returns `ExerciseError::EmptyName` for an empty name.
    pub fn planned(
        name: impl Into<String>,
        set_count: u32,
        reps: Option<u32>,
    ) -> Result<Self, ExerciseError> {
        let mut exercise = Self::new(name)?;
        exercise.sets = (0..set_count)
            .map(|index| {
                let mut set = ExerciseSet::new(index);
                set.set_reps(reps);
                set
            })
            .collect();
        Ok(exercise)
    }

    /// Rehydrate an exercise from storage. Sets are ordered by their stored
    /// index and renumbered so gaps left by older writes disappear.
    ///
    /// # Errors
    ///
    /// Returns `ExerciseError::EmptyName` for an empty name.
    pub fn from_persisted(
        name: impl Into<String>,
        mut sets: Vec<ExerciseSet>,
        workout_id: Option<WorkoutId>,
    ) -> Result<Self, ExerciseError> {
        sets.sort_by_key(ExerciseSet::index);
        let mut exercise = Self {
            name: normalize_name(name.into())?,
            sets,
            workout_id,
        };
        exercise.renumber()?;
        Ok(exercise)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn sets(&self) -> &[ExerciseSet] {
        &self.sets
    }

    #[must_use]
    pub fn set(&self, index: usize) -> Option<&ExerciseSet> {
        self.sets.get(index)
    }

    /// Id of the persisted workout this exercise belongs to.
    #[must_use]
    pub fn workout_id(&self) -> Option<WorkoutId> {
        self.workout_id
    }

    pub(crate) fn set_workout_id(&mut self, id: Option<WorkoutId>) {
        self.workout_id = id;
    }

    /// Position of the set a live session should focus next.
    ///
    /// This is the leftmost incomplete set, so a later set ticked off early
    /// never hides an earlier gap. `None` when every set is complete or there
    /// are no sets.
    #[must_use]
    pub fn current_set_index(&self) -> Option<usize> {
        self.sets.iter().position(|set| !set.is_complete())
    }

    #[must_use]
    pub fn current_set(&self) -> Option<&ExerciseSet> {
        self.current_set_index().and_then(|i| self.sets.get(i))
    }

    /// True when the exercise has sets and all of them are complete.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        !self.sets.is_empty() && self.current_set_index().is_none()
    }

    /// Heaviest weight recorded across the sets, ignoring unset weights.
    #[must_use]
    pub fn max_weight(&self) -> Option<f64> {
        self.sets
            .iter()
            .filter_map(ExerciseSet::weight)
            .fold(None, |best, w| Some(best.map_or(w, |b: f64| b.max(w))))
    }

    /// Heaviest set; the earliest one wins a tie.
    #[must_use]
    pub fn best_set(&self) -> Option<&ExerciseSet> {
        let mut best: Option<&ExerciseSet> = None;
        for set in &self.sets {
            let Some(weight) = set.weight() else { continue };
            match best.and_then(ExerciseSet::weight) {
                Some(current) if weight <= current => {}
                _ => best = Some(set),
            }
        }
        best
    }

    /// One-line log summary, e.g. `3x5 Bench Press - 135 lbs`.
    #[must_use]
    pub fn summary_line(&self, unit: WeightUnit) -> Option<String> {
        let shown = self.best_set().or_else(|| self.sets.first())?;
        let reps = shown
            .reps()
            .map_or_else(|| "-".to_string(), |r| r.to_string());
        let mut line = format!("{}x{} {}", self.sets.len(), reps, self.name);
        if shown.weight().is_some() {
            line.push_str(&format!(" - {} {}", shown.weight_label(), unit));
        }
        Some(line)
    }

    /// Append a set that carries over the last set's weight and reps.
    ///
    /// # Errors
    ///
    /// Returns `ExerciseError::TooManySets` if the index no longer fits in `u32`.
    pub fn add_set(&mut self) -> Result<&ExerciseSet, ExerciseError> {
        let index = u32::try_from(self.sets.len())
            .map_err(|_| ExerciseError::TooManySets(self.sets.len()))?;
        let set = match self.sets.last() {
            Some(last) => ExerciseSet::with_values(index, last.weight(), last.reps())?,
            None => ExerciseSet::new(index),
        };
        self.sets.push(set);
        Ok(&self.sets[self.sets.len() - 1])
    }

    /// Remove the set at `index` and renumber the remaining sets.
    ///
    /// # Errors
    ///
    /// Returns `ExerciseError::SetOutOfRange` if there is no such set.
    pub fn remove_set(&mut self, index: usize) -> Result<ExerciseSet, ExerciseError> {
        self.check_index(index)?;
        let removed = self.sets.remove(index);
        self.renumber()?;
        Ok(removed)
    }

    /// Move a set to a new position and renumber.
    ///
    /// # Errors
    ///
    /// Returns `ExerciseError::SetOutOfRange` if either position is invalid.
    pub fn move_set(&mut self, from: usize, to: usize) -> Result<(), ExerciseError> {
        self.check_index(from)?;
        self.check_index(to)?;
        if from == to {
            return Ok(());
        }
        let set = self.sets.remove(from);
        self.sets.insert(to, set);
        self.renumber()
    }

    /// Mutable access to one set.
    ///
    /// # Errors
    ///
    /// Returns `ExerciseError::SetOutOfRange` if there is no such set.
    pub fn set_mut(&mut self, index: usize) -> Result<&mut ExerciseSet, ExerciseError> {
        let len = self.sets.len();
        self.sets
            .get_mut(index)
            .ok_or(ExerciseError::SetOutOfRange { index, len })
    }

    /// Toggle completion of one set and return the new flag.
    ///
    /// # Errors
    ///
    /// Returns `ExerciseError::SetOutOfRange` if there is no such set.
    pub fn toggle_set(&mut self, index: usize) -> Result<bool, ExerciseError> {
        Ok(self.set_mut(index)?.toggle_complete())
    }

    /// Mark every set incomplete, keeping weights and reps.
    pub fn reset_completion(&mut self) {
        for set in &mut self.sets {
            set.set_complete(false);
        }
    }

    fn check_index(&self, index: usize) -> Result<(), ExerciseError> {
        if index < self.sets.len() {
            Ok(())
        } else {
            Err(ExerciseError::SetOutOfRange {
                index,
                len: self.sets.len(),
            })
        }
    }

    fn renumber(&mut self) -> Result<(), ExerciseError> {
        for (i, set) in self.sets.iter_mut().enumerate() {
            let index = u32::try_from(i).map_err(|_| ExerciseError::TooManySets(i))?;
            set.set_index(index);
        }
        Ok(())
    }
}

fn normalize_name(name: String) -> Result<String, ExerciseError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ExerciseError::EmptyName);
    }
    Ok(trimmed.to_owned())
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    fn exercise_with(pattern: &[bool]) -> Exercise {
        let sets = pattern
            .iter()
            .enumerate()
            .map(|(i, done)| {
                ExerciseSet::from_persisted(u32::try_from(i).unwrap(), Some(100.0), Some(5), *done)
                    .unwrap()
            })
            .collect();
        Exercise::from_persisted("Bench Press", sets, None).unwrap()
    }

    #[test]
    fn rejects_empty_name() {
        assert_eq!(Exercise::new("   ").unwrap_err(), ExerciseError::EmptyName);
    }

    #[test]
    fn current_set_defaults_to_first_when_nothing_done() {
        let exercise = exercise_with(&[false, false, false]);
        assert_eq!(exercise.current_set_index(), Some(0));
        assert_eq!(exercise.current_set().map(ExerciseSet::index), Some(0));
    }

    #[test]
    fn current_set_follows_completed_prefix() {
        let exercise = exercise_with(&[true, true, false]);
        assert_eq!(exercise.current_set_index(), Some(2));
    }

    #[test]
    fn current_set_prefers_leftmost_gap() {
        let exercise = exercise_with(&[true, true, false, true]);
        assert_eq!(exercise.current_set_index(), Some(2));
    }

    #[test]
    fn current_set_none_when_all_done_or_empty() {
        let exercise = exercise_with(&[true, true]);
        assert_eq!(exercise.current_set(), None);
        assert!(exercise.is_finished());

        let empty = Exercise::new("Squat").unwrap();
        assert_eq!(empty.current_set(), None);
        assert!(!empty.is_finished());
    }

    #[test]
    fn planned_exercise_has_incomplete_sets_with_target_reps() {
        let exercise = Exercise::planned("Row", 3, Some(8)).unwrap();
        assert_eq!(exercise.sets().len(), 3);
        for (i, set) in exercise.sets().iter().enumerate() {
            assert_eq!(set.index() as usize, i);
            assert_eq!(set.reps(), Some(8));
            assert_eq!(set.weight(), None);
            assert!(!set.is_complete());
        }
    }

    #[test]
    fn remove_and_move_keep_indices_contiguous() {
        let mut exercise = Exercise::planned("Deadlift", 4, Some(5)).unwrap();
        exercise.set_mut(3).unwrap().set_weight(Some(315.0)).unwrap();

        exercise.move_set(3, 0).unwrap();
        assert_eq!(exercise.sets()[0].weight(), Some(315.0));

        exercise.remove_set(1).unwrap();
        let indices: Vec<u32> = exercise.sets().iter().map(ExerciseSet::index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[test]
    fn out_of_range_set_is_rejected() {
        let mut exercise = Exercise::planned("Curl", 2, None).unwrap();
        assert_eq!(
            exercise.toggle_set(5).unwrap_err(),
            ExerciseError::SetOutOfRange { index: 5, len: 2 }
        );
        assert_eq!(exercise.sets().len(), 2);
    }

    #[test]
    fn add_set_carries_last_values() {
        let mut exercise = Exercise::planned("Press", 1, Some(5)).unwrap();
        exercise.set_mut(0).unwrap().set_weight(Some(95.0)).unwrap();
        exercise.toggle_set(0).unwrap();

        let added = exercise.add_set().unwrap();
        assert_eq!(added.index(), 1);
        assert_eq!(added.weight(), Some(95.0));
        assert!(!added.is_complete());
    }

    #[test]
    fn best_set_and_summary_line() {
        let sets = vec![
            ExerciseSet::from_persisted(0, Some(135.0), Some(5), true).unwrap(),
            ExerciseSet::from_persisted(1, Some(155.0), Some(3), true).unwrap(),
            ExerciseSet::from_persisted(2, Some(155.0), Some(2), true).unwrap(),
        ];
        let exercise = Exercise::from_persisted("Bench Press", sets, None).unwrap();
        assert_eq!(exercise.max_weight(), Some(155.0));
        assert_eq!(exercise.best_set().map(ExerciseSet::index), Some(1));
        assert_eq!(
            exercise.summary_line(WeightUnit::Lbs).as_deref(),
            Some("3x3 Bench Press - 155 lbs")
        );
    }

    #[test]
    fn summary_line_without_weights() {
        let exercise = Exercise::planned("Pull Up", 2, Some(10)).unwrap();
        assert_eq!(exercise.max_weight(), None);
        assert_eq!(
            exercise.summary_line(WeightUnit::Kg).as_deref(),
            Some("2x10 Pull Up")
        );
    }

    #[test]
    fn from_persisted_orders_sets_by_index() {
        let sets = vec![
            ExerciseSet::from_persisted(4, Some(2.0), None, false).unwrap(),
            ExerciseSet::from_persisted(1, Some(1.0), None, false).unwrap(),
        ];
        let exercise = Exercise::from_persisted("Lunge", sets, None).unwrap();
        assert_eq!(exercise.sets()[0].weight(), Some(1.0));
        assert_eq!(exercise.sets()[1].index(), 1);
    }
}
