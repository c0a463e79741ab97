use thiserror::Error;

use crate::model::exercise::{Exercise, ExerciseError};
use crate::model::hints::SetHints;
use crate::model::ids::TemplateId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TemplateError {
    #[error("template title cannot be empty")]
    EmptyTitle,

    #[error("template exercise name cannot be empty")]
    EmptyExerciseName,

    #[error("a template exercise needs at least one set")]
    InvalidSets,

    #[error("a template exercise needs at least one rep")]
    InvalidReps,

    #[error("template exercise {index} does not exist (template has {len} exercises)")]
    ExerciseOutOfRange { index: usize, len: usize },
}

/// Target prescription for one exercise of a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateExercise {
    name: String,
    sets: u32,
    reps: u32,
    index: u32,
}

impl TemplateExercise {
    /// # Errors
    ///
    /// Returns `TemplateError` if the name is empty or sets/reps are zero.
    pub fn new(name: impl Into<String>, sets: u32, reps: u32) -> Result<Self, TemplateError> {
        let name = name.into();
        let name = name.trim();
        if name.is_empty() {
            return Err(TemplateError::EmptyExerciseName);
        }
        check_targets(sets, reps)?;
        Ok(Self {
            name: name.to_owned(),
            sets,
            reps,
            index: 0,
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn sets(&self) -> u32 {
        self.sets
    }

    #[must_use]
    pub fn reps(&self) -> u32 {
        self.reps
    }

    #[must_use]
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Build the session exercise for this prescription: `sets` incomplete
    /// sets targeting `reps`, with weights carried over from the previous
    /// logged occurrence when there is one.
    ///
    /// # Errors
    ///
    /// Returns `ExerciseError` if a carried-over weight is invalid.
    pub fn instantiate(&self, previous: Option<&Exercise>) -> Result<Exercise, ExerciseError> {
        let mut exercise = Exercise::planned(&self.name, self.sets, Some(self.reps))?;
        let Some(previous) = previous else {
            return Ok(exercise);
        };
        for i in 0..exercise.sets().len() {
            let weight = SetHints::previous_set(previous, i).and_then(|set| set.weight());
            exercise.set_mut(i)?.set_weight(weight)?;
        }
        Ok(exercise)
    }
}

/// A reusable, ordered list of exercise prescriptions used to seed sessions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    id: Option<TemplateId>,
    title: String,
    exercises: Vec<TemplateExercise>,
}

impl Template {
    /// # Errors
    ///
    /// Returns `TemplateError::EmptyTitle` for an empty title.
    pub fn new(title: impl Into<String>) -> Result<Self, TemplateError> {
        Ok(Self {
            id: None,
            title: normalize_title(title.into())?,
            exercises: Vec::new(),
        })
    }

    /// Rehydrate a template from storage; exercises are ordered by their
    /// stored index and renumbered.
    ///
    /// # Errors
    ///
    /// Returns `TemplateError::EmptyTitle` for an empty stored title.
    pub fn from_persisted(
        id: TemplateId,
        title: impl Into<String>,
        mut exercises: Vec<TemplateExercise>,
        stored_order: &[u32],
    ) -> Result<Self, TemplateError> {
        for (exercise, index) in exercises.iter_mut().zip(stored_order) {
            exercise.index = *index;
        }
        exercises.sort_by_key(TemplateExercise::index);
        let mut template = Self {
            id: Some(id),
            title: normalize_title(title.into())?,
            exercises,
        };
        template.renumber();
        Ok(template)
    }

    #[must_use]
    pub fn id(&self) -> Option<TemplateId> {
        self.id
    }

    pub fn assign_id(&mut self, id: TemplateId) {
        self.id = Some(id);
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn exercises(&self) -> &[TemplateExercise] {
        &self.exercises
    }

    /// # Errors
    ///
    /// Returns `TemplateError::EmptyTitle` for an empty title.
    pub fn rename(&mut self, title: impl Into<String>) -> Result<(), TemplateError> {
        self.title = normalize_title(title.into())?;
        Ok(())
    }

    pub fn add_exercise(&mut self, exercise: TemplateExercise) {
        self.exercises.push(exercise);
        self.renumber();
    }

    /// Change the target sets and reps of one exercise.
    ///
    /// # Errors
    ///
    /// Returns `TemplateError` for an unknown position or zero targets.
    pub fn update_exercise(
        &mut self,
        index: usize,
        sets: u32,
        reps: u32,
    ) -> Result<(), TemplateError> {
        self.check_index(index)?;
        check_targets(sets, reps)?;
        let exercise = &mut self.exercises[index];
        exercise.sets = sets;
        exercise.reps = reps;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `TemplateError::ExerciseOutOfRange` for an unknown position.
    pub fn remove_exercise(&mut self, index: usize) -> Result<TemplateExercise, TemplateError> {
        self.check_index(index)?;
        let removed = self.exercises.remove(index);
        self.renumber();
        Ok(removed)
    }

    /// # Errors
    ///
    /// Returns `TemplateError::ExerciseOutOfRange` if either position is invalid.
    pub fn move_exercise(&mut self, from: usize, to: usize) -> Result<(), TemplateError> {
        self.check_index(from)?;
        self.check_index(to)?;
        let exercise = self.exercises.remove(from);
        self.exercises.insert(to, exercise);
        self.renumber();
        Ok(())
    }

    fn check_index(&self, index: usize) -> Result<(), TemplateError> {
        if index < self.exercises.len() {
            Ok(())
        } else {
            Err(TemplateError::ExerciseOutOfRange {
                index,
                len: self.exercises.len(),
            })
        }
    }

    fn renumber(&mut self) {
        for (i, exercise) in self.exercises.iter_mut().enumerate() {
            exercise.index = u32::try_from(i).unwrap_or(u32::MAX);
        }
    }
}

fn check_targets(sets: u32, reps: u32) -> Result<(), TemplateError> {
    if sets == 0 {
        return Err(TemplateError::InvalidSets);
    }
    if reps == 0 {
        return Err(TemplateError::InvalidReps);
    }
    Ok(())
}

fn normalize_title(title: String) -> Result<String, TemplateError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(TemplateError::EmptyTitle);
    }
    Ok(trimmed.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upper_body() -> Template {
        let mut template = Template::new("Upper").unwrap();
        template.add_exercise(TemplateExercise::new("Bench Press", 3, 5).unwrap());
        template.add_exercise(TemplateExercise::new("Row", 3, 8).unwrap());
        template.add_exercise(TemplateExercise::new("Curl", 2, 12).unwrap());
        template
    }

    fn indices(template: &Template) -> Vec<u32> {
        template.exercises().iter().map(TemplateExercise::index).collect()
    }

    #[test]
    fn rejects_zero_targets_and_empty_names() {
        assert_eq!(
            TemplateExercise::new("Row", 0, 8).unwrap_err(),
            TemplateError::InvalidSets
        );
        assert_eq!(
            TemplateExercise::new("Row", 3, 0).unwrap_err(),
            TemplateError::InvalidReps
        );
        assert_eq!(
            TemplateExercise::new(" ", 3, 8).unwrap_err(),
            TemplateError::EmptyExerciseName
        );
        assert_eq!(Template::new("").unwrap_err(), TemplateError::EmptyTitle);
    }

    #[test]
    fn edits_keep_indices_contiguous() {
        let mut template = upper_body();
        assert_eq!(indices(&template), vec![0, 1, 2]);

        template.move_exercise(2, 0).unwrap();
        assert_eq!(template.exercises()[0].name(), "Curl");
        assert_eq!(indices(&template), vec![0, 1, 2]);

        template.remove_exercise(1).unwrap();
        assert_eq!(indices(&template), vec![0, 1]);
        assert_eq!(template.exercises()[1].name(), "Row");
    }

    #[test]
    fn update_exercise_validates_targets() {
        let mut template = upper_body();
        template.update_exercise(1, 4, 10).unwrap();
        assert_eq!(template.exercises()[1].sets(), 4);
        assert_eq!(template.exercises()[1].reps(), 10);

        assert_eq!(
            template.update_exercise(1, 0, 10).unwrap_err(),
            TemplateError::InvalidSets
        );
        assert_eq!(
            template.update_exercise(9, 1, 1).unwrap_err(),
            TemplateError::ExerciseOutOfRange { index: 9, len: 3 }
        );
        assert_eq!(template.exercises()[1].sets(), 4);
    }

    #[test]
    fn instantiate_creates_incomplete_sets_at_target_reps() {
        let row = TemplateExercise::new("Row", 3, 8).unwrap();
        let exercise = row.instantiate(None).unwrap();
        assert_eq!(exercise.name(), "Row");
        assert_eq!(exercise.sets().len(), 3);
        assert!(exercise.sets().iter().all(|s| !s.is_complete()));
        assert!(exercise.sets().iter().all(|s| s.reps() == Some(8)));
        assert!(exercise.sets().iter().all(|s| s.weight().is_none()));
    }

    #[test]
    fn instantiate_carries_previous_weights() {
        let mut previous = Exercise::planned("Row", 2, Some(8)).unwrap();
        previous.set_mut(0).unwrap().set_weight(Some(95.0)).unwrap();
        previous.set_mut(1).unwrap().set_weight(Some(105.0)).unwrap();

        let row = TemplateExercise::new("Row", 3, 8).unwrap();
        let exercise = row.instantiate(Some(&previous)).unwrap();
        let weights: Vec<Option<f64>> = exercise.sets().iter().map(|s| s.weight()).collect();
        assert_eq!(weights, vec![Some(95.0), Some(105.0), Some(105.0)]);
        assert!(exercise.sets().iter().all(|s| s.reps() == Some(8)));
    }

    #[test]
    fn from_persisted_restores_stored_order() {
        let exercises = vec![
            TemplateExercise::new("Row", 3, 8).unwrap(),
            TemplateExercise::new("Bench Press", 3, 5).unwrap(),
        ];
        let template =
            Template::from_persisted(TemplateId::new(1), "Upper", exercises, &[5, 2]).unwrap();
        assert_eq!(template.exercises()[0].name(), "Bench Press");
        assert_eq!(indices(&template), vec![0, 1]);
    }
}
