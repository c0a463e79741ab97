use chrono::{DateTime, Duration, Utc};

use lift_core::model::{
    Exercise, ExerciseSet, SetHint, SetHints, TemplateId, WeightUnit, Workout, WorkoutId,
    WorkoutSettings, round_weight,
};

use crate::error::SessionError;
use crate::events::{EventBus, WorkoutEvent};

/// Where a live session was cloned from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionSource {
    Template(TemplateId),
    Plan(WorkoutId),
    Blank,
}

//
// ─── ACTIVE SESSION ────────────────────────────────────────────────────────────
//

/// A workout being performed right now.
///
/// Edits stay in memory until `SessionWorkflow::finish` logs the session.
/// Hints are kept per exercise, parallel to the workout's exercise list.
pub struct ActiveSession {
    workout: Workout,
    hints: Vec<SetHints>,
    source: SessionSource,
    started_at: DateTime<Utc>,
    logged_id: Option<WorkoutId>,
    events: EventBus,
}

impl ActiveSession {
    pub(crate) fn new(
        workout: Workout,
        hints: Vec<SetHints>,
        source: SessionSource,
        started_at: DateTime<Utc>,
        events: EventBus,
    ) -> Self {
        Self {
            workout,
            hints,
            source,
            started_at,
            logged_id: None,
            events,
        }
    }

    #[must_use]
    pub fn workout(&self) -> &Workout {
        &self.workout
    }

    #[must_use]
    pub fn exercises(&self) -> &[Exercise] {
        self.workout.exercises()
    }

    #[must_use]
    pub fn source(&self) -> SessionSource {
        self.source
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn elapsed(&self, now: DateTime<Utc>) -> Duration {
        (now - self.started_at).max(Duration::zero())
    }

    /// Id of the logged workout once the session has been finished.
    #[must_use]
    pub fn logged_id(&self) -> Option<WorkoutId> {
        self.logged_id
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.logged_id.is_some()
    }

    pub(crate) fn mark_finished(&mut self, id: WorkoutId) {
        self.logged_id = Some(id);
    }

    /// Set the lifter should focus on next in the given exercise.
    #[must_use]
    pub fn current_set(&self, exercise: usize) -> Option<&ExerciseSet> {
        self.workout.exercise(exercise)?.current_set()
    }

    #[must_use]
    pub fn hint(&self, exercise: usize, set: usize) -> Option<SetHint> {
        self.hints.get(exercise).map(|h| h.for_row(set))
    }

    /// Summary lines for every exercise, e.g. `3x5 Bench Press - 135 lbs`.
    #[must_use]
    pub fn summary_lines(&self, unit: WeightUnit) -> Vec<String> {
        self.exercises()
            .iter()
            .filter_map(|e| e.summary_line(unit))
            .collect()
    }

    /// # Errors
    ///
    /// Returns `SessionError::AlreadyFinished` once the session is logged, or
    /// a lookup error for unknown positions.
    pub fn toggle_set(&mut self, exercise: usize, set: usize) -> Result<bool, SessionError> {
        let done = self.exercise_mut(exercise)?.toggle_set(set)?;
        self.notify(exercise);
        Ok(done)
    }

    /// Apply weight text typed by the lifter. Invalid text leaves the set as it was.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Exercise` for invalid text or unknown positions.
    pub fn set_weight_text(
        &mut self,
        exercise: usize,
        set: usize,
        text: &str,
    ) -> Result<(), SessionError> {
        self.exercise_mut(exercise)?
            .set_mut(set)?
            .set_weight_text(text)?;
        self.notify(exercise);
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `SessionError::Exercise` for invalid text or unknown positions.
    pub fn set_reps_text(
        &mut self,
        exercise: usize,
        set: usize,
        text: &str,
    ) -> Result<(), SessionError> {
        self.exercise_mut(exercise)?
            .set_mut(set)?
            .set_reps_text(text)?;
        self.notify(exercise);
        Ok(())
    }

    /// Step the weight by one increment of the configured unit, starting
    /// from the entered weight or, when empty, the hint. Never goes below 0.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` for unknown positions or a finished session.
    pub fn step_weight(
        &mut self,
        exercise: usize,
        set: usize,
        up: bool,
        settings: &WorkoutSettings,
    ) -> Result<f64, SessionError> {
        let hint = self.hint(exercise, set);
        let target = self.exercise_mut(exercise)?.set_mut(set)?;
        let base = target
            .weight()
            .or(hint.map(|h| h.weight))
            .unwrap_or(0.0);
        let delta = if up {
            settings.weight_increment()
        } else {
            -settings.weight_increment()
        };
        let next = round_weight((base + delta).max(0.0));
        target.set_weight(Some(next))?;
        self.notify(exercise);
        Ok(next)
    }

    /// Step reps by one, starting from the entered value or the hint.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` for unknown positions or a finished session.
    pub fn step_reps(&mut self, exercise: usize, set: usize, up: bool) -> Result<u32, SessionError> {
        let hint = self.hint(exercise, set);
        let target = self.exercise_mut(exercise)?.set_mut(set)?;
        let base = target.reps().or(hint.map(|h| h.reps)).unwrap_or(0);
        let next = if up {
            base.saturating_add(1)
        } else {
            base.saturating_sub(1)
        };
        target.set_reps(Some(next));
        self.notify(exercise);
        Ok(next)
    }

    /// Append a set carrying over the previous set's values.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` for unknown positions or a finished session.
    pub fn add_set(&mut self, exercise: usize) -> Result<usize, SessionError> {
        let index = self.exercise_mut(exercise)?.add_set()?.index();
        self.notify(exercise);
        Ok(index as usize)
    }

    /// # Errors
    ///
    /// Returns `SessionError` for unknown positions or a finished session.
    pub fn remove_set(&mut self, exercise: usize, set: usize) -> Result<(), SessionError> {
        self.exercise_mut(exercise)?.remove_set(set)?;
        self.notify(exercise);
        Ok(())
    }

    /// Add an exercise with its hints (see `SessionWorkflow::add_exercise`).
    ///
    /// # Errors
    ///
    /// Returns `SessionError::AlreadyFinished` once the session is logged.
    pub fn push_exercise(&mut self, exercise: Exercise, hints: SetHints) -> Result<(), SessionError> {
        self.ensure_open()?;
        self.workout.add_exercise(exercise)?;
        self.hints.push(hints);
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `SessionError` for unknown positions or a finished session.
    pub fn remove_exercise(&mut self, exercise: usize) -> Result<Exercise, SessionError> {
        self.ensure_open()?;
        let removed = self.workout.remove_exercise(exercise)?;
        self.hints.remove(exercise);
        Ok(removed)
    }

    /// # Errors
    ///
    /// Returns `SessionError` for unknown positions or a finished session.
    pub fn move_exercise(&mut self, from: usize, to: usize) -> Result<(), SessionError> {
        self.ensure_open()?;
        self.workout.move_exercise(from, to)?;
        let hints = self.hints.remove(from);
        self.hints.insert(to, hints);
        Ok(())
    }

    fn ensure_open(&self) -> Result<(), SessionError> {
        if self.is_finished() {
            Err(SessionError::AlreadyFinished)
        } else {
            Ok(())
        }
    }

    fn exercise_mut(&mut self, exercise: usize) -> Result<&mut Exercise, SessionError> {
        self.ensure_open()?;
        Ok(self.workout.exercise_mut(exercise)?)
    }

    fn notify(&self, index: usize) {
        if let Some(exercise) = self.workout.exercise(index) {
            self.events.publish(WorkoutEvent::ExerciseUpdated {
                exercise: exercise.name().to_owned(),
                index,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lift_core::time::fixed_now;

    fn session_with(previous: Option<&Exercise>, settings: &WorkoutSettings) -> ActiveSession {
        let mut workout = Workout::new("Push").unwrap();
        workout
            .add_exercise(Exercise::planned("Bench Press", 3, Some(5)).unwrap())
            .unwrap();
        ActiveSession::new(
            workout,
            vec![SetHints::new(previous, settings)],
            SessionSource::Blank,
            fixed_now(),
            EventBus::new(),
        )
    }

    #[test]
    fn current_set_tracks_leftmost_gap() {
        let mut session = session_with(None, &WorkoutSettings::default());
        assert_eq!(session.current_set(0).map(ExerciseSet::index), Some(0));

        session.toggle_set(0, 0).unwrap();
        session.toggle_set(0, 2).unwrap();
        assert_eq!(session.current_set(0).map(ExerciseSet::index), Some(1));

        session.toggle_set(0, 1).unwrap();
        assert!(session.current_set(0).is_none());
        assert!(session.current_set(7).is_none());
    }

    #[test]
    fn step_weight_starts_from_hint_and_clamps_at_zero() {
        let settings = WorkoutSettings::default();
        let mut session = session_with(None, &settings);

        assert_eq!(session.step_weight(0, 0, true, &settings).unwrap(), 140.0);
        assert_eq!(session.step_weight(0, 0, false, &settings).unwrap(), 135.0);

        session.set_weight_text(0, 1, "2.5").unwrap();
        assert_eq!(session.step_weight(0, 1, false, &settings).unwrap(), 0.0);
        assert_eq!(session.step_weight(0, 1, false, &settings).unwrap(), 0.0);
    }

    #[test]
    fn kg_steps_use_smaller_increment() {
        let settings = WorkoutSettings {
            weight_unit: WeightUnit::Kg,
            ..WorkoutSettings::default()
        };
        let mut session = session_with(None, &settings);
        assert_eq!(session.step_weight(0, 0, true, &settings).unwrap(), 62.5);
        assert_eq!(session.step_reps(0, 0, false).unwrap(), 4);
    }

    #[test]
    fn invalid_text_is_rejected_without_change() {
        let mut session = session_with(None, &WorkoutSettings::default());
        session.set_weight_text(0, 0, "100").unwrap();
        assert!(matches!(
            session.set_weight_text(0, 0, "abc"),
            Err(SessionError::Exercise(_))
        ));
        assert_eq!(session.exercises()[0].sets()[0].weight(), Some(100.0));
    }

    #[test]
    fn finished_session_rejects_edits() {
        let mut session = session_with(None, &WorkoutSettings::default());
        session.mark_finished(WorkoutId::new(4));
        assert!(matches!(
            session.toggle_set(0, 0),
            Err(SessionError::AlreadyFinished)
        ));
        assert!(matches!(session.add_set(0), Err(SessionError::AlreadyFinished)));
    }

    #[test]
    fn elapsed_counts_from_start_and_never_goes_negative() {
        let session = session_with(None, &WorkoutSettings::default());
        let later = fixed_now() + Duration::minutes(42);
        assert_eq!(session.elapsed(later), Duration::minutes(42));
        assert_eq!(session.elapsed(fixed_now() - Duration::hours(1)), Duration::zero());
    }

    #[test]
    fn summary_skips_exercises_without_sets() {
        let settings = WorkoutSettings::default();
        let mut session = session_with(None, &settings);
        for set in 0..3 {
            session.set_weight_text(0, set, "135").unwrap();
        }
        for exercise in [
            Exercise::planned("Plank", 1, None).unwrap(),
            Exercise::new("Stretch").unwrap(),
        ] {
            session
                .push_exercise(exercise, SetHints::new(None, &settings))
                .unwrap();
        }

        assert_eq!(
            session.summary_lines(WeightUnit::Lbs),
            vec!["3x5 Bench Press - 135 lbs", "1x- Plank"]
        );
    }

    #[tokio::test]
    async fn edits_publish_exercise_updates() {
        let mut session = session_with(None, &WorkoutSettings::default());
        let mut rx = session.events.subscribe();
        session.add_set(0).unwrap();
        assert_eq!(
            rx.recv().await.unwrap(),
            WorkoutEvent::ExerciseUpdated {
                exercise: "Bench Press".into(),
                index: 0
            }
        );
        assert_eq!(session.exercises()[0].sets().len(), 4);
    }
}
