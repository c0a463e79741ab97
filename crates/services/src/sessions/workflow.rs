use std::sync::Arc;

use lift_core::model::{Exercise, SetHints, TemplateId, Workout, WorkoutId, WorkoutSettings};
use storage::repository::{TemplateRepository, WorkoutRepository};

use super::active::{ActiveSession, SessionSource};
use crate::Clock;
use crate::error::{SessionError, WorkoutServiceError};
use crate::events::{EventBus, WorkoutEvent};
use crate::workout_service::WorkoutService;

/// Starts live sessions from templates, plans or scratch, and logs them.
#[derive(Clone)]
pub struct SessionWorkflow {
    clock: Clock,
    workouts: Arc<dyn WorkoutRepository>,
    templates: Arc<dyn TemplateRepository>,
    history: Arc<WorkoutService>,
    events: EventBus,
}

impl SessionWorkflow {
    #[must_use]
    pub fn new(
        clock: Clock,
        workouts: Arc<dyn WorkoutRepository>,
        templates: Arc<dyn TemplateRepository>,
        history: Arc<WorkoutService>,
        events: EventBus,
    ) -> Self {
        Self {
            clock,
            workouts,
            templates,
            history,
            events,
        }
    }

    /// Build a session from a template. Reps come from the template, weights
    /// from the last logged occurrence of each exercise.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::SourceNotFound` for an unknown template, or a
    /// storage error if history lookups fail.
    pub async fn start_from_template(
        &self,
        id: TemplateId,
        settings: &WorkoutSettings,
    ) -> Result<ActiveSession, SessionError> {
        let template = self
            .templates
            .get_template(id)
            .await?
            .ok_or(SessionError::SourceNotFound)?;

        let mut workout = Workout::new(template.title())?;
        let mut hints = Vec::with_capacity(template.exercises().len());
        for planned in template.exercises() {
            let previous = self.history.previous_for_name(planned.name(), None).await?;
            workout.add_exercise(planned.instantiate(previous.as_ref())?)?;
            hints.push(SetHints::new(previous.as_ref(), settings));
        }

        tracing::debug!(%id, exercises = hints.len(), "session started from template");
        Ok(self.open(workout, hints, SessionSource::Template(id)))
    }

    /// Clone a plan into a fresh session. The plan itself stays untouched.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::SourceNotFound` for an unknown workout,
    /// `WorkoutServiceError::NotAPlan` for a logged one, or a storage error.
    pub async fn start_from_plan(
        &self,
        id: WorkoutId,
        settings: &WorkoutSettings,
    ) -> Result<ActiveSession, SessionError> {
        let plan = self
            .workouts
            .get_workout(id)
            .await?
            .ok_or(SessionError::SourceNotFound)?;
        if plan.is_logged() {
            return Err(WorkoutServiceError::NotAPlan.into());
        }

        let workout = plan.clone_as_session();
        let mut hints = Vec::with_capacity(workout.exercises().len());
        for exercise in workout.exercises() {
            let previous = self.history.previous_for_name(exercise.name(), None).await?;
            hints.push(SetHints::new(previous.as_ref(), settings));
        }

        tracing::debug!(%id, "session started from plan");
        Ok(self.open(workout, hints, SessionSource::Plan(id)))
    }

    /// # Errors
    ///
    /// Returns `SessionError::Workout` for an empty title.
    pub fn start_blank(&self, title: &str) -> Result<ActiveSession, SessionError> {
        let workout = Workout::new(title)?;
        Ok(self.open(workout, Vec::new(), SessionSource::Blank))
    }

    /// Add an exercise to a live session with one set pre-filled from its
    /// previous occurrence, when there is one.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` for an empty name, a finished session, or a
    /// failed history lookup.
    pub async fn add_exercise(
        &self,
        session: &mut ActiveSession,
        name: &str,
        settings: &WorkoutSettings,
    ) -> Result<(), SessionError> {
        let mut exercise = Exercise::new(name)?;
        let previous = self.history.previous_for_name(exercise.name(), None).await?;
        let hints = SetHints::new(previous.as_ref(), settings);

        exercise.add_set()?;
        if let Some(set) = previous.as_ref().and_then(|p| SetHints::previous_set(p, 0)) {
            let first = exercise.set_mut(0)?;
            first.set_weight(set.weight())?;
            first.set_reps(set.reps());
        }
        session.push_exercise(exercise, hints)
    }

    /// Log the session: stamp it with the current time and persist it.
    ///
    /// On a storage failure the session stays open so the lifter can retry.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::AlreadyFinished`, `SessionError::Empty`, or
    /// `SessionError::Storage` if the insert fails.
    pub async fn finish(&self, session: &mut ActiveSession) -> Result<Workout, SessionError> {
        if session.is_finished() {
            return Err(SessionError::AlreadyFinished);
        }
        if session.exercises().is_empty() {
            return Err(SessionError::Empty);
        }

        let mut logged = session.workout().clone();
        logged.mark_logged(self.clock.now())?;
        let id = match self.workouts.insert_workout(&logged).await {
            Ok(id) => id,
            Err(err) => {
                tracing::warn!(error = %err, title = logged.title(), "failed to log session");
                return Err(err.into());
            }
        };
        logged.assign_id(id);
        session.mark_finished(id);

        self.events.publish(WorkoutEvent::WorkoutCreated { id });
        self.events.publish(WorkoutEvent::SessionFinished {
            workout: logged.clone(),
        });
        tracing::info!(
            %id,
            title = logged.title(),
            exercises = logged.exercises().len(),
            "session logged"
        );
        Ok(logged)
    }

    fn open(
        &self,
        workout: Workout,
        hints: Vec<SetHints>,
        source: SessionSource,
    ) -> ActiveSession {
        ActiveSession::new(
            workout,
            hints,
            source,
            self.clock.now(),
            self.events.clone(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lift_core::model::{Template, TemplateExercise};
    use lift_core::time::fixed_clock;
    use storage::repository::{InMemoryRepository, Storage};

    fn workflow(repo: &InMemoryRepository) -> SessionWorkflow {
        let storage = Storage::from_in_memory(repo);
        let events = EventBus::new();
        let history = Arc::new(WorkoutService::new(
            fixed_clock(),
            storage.workouts.clone(),
            events.clone(),
        ));
        SessionWorkflow::new(
            fixed_clock(),
            storage.workouts,
            storage.templates,
            history,
            events,
        )
    }

    #[tokio::test]
    async fn finish_rejects_empty_and_repeat_finishes() {
        let repo = InMemoryRepository::new();
        let flow = workflow(&repo);

        let mut session = flow.start_blank("Quick").unwrap();
        assert!(matches!(
            flow.finish(&mut session).await,
            Err(SessionError::Empty)
        ));

        let settings = WorkoutSettings::default();
        flow.add_exercise(&mut session, "Curl", &settings).await.unwrap();
        let logged = flow.finish(&mut session).await.unwrap();
        assert!(logged.is_logged());
        assert_eq!(session.logged_id(), logged.id());
        assert!(matches!(
            flow.finish(&mut session).await,
            Err(SessionError::AlreadyFinished)
        ));
    }

    #[tokio::test]
    async fn unknown_sources_are_reported() {
        let repo = InMemoryRepository::new();
        let flow = workflow(&repo);
        let settings = WorkoutSettings::default();

        assert!(matches!(
            flow.start_from_template(TemplateId::new(9), &settings).await,
            Err(SessionError::SourceNotFound)
        ));
        assert!(matches!(
            flow.start_from_plan(WorkoutId::new(9), &settings).await,
            Err(SessionError::SourceNotFound)
        ));
    }

    #[tokio::test]
    async fn template_without_history_uses_default_hints() {
        let repo = InMemoryRepository::new();
        let flow = workflow(&repo);

        let mut template = Template::new("Pull").unwrap();
        template.add_exercise(TemplateExercise::new("Row", 3, 8).unwrap());
        let id = repo.insert_template(&template).await.unwrap();

        let session = flow
            .start_from_template(id, &WorkoutSettings::default())
            .await
            .unwrap();
        let row = &session.exercises()[0];
        assert_eq!(row.sets().len(), 3);
        assert!(row.sets().iter().all(|s| s.weight().is_none()));
        assert!(row.sets().iter().all(|s| s.reps() == Some(8)));

        let hint = session.hint(0, 2).unwrap();
        assert_eq!((hint.weight, hint.reps), (135.0, 5));
        assert_eq!(hint.previous_label(), "-");
        assert_eq!(session.source(), SessionSource::Template(id));
    }
}
