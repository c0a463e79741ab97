use std::sync::Arc;

use storage::repository::Storage;

use crate::Clock;
use crate::error::AppServicesError;
use crate::events::EventBus;
use crate::progress::ProgressTracker;
use crate::sessions::SessionWorkflow;
use crate::settings_service::SettingsService;
use crate::template_service::TemplateService;
use crate::workout_service::WorkoutService;

/// Assembles app-facing services over one storage backend and event bus.
#[derive(Clone)]
pub struct AppServices {
    events: EventBus,
    workouts: Arc<WorkoutService>,
    sessions: Arc<SessionWorkflow>,
    templates: Arc<TemplateService>,
    settings: Arc<SettingsService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage and load saved settings.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization or the settings
    /// load fails.
    pub async fn new_sqlite(db_url: &str, clock: Clock) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        let services = Self::from_storage(&storage, clock);
        services.settings.load().await?;
        Ok(services)
    }

    /// Build services over already-initialized storage. Settings start at
    /// their defaults until `SettingsService::load` runs.
    #[must_use]
    pub fn from_storage(storage: &Storage, clock: Clock) -> Self {
        let events = EventBus::new();
        let workouts = Arc::new(WorkoutService::new(
            clock,
            Arc::clone(&storage.workouts),
            events.clone(),
        ));
        let sessions = Arc::new(SessionWorkflow::new(
            clock,
            Arc::clone(&storage.workouts),
            Arc::clone(&storage.templates),
            Arc::clone(&workouts),
            events.clone(),
        ));
        let templates = Arc::new(TemplateService::new(Arc::clone(&storage.templates)));
        let settings = Arc::new(SettingsService::new(Arc::clone(&storage.settings)));

        Self {
            events,
            workouts,
            sessions,
            templates,
            settings,
        }
    }

    #[must_use]
    pub fn in_memory(clock: Clock) -> Self {
        Self::from_storage(&Storage::in_memory(), clock)
    }

    #[must_use]
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    #[must_use]
    pub fn workouts(&self) -> Arc<WorkoutService> {
        Arc::clone(&self.workouts)
    }

    #[must_use]
    pub fn sessions(&self) -> Arc<SessionWorkflow> {
        Arc::clone(&self.sessions)
    }

    #[must_use]
    pub fn templates(&self) -> Arc<TemplateService> {
        Arc::clone(&self.templates)
    }

    #[must_use]
    pub fn settings(&self) -> Arc<SettingsService> {
        Arc::clone(&self.settings)
    }

    /// A fresh, empty tracker over this bundle's workout history. Call
    /// `recompute` to populate it and `follow` to keep it current.
    #[must_use]
    pub fn progress_tracker(&self) -> ProgressTracker {
        ProgressTracker::new(Arc::clone(&self.workouts))
    }
}
