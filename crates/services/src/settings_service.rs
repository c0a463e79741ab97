use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::broadcast;

use lift_core::model::WorkoutSettings;
use storage::repository::SettingsRepository;

use crate::error::SettingsServiceError;

const SETTINGS_CHANNEL_CAPACITY: usize = 8;

/// Holds the current preferences and tells subscribers when they change.
pub struct SettingsService {
    repo: Arc<dyn SettingsRepository>,
    current: Mutex<WorkoutSettings>,
    changes: broadcast::Sender<WorkoutSettings>,
}

impl SettingsService {
    #[must_use]
    pub fn new(repo: Arc<dyn SettingsRepository>) -> Self {
        let (changes, _) = broadcast::channel(SETTINGS_CHANNEL_CAPACITY);
        Self {
            repo,
            current: Mutex::new(WorkoutSettings::default()),
            changes,
        }
    }

    /// Load persisted settings (or defaults if missing) into the cache.
    ///
    /// # Errors
    ///
    /// Returns `SettingsServiceError` on storage failures.
    pub async fn load(&self) -> Result<WorkoutSettings, SettingsServiceError> {
        let settings = self.repo.get_settings().await?.unwrap_or_default();
        self.store(settings);
        Ok(settings)
    }

    /// Last loaded or saved settings.
    #[must_use]
    pub fn current(&self) -> WorkoutSettings {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Persist new settings and notify subscribers.
    ///
    /// # Errors
    ///
    /// Returns `SettingsServiceError` if persistence fails; the cached value
    /// is left unchanged in that case.
    pub async fn save(&self, settings: WorkoutSettings) -> Result<(), SettingsServiceError> {
        self.repo.save_settings(&settings).await?;
        self.store(settings);
        if self.changes.send(settings).is_err() {
            tracing::debug!("settings changed with no subscribers");
        }
        Ok(())
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<WorkoutSettings> {
        self.changes.subscribe()
    }

    fn store(&self, settings: WorkoutSettings) {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = settings;
    }
}
