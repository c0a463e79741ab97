//! Shared error types for the services crate.

use thiserror::Error;

use lift_core::model::{ExerciseError, TemplateError, WorkoutError};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by `WorkoutService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum WorkoutServiceError {
    #[error("cannot move workout from {from} to {to} (list has {len} workouts)")]
    InvalidPosition { from: usize, to: usize, len: usize },
    #[error("logged workouts cannot be edited as plans")]
    NotAPlan,
    #[error(transparent)]
    Workout(#[from] WorkoutError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by live sessions and `SessionWorkflow`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("session already finished")]
    AlreadyFinished,
    #[error("session has no exercises")]
    Empty,
    #[error("template or plan not found")]
    SourceNotFound,
    #[error(transparent)]
    Exercise(#[from] ExerciseError),
    #[error(transparent)]
    Workout(#[from] WorkoutError),
    #[error(transparent)]
    Lookup(#[from] WorkoutServiceError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `TemplateService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TemplateServiceError {
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `SettingsService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SettingsServiceError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Settings(#[from] SettingsServiceError),
}
