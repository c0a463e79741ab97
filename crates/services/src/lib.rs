#![forbid(unsafe_code)]

pub mod app_services;
pub mod error;
pub mod events;
pub mod progress;
pub mod sessions;
pub mod settings_service;
pub mod template_service;
pub mod workout_service;

pub use lift_core::Clock;

pub use app_services::AppServices;
pub use error::{
    AppServicesError, SessionError, SettingsServiceError, TemplateServiceError,
    WorkoutServiceError,
};
pub use events::{EventBus, WorkoutEvent};
pub use progress::{ProgressTracker, compute_progress};
pub use sessions::{ActiveSession, SessionSource, SessionWorkflow};
pub use settings_service::SettingsService;
pub use template_service::TemplateService;
pub use workout_service::{LoggedSet, ProgressData, WorkoutService};
