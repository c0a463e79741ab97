mod exercise;
mod exercise_set;
mod hints;
mod ids;
mod progress;
mod settings;
mod template;
mod workout;

pub use ids::{ParseIdError, TemplateId, WorkoutId};

pub use exercise::{Exercise, ExerciseError};
pub use exercise_set::{ExerciseSet, format_weight, parse_weight, round_weight};
pub use hints::{SetHint, SetHints};
pub use progress::{ExerciseProgress, PROGRESS_WINDOW, ProgressPoint, ProgressSort};
pub use settings::{SettingsError, Theme, WeightUnit, WorkoutSettings};
pub use template::{Template, TemplateError, TemplateExercise};
pub use workout::{Workout, WorkoutError};
