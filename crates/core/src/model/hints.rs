use crate::model::exercise::Exercise;
use crate::model::exercise_set::{ExerciseSet, format_weight};
use crate::model::settings::WorkoutSettings;

/// Suggested values shown for a set the lifter has not filled in yet.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SetHint {
    pub weight: f64,
    pub reps: u32,
    /// True when the set at the same position last time recorded both weight
    /// and reps.
    pub from_same_row: bool,
}

impl SetHint {
    /// Text for the "previous" column: `135 x 5`, or `-` when the row had no
    /// fully recorded counterpart last time.
    #[must_use]
    pub fn previous_label(&self) -> String {
        if self.from_same_row {
            format!("{} x {}", format_weight(self.weight), self.reps)
        } else {
            "-".to_string()
        }
    }
}

/// Per-row hints derived from the most recent logged occurrence of an exercise.
#[derive(Debug, Clone, PartialEq)]
pub struct SetHints {
    previous: Vec<ExerciseSet>,
    default_weight: f64,
    default_reps: u32,
}

impl SetHints {
    #[must_use]
    pub fn new(previous: Option<&Exercise>, settings: &WorkoutSettings) -> Self {
        Self {
            previous: previous.map(|e| e.sets().to_vec()).unwrap_or_default(),
            default_weight: settings.default_weight_hint(),
            default_reps: settings.default_reps_hint(),
        }
    }

    /// Set of `previous` matching row `index`: the set at the same position,
    /// else the last one.
    #[must_use]
    pub fn previous_set(previous: &Exercise, index: usize) -> Option<&ExerciseSet> {
        previous.set(index).or_else(|| previous.sets().last())
    }

    #[must_use]
    pub fn has_previous(&self) -> bool {
        !self.previous.is_empty()
    }

    #[must_use]
    pub fn for_row(&self, index: usize) -> SetHint {
        let same_row = self.previous.get(index);
        let Some(set) = same_row.or_else(|| self.previous.last()) else {
            return SetHint {
                weight: self.default_weight,
                reps: self.default_reps,
                from_same_row: false,
            };
        };
        SetHint {
            weight: set.weight().unwrap_or(self.default_weight),
            reps: set.reps().unwrap_or(self.default_reps),
            from_same_row: same_row
                .is_some_and(|s| s.weight().is_some() && s.reps().is_some()),
        }
    }
}
