use std::cmp::Ordering;
use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::exercise::Exercise;
use crate::model::ids::WorkoutId;
use crate::model::settings::SettingsError;

/// Number of recent sessions kept per exercise.
pub const PROGRESS_WINDOW: usize = 7;

/// Best set of one logged session for a given exercise.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProgressPoint {
    /// Logged workout the point was taken from; `None` before it is persisted.
    pub workout_id: Option<WorkoutId>,
    pub completed_at: DateTime<Utc>,
    pub weight: f64,
    pub reps: Option<u32>,
}

impl ProgressPoint {
    /// Point for the heaviest set of `exercise`, if any set has a weight.
    #[must_use]
    pub fn from_exercise(exercise: &Exercise, completed_at: DateTime<Utc>) -> Option<Self> {
        let best = exercise.best_set()?;
        Some(Self {
            workout_id: exercise.workout_id(),
            completed_at,
            weight: best.weight()?,
            reps: best.reps(),
        })
    }

    /// Position of the point in session order.
    fn session_key(&self) -> (DateTime<Utc>, Option<WorkoutId>) {
        (self.completed_at, self.workout_id)
    }
}

/// Progress summary for one exercise name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseProgress {
    name: String,
    recent: VecDeque<ProgressPoint>,
    best_lift: f64,
    last_updated: DateTime<Utc>,
}

impl ExerciseProgress {
    #[must_use]
    pub fn new(name: impl Into<String>, last_updated: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            recent: VecDeque::with_capacity(PROGRESS_WINDOW),
            best_lift: 0.0,
            last_updated,
        }
    }

    /// Rebuild from a full history; only the newest `PROGRESS_WINDOW` points
    /// are kept. `points` must be ordered oldest to newest.
    #[must_use]
    pub fn from_history(
        name: impl Into<String>,
        best_lift: f64,
        points: &[ProgressPoint],
        last_updated: DateTime<Utc>,
    ) -> Self {
        let skip = points.len().saturating_sub(PROGRESS_WINDOW);
        Self {
            name: name.into(),
            recent: points[skip..].iter().copied().collect(),
            best_lift,
            last_updated,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Recent points, oldest first.
    pub fn recent(&self) -> impl Iterator<Item = &ProgressPoint> {
        self.recent.iter()
    }

    #[must_use]
    pub fn recent_weights(&self) -> Vec<f64> {
        self.recent.iter().map(|p| p.weight).collect()
    }

    #[must_use]
    pub fn best_lift(&self) -> f64 {
        self.best_lift
    }

    #[must_use]
    pub fn last_updated(&self) -> DateTime<Utc> {
        self.last_updated
    }

    /// Weight of the newest point, or 0 without history.
    #[must_use]
    pub fn latest_lift(&self) -> f64 {
        self.recent.back().map_or(0.0, |p| p.weight)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.recent.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.recent.is_empty()
    }

    /// Append a point newer than every point in the window, evicting the
    /// oldest past capacity. The best lift only ever grows here.
    ///
    /// Returns `false` and leaves the entry unchanged when the point is not
    /// newer than the window's newest, e.g. a session already folded in by a
    /// full rebuild.
    pub fn push(&mut self, point: ProgressPoint) -> bool {
        if self
            .recent
            .back()
            .is_some_and(|newest| point.session_key() <= newest.session_key())
        {
            return false;
        }
        if self.recent.len() == PROGRESS_WINDOW {
            self.recent.pop_front();
        }
        self.recent.push_back(point);
        self.best_lift = self.best_lift.max(point.weight);
        self.touch(point.completed_at);
        true
    }

    /// Record a session that had no weighted set for this exercise.
    /// `last_updated` never moves backwards.
    pub fn touch(&mut self, at: DateTime<Utc>) {
        self.last_updated = self.last_updated.max(at);
    }
}

//
// ─── SORTING ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressSort {
    #[default]
    Alphabetical,
    Weight,
    Recent,
}

impl ProgressSort {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ProgressSort::Alphabetical => "alphabetical",
            ProgressSort::Weight => "weight",
            ProgressSort::Recent => "recent",
        }
    }

    /// Ordering used by progress listings; names break ties.
    #[must_use]
    pub fn compare(self, a: &ExerciseProgress, b: &ExerciseProgress) -> Ordering {
        let primary = match self {
            ProgressSort::Alphabetical => Ordering::Equal,
            ProgressSort::Weight => b.best_lift.total_cmp(&a.best_lift),
            ProgressSort::Recent => b.last_updated.cmp(&a.last_updated),
        };
        primary.then_with(|| a.name.cmp(&b.name))
    }
}

impl fmt::Display for ProgressSort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProgressSort {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "alphabetical" | "name" => Ok(ProgressSort::Alphabetical),
            "weight" => Ok(ProgressSort::Weight),
            "recent" => Ok(ProgressSort::Recent),
            other => Err(SettingsError::UnknownSort(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::exercise_set::ExerciseSet;
    use crate::time::fixed_now;
    use chrono::Duration;

    fn point(day: i64, weight: f64) -> ProgressPoint {
        ProgressPoint {
            workout_id: Some(WorkoutId::new(u64::try_from(day).unwrap() + 1)),
            completed_at: fixed_now() + Duration::days(day),
            weight,
            reps: Some(5),
        }
    }

    #[test]
    fn window_evicts_oldest_and_best_lift_is_monotonic() {
        let mut progress = ExerciseProgress::new("Squat", fixed_now());
        for day in 0..10 {
            progress.push(point(day, 200.0 + day as f64));
        }
        progress.push(point(10, 150.0));

        assert_eq!(progress.len(), PROGRESS_WINDOW);
        assert_eq!(progress.recent_weights()[0], 204.0);
        assert_eq!(progress.best_lift(), 209.0);
        assert_eq!(progress.latest_lift(), 150.0);
        assert_eq!(progress.last_updated(), fixed_now() + Duration::days(10));
    }

    #[test]
    fn push_ignores_sessions_already_in_window() {
        let points: Vec<_> = (0..3).map(|d| point(d, 100.0 + d as f64)).collect();
        let mut progress = ExerciseProgress::from_history("Row", 102.0, &points, fixed_now());

        assert!(!progress.push(point(2, 102.0)));
        assert!(!progress.push(point(1, 180.0)));
        assert_eq!(progress.recent_weights(), vec![100.0, 101.0, 102.0]);
        assert_eq!(progress.best_lift(), 102.0);

        assert!(progress.push(point(3, 90.0)));
        assert_eq!(progress.len(), 4);
    }

    #[test]
    fn same_time_sessions_order_by_workout_id() {
        let mut progress = ExerciseProgress::new("Curl", fixed_now());
        let mut first = point(0, 40.0);
        let mut second = point(0, 45.0);
        first.workout_id = Some(WorkoutId::new(3));
        second.workout_id = Some(WorkoutId::new(4));

        assert!(progress.push(first));
        assert!(progress.push(second));
        assert!(!progress.push(first));
        assert_eq!(progress.recent_weights(), vec![40.0, 45.0]);
    }

    #[test]
    fn from_history_keeps_newest_points() {
        let points: Vec<_> = (0..9).map(|d| point(d, 100.0 + d as f64)).collect();
        let progress = ExerciseProgress::from_history("Row", 108.0, &points, fixed_now());
        assert_eq!(progress.len(), PROGRESS_WINDOW);
        assert_eq!(progress.recent().next().map(|p| p.weight), Some(102.0));
    }

    #[test]
    fn point_uses_best_set() {
        let sets = vec![
            ExerciseSet::from_persisted(0, Some(100.0), Some(8), true).unwrap(),
            ExerciseSet::from_persisted(1, Some(120.0), Some(3), true).unwrap(),
        ];
        let exercise = Exercise::from_persisted("Press", sets, None).unwrap();
        let p = ProgressPoint::from_exercise(&exercise, fixed_now()).unwrap();
        assert_eq!((p.weight, p.reps), (120.0, Some(3)));

        let unweighted = Exercise::planned("Dip", 2, Some(10)).unwrap();
        assert!(ProgressPoint::from_exercise(&unweighted, fixed_now()).is_none());
    }

    #[test]
    fn sorts_by_weight_then_name() {
        let mut a = ExerciseProgress::new("Bench", fixed_now());
        a.push(point(0, 200.0));
        let mut b = ExerciseProgress::new("Squat", fixed_now());
        b.push(point(1, 300.0));
        let c = ExerciseProgress::new("Curl", fixed_now());

        let mut rows = vec![a, b, c];
        rows.sort_by(|x, y| ProgressSort::Weight.compare(x, y));
        let names: Vec<&str> = rows.iter().map(ExerciseProgress::name).collect();
        assert_eq!(names, vec!["Squat", "Bench", "Curl"]);

        rows.sort_by(|x, y| ProgressSort::Recent.compare(x, y));
        assert_eq!(rows[0].name(), "Squat");

        rows.sort_by(|x, y| ProgressSort::Alphabetical.compare(x, y));
        assert_eq!(rows[0].name(), "Bench");
    }
}
