use crate::model::exercise::ExerciseError;

/// One recorded attempt within an exercise.
///
/// Weight and reps are optional: a freshly planned set has neither until the
/// lifter fills them in.
#[derive(Debug, Clone, PartialEq)]
pub struct ExerciseSet {
    index: u32,
    weight: Option<f64>,
    reps: Option<u32>,
    is_complete: bool,
}

impl ExerciseSet {
    /// Creates an empty, incomplete set at the given position.
    #[must_use]
    pub fn new(index: u32) -> Self {
        Self {
            index,
            weight: None,
            reps: None,
            is_complete: false,
        }
    }

    /// Creates an incomplete set with pre-filled values.
    ///
    /// # Errors
    ///
    /// Returns `ExerciseError::InvalidWeight` if the weight is negative or not finite.
    pub fn with_values(
        index: u32,
        weight: Option<f64>,
        reps: Option<u32>,
    ) -> Result<Self, ExerciseError> {
        Ok(Self {
            index,
            weight: validate_weight(weight)?,
            reps,
            is_complete: false,
        })
    }

    /// Rehydrate a set from storage.
    ///
    /// # Errors
    ///
    /// Returns `ExerciseError::InvalidWeight` if the stored weight is invalid.
    pub fn from_persisted(
        index: u32,
        weight: Option<f64>,
        reps: Option<u32>,
        is_complete: bool,
    ) -> Result<Self, ExerciseError> {
        let mut set = Self::with_values(index, weight, reps)?;
        set.is_complete = is_complete;
        Ok(set)
    }

    #[must_use]
    pub fn index(&self) -> u32 {
        self.index
    }

    #[must_use]
    pub fn weight(&self) -> Option<f64> {
        self.weight
    }

    #[must_use]
    pub fn reps(&self) -> Option<u32> {
        self.reps
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.is_complete
    }

    /// Compact weight text (`135`, `62.5`), or an empty string when unset.
    #[must_use]
    pub fn weight_label(&self) -> String {
        self.weight.map(format_weight).unwrap_or_default()
    }

    /// # Errors
    ///
    /// Returns `ExerciseError::InvalidWeight` if the weight is negative or not finite.
    pub fn set_weight(&mut self, weight: Option<f64>) -> Result<(), ExerciseError> {
        self.weight = validate_weight(weight)?;
        Ok(())
    }

    pub fn set_reps(&mut self, reps: Option<u32>) {
        self.reps = reps;
    }

    /// Parse user-entered weight text. Empty text clears the weight.
    ///
    /// # Errors
    ///
    /// Returns `ExerciseError::InvalidWeight` and leaves the set unchanged if the
    /// text is not a non-negative decimal.
    pub fn set_weight_text(&mut self, text: &str) -> Result<(), ExerciseError> {
        let weight = parse_weight(text)?;
        self.weight = weight;
        Ok(())
    }

    /// Parse user-entered reps text. Empty text clears the reps.
    ///
    /// # Errors
    ///
    /// Returns `ExerciseError::InvalidReps` and leaves the set unchanged if the
    /// text is not a non-negative integer.
    pub fn set_reps_text(&mut self, text: &str) -> Result<(), ExerciseError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            self.reps = None;
            return Ok(());
        }
        let reps = trimmed
            .parse::<u32>()
            .map_err(|_| ExerciseError::InvalidReps(trimmed.to_string()))?;
        self.reps = Some(reps);
        Ok(())
    }

    pub fn set_complete(&mut self, complete: bool) {
        self.is_complete = complete;
    }

    /// Flip the completion flag and return the new value.
    pub fn toggle_complete(&mut self) -> bool {
        self.is_complete = !self.is_complete;
        self.is_complete
    }

    pub(crate) fn set_index(&mut self, index: u32) {
        self.index = index;
    }
}

/// Parse weight text the way the entry fields accept it.
///
/// # Errors
///
/// Returns `ExerciseError::InvalidWeight` for anything but an empty string or a
/// finite, non-negative decimal.
pub fn parse_weight(text: &str) -> Result<Option<f64>, ExerciseError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let value = trimmed
        .parse::<f64>()
        .map_err(|_| ExerciseError::InvalidWeight(trimmed.to_string()))?;
    validate_weight(Some(value))
}

/// Round to two decimal places, the precision weights are stored and shown with.
#[must_use]
pub fn round_weight(weight: f64) -> f64 {
    let rounded = (weight * 100.0).round() / 100.0;
    if rounded == 0.0 { 0.0 } else { rounded }
}

/// Format a weight with at most two decimals and no trailing zeros.
#[must_use]
pub fn format_weight(weight: f64) -> String {
    let text = format!("{:.2}", round_weight(weight));
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}

fn validate_weight(weight: Option<f64>) -> Result<Option<f64>, ExerciseError> {
    match weight {
        Some(w) if !w.is_finite() || w < 0.0 => Err(ExerciseError::InvalidWeight(w.to_string())),
        Some(w) => Ok(Some(round_weight(w))),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_set_is_empty_and_incomplete() {
        let set = ExerciseSet::new(3);
        assert_eq!(set.index(), 3);
        assert_eq!(set.weight(), None);
        assert_eq!(set.reps(), None);
        assert!(!set.is_complete());
        assert_eq!(set.weight_label(), "");
    }

    #[test]
    fn weight_text_parses_and_clears() {
        let mut set = ExerciseSet::new(0);
        set.set_weight_text(" 62.5 ").unwrap();
        assert_eq!(set.weight(), Some(62.5));
        assert_eq!(set.weight_label(), "62.5");

        set.set_weight_text("").unwrap();
        assert_eq!(set.weight(), None);
    }

    #[test]
    fn invalid_text_leaves_set_unchanged() {
        let mut set = ExerciseSet::with_values(0, Some(135.0), Some(5)).unwrap();
        assert!(matches!(
            set.set_weight_text("heavy"),
            Err(ExerciseError::InvalidWeight(_))
        ));
        assert!(matches!(
            set.set_weight_text("-5"),
            Err(ExerciseError::InvalidWeight(_))
        ));
        assert!(matches!(
            set.set_reps_text("five"),
            Err(ExerciseError::InvalidReps(_))
        ));
        assert_eq!(set.weight(), Some(135.0));
        assert_eq!(set.reps(), Some(5));
    }

    #[test]
    fn toggle_flips_completion() {
        let mut set = ExerciseSet::new(0);
        assert!(set.toggle_complete());
        assert!(!set.toggle_complete());
    }

    #[test]
    fn weight_labels_drop_trailing_zeros() {
        assert_eq!(format_weight(135.0), "135");
        assert_eq!(format_weight(102.25), "102.25");
        assert_eq!(format_weight(0.004), "0");
        assert!((round_weight(2.345_6) - 2.35).abs() < 1e-9);
    }
}
