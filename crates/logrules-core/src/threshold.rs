//! The four threshold levels governing a category.

use std::fmt;

use serde::Serialize;

pub use logrules_config::Severity;

/// Severity cutoffs for a category: record, pass, trigger, and trigger-all.
///
/// Numerically larger levels are less severe, so a larger threshold lets
/// more messages through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct ThresholdLevels {
    pub record: u8,
    pub pass: u8,
    pub trigger: u8,
    pub trigger_all: u8,
}

impl ThresholdLevels {
    /// Every threshold disabled.
    pub const OFF: ThresholdLevels = ThresholdLevels::new(0, 0, 0, 0);

    /// Thresholds given to categories with no explicit configuration.
    pub const DEFAULT: ThresholdLevels =
        ThresholdLevels::new(0, Severity::Error.value(), 0, 0);

    pub const fn new(record: u8, pass: u8, trigger: u8, trigger_all: u8) -> Self {
        Self {
            record,
            pass,
            trigger,
            trigger_all,
        }
    }

    /// From `[record, pass, trigger, trigger_all]`.
    pub const fn from_array(levels: [u8; 4]) -> Self {
        Self::new(levels[0], levels[1], levels[2], levels[3])
    }

    pub const fn to_array(self) -> [u8; 4] {
        [self.record, self.pass, self.trigger, self.trigger_all]
    }

    /// Field-wise maximum. Combining with a rule can only relax thresholds.
    pub fn combine_max(self, other: ThresholdLevels) -> ThresholdLevels {
        Self {
            record: self.record.max(other.record),
            pass: self.pass.max(other.pass),
            trigger: self.trigger.max(other.trigger),
            trigger_all: self.trigger_all.max(other.trigger_all),
        }
    }
}

impl fmt::Display for ThresholdLevels {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[ record = {} pass = {} trigger = {} trigger_all = {} ]",
            self.record, self.pass, self.trigger, self.trigger_all
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_combine_max_is_per_field() {
        let category = ThresholdLevels::new(128, 96, 64, 32);
        let rule = ThresholdLevels::new(120, 110, 70, 40);
        assert_eq!(
            category.combine_max(rule),
            ThresholdLevels::new(128, 110, 70, 40)
        );
    }

    #[test]
    fn test_combine_with_off_is_identity() {
        let levels = ThresholdLevels::new(1, 2, 3, 4);
        assert_eq!(levels.combine_max(ThresholdLevels::OFF), levels);
    }

    #[test]
    fn test_array_round_trip() {
        let levels = ThresholdLevels::from_array([10, 20, 30, 40]);
        assert_eq!(levels.pass, 20);
        assert_eq!(levels.to_array(), [10, 20, 30, 40]);
    }

    #[test]
    fn test_display() {
        assert_eq!(
            ThresholdLevels::DEFAULT.to_string(),
            "[ record = 0 pass = 64 trigger = 0 trigger_all = 0 ]"
        );
    }
}
