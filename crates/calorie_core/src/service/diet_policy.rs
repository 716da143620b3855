//! Diet level derivation policies.
//!
//! The label attached to a new entry is decided by a collaborator outside
//! the record store. Callers pick a policy when building the store.

use crate::model::entry::DietLevel;

/// Derives the diet level for a new entry from its calorie amount.
pub trait DietPolicy {
    fn classify(&self, calories: f64) -> DietLevel;
}

/// Three-band policy: `cut` below `cut_below`, `bulk` from `bulk_from`,
/// `maintain` in between.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdDietPolicy {
    pub cut_below: f64,
    pub bulk_from: f64,
}

impl ThresholdDietPolicy {
    pub const DEFAULT_CUT_BELOW: f64 = 300.0;
    pub const DEFAULT_BULK_FROM: f64 = 1_000.0;
}

impl Default for ThresholdDietPolicy {
    fn default() -> Self {
        Self {
            cut_below: Self::DEFAULT_CUT_BELOW,
            bulk_from: Self::DEFAULT_BULK_FROM,
        }
    }
}

impl DietPolicy for ThresholdDietPolicy {
    fn classify(&self, calories: f64) -> DietLevel {
        if calories < self.cut_below {
            DietLevel::cut()
        } else if calories >= self.bulk_from {
            DietLevel::bulk()
        } else {
            DietLevel::maintain()
        }
    }
}

/// Assigns the same label to every entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedDietPolicy(pub DietLevel);

impl DietPolicy for FixedDietPolicy {
    fn classify(&self, _calories: f64) -> DietLevel {
        self.0.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::{DietPolicy, ThresholdDietPolicy};
    use crate::model::entry::DietLevel;

    #[test]
    fn threshold_policy_bands() {
        let policy = ThresholdDietPolicy::default();
        assert_eq!(policy.classify(200.0), DietLevel::cut());
        assert_eq!(policy.classify(300.0), DietLevel::maintain());
        assert_eq!(policy.classify(500.0), DietLevel::maintain());
        assert_eq!(policy.classify(1_000.0), DietLevel::bulk());
    }
}
