//! Fixed-cutoff threshold ladders
//!
//! A ladder maps a single measured value onto a [`Rating`] and a coarse
//! percentile bucket. The buckets are a step function over the four cutoffs,
//! not a population percentile.

use serde::{Deserialize, Serialize};

use crate::models::{Direction, Gender, Performance, Rating, TestType, Trend};

/// How a value exactly on a cutoff is treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Boundary {
    /// `<=` / `>=`: ties go to the better tier
    #[default]
    Inclusive,
    /// `<` / `>`: ties fall to the worse tier
    Strict,
}

/// The four cutoffs of a ladder; anything past `below_average` is poor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TierThresholds {
    pub excellent: f64,
    pub good: f64,
    pub average: f64,
    pub below_average: f64,
}

impl TierThresholds {
    pub const fn new(excellent: f64, good: f64, average: f64, below_average: f64) -> Self {
        Self {
            excellent,
            good,
            average,
            below_average,
        }
    }

    fn ladder(&self) -> [(f64, Rating); 4] {
        [
            (self.excellent, Rating::Excellent),
            (self.good, Rating::Good),
            (self.average, Rating::Average),
            (self.below_average, Rating::BelowAverage),
        ]
    }
}

/// Return the first tier, from excellent down, whose cutoff `value` satisfies
pub fn rate(value: f64, tiers: &TierThresholds, direction: Direction, boundary: Boundary) -> Rating {
    let passes = |cutoff: f64| match (direction, boundary) {
        (Direction::LowerIsBetter, Boundary::Inclusive) => value <= cutoff,
        (Direction::LowerIsBetter, Boundary::Strict) => value < cutoff,
        (Direction::HigherIsBetter, Boundary::Inclusive) => value >= cutoff,
        (Direction::HigherIsBetter, Boundary::Strict) => value > cutoff,
    };

    tiers
        .ladder()
        .into_iter()
        .find(|(cutoff, _)| passes(*cutoff))
        .map(|(_, rating)| rating)
        .unwrap_or(Rating::Poor)
}

/// Percentile bucket for a rating
pub fn bucket(rating: Rating) -> u8 {
    match rating {
        Rating::Excellent => 90,
        Rating::Good => 75,
        Rating::Average => 50,
        Rating::BelowAverage => 25,
        Rating::Poor => 10,
    }
}

/// Coarse percentile from the same comparisons as [`rate`]
pub fn percentile(value: f64, tiers: &TierThresholds, direction: Direction, boundary: Boundary) -> u8 {
    bucket(rate(value, tiers, direction, boundary))
}

/// One ladder, keyed by test type and optionally gender
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdEntry {
    pub test_type: TestType,

    /// Applies to every athlete when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,

    /// Input or derived field the ladder reads
    pub metric: String,

    pub direction: Direction,

    #[serde(default)]
    pub boundary: Boundary,

    pub tiers: TierThresholds,
}

impl ThresholdEntry {
    pub fn rate(&self, value: f64) -> Rating {
        rate(value, &self.tiers, self.direction, self.boundary)
    }

    /// Rating and percentile for `value`; the trend is assigned later from history
    pub fn performance(&self, value: f64) -> Performance {
        let rating = self.rate(value);
        Performance {
            rating,
            percentile: bucket(rating),
            trend: Trend::Stable,
        }
    }
}

/// Cutoffs on the 0-100 reaction session score
pub const SESSION_SCORE: TierThresholds = TierThresholds::new(90.0, 80.0, 70.0, 60.0);

/// Injectable set of ladders
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdTable {
    entries: Vec<ThresholdEntry>,
}

impl Default for ThresholdTable {
    fn default() -> Self {
        let entry = |test_type, gender, metric: &str, direction, boundary, tiers| ThresholdEntry {
            test_type,
            gender,
            metric: metric.to_string(),
            direction,
            boundary,
            tiers,
        };

        Self {
            entries: vec![
                entry(
                    TestType::IllinoisAgilityTest,
                    Some(Gender::Male),
                    "completionTime",
                    Direction::LowerIsBetter,
                    Boundary::Strict,
                    TierThresholds::new(15.2, 16.1, 18.1, 19.3),
                ),
                entry(
                    TestType::IllinoisAgilityTest,
                    Some(Gender::Female),
                    "completionTime",
                    Direction::LowerIsBetter,
                    Boundary::Strict,
                    TierThresholds::new(17.0, 17.9, 21.0, 23.0),
                ),
                // No poor tier: anything slower than 11.5 s is below average
                entry(
                    TestType::TTest,
                    None,
                    "completionTime",
                    Direction::LowerIsBetter,
                    Boundary::Strict,
                    TierThresholds::new(9.5, 10.5, 11.5, f64::INFINITY),
                ),
                // Composite reaction score, shared by both reaction-style tests
                entry(
                    TestType::MentalNeuralSession,
                    None,
                    "score",
                    Direction::HigherIsBetter,
                    Boundary::Inclusive,
                    SESSION_SCORE,
                ),
                entry(
                    TestType::SimpleReactionTime,
                    None,
                    "score",
                    Direction::HigherIsBetter,
                    Boundary::Inclusive,
                    SESSION_SCORE,
                ),
            ],
        }
    }
}

impl ThresholdTable {
    /// A table with no ladders; every test gets the neutral performance
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn new(entries: Vec<ThresholdEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[ThresholdEntry] {
        &self.entries
    }

    /// Ladder for a test type, preferring a gender-specific entry.
    ///
    /// A table holding only gender-specific ladders for a type yields `None`
    /// when the gender is unknown.
    pub fn lookup(&self, test_type: TestType, gender: Option<Gender>) -> Option<&ThresholdEntry> {
        let mut generic = None;
        for entry in self.entries.iter().filter(|e| e.test_type == test_type) {
            match (entry.gender, gender) {
                (Some(wanted), Some(actual)) if wanted == actual => return Some(entry),
                (None, _) => generic = generic.or(Some(entry)),
                _ => {}
            }
        }
        generic
    }

    /// Whether any ladder exists for the test type
    pub fn covers(&self, test_type: TestType) -> bool {
        self.entries.iter().any(|e| e.test_type == test_type)
    }

    /// Replace ladders with the same (test type, gender) key, appending new ones
    pub fn merge(&mut self, overrides: impl IntoIterator<Item = ThresholdEntry>) {
        for entry in overrides {
            match self
                .entries
                .iter_mut()
                .find(|e| e.test_type == entry.test_type && e.gender == entry.gender)
            {
                Some(existing) => {
                    tracing::debug!(
                        test_type = %entry.test_type,
                        gender = ?entry.gender,
                        "Overriding threshold ladder"
                    );
                    *existing = entry;
                }
                None => self.entries.push(entry),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const TIMES: TierThresholds = TierThresholds::new(200.0, 250.0, 300.0, 350.0);

    fn tier_rank(rating: Rating) -> u8 {
        match rating {
            Rating::Excellent => 4,
            Rating::Good => 3,
            Rating::Average => 2,
            Rating::BelowAverage => 1,
            Rating::Poor => 0,
        }
    }

    #[test]
    fn test_inclusive_ties_go_to_better_tier() {
        let lower = Direction::LowerIsBetter;
        assert_eq!(rate(200.0, &TIMES, lower, Boundary::Inclusive), Rating::Excellent);
        assert_eq!(rate(250.0, &TIMES, lower, Boundary::Inclusive), Rating::Good);
        assert_eq!(rate(350.0, &TIMES, lower, Boundary::Inclusive), Rating::BelowAverage);
        assert_eq!(rate(350.1, &TIMES, lower, Boundary::Inclusive), Rating::Poor);

        let higher = Direction::HigherIsBetter;
        assert_eq!(rate(90.0, &SESSION_SCORE, higher, Boundary::Inclusive), Rating::Excellent);
        assert_eq!(rate(70.0, &SESSION_SCORE, higher, Boundary::Inclusive), Rating::Average);
        assert_eq!(rate(59.9, &SESSION_SCORE, higher, Boundary::Inclusive), Rating::Poor);
    }

    #[test]
    fn test_strict_ties_fall_to_worse_tier() {
        let tiers = TierThresholds::new(15.2, 16.1, 18.1, 19.3);
        let lower = Direction::LowerIsBetter;
        assert_eq!(rate(15.19, &tiers, lower, Boundary::Strict), Rating::Excellent);
        assert_eq!(rate(15.2, &tiers, lower, Boundary::Strict), Rating::Good);
        assert_eq!(rate(19.3, &tiers, lower, Boundary::Strict), Rating::Poor);
    }

    #[test]
    fn test_percentile_buckets() {
        let lower = Direction::LowerIsBetter;
        assert_eq!(percentile(180.0, &TIMES, lower, Boundary::Inclusive), 90);
        assert_eq!(percentile(240.0, &TIMES, lower, Boundary::Inclusive), 75);
        assert_eq!(percentile(290.0, &TIMES, lower, Boundary::Inclusive), 50);
        assert_eq!(percentile(330.0, &TIMES, lower, Boundary::Inclusive), 25);
        assert_eq!(percentile(400.0, &TIMES, lower, Boundary::Inclusive), 10);
    }

    #[test]
    fn test_lookup_prefers_gender_specific() {
        let table = ThresholdTable::default();

        let male = table
            .lookup(TestType::IllinoisAgilityTest, Some(Gender::Male))
            .unwrap();
        assert_eq!(male.tiers.excellent, 15.2);

        let female = table
            .lookup(TestType::IllinoisAgilityTest, Some(Gender::Female))
            .unwrap();
        assert_eq!(female.tiers.excellent, 17.0);

        assert!(table.lookup(TestType::IllinoisAgilityTest, None).is_none());
        assert!(table.lookup(TestType::TTest, Some(Gender::Female)).is_some());
        assert!(table.lookup(TestType::BroadJump, None).is_none());
    }

    #[test]
    fn test_only_sourced_ladders_ship() {
        let table = ThresholdTable::default();
        for test_type in [TestType::VerticalJump, TestType::DailyReadiness, TestType::CooperTest] {
            assert!(!table.covers(test_type), "{} has a ladder", test_type);
        }

        let reaction = table.lookup(TestType::SimpleReactionTime, None).unwrap();
        assert_eq!(reaction.metric, "score");
        assert_eq!(reaction.rate(80.0), Rating::Good);
        assert_eq!(reaction.rate(79.9), Rating::Average);
        assert_eq!(
            table.lookup(TestType::MentalNeuralSession, None).unwrap().tiers,
            SESSION_SCORE
        );
    }

    #[test]
    fn test_merge_replaces_matching_key() {
        let mut table = ThresholdTable::default();
        let before = table.entries().len();

        table.merge(vec![ThresholdEntry {
            test_type: TestType::TTest,
            gender: None,
            metric: "completionTime".to_string(),
            direction: Direction::LowerIsBetter,
            boundary: Boundary::Strict,
            tiers: TierThresholds::new(10.0, 11.0, 12.0, 13.0),
        }]);
        assert_eq!(table.entries().len(), before);
        let t_test = table.lookup(TestType::TTest, None).unwrap();
        assert_eq!(t_test.rate(10.5), Rating::Good);

        table.merge(vec![ThresholdEntry {
            test_type: TestType::BroadJump,
            gender: Some(Gender::Female),
            metric: "jumpDistance".to_string(),
            direction: Direction::HigherIsBetter,
            boundary: Boundary::Inclusive,
            tiers: TierThresholds::new(220.0, 200.0, 180.0, 160.0),
        }]);
        assert_eq!(table.entries().len(), before + 1);
        assert!(table.covers(TestType::BroadJump));
    }

    #[test]
    fn test_t_test_has_no_poor_tier() {
        let table = ThresholdTable::default();
        let entry = table.lookup(TestType::TTest, None).unwrap();
        assert_eq!(entry.rate(9.4), Rating::Excellent);
        assert_eq!(entry.rate(11.5), Rating::BelowAverage);
        assert_eq!(entry.rate(30.0), Rating::BelowAverage);
    }

    proptest! {
        #[test]
        fn test_lower_is_better_is_monotonic(a in 0.0f64..1000.0, b in 0.0f64..1000.0) {
            let (fast, slow) = if a <= b { (a, b) } else { (b, a) };
            for boundary in [Boundary::Inclusive, Boundary::Strict] {
                let fast_tier = rate(fast, &TIMES, Direction::LowerIsBetter, boundary);
                let slow_tier = rate(slow, &TIMES, Direction::LowerIsBetter, boundary);
                prop_assert!(tier_rank(fast_tier) >= tier_rank(slow_tier));
            }
        }

        #[test]
        fn test_higher_is_better_is_monotonic(a in 0.0f64..150.0, b in 0.0f64..150.0) {
            let (low, high) = if a <= b { (a, b) } else { (b, a) };
            let low_tier = rate(low, &SESSION_SCORE, Direction::HigherIsBetter, Boundary::Inclusive);
            let high_tier = rate(high, &SESSION_SCORE, Direction::HigherIsBetter, Boundary::Inclusive);
            prop_assert!(tier_rank(high_tier) >= tier_rank(low_tier));
        }

        #[test]
        fn test_percentile_agrees_with_rating(v in 0.0f64..500.0) {
            let rating = rate(v, &TIMES, Direction::LowerIsBetter, Boundary::Inclusive);
            prop_assert_eq!(
                percentile(v, &TIMES, Direction::LowerIsBetter, Boundary::Inclusive),
                bucket(rating)
            );
        }
    }
}
