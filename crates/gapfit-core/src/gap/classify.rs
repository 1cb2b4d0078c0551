//! Gap quality scoring and activity suggestion.
//!
//! Quality is a pure function of duration and hour-of-day. The activity
//! suggestion is duration-bucketed; multi-candidate buckets are resolved by
//! uniform random choice for variety, with the random source injected
//! (seedable) so classification is reproducible in tests.

use chrono::Timelike;
use rand::prelude::*;
use rand_pcg::Mcg128Xsl64;

use super::{ActivityType, Gap, GapQuality};

/// First/last hour of the "awake and able to move" band used for the
/// excellent rating.
const ACTIVE_HOURS: (u32, u32) = (6, 20);

/// Scores gaps and picks a suggested activity.
pub struct GapQualityClassifier {
    rng: Mcg128Xsl64,
}

impl GapQualityClassifier {
    /// Classifier with an entropy-seeded random source.
    pub fn new() -> Self {
        Self::with_seed(rand::thread_rng().gen())
    }

    /// Classifier with a fixed seed, for reproducible runs.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Mcg128Xsl64::seed_from_u64(seed),
        }
    }

    /// Score a gap and suggest an activity.
    ///
    /// Rules, in order, over `m` = whole minutes of duration:
    /// - `m` in 3..=5 during active hours (6-20): excellent
    /// - `m` in 3..=5 otherwise: good
    /// - `m` == 2: good
    /// - `m` == 1: fair
    /// - otherwise: poor
    pub fn classify(&mut self, gap: &Gap) -> (GapQuality, ActivityType) {
        let m = gap.duration_minutes();
        let hour = gap.start.hour();

        let quality = if (3..=5).contains(&m) {
            if (ACTIVE_HOURS.0..=ACTIVE_HOURS.1).contains(&hour) {
                GapQuality::Excellent
            } else {
                GapQuality::Good
            }
        } else if m == 2 {
            GapQuality::Good
        } else if m == 1 {
            GapQuality::Fair
        } else {
            GapQuality::Poor
        };

        (quality, self.suggest_activity(m))
    }

    /// Classify in place, deriving the finished gap value.
    pub fn apply(&mut self, gaps: Vec<Gap>) -> Vec<Gap> {
        gaps.into_iter()
            .map(|gap| {
                let (quality, activity) = self.classify(&gap);
                gap.classified(quality, activity)
            })
            .collect()
    }

    fn suggest_activity(&mut self, minutes: i64) -> ActivityType {
        match minutes {
            1 => ActivityType::Breathing,
            2 => ActivityType::Stretching,
            3 => *[ActivityType::Hiit, ActivityType::Cardio]
                .choose(&mut self.rng)
                .unwrap_or(&ActivityType::Cardio),
            4 | 5 => *[
                ActivityType::Strength,
                ActivityType::Family,
                ActivityType::Stretching,
            ]
            .choose(&mut self.rng)
            .unwrap_or(&ActivityType::Stretching),
            _ => ActivityType::Stretching,
        }
    }
}

impl Default for GapQualityClassifier {
    fn default() -> Self {
        Self::new()
    }
}
