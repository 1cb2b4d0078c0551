//! Free-interval (gap) model.
//!
//! A gap is a stretch of unscheduled time between calendar commitments,
//! eligible as a micro-workout suggestion. Gaps are derived values: the
//! detector produces them, the classifier derives the final scored value,
//! and nothing mutates them afterwards.

mod classify;
mod detector;

pub use classify::GapQualityClassifier;
pub use detector::GapDetector;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Quality score for a gap, ordered worst to best.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GapQuality {
    Poor,
    Fair,
    Good,
    Excellent,
}

/// Suggested micro-workout category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    Breathing,
    Stretching,
    Cardio,
    Hiit,
    Strength,
    /// Family-friendly movement (suitable with kids around)
    Family,
}

impl ActivityType {
    /// Short label for notification copy.
    pub fn label(&self) -> &'static str {
        match self {
            ActivityType::Breathing => "breathing exercise",
            ActivityType::Stretching => "stretch",
            ActivityType::Cardio => "cardio burst",
            ActivityType::Hiit => "HIIT round",
            ActivityType::Strength => "strength set",
            ActivityType::Family => "family workout",
        }
    }
}

/// A detected free interval.
///
/// Invariant: `duration_secs() == end - start`. The detector keeps durations
/// within its configured bounds; the empty-window and lead cases are capped
/// by shortening `end`, so the invariant holds there too.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Gap {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub quality: GapQuality,
    pub suggested_activity: ActivityType,
    /// Ids of the sources whose events bound this gap (empty for an
    /// empty-window gap).
    pub source_set: Vec<String>,
}

impl Gap {
    /// A freshly detected, not-yet-classified gap. Quality and activity
    /// carry the "otherwise" defaults until the classifier derives the
    /// final value.
    pub(crate) fn unclassified(
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        source_set: Vec<String>,
    ) -> Self {
        Self {
            start,
            end,
            quality: GapQuality::Poor,
            suggested_activity: ActivityType::Stretching,
            source_set,
        }
    }

    /// Derive the classified value. Consumes self; gaps are never mutated
    /// in place.
    pub(crate) fn classified(self, quality: GapQuality, activity: ActivityType) -> Self {
        Self {
            quality,
            suggested_activity: activity,
            ..self
        }
    }

    /// Gap duration in whole seconds.
    pub fn duration_secs(&self) -> i64 {
        (self.end - self.start).num_seconds()
    }

    /// Whole minutes, rounded down. The classifier's `m`.
    pub fn duration_minutes(&self) -> i64 {
        self.duration_secs() / 60
    }
}
