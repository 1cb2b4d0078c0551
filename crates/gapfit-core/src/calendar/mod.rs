//! Calendar event model and source plumbing.
//!
//! This module provides:
//! - The immutable [`CalendarEvent`] value and [`TimeWindow`] scan range
//! - The [`CalendarEventSource`] trait implemented by each provider
//! - [`EventMerger`] for combining several providers into one timeline

mod merge;
mod source;

pub use merge::EventMerger;
pub use source::{CalendarEventSource, JsonCalendarSource, StaticCalendarSource};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single calendar event from one provider. Immutable value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: String,
    pub title: String,
    pub start_time: DateTime<Utc>,
    /// Missing for malformed provider data; such events are skipped with a
    /// diagnostic during gap detection rather than treated as zero-duration.
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_all_day: bool,
    pub source_id: String,
}

impl CalendarEvent {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        source_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            start_time,
            end_time: Some(end_time),
            is_all_day: false,
            source_id: source_id.into(),
        }
    }

    /// Whether this event is a duplicate of `other`: titles match
    /// case-insensitively and start times fall within 60 seconds. Handles the
    /// same meeting appearing in two connected calendars.
    pub fn duplicates(&self, other: &CalendarEvent) -> bool {
        if !self.title.eq_ignore_ascii_case(&other.title) {
            return false;
        }
        (self.start_time - other.start_time).num_seconds().abs() < 60
    }
}

/// Half-open scan range. Invariant: `end > start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Create a window.
    ///
    /// # Panics
    /// Panics if `end <= start`. An inverted window is a programming error,
    /// not a recoverable condition.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        assert!(end > start, "TimeWindow end ({end}) must be after start ({start})");
        Self { start, end }
    }

    /// Window duration in whole seconds.
    pub fn duration_secs(&self) -> i64 {
        (self.end - self.start).num_seconds()
    }
}
