//! Merging events from multiple calendar sources into one timeline.

use super::CalendarEvent;

/// Combines several sources' event lists into one deduplicated sequence
/// sorted ascending by start time.
///
/// Duplicate detection is a linear scan over already-accepted output per
/// candidate, O(n²) in event count. The scan window is at most 48 hours
/// (realistically under 200 events), so no index structure is warranted.
#[derive(Debug, Default)]
pub struct EventMerger;

impl EventMerger {
    pub fn new() -> Self {
        Self
    }

    /// Merge event lists in source-priority order: when the same meeting
    /// appears in two lists, the occurrence from the earlier list wins.
    /// The result is sorted by start time; ties keep source order (stable
    /// sort) so output is deterministic.
    pub fn merge(&self, event_lists: &[Vec<CalendarEvent>]) -> Vec<CalendarEvent> {
        let mut accepted: Vec<CalendarEvent> = Vec::new();

        for list in event_lists {
            for event in list {
                if !accepted.iter().any(|kept| kept.duplicates(event)) {
                    accepted.push(event.clone());
                }
            }
        }

        accepted.sort_by_key(|e| e.start_time);
        accepted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, h, m, 0).unwrap()
    }

    fn event(id: &str, title: &str, start: DateTime<Utc>, source: &str) -> CalendarEvent {
        CalendarEvent::new(id, title, start, start + chrono::Duration::minutes(15), source)
    }

    #[test]
    fn test_duplicate_across_sources_collapses() {
        let work = vec![event("a1", "Standup", at(9, 0), "work")];
        let personal = vec![event("b1", "standup", at(9, 0), "personal")];

        let merged = EventMerger::new().merge(&[work, personal]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].source_id, "work"); // first source wins
    }

    #[test]
    fn test_result_sorted_by_start() {
        let a = vec![event("a1", "Late", at(14, 0), "work")];
        let b = vec![
            event("b1", "Early", at(8, 0), "personal"),
            event("b2", "Mid", at(11, 0), "personal"),
        ];

        let merged = EventMerger::new().merge(&[a, b]);
        let titles: Vec<_> = merged.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["Early", "Mid", "Late"]);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let work = vec![
            event("a1", "Standup", at(9, 0), "work"),
            event("a2", "Review", at(10, 0), "work"),
        ];
        let personal = vec![event("b1", "Standup", at(9, 0), "personal")];

        let merger = EventMerger::new();
        let once = merger.merge(&[work, personal]);
        let twice = merger.merge(&[once.clone()]);

        assert_eq!(once.len(), twice.len());
        for (a, b) in once.iter().zip(twice.iter()) {
            assert_eq!(a.id, b.id);
        }
    }

    #[test]
    fn test_near_duplicate_within_a_minute() {
        // Same title, starts 45 seconds apart: two connected calendars
        // showing the same meeting with slightly different sync times.
        let start = at(9, 0);
        let work = vec![event("a1", "1:1", start, "work")];
        let personal = vec![event(
            "b1",
            "1:1",
            start + chrono::Duration::seconds(45),
            "personal",
        )];

        let merged = EventMerger::new().merge(&[work, personal]);
        assert_eq!(merged.len(), 1);
    }
}
