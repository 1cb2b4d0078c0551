//! Gap detection over a merged event timeline.
//!
//! Walks a sorted event sequence and a scan window, producing candidate free
//! intervals bounded to the configured duration range.

use chrono::Duration;
use tracing::debug;

use super::Gap;
use crate::calendar::{CalendarEvent, TimeWindow};

/// Detector for free intervals between events.
///
/// Four cases, each independently bounded to `[min_gap, max_gap]`:
/// 1. Lead gap: window start to first event, capped at `max_gap`.
/// 2. Between gaps: each adjacent event pair.
/// 3. Trail gap: last event end to window end.
/// 4. Empty-window gap: no events at all, the whole window, capped at
///    `max_gap`.
///
/// Known limitation: with pathological inputs (an event fully containing
/// another), between-gaps can overlap each other. The walk deliberately takes
/// adjacent sorted pairs as-is rather than pre-coalescing busy intervals.
pub struct GapDetector {
    min_gap: Duration,
    max_gap: Duration,
}

impl GapDetector {
    /// Detector with default bounds (60s minimum, 300s maximum).
    pub fn new() -> Self {
        Self {
            min_gap: Duration::seconds(60),
            max_gap: Duration::seconds(300),
        }
    }

    /// Set the minimum gap duration in seconds.
    pub fn with_min_gap(mut self, secs: i64) -> Self {
        self.min_gap = Duration::seconds(secs);
        self
    }

    /// Set the maximum gap duration in seconds.
    pub fn with_max_gap(mut self, secs: i64) -> Self {
        self.max_gap = Duration::seconds(secs);
        self
    }

    /// Find candidate gaps between `events` (sorted by start time) within
    /// `window`.
    ///
    /// Events with a missing end time are skipped with a diagnostic rather
    /// than treated as zero-duration.
    pub fn find_gaps(&self, events: &[CalendarEvent], window: TimeWindow) -> Vec<Gap> {
        let usable: Vec<&CalendarEvent> = events
            .iter()
            .filter(|e| {
                if e.end_time.is_none() {
                    debug!(event_id = %e.id, title = %e.title, "skipping event with missing end time");
                }
                e.end_time.is_some()
            })
            .collect();

        // Case 4: nothing on the calendar, the whole window is one gap.
        if usable.is_empty() {
            let span = (window.end - window.start).min(self.max_gap);
            return vec![Gap::unclassified(window.start, window.start + span, Vec::new())];
        }

        let mut gaps = Vec::new();

        // Case 1: lead gap. No minimum-only bound here would leave an
        // unbounded suggestion, so the lead is capped at max_gap.
        let first = usable[0];
        if first.start_time - window.start >= self.min_gap {
            let end = first.start_time.min(window.start + self.max_gap);
            gaps.push(Gap::unclassified(
                window.start,
                end,
                vec![first.source_id.clone()],
            ));
        }

        // Case 2: between each adjacent pair.
        for pair in usable.windows(2) {
            let (current, next) = (pair[0], pair[1]);
            let free_from = current.end_time.unwrap_or(current.start_time);
            let span = next.start_time - free_from;
            if span >= self.min_gap && span <= self.max_gap {
                gaps.push(Gap::unclassified(
                    free_from,
                    next.start_time,
                    source_set(&[current, next]),
                ));
            }
        }

        // Case 3: trail gap.
        let last = usable[usable.len() - 1];
        if let Some(last_end) = last.end_time {
            let span = window.end - last_end;
            if span >= self.min_gap && span <= self.max_gap {
                gaps.push(Gap::unclassified(
                    last_end,
                    window.end,
                    vec![last.source_id.clone()],
                ));
            }
        }

        gaps
    }
}

impl Default for GapDetector {
    fn default() -> Self {
        Self::new()
    }
}

fn source_set(events: &[&CalendarEvent]) -> Vec<String> {
    let mut set: Vec<String> = Vec::new();
    for event in events {
        if !set.contains(&event.source_id) {
            set.push(event.source_id.clone());
        }
    }
    set
}
