//! Calendar provider abstraction.
//!
//! Every provider implements [`CalendarEventSource`]; the scheduling service
//! fetches from all registered sources concurrently, one call per scan per
//! source. Retry policy belongs to the source implementation, not the engine.

use std::path::PathBuf;

use async_trait::async_trait;

use super::{CalendarEvent, TimeWindow};
use crate::error::SourceError;

/// A single calendar provider.
#[async_trait]
pub trait CalendarEventSource: Send + Sync {
    /// Unique identifier (e.g. "work", "personal", "school").
    fn source_id(&self) -> &str;

    /// Yield raw events intersecting the window.
    async fn fetch_events(&self, window: TimeWindow) -> Result<Vec<CalendarEvent>, SourceError>;
}

/// Fixed in-memory source, used in tests and demo scans.
pub struct StaticCalendarSource {
    source_id: String,
    events: Vec<CalendarEvent>,
}

impl StaticCalendarSource {
    pub fn new(source_id: impl Into<String>, events: Vec<CalendarEvent>) -> Self {
        Self {
            source_id: source_id.into(),
            events,
        }
    }
}

#[async_trait]
impl CalendarEventSource for StaticCalendarSource {
    fn source_id(&self) -> &str {
        &self.source_id
    }

    async fn fetch_events(&self, window: TimeWindow) -> Result<Vec<CalendarEvent>, SourceError> {
        Ok(self
            .events
            .iter()
            .filter(|e| e.start_time < window.end && e.end_time.map_or(true, |end| end > window.start))
            .cloned()
            .collect())
    }
}

/// Reads a serde-JSON array of events from disk. CLI input format.
pub struct JsonCalendarSource {
    source_id: String,
    path: PathBuf,
}

impl JsonCalendarSource {
    pub fn new(source_id: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            source_id: source_id.into(),
            path: path.into(),
        }
    }
}

#[async_trait]
impl CalendarEventSource for JsonCalendarSource {
    fn source_id(&self) -> &str {
        &self.source_id
    }

    async fn fetch_events(&self, window: TimeWindow) -> Result<Vec<CalendarEvent>, SourceError> {
        let raw = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            SourceError::Unreachable {
                source_id: self.source_id.clone(),
                message: format!("{}: {e}", self.path.display()),
            }
        })?;

        let mut events: Vec<CalendarEvent> =
            serde_json::from_str(&raw).map_err(|e| SourceError::Malformed {
                source_id: self.source_id.clone(),
                message: e.to_string(),
            })?;

        for event in &mut events {
            event.source_id = self.source_id.clone();
        }
        events.retain(|e| e.start_time < window.end && e.end_time.map_or(true, |end| end > window.start));
        Ok(events)
    }
}
