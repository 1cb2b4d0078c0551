//! # GapFit Core Library
//!
//! This library provides the core business logic for GapFit: detecting free
//! "micro-workout" windows in a user's calendars and deciding whether to
//! suggest one. The CLI binary is a thin layer over this crate; anything
//! that renders UI, verifies purchases, or talks to OS notification APIs is
//! an external collaborator behind a trait.
//!
//! ## Architecture
//!
//! - **Calendar**: the event model, the per-provider [`CalendarEventSource`]
//!   trait, and [`EventMerger`] for deduplicating across providers
//! - **Gap**: [`GapDetector`] walks the merged timeline for free intervals;
//!   [`GapQualityClassifier`] scores them and suggests an activity
//! - **Notify**: [`NotificationRuleEngine`] gates decisions by policy,
//!   quiet hours, cooldowns, and engagement history behind a
//!   [`NotificationHistoryStore`]
//! - **Scheduler**: [`GapSchedulingService`] orchestrates one scan end to
//!   end and emits [`NotificationDecision`]s to a delivery sink
//! - **Storage**: TOML configuration and a SQLite history store
//!
//! Every service takes its dependencies (sources, store, random seed,
//! "now") explicitly, so scans are deterministic under test.

pub mod calendar;
pub mod error;
pub mod gap;
pub mod notify;
pub mod scheduler;
pub mod storage;

pub use calendar::{
    CalendarEvent, CalendarEventSource, EventMerger, JsonCalendarSource, StaticCalendarSource,
    TimeWindow,
};
pub use error::{ConfigError, CoreError, Result, SourceError, StoreError};
pub use gap::{ActivityType, Gap, GapDetector, GapQuality, GapQualityClassifier};
pub use notify::{
    ignore_rate, recommend_level, response_rate, DecisionContext, MemoryHistoryStore,
    NotificationHistoryStore, NotificationKind, NotificationPolicy, NotificationRecord,
    NotificationRuleEngine, PolicyLevel, RecordMutation,
};
pub use scheduler::{
    ChannelSink, GapSchedulingService, NotificationDecision, NotificationDeliverySink,
    ScanOutcome, ScanRequest, ScanState,
};
pub use storage::{Config, SqliteHistoryStore};
