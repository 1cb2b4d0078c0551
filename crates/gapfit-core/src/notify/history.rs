//! Notification history: the append-only log of sends and feedback.
//!
//! Records are created on send and mutated exactly once afterwards (opened
//! or ignored) by the delivery-feedback collaborator. The log is capped to
//! the most recent [`MAX_HISTORY_RECORDS`] entries, oldest evicted first.

use std::collections::VecDeque;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::notify::NotificationPolicy;

/// History log cap; oldest entries are evicted beyond this.
pub const MAX_HISTORY_RECORDS: usize = 1000;

/// Category of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    GapReminder,
    StreakRisk,
    PerfectGap,
    DailyCheck,
}

impl NotificationKind {
    /// Minimum elapsed time before another send of this kind.
    pub fn cooldown(self) -> Duration {
        match self {
            NotificationKind::GapReminder => Duration::hours(2),
            NotificationKind::StreakRisk => Duration::hours(12),
            NotificationKind::PerfectGap => Duration::hours(24),
            NotificationKind::DailyCheck => Duration::hours(48),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            NotificationKind::GapReminder => "gap_reminder",
            NotificationKind::StreakRisk => "streak_risk",
            NotificationKind::PerfectGap => "perfect_gap",
            NotificationKind::DailyCheck => "daily_check",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "gap_reminder" => Some(NotificationKind::GapReminder),
            "streak_risk" => Some(NotificationKind::StreakRisk),
            "perfect_gap" => Some(NotificationKind::PerfectGap),
            "daily_check" => Some(NotificationKind::DailyCheck),
            _ => None,
        }
    }
}

/// One sent notification and what the user did with it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub kind: NotificationKind,
    pub sent_at: DateTime<Utc>,
    pub was_opened: bool,
    pub was_ignored: bool,
}

impl NotificationRecord {
    pub fn sent(kind: NotificationKind, sent_at: DateTime<Utc>) -> Self {
        Self {
            kind,
            sent_at,
            was_opened: false,
            was_ignored: false,
        }
    }
}

/// The one post-send mutation a record receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordMutation {
    Opened,
    Ignored,
}

/// Durable log of past notification sends plus the current policy.
///
/// Implementations must serialize writes (single-writer queue or store-level
/// lock): the rule engine reads while the decision service records sends and
/// the feedback collaborator flips opened/ignored flags.
pub trait NotificationHistoryStore: Send + Sync {
    /// Append a send record, evicting the oldest entry past the cap.
    fn append(&self, record: NotificationRecord) -> Result<(), StoreError>;

    /// Records sent at or after `since`, oldest first.
    fn recent_records(&self, since: DateTime<Utc>) -> Result<Vec<NotificationRecord>, StoreError>;

    /// Apply the post-send mutation to the most recent record of `kind`.
    fn update_latest(
        &self,
        kind: NotificationKind,
        mutation: RecordMutation,
    ) -> Result<(), StoreError>;

    fn load_policy(&self) -> Result<NotificationPolicy, StoreError>;

    fn save_policy(&self, policy: &NotificationPolicy) -> Result<(), StoreError>;
}

/// Fraction of records the user opened. Empty history is 0.0.
pub fn response_rate(records: &[NotificationRecord]) -> f64 {
    if records.is_empty() {
        return 0.0;
    }
    let opened = records.iter().filter(|r| r.was_opened).count();
    opened as f64 / records.len() as f64
}

/// Fraction of records the user ignored. Empty history is 0.0.
pub fn ignore_rate(records: &[NotificationRecord]) -> f64 {
    if records.is_empty() {
        return 0.0;
    }
    let ignored = records.iter().filter(|r| r.was_ignored).count();
    ignored as f64 / records.len() as f64
}

/// In-memory store behind a mutex. Default for tests and ephemeral runs.
#[derive(Default)]
pub struct MemoryHistoryStore {
    inner: Mutex<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    records: VecDeque<NotificationRecord>,
    policy: Option<NotificationPolicy>,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl NotificationHistoryStore for MemoryHistoryStore {
    fn append(&self, record: NotificationRecord) -> Result<(), StoreError> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|e| StoreError::WriteFailed(e.to_string()))?;
        inner.records.push_back(record);
        while inner.records.len() > MAX_HISTORY_RECORDS {
            inner.records.pop_front();
        }
        Ok(())
    }

    fn recent_records(&self, since: DateTime<Utc>) -> Result<Vec<NotificationRecord>, StoreError> {
        let inner = self
            .inner
            .lock()
            .map_err(|e| StoreError::ReadFailed(e.to_string()))?;
        Ok(inner
            .records
            .iter()
            .filter(|r| r.sent_at >= since)
            .cloned()
            .collect())
    }

    fn update_latest(
        &self,
        kind: NotificationKind,
        mutation: RecordMutation,
    ) -> Result<(), StoreError> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|e| StoreError::WriteFailed(e.to_string()))?;
        let record = inner
            .records
            .iter_mut()
            .rev()
            .find(|r| r.kind == kind)
            .ok_or_else(|| StoreError::NoSuchRecord {
                kind: kind.as_str().to_string(),
            })?;
        match mutation {
            RecordMutation::Opened => record.was_opened = true,
            RecordMutation::Ignored => record.was_ignored = true,
        }
        Ok(())
    }

    fn load_policy(&self) -> Result<NotificationPolicy, StoreError> {
        let inner = self
            .inner
            .lock()
            .map_err(|e| StoreError::ReadFailed(e.to_string()))?;
        Ok(inner.policy.clone().unwrap_or_default())
    }

    fn save_policy(&self, policy: &NotificationPolicy) -> Result<(), StoreError> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|e| StoreError::WriteFailed(e.to_string()))?;
        inner.policy = Some(policy.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, h, m, 0).unwrap()
    }

    #[test]
    fn test_append_and_recent() {
        let store = MemoryHistoryStore::new();
        store
            .append(NotificationRecord::sent(NotificationKind::GapReminder, at(9, 0)))
            .unwrap();
        store
            .append(NotificationRecord::sent(NotificationKind::StreakRisk, at(11, 0)))
            .unwrap();

        let recent = store.recent_records(at(10, 0)).unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].kind, NotificationKind::StreakRisk);
    }

    #[test]
    fn test_cap_evicts_oldest() {
        let store = MemoryHistoryStore::new();
        let base = at(0, 0);
        for i in 0..(MAX_HISTORY_RECORDS + 1) {
            store
                .append(NotificationRecord::sent(
                    NotificationKind::GapReminder,
                    base + Duration::seconds(i as i64),
                ))
                .unwrap();
        }

        let all = store.recent_records(base - Duration::hours(1)).unwrap();
        assert_eq!(all.len(), MAX_HISTORY_RECORDS);
        assert_eq!(all[0].sent_at, base + Duration::seconds(1)); // oldest gone
    }

    #[test]
    fn test_update_latest_flags_most_recent_of_kind() {
        let store = MemoryHistoryStore::new();
        store
            .append(NotificationRecord::sent(NotificationKind::GapReminder, at(9, 0)))
            .unwrap();
        store
            .append(NotificationRecord::sent(NotificationKind::GapReminder, at(12, 0)))
            .unwrap();

        store
            .update_latest(NotificationKind::GapReminder, RecordMutation::Opened)
            .unwrap();

        let all = store.recent_records(at(0, 0)).unwrap();
        assert!(!all[0].was_opened);
        assert!(all[1].was_opened);
    }

    #[test]
    fn test_update_latest_missing_kind_errors() {
        let store = MemoryHistoryStore::new();
        let err = store
            .update_latest(NotificationKind::DailyCheck, RecordMutation::Ignored)
            .unwrap_err();
        assert!(matches!(err, StoreError::NoSuchRecord { .. }));
    }

    #[test]
    fn test_rates() {
        let mut records = vec![
            NotificationRecord::sent(NotificationKind::GapReminder, at(9, 0)),
            NotificationRecord::sent(NotificationKind::GapReminder, at(10, 0)),
            NotificationRecord::sent(NotificationKind::GapReminder, at(11, 0)),
            NotificationRecord::sent(NotificationKind::GapReminder, at(12, 0)),
        ];
        records[0].was_opened = true;
        records[1].was_ignored = true;
        records[2].was_ignored = true;

        assert_eq!(response_rate(&records), 0.25);
        assert_eq!(ignore_rate(&records), 0.5);
        assert_eq!(response_rate(&[]), 0.0);
    }
}
