//! The notification decision gate.
//!
//! `should_send` evaluates an ordered series of conditions and short-circuits
//! on the first failure:
//!
//! 1. Policy level is not off
//! 2. Today's per-kind send count is under the level's daily budget
//! 3. Outside quiet hours (overnight wraparound handled)
//! 4. Engagement guard: not suppressed for being repeatedly ignored
//! 5. Global cooldown: 30 minutes since *any* send
//! 6. Per-kind cooldown elapsed
//! 7. The kind's own triggering condition holds
//!
//! A kind may register several rules; they are evaluated in ascending
//! priority order and the first whose condition holds authorizes the send.

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, warn};

use crate::gap::Gap;
use crate::notify::{
    response_rate, NotificationHistoryStore, NotificationKind, NotificationPolicy,
    NotificationRecord,
};

/// Minimum elapsed time since any notification, regardless of kind.
const GLOBAL_COOLDOWN_MINUTES: i64 = 30;

/// Ignored sends (among the recent records of a kind) that trip the
/// engagement guard when the overall response rate is also poor.
const ENGAGEMENT_IGNORE_THRESHOLD: usize = 3;
const ENGAGEMENT_WINDOW: usize = 5;
const ENGAGEMENT_MIN_RESPONSE_RATE: f64 = 0.3;

/// How far back history is read when building gate inputs. Covers the
/// longest per-kind cooldown (48 h) with slack for the engagement window.
const HISTORY_LOOKBACK_DAYS: i64 = 7;

/// Ephemeral inputs for one `should_send` evaluation. Built per call,
/// never persisted.
#[derive(Debug, Clone)]
pub struct DecisionContext {
    pub now: DateTime<Utc>,
    pub last_notification_at: Option<DateTime<Utc>>,
    /// Rolling fraction of recent notifications the user opened.
    pub response_rate: f64,
    pub current_streak: u32,
    pub hours_since_last_activity: f64,
    /// Nearest upcoming gap, already classified.
    pub upcoming_gap: Option<Gap>,
}

impl DecisionContext {
    /// Build a context from activity state plus what the history store says.
    /// An unreadable history is treated as empty (fail open).
    pub fn build(
        now: DateTime<Utc>,
        current_streak: u32,
        hours_since_last_activity: f64,
        upcoming_gap: Option<Gap>,
        history: &dyn NotificationHistoryStore,
    ) -> Self {
        let records = read_history(history, now);
        Self {
            now,
            last_notification_at: records.iter().map(|r| r.sent_at).max(),
            response_rate: response_rate(&records),
            current_streak,
            hours_since_last_activity,
            upcoming_gap,
        }
    }
}

/// One triggering condition for a kind, with a priority for ordering among
/// rules of the same kind (lower fires first).
pub struct NotificationRule {
    pub kind: NotificationKind,
    pub priority: u8,
    pub condition: fn(&DecisionContext) -> bool,
}

/// Decides whether a notification of a given kind should fire now.
pub struct NotificationRuleEngine {
    rules: Vec<NotificationRule>,
}

impl NotificationRuleEngine {
    /// Engine with the built-in rule set.
    pub fn new() -> Self {
        Self::with_rules(default_rules())
    }

    /// Engine with a custom rule table.
    pub fn with_rules(mut rules: Vec<NotificationRule>) -> Self {
        rules.sort_by_key(|r| r.priority);
        Self { rules }
    }

    /// Evaluate the full gate for `kind`.
    pub fn should_send(
        &self,
        kind: NotificationKind,
        context: &DecisionContext,
        policy: &NotificationPolicy,
        history: &dyn NotificationHistoryStore,
    ) -> bool {
        use crate::notify::PolicyLevel;

        // Gate 1: notifications enabled at all.
        if policy.level == PolicyLevel::Off {
            debug!(kind = kind.as_str(), "denied: level off");
            return false;
        }

        let records = read_history(history, context.now);

        // Gate 2: per-kind daily budget.
        let today = context.now.date_naive();
        let sent_today = records
            .iter()
            .filter(|r| r.kind == kind && r.sent_at.date_naive() == today)
            .count() as u32;
        if sent_today >= policy.max_daily_notifications() {
            debug!(kind = kind.as_str(), sent_today, "denied: daily budget spent");
            return false;
        }

        // Gate 3: quiet hours.
        if policy.is_quiet(context.now) {
            debug!(kind = kind.as_str(), "denied: quiet hours");
            return false;
        }

        // Gate 4: engagement guard. Users who ignore us get left alone.
        let recent_of_kind: Vec<&NotificationRecord> = records
            .iter()
            .rev()
            .filter(|r| r.kind == kind)
            .take(ENGAGEMENT_WINDOW)
            .collect();
        let ignored = recent_of_kind.iter().filter(|r| r.was_ignored).count();
        if ignored >= ENGAGEMENT_IGNORE_THRESHOLD
            && context.response_rate < ENGAGEMENT_MIN_RESPONSE_RATE
        {
            debug!(kind = kind.as_str(), ignored, "denied: engagement guard");
            return false;
        }

        // Gate 5: global cooldown across all kinds.
        if let Some(last) = records.iter().map(|r| r.sent_at).max() {
            if context.now - last < Duration::minutes(GLOBAL_COOLDOWN_MINUTES) {
                debug!(kind = kind.as_str(), "denied: global cooldown");
                return false;
            }
        }

        // Gate 6: per-kind cooldown.
        if let Some(last_of_kind) = records
            .iter()
            .filter(|r| r.kind == kind)
            .map(|r| r.sent_at)
            .max()
        {
            if context.now - last_of_kind < kind.cooldown() {
                debug!(kind = kind.as_str(), "denied: kind cooldown");
                return false;
            }
        }

        // Gate 7: the kind's own trigger, lowest priority first.
        let authorized = self
            .rules
            .iter()
            .filter(|r| r.kind == kind)
            .any(|r| (r.condition)(context));
        if !authorized {
            debug!(kind = kind.as_str(), "denied: no rule condition held");
        }
        authorized
    }
}

impl Default for NotificationRuleEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn read_history(
    history: &dyn NotificationHistoryStore,
    now: DateTime<Utc>,
) -> Vec<NotificationRecord> {
    match history.recent_records(now - Duration::days(HISTORY_LOOKBACK_DAYS)) {
        Ok(records) => records,
        Err(err) => {
            // Fail open: an unreadable history means fewer suppressions.
            warn!(error = %err, "history unreadable, treating as empty");
            Vec::new()
        }
    }
}

/// Whether the context carries a gap starting within the next hour of at
/// least `min_secs` duration.
fn upcoming_gap_within_hour(context: &DecisionContext, min_secs: i64) -> bool {
    context.upcoming_gap.as_ref().is_some_and(|gap| {
        gap.start >= context.now
            && gap.start - context.now <= Duration::hours(1)
            && gap.duration_secs() >= min_secs
    })
}

/// The built-in rule table.
pub fn default_rules() -> Vec<NotificationRule> {
    vec![
        // A usable gap is coming up.
        NotificationRule {
            kind: NotificationKind::GapReminder,
            priority: 0,
            condition: |ctx| upcoming_gap_within_hour(ctx, 60),
        },
        // The user is about to lose a streak worth keeping.
        NotificationRule {
            kind: NotificationKind::StreakRisk,
            priority: 0,
            condition: |ctx| ctx.hours_since_last_activity > 20.0 && ctx.current_streak > 3,
        },
        // A full five-minute window within the hour.
        NotificationRule {
            kind: NotificationKind::PerfectGap,
            priority: 0,
            condition: |ctx| upcoming_gap_within_hour(ctx, 300),
        },
        // Lapsed user with no streak to protect.
        NotificationRule {
            kind: NotificationKind::DailyCheck,
            priority: 0,
            condition: |ctx| ctx.hours_since_last_activity > 24.0 && ctx.current_streak == 0,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gap::{ActivityType, Gap, GapQuality};
    use crate::notify::{MemoryHistoryStore, PolicyLevel, RecordMutation};
    use chrono::TimeZone;

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 12, 0, 0).unwrap()
    }

    fn gap_in(minutes: i64, duration_secs: i64) -> Gap {
        let start = noon() + Duration::minutes(minutes);
        Gap {
            start,
            end: start + Duration::seconds(duration_secs),
            quality: GapQuality::Excellent,
            suggested_activity: ActivityType::Cardio,
            source_set: vec!["work".into()],
        }
    }

    fn context_with_gap(gap: Option<Gap>) -> DecisionContext {
        DecisionContext {
            now: noon(),
            last_notification_at: None,
            response_rate: 0.5,
            current_streak: 5,
            hours_since_last_activity: 6.0,
            upcoming_gap: gap,
        }
    }

    #[test]
    fn test_level_off_denies_everything() {
        let engine = NotificationRuleEngine::new();
        let store = MemoryHistoryStore::new();
        let policy = NotificationPolicy {
            level: PolicyLevel::Off,
            ..NotificationPolicy::default()
        };
        let ctx = context_with_gap(Some(gap_in(10, 300)));

        assert!(!engine.should_send(NotificationKind::PerfectGap, &ctx, &policy, &store));
    }

    #[test]
    fn test_quiet_hours_denies() {
        let engine = NotificationRuleEngine::new();
        let store = MemoryHistoryStore::new();
        let policy = NotificationPolicy::default(); // quiet 22:00-07:00

        let mut ctx = context_with_gap(Some(gap_in(10, 300)));
        ctx.now = Utc.with_ymd_and_hms(2026, 3, 2, 23, 30, 0).unwrap();
        if let Some(gap) = ctx.upcoming_gap.as_mut() {
            gap.start = ctx.now + Duration::minutes(10);
            gap.end = gap.start + Duration::seconds(300);
        }

        assert!(!engine.should_send(NotificationKind::PerfectGap, &ctx, &policy, &store));
    }

    #[test]
    fn test_global_cooldown() {
        let engine = NotificationRuleEngine::new();
        let store = MemoryHistoryStore::new();
        let policy = NotificationPolicy::default();
        let ctx = context_with_gap(Some(gap_in(10, 300)));

        // A different kind sent 10 minutes ago blocks everything.
        store
            .append(NotificationRecord::sent(
                NotificationKind::DailyCheck,
                noon() - Duration::minutes(10),
            ))
            .unwrap();

        assert!(!engine.should_send(NotificationKind::PerfectGap, &ctx, &policy, &store));
    }

    #[test]
    fn test_kind_cooldown() {
        let engine = NotificationRuleEngine::new();
        let store = MemoryHistoryStore::new();
        let policy = NotificationPolicy {
            level: PolicyLevel::Aggressive,
            ..NotificationPolicy::default()
        };
        let ctx = context_with_gap(Some(gap_in(10, 300)));

        // PerfectGap sent 2 hours ago: global cooldown passed, 24h kind
        // cooldown has not.
        store
            .append(NotificationRecord::sent(
                NotificationKind::PerfectGap,
                noon() - Duration::hours(2),
            ))
            .unwrap();

        assert!(!engine.should_send(NotificationKind::PerfectGap, &ctx, &policy, &store));
        // GapReminder's own 2h cooldown is clear.
        assert!(engine.should_send(NotificationKind::GapReminder, &ctx, &policy, &store));
    }

    #[test]
    fn test_engagement_guard() {
        let engine = NotificationRuleEngine::new();
        let store = MemoryHistoryStore::new();
        let policy = NotificationPolicy::default();

        // Three ignored gap reminders, old enough to clear both cooldowns.
        for days in [5, 4, 3] {
            store
                .append(NotificationRecord::sent(
                    NotificationKind::GapReminder,
                    noon() - Duration::days(days),
                ))
                .unwrap();
            store
                .update_latest(NotificationKind::GapReminder, RecordMutation::Ignored)
                .unwrap();
        }

        let mut ctx = context_with_gap(Some(gap_in(10, 120)));
        ctx.response_rate = 0.1;
        assert!(!engine.should_send(NotificationKind::GapReminder, &ctx, &policy, &store));

        // A healthy response rate clears the guard.
        ctx.response_rate = 0.5;
        assert!(engine.should_send(NotificationKind::GapReminder, &ctx, &policy, &store));
    }

    #[test]
    fn test_streak_risk_trigger() {
        let engine = NotificationRuleEngine::new();
        let store = MemoryHistoryStore::new();
        let policy = NotificationPolicy::default();

        let mut ctx = context_with_gap(None);
        ctx.hours_since_last_activity = 22.0;
        ctx.current_streak = 7;
        assert!(engine.should_send(NotificationKind::StreakRisk, &ctx, &policy, &store));

        ctx.current_streak = 2;
        assert!(!engine.should_send(NotificationKind::StreakRisk, &ctx, &policy, &store));
    }

    #[test]
    fn test_daily_check_trigger() {
        let engine = NotificationRuleEngine::new();
        let store = MemoryHistoryStore::new();
        let policy = NotificationPolicy::default();

        let mut ctx = context_with_gap(None);
        ctx.hours_since_last_activity = 30.0;
        ctx.current_streak = 0;
        assert!(engine.should_send(NotificationKind::DailyCheck, &ctx, &policy, &store));

        ctx.current_streak = 1;
        assert!(!engine.should_send(NotificationKind::DailyCheck, &ctx, &policy, &store));
    }

    #[test]
    fn test_perfect_gap_needs_five_minutes() {
        let engine = NotificationRuleEngine::new();
        let store = MemoryHistoryStore::new();
        let policy = NotificationPolicy::default();

        let ctx = context_with_gap(Some(gap_in(10, 180)));
        assert!(!engine.should_send(NotificationKind::PerfectGap, &ctx, &policy, &store));

        let ctx = context_with_gap(Some(gap_in(10, 300)));
        assert!(engine.should_send(NotificationKind::PerfectGap, &ctx, &policy, &store));

        // Gap beyond the next hour does not trigger.
        let ctx = context_with_gap(Some(gap_in(90, 300)));
        assert!(!engine.should_send(NotificationKind::PerfectGap, &ctx, &policy, &store));
    }

    #[test]
    fn test_context_build_fails_open_on_empty_store() {
        let store = MemoryHistoryStore::new();
        let ctx = DecisionContext::build(noon(), 3, 5.0, None, &store);
        assert_eq!(ctx.response_rate, 0.0);
        assert!(ctx.last_notification_at.is_none());
    }
}
