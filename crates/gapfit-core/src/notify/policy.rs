//! User-owned notification policy.
//!
//! Loaded at startup, persisted on change. The level caps how many
//! notifications of each kind may fire per calendar day; quiet hours define a
//! window (possibly spanning midnight) in which nothing fires.

use chrono::{DateTime, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

/// How chatty notifications are allowed to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyLevel {
    Off,
    Minimal,
    Balanced,
    Aggressive,
}

impl PolicyLevel {
    /// Daily per-kind notification budget derived from the level.
    pub fn max_daily_notifications(self) -> u32 {
        match self {
            PolicyLevel::Off => 0,
            PolicyLevel::Minimal => 1,
            PolicyLevel::Balanced => 2,
            PolicyLevel::Aggressive => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PolicyLevel::Off => "off",
            PolicyLevel::Minimal => "minimal",
            PolicyLevel::Balanced => "balanced",
            PolicyLevel::Aggressive => "aggressive",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "off" => Some(PolicyLevel::Off),
            "minimal" => Some(PolicyLevel::Minimal),
            "balanced" => Some(PolicyLevel::Balanced),
            "aggressive" => Some(PolicyLevel::Aggressive),
            _ => None,
        }
    }
}

/// Notification policy: level plus quiet hours.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct NotificationPolicy {
    pub level: PolicyLevel,
    pub quiet_hours_enabled: bool,
    pub quiet_hours_start: NaiveTime,
    pub quiet_hours_end: NaiveTime,
}

impl Default for NotificationPolicy {
    fn default() -> Self {
        Self {
            level: PolicyLevel::Balanced,
            quiet_hours_enabled: true,
            quiet_hours_start: NaiveTime::from_hms_opt(22, 0, 0).unwrap_or_default(),
            quiet_hours_end: NaiveTime::from_hms_opt(7, 0, 0).unwrap_or_default(),
        }
    }
}

impl NotificationPolicy {
    /// Per-kind daily budget for the configured level.
    pub fn max_daily_notifications(&self) -> u32 {
        self.level.max_daily_notifications()
    }

    /// Whether `at` falls inside the quiet window.
    ///
    /// `start > end` means the window spans midnight (the 22:00-07:00
    /// default), so the check becomes `t >= start || t < end`.
    pub fn is_quiet(&self, at: DateTime<Utc>) -> bool {
        if !self.quiet_hours_enabled {
            return false;
        }

        let t = at.time();
        if self.quiet_hours_start > self.quiet_hours_end {
            t >= self.quiet_hours_start || t < self.quiet_hours_end
        } else {
            t >= self.quiet_hours_start && t < self.quiet_hours_end
        }
    }

    /// Hour-of-day convenience used by display layers.
    pub fn quiet_window_hours(&self) -> (u32, u32) {
        (self.quiet_hours_start.hour(), self.quiet_hours_end.hour())
    }
}

/// Advisory level recommendation from observed engagement.
///
/// Never auto-applied; callers surface it to the user.
pub fn recommend_level(response_rate: f64, ignore_rate: f64) -> PolicyLevel {
    if ignore_rate > 0.7 || response_rate < 0.1 {
        PolicyLevel::Minimal
    } else if response_rate > 0.6 && ignore_rate < 0.2 {
        PolicyLevel::Aggressive
    } else {
        PolicyLevel::Balanced
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
    fn test_overnight_quiet_window() {
        let policy = NotificationPolicy::default(); // 22:00-07:00

        assert!(policy.is_quiet(at(23, 30)));
        assert!(policy.is_quiet(at(3, 0)));
        assert!(!policy.is_quiet(at(12, 0)));
        assert!(!policy.is_quiet(at(21, 59)));
    }

    #[test]
    fn test_daytime_quiet_window() {
        let policy = NotificationPolicy {
            quiet_hours_start: NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
            quiet_hours_end: NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
            ..NotificationPolicy::default()
        };

        assert!(policy.is_quiet(at(13, 0)));
        assert!(!policy.is_quiet(at(9, 0)));
        assert!(!policy.is_quiet(at(17, 0)));
    }

    #[test]
    fn test_disabled_quiet_hours() {
        let policy = NotificationPolicy {
            quiet_hours_enabled: false,
            ..NotificationPolicy::default()
        };
        assert!(!policy.is_quiet(at(23, 30)));
    }

    #[test]
    fn test_level_budgets() {
        assert_eq!(PolicyLevel::Off.max_daily_notifications(), 0);
        assert_eq!(PolicyLevel::Minimal.max_daily_notifications(), 1);
        assert_eq!(PolicyLevel::Balanced.max_daily_notifications(), 2);
        assert_eq!(PolicyLevel::Aggressive.max_daily_notifications(), 3);
    }

    #[test]
    fn test_recommend_level() {
        // Heavy ignoring with almost no opens backs all the way off.
        assert_eq!(recommend_level(0.05, 0.8), PolicyLevel::Minimal);

        assert_eq!(recommend_level(0.5, 0.9), PolicyLevel::Minimal);
        assert_eq!(recommend_level(0.7, 0.1), PolicyLevel::Aggressive);
        assert_eq!(recommend_level(0.4, 0.3), PolicyLevel::Balanced);
    }
}
