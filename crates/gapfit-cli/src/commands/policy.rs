//! `policy` subcommand: inspect, edit, and get advice on the notification
//! policy.
//!
//! config.toml owns the policy; `scan` mirrors it into the history store.
//! Edits here go to config.toml so a later scan cannot clobber them.

use chrono::{Duration, NaiveTime, Utc};
use clap::Subcommand;

use gapfit_core::{
    ignore_rate, recommend_level, response_rate, Config, NotificationHistoryStore, PolicyLevel,
    SqliteHistoryStore,
};

#[derive(Subcommand)]
pub enum PolicyAction {
    /// Show the current policy
    Show,
    /// Set the notification level (off, minimal, balanced, aggressive)
    SetLevel { level: String },
    /// Configure quiet hours
    QuietHours {
        /// Enable or disable quiet hours
        #[arg(long)]
        enabled: Option<bool>,
        /// Start time, e.g. 22:00
        #[arg(long)]
        start: Option<String>,
        /// End time, e.g. 07:00
        #[arg(long)]
        end: Option<String>,
    },
    /// Print the advisory level recommendation from recent engagement
    Recommend,
}

pub fn run(action: PolicyAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        PolicyAction::Show => {
            let policy = Config::load()?.policy();
            println!("level:        {}", policy.level.as_str());
            println!("quiet hours:  {}", if policy.quiet_hours_enabled { "on" } else { "off" });
            println!(
                "quiet window: {} - {}",
                policy.quiet_hours_start.format("%H:%M"),
                policy.quiet_hours_end.format("%H:%M"),
            );
            println!("daily budget: {} per kind", policy.max_daily_notifications());
        }
        PolicyAction::SetLevel { level } => {
            let level = PolicyLevel::parse(&level)
                .ok_or_else(|| format!("unknown level '{level}' (off|minimal|balanced|aggressive)"))?;
            let mut config = Config::load()?;
            config.notifications.level = level;
            config.save()?;
            println!("level set to {}", level.as_str());
        }
        PolicyAction::QuietHours { enabled, start, end } => {
            let mut config = Config::load()?;
            apply_quiet_hours(&mut config, enabled, start.as_deref(), end.as_deref())?;
            config.save()?;
            println!("quiet hours updated");
        }
        PolicyAction::Recommend => {
            let store = SqliteHistoryStore::open()?;
            let records = store.recent_records(Utc::now() - Duration::days(30))?;
            let response = response_rate(&records);
            let ignore = ignore_rate(&records);
            let advised = recommend_level(response, ignore);
            println!("response rate: {response:.2}");
            println!("ignore rate:   {ignore:.2}");
            println!("recommended:   {} (advisory only, not applied)", advised.as_str());
        }
    }
    Ok(())
}

fn apply_quiet_hours(
    config: &mut Config,
    enabled: Option<bool>,
    start: Option<&str>,
    end: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(enabled) = enabled {
        config.notifications.quiet_hours_enabled = enabled;
    }
    if let Some(start) = start {
        config.notifications.quiet_hours_start = parse_time(start)?;
    }
    if let Some(end) = end {
        config.notifications.quiet_hours_end = parse_time(end)?;
    }
    Ok(())
}

fn parse_time(s: &str) -> Result<NaiveTime, Box<dyn std::error::Error>> {
    NaiveTime::parse_from_str(s, "%H:%M")
        .map_err(|_| format!("invalid time '{s}', expected HH:MM").into())
}
