//! `history` subcommand: recent sends and engagement stats.

use std::collections::BTreeMap;

use chrono::{Duration, Utc};
use clap::Subcommand;

use gapfit_core::{
    ignore_rate, response_rate, NotificationHistoryStore, NotificationKind, RecordMutation,
    SqliteHistoryStore,
};

#[derive(Subcommand)]
pub enum HistoryAction {
    /// List recent notification records
    Show {
        /// How many days back to list
        #[arg(long, default_value_t = 7)]
        days: i64,
    },
    /// Response and ignore rates, per kind and overall
    Stats,
    /// Mark the latest notification of a kind as opened or ignored
    /// (delivery feedback, normally driven by the app)
    Feedback {
        /// Notification kind (gap_reminder, streak_risk, perfect_gap, daily_check)
        kind: String,
        /// "opened" or "ignored"
        outcome: String,
    },
}

pub fn run(action: HistoryAction) -> Result<(), Box<dyn std::error::Error>> {
    let store = SqliteHistoryStore::open()?;
    match action {
        HistoryAction::Show { days } => {
            let records = store.recent_records(Utc::now() - Duration::days(days))?;
            if records.is_empty() {
                println!("no notifications in the last {days} day(s)");
                return Ok(());
            }
            for record in records {
                let status = if record.was_opened {
                    "opened"
                } else if record.was_ignored {
                    "ignored"
                } else {
                    "pending"
                };
                println!(
                    "{}  {:<13} {status}",
                    record.sent_at.format("%Y-%m-%d %H:%M"),
                    record.kind.as_str(),
                );
            }
        }
        HistoryAction::Stats => {
            let records = store.recent_records(Utc::now() - Duration::days(30))?;
            println!("last 30 days: {} notification(s)", records.len());
            println!("response rate: {:.2}", response_rate(&records));
            println!("ignore rate:   {:.2}", ignore_rate(&records));

            let mut per_kind: BTreeMap<&str, usize> = BTreeMap::new();
            for record in &records {
                *per_kind.entry(record.kind.as_str()).or_insert(0) += 1;
            }
            for (kind, count) in per_kind {
                println!("  {kind:<13} {count}");
            }
        }
        HistoryAction::Feedback { kind, outcome } => {
            let kind = NotificationKind::parse(&kind)
                .ok_or_else(|| format!("unknown kind '{kind}'"))?;
            let mutation = match outcome.as_str() {
                "opened" => RecordMutation::Opened,
                "ignored" => RecordMutation::Ignored,
                other => return Err(format!("unknown outcome '{other}'").into()),
            };
            store.update_latest(kind, mutation)?;
            println!("ok");
        }
    }
    Ok(())
}
