//! `config` subcommand.

use chrono::NaiveTime;
use clap::Subcommand;

use gapfit_core::{Config, PolicyLevel};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show the full configuration as JSON
    Show,
    /// Set a config value
    Set {
        /// Config key (e.g. "level", "min_gap_seconds")
        key: String,
        /// New value
        value: String,
    },
    /// Reset config to defaults
    Reset,
}

pub fn run(action: ConfigAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ConfigAction::Show => {
            let config = Config::load()?;
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load()?;
            apply(&mut config, &key, &value)?;
            config.validate()?;
            config.save()?;
            println!("ok");
        }
        ConfigAction::Reset => {
            Config::default().save()?;
            println!("config reset to defaults");
        }
    }
    Ok(())
}

fn apply(config: &mut Config, key: &str, value: &str) -> Result<(), Box<dyn std::error::Error>> {
    match key {
        "level" => {
            config.notifications.level = PolicyLevel::parse(value)
                .ok_or_else(|| format!("unknown level '{value}'"))?;
        }
        "quiet_hours_enabled" => {
            config.notifications.quiet_hours_enabled = value.parse()?;
        }
        "quiet_hours_start" => {
            config.notifications.quiet_hours_start = parse_time(value)?;
        }
        "quiet_hours_end" => {
            config.notifications.quiet_hours_end = parse_time(value)?;
        }
        "min_gap_seconds" => {
            config.scan.min_gap_seconds = value.parse()?;
        }
        "max_gap_seconds" => {
            config.scan.max_gap_seconds = value.parse()?;
        }
        "scan_window_hours" => {
            config.scan.scan_window_hours = value.parse()?;
        }
        other => return Err(format!("unknown key: {other}").into()),
    }
    Ok(())
}

fn parse_time(s: &str) -> Result<NaiveTime, Box<dyn std::error::Error>> {
    NaiveTime::parse_from_str(s, "%H:%M")
        .map_err(|_| format!("invalid time '{s}', expected HH:MM").into())
}
