//! `scan` and `gaps` subcommands.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{Duration, Utc};
use clap::Args;

use gapfit_core::{
    CalendarEvent, CalendarEventSource, ChannelSink, Config, EventMerger, Gap, GapDetector,
    GapQualityClassifier, GapSchedulingService, JsonCalendarSource, NotificationHistoryStore,
    NotificationRuleEngine, ScanRequest, SqliteHistoryStore, StaticCalendarSource, TimeWindow,
};

#[derive(Args)]
pub struct ScanArgs {
    /// JSON event files, one per calendar source in priority order
    #[arg(long = "events", value_name = "FILE")]
    pub event_files: Vec<PathBuf>,
    /// Scan window length in hours (default from config)
    #[arg(long)]
    pub hours: Option<i64>,
    /// Current activity streak in days
    #[arg(long, default_value_t = 0)]
    pub streak: u32,
    /// Hours since the last completed activity
    #[arg(long, default_value_t = 0.0)]
    pub since_activity: f64,
    /// Fixed seed for the activity suggestion
    #[arg(long)]
    pub seed: Option<u64>,
}

#[derive(Args)]
pub struct GapsArgs {
    /// JSON event files, one per calendar source in priority order
    #[arg(long = "events", value_name = "FILE")]
    pub event_files: Vec<PathBuf>,
    /// Scan window length in hours (default from config)
    #[arg(long)]
    pub hours: Option<i64>,
    /// Fixed seed for the activity suggestion
    #[arg(long)]
    pub seed: Option<u64>,
}

pub fn run_scan(args: ScanArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    config.validate()?;

    let history = Arc::new(SqliteHistoryStore::open()?);
    // config.toml is the authority on policy; mirror it into the store the
    // rule engine reads from.
    history.save_policy(&config.policy())?;

    let (sink, mut receiver) = ChannelSink::new();
    let service = GapSchedulingService::new(
        build_sources(&args.event_files),
        detector_from(&config),
        classifier_from(args.seed),
        NotificationRuleEngine::new(),
        history,
        Arc::new(sink),
    );

    let now = Utc::now();
    let hours = args.hours.unwrap_or(config.scan.scan_window_hours);
    let request = ScanRequest::hours_from(now, hours, args.streak, args.since_activity);

    let runtime = tokio::runtime::Runtime::new()?;
    let outcome = runtime.block_on(service.scan(request))?;

    for warning in &outcome.warnings {
        eprintln!("warning: {warning}");
    }
    print_gaps(&outcome.gaps);

    match receiver.try_recv() {
        Ok(decision) => {
            println!();
            println!("notification authorized: {}", decision.kind.as_str());
            println!("  {}", decision.title);
            println!("  {}", decision.body);
            println!("  trigger at {}", decision.trigger_at.format("%Y-%m-%d %H:%M"));
        }
        Err(_) => println!("\nno notification authorized"),
    }
    Ok(())
}

pub fn run_gaps(args: GapsArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    config.validate()?;

    let now = Utc::now();
    let hours = args.hours.unwrap_or(config.scan.scan_window_hours);
    let window = TimeWindow::new(now, now + Duration::hours(hours));
    let sources = build_sources(&args.event_files);

    let runtime = tokio::runtime::Runtime::new()?;
    let mut event_lists = Vec::new();
    for source in &sources {
        match runtime.block_on(source.fetch_events(window)) {
            Ok(events) => event_lists.push(events),
            Err(err) => eprintln!("warning: source '{}' failed: {err}", err.source_id()),
        }
    }

    let merged = EventMerger::new().merge(&event_lists);
    let candidates = detector_from(&config).find_gaps(&merged, window);
    let gaps = classifier_from(args.seed).apply(candidates);
    print_gaps(&gaps);
    Ok(())
}

fn build_sources(event_files: &[PathBuf]) -> Vec<Arc<dyn CalendarEventSource>> {
    if event_files.is_empty() {
        return vec![Arc::new(demo_source())];
    }
    event_files
        .iter()
        .enumerate()
        .map(|(i, path)| {
            Arc::new(JsonCalendarSource::new(format!("file-{i}"), path.clone()))
                as Arc<dyn CalendarEventSource>
        })
        .collect()
}

/// A small synthetic calendar around "now" so the command does something
/// useful without input files.
fn demo_source() -> StaticCalendarSource {
    let now = Utc::now();
    StaticCalendarSource::new(
        "demo",
        vec![
            CalendarEvent::new(
                "demo-1",
                "Deep work",
                now + Duration::minutes(5),
                now + Duration::minutes(55),
                "demo",
            ),
            CalendarEvent::new(
                "demo-2",
                "Team sync",
                now + Duration::minutes(58),
                now + Duration::minutes(85),
                "demo",
            ),
        ],
    )
}

fn detector_from(config: &Config) -> GapDetector {
    GapDetector::new()
        .with_min_gap(config.scan.min_gap_seconds)
        .with_max_gap(config.scan.max_gap_seconds)
}

fn classifier_from(seed: Option<u64>) -> GapQualityClassifier {
    match seed {
        Some(seed) => GapQualityClassifier::with_seed(seed),
        None => GapQualityClassifier::new(),
    }
}

fn print_gaps(gaps: &[Gap]) {
    if gaps.is_empty() {
        println!("no gaps found");
        return;
    }
    println!("{} gap(s):", gaps.len());
    for gap in gaps {
        println!(
            "  {} - {}  {:>3}s  {:<9}  {}",
            gap.start.format("%H:%M:%S"),
            gap.end.format("%H:%M:%S"),
            gap.duration_secs(),
            format!("{:?}", gap.quality).to_lowercase(),
            gap.suggested_activity.label(),
        );
    }
}
