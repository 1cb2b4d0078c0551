//! Scan orchestration: fetch, merge, detect, classify, decide.
//!
//! [`GapSchedulingService`] drives one full scan. Source fetches run
//! concurrently (one task per source) and are joined before the rest of the
//! pipeline, which is sequential so ordering stays deterministic. The core
//! holds no background timer; an external caller (timer tick, foreground
//! event, pull-to-refresh) triggers each scan.
//!
//! At most one scan is in flight at a time. A scan requested while another
//! is running is dropped with [`CoreError::ScanInProgress`]; callers driven
//! by a timer simply retry on the next tick. An in-flight scan can be
//! cancelled cooperatively via [`GapSchedulingService::cancel`], ending in
//! `Idle` with no gaps published.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::calendar::{CalendarEvent, CalendarEventSource, EventMerger, TimeWindow};
use crate::error::{CoreError, Result};
use crate::gap::{Gap, GapDetector, GapQuality, GapQualityClassifier};
use crate::notify::{
    DecisionContext, NotificationHistoryStore, NotificationKind, NotificationRecord,
    NotificationRuleEngine,
};

/// Scan pipeline state, observable for display layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanState {
    Idle,
    Fetching,
    Merging,
    Detecting,
    Classifying,
    Deciding,
    Emitting,
}

/// The decision the external delivery sink acts upon. The core never calls
/// OS notification APIs itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationDecision {
    pub id: Uuid,
    pub kind: NotificationKind,
    pub title: String,
    pub body: String,
    pub trigger_at: DateTime<Utc>,
    pub gap: Gap,
    pub payload: serde_json::Value,
}

/// Receives authorized decisions. OS-level scheduling lives behind this.
pub trait NotificationDeliverySink: Send + Sync {
    fn deliver(&self, decision: NotificationDecision);
}

/// Sink adapter over a typed channel, replacing stringly-keyed global
/// broadcasts: consumers subscribe to the receiver end.
pub struct ChannelSink {
    sender: tokio::sync::mpsc::UnboundedSender<NotificationDecision>,
}

impl ChannelSink {
    pub fn new() -> (Self, tokio::sync::mpsc::UnboundedReceiver<NotificationDecision>) {
        let (sender, receiver) = tokio::sync::mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl NotificationDeliverySink for ChannelSink {
    fn deliver(&self, decision: NotificationDecision) {
        // Receiver dropped means nobody is listening anymore; nothing to do.
        let _ = self.sender.send(decision);
    }
}

/// Per-scan inputs supplied by the caller.
#[derive(Debug, Clone)]
pub struct ScanRequest {
    pub now: DateTime<Utc>,
    pub window: TimeWindow,
    /// Whether the app currently has calendar access at all.
    pub calendar_authorized: bool,
    pub current_streak: u32,
    pub hours_since_last_activity: f64,
}

impl ScanRequest {
    /// Scan the given number of hours starting from `now`.
    pub fn hours_from(now: DateTime<Utc>, hours: i64, streak: u32, hours_since_activity: f64) -> Self {
        Self {
            now,
            window: TimeWindow::new(now, now + Duration::hours(hours)),
            calendar_authorized: true,
            current_streak: streak,
            hours_since_last_activity: hours_since_activity,
        }
    }
}

/// Result of one scan.
#[derive(Debug, Clone)]
pub struct ScanOutcome {
    pub gaps: Vec<Gap>,
    pub decision: Option<NotificationDecision>,
    /// Soft warnings: per-source fetch failures, history write failures.
    pub warnings: Vec<String>,
}

/// Orchestrates the full scan pipeline and emits notification decisions.
pub struct GapSchedulingService {
    sources: Vec<Arc<dyn CalendarEventSource>>,
    merger: EventMerger,
    detector: GapDetector,
    classifier: Mutex<GapQualityClassifier>,
    engine: NotificationRuleEngine,
    history: Arc<dyn NotificationHistoryStore>,
    sink: Arc<dyn NotificationDeliverySink>,
    busy: AtomicBool,
    /// Cancellation signal. A watch channel rather than a plain flag so the
    /// fetch join can be interrupted while every source is still pending.
    cancel: watch::Sender<bool>,
    state: Mutex<ScanState>,
    /// Last computed gap set, replaced atomically after each scan.
    last_gaps: Mutex<Vec<Gap>>,
}

impl GapSchedulingService {
    pub fn new(
        sources: Vec<Arc<dyn CalendarEventSource>>,
        detector: GapDetector,
        classifier: GapQualityClassifier,
        engine: NotificationRuleEngine,
        history: Arc<dyn NotificationHistoryStore>,
        sink: Arc<dyn NotificationDeliverySink>,
    ) -> Self {
        Self {
            sources,
            merger: EventMerger::new(),
            detector,
            classifier: Mutex::new(classifier),
            engine,
            history,
            sink,
            busy: AtomicBool::new(false),
            cancel: watch::channel(false).0,
            state: Mutex::new(ScanState::Idle),
            last_gaps: Mutex::new(Vec::new()),
        }
    }

    /// Current pipeline state.
    pub fn state(&self) -> ScanState {
        self.state.lock().map(|s| *s).unwrap_or(ScanState::Idle)
    }

    /// Gap set from the most recent completed scan.
    pub fn last_gaps(&self) -> Vec<Gap> {
        self.last_gaps.lock().map(|g| g.clone()).unwrap_or_default()
    }

    /// Request cooperative cancellation of the in-flight scan. No-op when
    /// idle.
    pub fn cancel(&self) {
        self.cancel.send_replace(true);
    }

    /// Run one full scan.
    ///
    /// Independent source failures degrade merge inputs but do not abort the
    /// scan; they come back as warnings. A request without calendar
    /// authorization skips everything and returns an empty gap set with a
    /// warning, leaving the caller to prompt the user.
    pub async fn scan(&self, request: ScanRequest) -> Result<ScanOutcome> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(CoreError::ScanInProgress);
        }
        self.cancel.send_replace(false);

        let result = self.run_pipeline(&request).await;

        self.set_state(ScanState::Idle);
        self.busy.store(false, Ordering::SeqCst);
        result
    }

    async fn run_pipeline(&self, request: &ScanRequest) -> Result<ScanOutcome> {
        let mut warnings = Vec::new();

        if !request.calendar_authorized {
            warnings.push("calendar authorization missing, scan skipped".to_string());
            return Ok(ScanOutcome {
                gaps: Vec::new(),
                decision: None,
                warnings,
            });
        }

        // Fetch from every source concurrently, then join.
        self.set_state(ScanState::Fetching);
        let event_lists = self.fetch_all(request.window, &mut warnings).await;
        self.check_cancelled()?;

        // Any fetch failure still moves us to Merging with partial data.
        self.set_state(ScanState::Merging);
        let merged = self.merger.merge(&event_lists);
        self.check_cancelled()?;

        self.set_state(ScanState::Detecting);
        let candidates = self.detector.find_gaps(&merged, request.window);
        self.check_cancelled()?;

        self.set_state(ScanState::Classifying);
        let gaps = match self.classifier.lock() {
            Ok(mut classifier) => classifier.apply(candidates),
            Err(poisoned) => poisoned.into_inner().apply(candidates),
        };
        self.check_cancelled()?;

        if let Ok(mut last) = self.last_gaps.lock() {
            *last = gaps.clone();
        }

        self.set_state(ScanState::Deciding);
        let decision = self.decide(request, &gaps, &mut warnings);

        if let Some(ref decision) = decision {
            self.set_state(ScanState::Emitting);
            self.sink.deliver(decision.clone());
            // A logging failure must not degrade the notification
            // experience: record the send, warn on error, move on.
            let record = NotificationRecord::sent(decision.kind, request.now);
            if let Err(err) = self.history.append(record) {
                warn!(error = %err, "failed to record notification send");
                warnings.push(format!("history write failed: {err}"));
            }
        }

        Ok(ScanOutcome {
            gaps,
            decision,
            warnings,
        })
    }

    async fn fetch_all(
        &self,
        window: TimeWindow,
        warnings: &mut Vec<String>,
    ) -> Vec<Vec<CalendarEvent>> {
        let mut tasks: JoinSet<(usize, std::result::Result<Vec<CalendarEvent>, crate::error::SourceError>)> =
            JoinSet::new();

        for (index, source) in self.sources.iter().enumerate() {
            let source = Arc::clone(source);
            tasks.spawn(async move { (index, source.fetch_events(window).await) });
        }

        // Slots keep source-priority order regardless of join order.
        let mut slots: Vec<Option<Vec<CalendarEvent>>> = vec![None; self.sources.len()];
        let mut cancelled = self.cancel.subscribe();
        loop {
            // The join races the cancel signal so a fetch that never resolves
            // can still be interrupted. `wait_for` also catches a cancel that
            // fired before this loop started.
            let joined = tokio::select! {
                joined = tasks.join_next() => match joined {
                    Some(joined) => joined,
                    None => break,
                },
                _ = cancelled.wait_for(|&c| c) => {
                    tasks.abort_all();
                    break;
                }
            };
            match joined {
                Ok((index, Ok(events))) => slots[index] = Some(events),
                Ok((index, Err(err))) => {
                    warn!(source_id = err.source_id(), error = %err, "source fetch failed");
                    warnings.push(format!("source '{}' failed: {err}", err.source_id()));
                    slots[index] = None;
                }
                Err(join_err) => {
                    warn!(error = %join_err, "source fetch task failed");
                    warnings.push(format!("source task failed: {join_err}"));
                }
            }
        }

        slots.into_iter().flatten().collect()
    }

    /// Pick the best upcoming gap and ask the rule engine whether to notify.
    fn decide(
        &self,
        request: &ScanRequest,
        gaps: &[Gap],
        warnings: &mut Vec<String>,
    ) -> Option<NotificationDecision> {
        let best = best_upcoming_gap(gaps, request.now)?;
        if best.quality == GapQuality::Poor {
            debug!("best gap is poor quality, no notification");
            return None;
        }

        let policy = match self.history.load_policy() {
            Ok(policy) => policy,
            Err(err) => {
                warnings.push(format!("policy unreadable, using defaults: {err}"));
                Default::default()
            }
        };

        let context = DecisionContext::build(
            request.now,
            request.current_streak,
            request.hours_since_last_activity,
            Some(best.clone()),
            self.history.as_ref(),
        );

        // Perfect-gap is the more specific claim; try it before the plain
        // reminder.
        for kind in [NotificationKind::PerfectGap, NotificationKind::GapReminder] {
            if self
                .engine
                .should_send(kind, &context, &policy, self.history.as_ref())
            {
                return Some(render_decision(kind, best, request.now));
            }
        }
        None
    }

    fn set_state(&self, state: ScanState) {
        debug!(?state, "scan state");
        if let Ok(mut current) = self.state.lock() {
            *current = state;
        }
    }

    fn check_cancelled(&self) -> Result<()> {
        if *self.cancel.borrow() {
            debug!("scan cancelled");
            Err(CoreError::ScanCancelled)
        } else {
            Ok(())
        }
    }
}

/// Highest quality first, then soonest start.
fn best_upcoming_gap<'a>(gaps: &'a [Gap], now: DateTime<Utc>) -> Option<&'a Gap> {
    gaps.iter()
        .filter(|g| g.start >= now)
        .max_by(|a, b| {
            a.quality
                .cmp(&b.quality)
                .then_with(|| b.start.cmp(&a.start))
        })
}

fn render_decision(kind: NotificationKind, gap: &Gap, now: DateTime<Utc>) -> NotificationDecision {
    let minutes = gap.duration_minutes().max(1);
    let activity = gap.suggested_activity.label();
    let (title, body) = match kind {
        NotificationKind::PerfectGap => (
            "Perfect workout window".to_string(),
            format!("You're free for {minutes} minutes at {}. Ideal for a {activity}.", gap.start.format("%H:%M")),
        ),
        NotificationKind::GapReminder => (
            format!("{minutes}-minute break coming up"),
            format!("Squeeze in a quick {activity} at {}.", gap.start.format("%H:%M")),
        ),
        NotificationKind::StreakRisk => (
            "Your streak is at risk".to_string(),
            format!("A quick {activity} now keeps it alive."),
        ),
        NotificationKind::DailyCheck => (
            "Time to move".to_string(),
            format!("It's been a while. Start small with a {activity}."),
        ),
    };

    NotificationDecision {
        id: Uuid::new_v4(),
        kind,
        title,
        body,
        trigger_at: gap.start.max(now),
        gap: gap.clone(),
        payload: serde_json::json!({
            "gap_start": gap.start,
            "gap_end": gap.end,
            "activity": gap.suggested_activity,
        }),
    }
}
