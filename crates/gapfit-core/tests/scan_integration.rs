//! End-to-end scan tests: sources through merge, detection, classification,
//! and the notification decision.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};

use gapfit_core::{
    calendar::CalendarEventSource, CalendarEvent, ChannelSink, CoreError, GapDetector,
    GapQuality, GapQualityClassifier, GapSchedulingService, MemoryHistoryStore,
    NotificationHistoryStore, NotificationKind, NotificationRuleEngine, ScanRequest, SourceError,
    StaticCalendarSource, TimeWindow,
};

fn at(h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, h, m, 0).unwrap()
}

fn event(id: &str, title: &str, start: DateTime<Utc>, end: DateTime<Utc>, source: &str) -> CalendarEvent {
    CalendarEvent::new(id, title, start, end, source)
}

fn service(
    sources: Vec<Arc<dyn CalendarEventSource>>,
) -> (
    Arc<GapSchedulingService>,
    Arc<MemoryHistoryStore>,
    tokio::sync::mpsc::UnboundedReceiver<gapfit_core::NotificationDecision>,
) {
    let history = Arc::new(MemoryHistoryStore::new());
    let (sink, receiver) = ChannelSink::new();
    let service = GapSchedulingService::new(
        sources,
        GapDetector::new(),
        GapQualityClassifier::with_seed(7),
        NotificationRuleEngine::new(),
        history.clone(),
        Arc::new(sink),
    );
    (Arc::new(service), history, receiver)
}

/// A source that always fails, for partial-failure scans.
struct FailingSource;

#[async_trait]
impl CalendarEventSource for FailingSource {
    fn source_id(&self) -> &str {
        "broken"
    }

    async fn fetch_events(&self, _window: TimeWindow) -> Result<Vec<CalendarEvent>, SourceError> {
        Err(SourceError::Unreachable {
            source_id: "broken".to_string(),
            message: "connection refused".to_string(),
        })
    }
}

/// A source that stalls until told to finish, for busy/cancel tests.
struct SlowSource {
    release: tokio::sync::Semaphore,
}

impl SlowSource {
    fn new() -> Self {
        Self {
            release: tokio::sync::Semaphore::new(0),
        }
    }
}

#[async_trait]
impl CalendarEventSource for SlowSource {
    fn source_id(&self) -> &str {
        "slow"
    }

    async fn fetch_events(&self, _window: TimeWindow) -> Result<Vec<CalendarEvent>, SourceError> {
        let _permit = self.release.acquire().await;
        Ok(Vec::new())
    }
}

/// A source whose fetch never resolves.
struct StalledSource;

#[async_trait]
impl CalendarEventSource for StalledSource {
    fn source_id(&self) -> &str {
        "stalled"
    }

    async fn fetch_events(&self, _window: TimeWindow) -> Result<Vec<CalendarEvent>, SourceError> {
        std::future::pending().await
    }
}

#[tokio::test]
async fn empty_window_yields_one_full_length_gap() {
    // No events at all: the whole 300s window is one gap.
    let now = at(10, 0);
    let (service, _, mut receiver) = service(vec![Arc::new(StaticCalendarSource::new(
        "work",
        Vec::new(),
    ))]);

    let request = ScanRequest {
        now,
        window: TimeWindow::new(now, now + Duration::seconds(300)),
        calendar_authorized: true,
        current_streak: 2,
        hours_since_last_activity: 4.0,
    };
    let outcome = service.scan(request).await.unwrap();

    assert_eq!(outcome.gaps.len(), 1);
    assert_eq!(outcome.gaps[0].duration_secs(), 300);
    assert_eq!(outcome.gaps[0].quality, GapQuality::Excellent); // 10:00 is in 6-20

    // A 5-minute gap right now is a perfect gap.
    let decision = outcome.decision.expect("expected a decision");
    assert_eq!(decision.kind, NotificationKind::PerfectGap);
    assert_eq!(receiver.try_recv().unwrap().id, decision.id);
}

#[tokio::test]
async fn between_gap_detected_and_classified() {
    // Two short meetings leave a three-minute between-gap.
    let now = at(10, 0);
    let source = StaticCalendarSource::new(
        "work",
        vec![
            event("1", "Standup", at(10, 0), at(10, 2), "work"),
            event("2", "Review", at(10, 5), at(10, 6), "work"),
        ],
    );
    let (service, _, _receiver) = service(vec![Arc::new(source)]);

    let request = ScanRequest {
        now,
        window: TimeWindow::new(now, now + Duration::minutes(10)),
        calendar_authorized: true,
        current_streak: 2,
        hours_since_last_activity: 4.0,
    };
    let outcome = service.scan(request).await.unwrap();

    // 10:06-10:10 trail is 240s, also valid; the between gap comes first.
    assert_eq!(outcome.gaps[0].start, at(10, 2));
    assert_eq!(outcome.gaps[0].end, at(10, 5));
    assert_eq!(outcome.gaps[0].duration_secs(), 180);
    assert_eq!(outcome.gaps[0].quality, GapQuality::Excellent);
}

#[tokio::test]
async fn duplicate_event_across_sources_merges() {
    // The same "Standup" meeting at 09:00 appears in two connected calendars.
    let now = at(8, 58);
    let work = StaticCalendarSource::new(
        "work",
        vec![event("a", "Standup", at(9, 0), at(9, 50), "work")],
    );
    let personal = StaticCalendarSource::new(
        "personal",
        vec![event("b", "standup", at(9, 0), at(9, 50), "personal")],
    );
    let (service, _, _receiver) = service(vec![Arc::new(work), Arc::new(personal)]);

    let request = ScanRequest {
        now,
        window: TimeWindow::new(at(9, 0), at(9, 53)),
        calendar_authorized: true,
        current_streak: 0,
        hours_since_last_activity: 1.0,
    };
    let outcome = service.scan(request).await.unwrap();

    // One merged event: only the trail gap 09:50-09:53 remains. A duplicate
    // kept from the second source would have produced the same busy block,
    // but the merge is observable through the gap's source set.
    assert_eq!(outcome.gaps.len(), 1);
    assert_eq!(outcome.gaps[0].start, at(9, 50));
    assert_eq!(outcome.gaps[0].source_set, vec!["work".to_string()]);
}

#[tokio::test]
async fn failing_source_degrades_but_scan_continues() {
    let now = at(10, 0);
    let good = StaticCalendarSource::new(
        "work",
        vec![
            event("1", "A", at(10, 0), at(10, 2), "work"),
            event("2", "B", at(10, 5), at(10, 6), "work"),
        ],
    );
    let (service, _, _receiver) = service(vec![Arc::new(FailingSource), Arc::new(good)]);

    let request = ScanRequest {
        now,
        window: TimeWindow::new(now, now + Duration::minutes(10)),
        calendar_authorized: true,
        current_streak: 2,
        hours_since_last_activity: 4.0,
    };
    let outcome = service.scan(request).await.unwrap();

    assert!(!outcome.gaps.is_empty());
    assert_eq!(outcome.warnings.len(), 1);
    assert!(outcome.warnings[0].contains("broken"));
}

#[tokio::test]
async fn missing_authorization_skips_scan() {
    let now = at(10, 0);
    let (service, history, _receiver) = service(vec![Arc::new(StaticCalendarSource::new(
        "work",
        Vec::new(),
    ))]);

    let request = ScanRequest {
        now,
        window: TimeWindow::new(now, now + Duration::hours(1)),
        calendar_authorized: false,
        current_streak: 2,
        hours_since_last_activity: 4.0,
    };
    let outcome = service.scan(request).await.unwrap();

    assert!(outcome.gaps.is_empty());
    assert!(outcome.decision.is_none());
    assert!(outcome.warnings[0].contains("authorization"));
    assert!(history.recent_records(now - Duration::days(1)).unwrap().is_empty());
}

#[tokio::test]
async fn concurrent_scan_is_dropped() {
    let now = at(10, 0);
    let slow = Arc::new(SlowSource::new());
    let (service, _, _receiver) = service(vec![slow.clone()]);

    let request = ScanRequest {
        now,
        window: TimeWindow::new(now, now + Duration::hours(1)),
        calendar_authorized: true,
        current_streak: 2,
        hours_since_last_activity: 4.0,
    };

    let first = tokio::spawn({
        let service = service.clone();
        let request = request.clone();
        async move { service.scan(request).await }
    });

    // Wait until the first scan is actually fetching.
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    let second = service.scan(request).await;
    assert!(matches!(second, Err(CoreError::ScanInProgress)));

    slow.release.add_permits(1);
    assert!(first.await.unwrap().is_ok());
}

#[tokio::test]
async fn cancelled_scan_publishes_nothing() {
    let now = at(10, 0);
    let slow = Arc::new(SlowSource::new());
    let (service, history, mut receiver) = service(vec![slow.clone()]);

    let request = ScanRequest {
        now,
        window: TimeWindow::new(now, now + Duration::hours(1)),
        calendar_authorized: true,
        current_streak: 2,
        hours_since_last_activity: 4.0,
    };

    let handle = tokio::spawn({
        let service = service.clone();
        async move { service.scan(request).await }
    });

    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    service.cancel();
    slow.release.add_permits(1);

    let result = handle.await.unwrap();
    assert!(matches!(result, Err(CoreError::ScanCancelled)));
    assert!(service.last_gaps().is_empty());
    assert!(receiver.try_recv().is_err());
    assert!(history.recent_records(now - Duration::days(1)).unwrap().is_empty());
}

#[tokio::test]
async fn cancel_interrupts_fetch_that_never_resolves() {
    // Cancellation must not wait for the sources; a hung fetch (calendar
    // access revoked mid-flight) still ends the scan.
    let now = at(10, 0);
    let (service, _, mut receiver) = service(vec![Arc::new(StalledSource)]);

    let request = ScanRequest {
        now,
        window: TimeWindow::new(now, now + Duration::hours(1)),
        calendar_authorized: true,
        current_streak: 2,
        hours_since_last_activity: 4.0,
    };

    let handle = tokio::spawn({
        let service = service.clone();
        async move { service.scan(request).await }
    });

    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    service.cancel();

    let result = tokio::time::timeout(std::time::Duration::from_secs(2), handle)
        .await
        .expect("cancelled scan should finish promptly")
        .unwrap();
    assert!(matches!(result, Err(CoreError::ScanCancelled)));
    assert!(receiver.try_recv().is_err());
}
