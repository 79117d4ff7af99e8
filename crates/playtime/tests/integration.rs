//! Integration tests for playtime
//!
//! These tests drive the tracker end to end: config file, CSV session log,
//! corrected time source, and a restart in between.

use chrono::{DateTime, Duration, Local, NaiveDate, TimeZone, Utc};
use playtime_clock::{ManualClock, MockAuthority, SntpAuthority, TimeSource};
use playtime_config::{DayKind, load_config, load_config_or_default};
use playtime_core::{SessionTracker, TrackerError, TrackerEvent, UsageLevel};
use playtime_store::{CsvLedger, SessionLedger};
use std::path::Path;
use std::sync::Arc;

fn local(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
    Local
        .with_ymd_and_hms(y, mo, d, h, mi, 0)
        .unwrap()
        .with_timezone(&Utc)
}

fn write_config(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("config.json");
    std::fs::write(
        &path,
        r#"{
            "weekday_limit_minutes": 60,
            "weekend_limit_minutes": 120,
            "holidays": ["2024-12-25"],
            "games": ["Minecraft", "VR"]
        }"#,
    )
    .unwrap();
    path
}

fn tracker_at(
    config: &Path,
    ledger: &Path,
    clock: Arc<ManualClock>,
    authority: Arc<MockAuthority>,
) -> SessionTracker {
    let policy = load_config_or_default(config);
    let time = Arc::new(TimeSource::new(clock, authority));
    SessionTracker::open(policy, Arc::new(CsvLedger::new(ledger)), time).unwrap()
}

#[tokio::test]
async fn test_holiday_session_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path());
    let ledger_path = dir.path().join("data").join("playtime_log.csv");

    let clock = Arc::new(ManualClock::new(local(2024, 12, 25, 9, 0)));
    let authority = Arc::new(MockAuthority::new(clock.clone()));
    let mut tracker = tracker_at(&config, &ledger_path, clock.clone(), authority.clone());

    tracker.start("Minecraft").await.unwrap();
    clock.set(local(2024, 12, 25, 9, 30));
    let report = tracker.tick().unwrap();
    assert_eq!(report.elapsed, Duration::minutes(30));
    assert_eq!(report.usage.limit_minutes, 120);
    assert!(!report.exceeded);

    clock.set(local(2024, 12, 25, 10, 5));
    tracker.stop().unwrap();
    drop(tracker);

    // A new process sees the same day through the log alone
    let tracker = tracker_at(&config, &ledger_path, clock, authority);
    let christmas = NaiveDate::from_ymd_opt(2024, 12, 25).unwrap();
    assert_eq!(tracker.daily_usage(christmas).unwrap().total_minutes(), 65);

    let summary = tracker.summary().unwrap();
    assert_eq!(summary.day_kind, DayKind::Holiday);
    assert_eq!(summary.remaining_minutes, 55);

    let contents = std::fs::read_to_string(&ledger_path).unwrap();
    assert_eq!(
        contents,
        "date,start_time,end_time,duration_minutes,game\n\
         2024-12-25,2024-12-25 09:00:00,2024-12-25 10:05:00,65,Minecraft\n"
    );
}

#[tokio::test]
async fn test_clock_tampering_is_corrected_at_start() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path());
    let ledger_path = dir.path().join("playtime_log.csv");

    // A Thursday; weekday limit 60. The local clock has been wound back
    // 50 minutes to make earlier play look shorter.
    let clock = Arc::new(ManualClock::new(local(2024, 12, 26, 15, 0)));
    let authority =
        Arc::new(MockAuthority::new(clock.clone()).with_skew(Duration::minutes(50)));
    let mut tracker = tracker_at(&config, &ledger_path, clock.clone(), authority.clone());

    let events = tracker.start("VR").await.unwrap();
    assert!(matches!(events[0], TrackerEvent::TimeResynced { .. }));

    clock.advance(Duration::minutes(50));
    let report = tracker.tick().unwrap();
    assert_eq!(report.usage.level, UsageLevel::Warning);

    clock.advance(Duration::minutes(15));
    let report = tracker.tick().unwrap();
    assert!(report.exceeded);
    assert!(report
        .events
        .iter()
        .any(|e| matches!(e, TrackerEvent::LimitReached { limit_minutes: 60, .. })));

    let stopped = tracker.stop().unwrap();
    assert_eq!(
        stopped.record.start_time,
        NaiveDate::from_ymd_opt(2024, 12, 26)
            .unwrap()
            .and_hms_opt(15, 50, 0)
            .unwrap()
    );
    assert_eq!(stopped.record.duration_minutes, 65);
}

#[tokio::test]
async fn test_unreachable_time_server_falls_back_to_local_clock() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path());
    let ledger_path = dir.path().join("playtime_log.csv");

    let clock = Arc::new(ManualClock::new(local(2024, 12, 28, 10, 0)));
    let authority = Arc::new(MockAuthority::unreachable(clock.clone()));
    let mut tracker = tracker_at(&config, &ledger_path, clock.clone(), authority);

    let events = tracker.start("").await.unwrap();
    assert!(matches!(events[0], TrackerEvent::TimeSyncFailed { .. }));

    clock.advance(Duration::minutes(12));
    let stopped = tracker.stop().unwrap();
    assert_eq!(stopped.record.duration_minutes, 12);
    assert_eq!(stopped.record.activity, "");

    // Saturday
    assert_eq!(tracker.summary().unwrap().day_kind, DayKind::Weekend);
    assert!(matches!(tracker.stop(), Err(TrackerError::NotActive)));
}

#[tokio::test]
async fn test_legacy_log_is_repaired_and_counted() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path());
    let ledger_path = dir.path().join("playtime_log.csv");
    std::fs::write(
        &ledger_path,
        "2024-12-26,09:00 AM,09:40 AM,40.0,Roblox\n2024-12-26,garbage\n",
    )
    .unwrap();

    let clock = Arc::new(ManualClock::new(local(2024, 12, 26, 11, 0)));
    let authority = Arc::new(MockAuthority::new(clock.clone()));
    let mut tracker = tracker_at(&config, &ledger_path, clock.clone(), authority);

    tracker.start("VR").await.unwrap();
    let report = tracker.tick().unwrap();
    assert_eq!(report.usage.used_minutes, 40);
    assert!(matches!(
        report.events.as_slice(),
        [TrackerEvent::RecordSkipped { line: 3, .. }]
    ));

    clock.advance(Duration::minutes(10));
    tracker.stop().unwrap();

    let ledger = CsvLedger::new(&ledger_path);
    let scan = ledger.read_all().unwrap();
    assert_eq!(scan.records.len(), 2);
    assert_eq!(scan.skipped.len(), 1);
    assert_eq!(scan.minutes_on(NaiveDate::from_ymd_opt(2024, 12, 26).unwrap()), 50);
}

#[test]
fn test_example_config_is_valid() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../config.example.json");
    let policy = load_config(&path).unwrap();
    assert!(!policy.activities.is_empty());
}

#[tokio::test]
async fn test_sntp_authority_against_silent_server_times_out() {
    let silent = tokio::net::UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let authority = Arc::new(SntpAuthority::new(
        silent.local_addr().unwrap().to_string(),
        std::time::Duration::from_millis(200),
    ));
    let time = TimeSource::system(authority);

    let before = time.offset();
    assert!(!time.resync().await.is_resynced());
    assert_eq!(time.offset(), before);
}
