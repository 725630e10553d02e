use std::sync::Arc;

use url::Url;
use vitalscope::{
    collect::{
        CollectorUpdate,
        network::{NetworkResourceEntry, NetworkView},
        timeline::{TimelineEntry, TimelineEntryKind, TimelineModel},
        update_channel,
    },
    session::{
        ManualClock, RecordingState, SessionHandle,
        aggregator::{scope_network, spawn_aggregator},
        snapshot::SnapshotUpdate,
    },
    vitals::{VitalName, VitalRating, VitalsView, WebVitalMetric},
};

fn session_with_clock(start_ms: f64) -> (SessionHandle, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(start_ms, 1_700_000_000_000));
    (SessionHandle::new(clock.clone(), 50), clock)
}

fn timeline_model(entry_count: usize) -> TimelineModel {
    let entries: Vec<TimelineEntry> = (0..entry_count)
        .map(|index| TimelineEntry {
            id: format!("paint-p{index}-{index}.00"),
            name: format!("p{index}"),
            start_time: index as f64,
            duration: 1.0,
            kind: TimelineEntryKind::Paint,
            detail: None,
            value: None,
        })
        .collect();
    let end_time = entries
        .iter()
        .map(|entry| entry.start_time + entry.duration)
        .fold(0.0_f64, f64::max);
    TimelineModel {
        entries,
        time_origin: 0.0,
        end_time,
    }
}

fn network_entry(url: &str, start: f64) -> NetworkResourceEntry {
    NetworkResourceEntry {
        id: format!("{url}-{start:.2}"),
        url: url.to_string(),
        name: "res".to_string(),
        start_time: start,
        duration: 10.0,
        size: Some(100.0),
        initiator: "script".to_string(),
        timing: None,
    }
}

fn vitals_view(name: VitalName, value: f64, rating: VitalRating) -> VitalsView {
    VitalsView {
        metrics_list: vec![WebVitalMetric {
            name,
            value,
            rating,
            delta: value,
            id: "v1".to_string(),
            navigation_type: "navigate".to_string(),
        }],
        history: Vec::new(),
    }
}

#[test]
fn start_is_noop_while_recording() {
    let (session, _clock) = session_with_clock(100.0);
    session.start();
    let first_id = session.session_id().expect("id after start");
    session.start();
    assert_eq!(session.session_id().expect("id unchanged"), first_id);
    assert_eq!(session.state(), RecordingState::Recording);
    assert_eq!(session.session_anchor(), Some(100.0));
}

#[test]
fn stop_then_start_produces_fresh_session() {
    let (session, clock) = session_with_clock(100.0);
    session.start();
    let first_id = session.session_id().expect("first id");

    session.update_snapshot(SnapshotUpdate {
        timeline: Some(timeline_model(3)),
        ..SnapshotUpdate::default()
    });
    clock.set_ms(500.0);
    session.stop();
    assert_eq!(session.state(), RecordingState::Stopped);

    let history = session.runs_history();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].session_id, first_id);
    assert_eq!(history[0].summary.timeline_entry_count, 3);

    clock.set_ms(600.0);
    session.start();
    let second_id = session.session_id().expect("second id");
    assert_ne!(second_id, first_id);
    assert!(session.snapshot().timeline.entries.is_empty());
    assert_eq!(session.session_anchor(), Some(600.0));

    // The prior run record is unchanged at index 0.
    let history = session.runs_history();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].session_id, first_id);
    assert_eq!(history[0].summary.timeline_entry_count, 3);
}

#[test]
fn stop_without_recording_is_noop() {
    let (session, _clock) = session_with_clock(0.0);
    session.stop();
    assert!(session.runs_history().is_empty());
    assert_eq!(session.state(), RecordingState::Idle);
}

#[test]
fn reset_is_idempotent() {
    let (session, _clock) = session_with_clock(50.0);
    session.start();
    session.update_snapshot(SnapshotUpdate {
        timeline: Some(timeline_model(2)),
        ..SnapshotUpdate::default()
    });

    session.reset();
    assert_eq!(session.state(), RecordingState::Idle);
    assert_eq!(session.session_id(), None);
    assert_eq!(session.session_anchor(), None);
    assert!(session.snapshot().timeline.entries.is_empty());

    session.reset();
    assert_eq!(session.state(), RecordingState::Idle);
    assert_eq!(session.session_id(), None);
    assert!(session.snapshot().timeline.entries.is_empty());
}

#[test]
fn history_is_bounded_newest_first() {
    let clock = Arc::new(ManualClock::new(0.0, 1_700_000_000_000));
    let session = SessionHandle::new(clock.clone(), 2);

    for run in 0..3 {
        clock.set_ms(run as f64 * 1000.0);
        session.start();
        session.update_snapshot(SnapshotUpdate {
            timeline: Some(timeline_model(run + 1)),
            ..SnapshotUpdate::default()
        });
        clock.set_ms(run as f64 * 1000.0 + 500.0);
        session.stop();
    }

    let history = session.runs_history();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].summary.timeline_entry_count, 3);
    assert_eq!(history[1].summary.timeline_entry_count, 2);
}

#[test]
fn clear_history_keeps_snapshot() {
    let (session, _clock) = session_with_clock(0.0);
    session.start();
    session.update_snapshot(SnapshotUpdate {
        timeline: Some(timeline_model(4)),
        ..SnapshotUpdate::default()
    });
    session.stop();
    assert_eq!(session.runs_history().len(), 1);

    session.clear_history();
    assert!(session.runs_history().is_empty());
    assert_eq!(session.snapshot().timeline.entries.len(), 4);
}

#[test]
fn update_snapshot_merges_per_field() {
    let (session, _clock) = session_with_clock(0.0);
    session.start();

    session.update_snapshot(SnapshotUpdate {
        web_vitals: Some(vitals_view(VitalName::Lcp, 2000.0, VitalRating::Good)),
        ..SnapshotUpdate::default()
    });
    session.update_snapshot(SnapshotUpdate {
        timeline: Some(timeline_model(1)),
        ..SnapshotUpdate::default()
    });

    let snapshot = session.snapshot();
    assert_eq!(snapshot.web_vitals.metrics_list.len(), 1);
    assert_eq!(snapshot.timeline.entries.len(), 1);
}

#[test]
fn anchor_watch_follows_session() {
    let (session, _clock) = session_with_clock(250.0);
    let watch = session.anchor_watch();
    assert_eq!(*watch.borrow(), None);

    session.start();
    assert_eq!(*watch.borrow(), Some(250.0));

    session.reset();
    assert_eq!(*watch.borrow(), None);
}

#[test]
fn scope_network_filters_and_rebases() {
    let origin = Url::parse("https://app.example.com").expect("origin");
    let view = NetworkView {
        entries: vec![
            network_entry("https://app.example.com/early", 400.0),
            network_entry("https://app.example.com/kept", 1200.0),
            network_entry("https://cdn.example.net/vendor", 1300.0),
            network_entry("not a url", 1400.0),
        ],
        end_time: 1410.0,
    };

    let scoped = scope_network(&view, 1000.0, &origin);
    assert_eq!(scoped.entries.len(), 1);
    assert_eq!(scoped.entries[0].start_time, 200.0);
    assert_eq!(scoped.end_time, 210.0);
}

#[tokio::test]
async fn aggregator_drops_updates_while_idle() {
    let (session, _clock) = session_with_clock(0.0);
    let origin = Url::parse("https://app.example.com").expect("origin");
    let (updates_tx, updates_rx) = update_channel(8);
    let handle = spawn_aggregator(session.clone(), origin, updates_rx);

    updates_tx
        .send(CollectorUpdate::Timeline(timeline_model(2)))
        .await
        .expect("send update");
    drop(updates_tx);
    handle.await.expect("join").expect("aggregator");

    assert!(session.snapshot().timeline.entries.is_empty());
}

#[tokio::test]
async fn aggregator_applies_updates_while_recording() {
    let (session, _clock) = session_with_clock(1000.0);
    session.start();
    let origin = Url::parse("https://app.example.com").expect("origin");
    let (updates_tx, updates_rx) = update_channel(8);
    let handle = spawn_aggregator(session.clone(), origin, updates_rx);

    updates_tx
        .send(CollectorUpdate::Timeline(timeline_model(2)))
        .await
        .expect("send timeline");
    updates_tx
        .send(CollectorUpdate::Network(NetworkView {
            entries: vec![
                network_entry("https://app.example.com/kept", 1500.0),
                network_entry("https://cdn.example.net/dropped", 1500.0),
            ],
            end_time: 1510.0,
        }))
        .await
        .expect("send network");
    drop(updates_tx);
    handle.await.expect("join").expect("aggregator");

    let snapshot = session.snapshot();
    assert_eq!(snapshot.timeline.entries.len(), 2);
    assert_eq!(snapshot.network.entries.len(), 1);
    assert_eq!(snapshot.network.entries[0].start_time, 500.0);
}
