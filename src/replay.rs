//! Trace replay driver feeding recorded platform events through the
//! pipeline.
//!
//! A trace is the serialized form of what the platform feeds deliver
//! live: timestamped vital reports and observer batches. The driver
//! starts a session, replays every event at its recorded time, tears the
//! collectors down, stops the session, and produces a report combining
//! the completed run record, the frozen snapshot, and the suggestion
//! list.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::instrument;
use url::Url;

use crate::{
    InstrumentError, ObserverBatch, RawEntry,
    collect::{
        self, FeedSender,
        layout_shift::{PathBoundary, ShiftBoundary},
    },
    config::AppConfig,
    session::{
        ManualClock, RunRecord, SessionHandle, aggregator::spawn_aggregator,
        snapshot::InstrumentationSnapshot,
    },
    suggest::{self, Suggestion},
    vitals::{RawVitalReport, forwarder::VitalForwarder},
};

fn default_supported() -> Vec<String> {
    vec![
        "paint".to_string(),
        "resource".to_string(),
        "navigation".to_string(),
        "layout-shift".to_string(),
    ]
}

/// One timestamped event in a recorded trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum TraceEvent {
    #[serde(rename_all = "camelCase")]
    Vital { at_ms: f64, report: RawVitalReport },
    #[serde(rename_all = "camelCase")]
    Entries { at_ms: f64, entries: ObserverBatch },
}

/// Serialized recording of a page's platform feeds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceDocument {
    /// Page origin; overridden by the CLI, defaulted by the capture
    /// document when absent here.
    #[serde(default)]
    pub origin: Option<String>,
    /// Platform time origin in unix ms, used when no anchor is set.
    #[serde(default)]
    pub time_origin: f64,
    /// Monotonic time at which recording started.
    #[serde(default)]
    pub start_ms: f64,
    /// Entry types the recorded platform supported; absent types are
    /// never delivered, leaving their collectors permanently empty.
    #[serde(default = "default_supported")]
    pub supported: Vec<String>,
    pub events: Vec<TraceEvent>,
}

impl TraceDocument {
    pub async fn load(path: &Path) -> Result<Self, InstrumentError> {
        let raw = fs::read_to_string(path)
            .await
            .map_err(|err| InstrumentError::Trace(format!("failed to read trace: {err}")))?;
        serde_json::from_str(&raw)
            .map_err(|err| InstrumentError::Trace(format!("invalid trace document: {err}")))
    }
}

/// Source of replayable events; the seam between the driver and however
/// the events were recorded.
#[async_trait]
pub trait EventSource: Send {
    async fn next_event(&mut self) -> Option<TraceEvent>;
}

/// In-memory source draining a loaded trace in order.
pub struct TraceSource {
    events: VecDeque<TraceEvent>,
}

impl TraceSource {
    pub fn new(events: Vec<TraceEvent>) -> Self {
        Self {
            events: events.into(),
        }
    }
}

#[async_trait]
impl EventSource for TraceSource {
    async fn next_event(&mut self) -> Option<TraceEvent> {
        self.events.pop_front()
    }
}

/// Final output of a replay run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayReport {
    pub run: RunRecord,
    pub suggestions: Vec<Suggestion>,
    pub snapshot: InstrumentationSnapshot,
}

fn resolve_origin(config: &AppConfig, trace: &TraceDocument) -> Result<Url, InstrumentError> {
    if config.cli.origin.is_some() {
        return Ok(config.origin.clone());
    }
    match &trace.origin {
        Some(raw) => Url::parse(raw)
            .map_err(|err| InstrumentError::Trace(format!("invalid trace origin '{raw}': {err}"))),
        None => Ok(config.origin.clone()),
    }
}

fn unix_now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}

async fn send_batch(
    feed: &FeedSender,
    batch: ObserverBatch,
    collector: &'static str,
) -> Result<(), InstrumentError> {
    if batch.is_empty() {
        return Ok(());
    }
    feed.send(batch)
        .await
        .map_err(|_| InstrumentError::Channel(format!("{collector} feed closed")))
}

/// Replays the configured trace end-to-end and returns the report.
#[instrument(skip_all)]
pub async fn execute_replay(config: &AppConfig) -> Result<ReplayReport, InstrumentError> {
    let trace = TraceDocument::load(&config.cli.trace).await?;
    let origin = resolve_origin(config, &trace)?;

    let clock = Arc::new(ManualClock::new(trace.start_ms, unix_now_ms()));
    let session = SessionHandle::new(clock.clone(), config.limits.max_runs_history);

    let supported: Vec<&str> = trace.supported.iter().map(String::as_str).collect();
    let boundary: Option<Arc<dyn ShiftBoundary>> = config
        .boundary_prefix
        .as_ref()
        .map(|prefix| Arc::new(PathBoundary::new(prefix.clone())) as Arc<dyn ShiftBoundary>);

    let (updates_tx, updates_rx) = collect::update_channel(64);
    let (timeline_tx, timeline_rx) = collect::feed_channel(64);
    let (network_tx, network_rx) = collect::feed_channel(64);
    let (shift_tx, shift_rx) = collect::feed_channel(64);
    let (vitals_tx, vitals_rx) = tokio::sync::mpsc::unbounded_channel();

    let timeline_handle = collect::spawn_timeline(
        config.limits.clone(),
        trace.time_origin,
        timeline_rx,
        session.anchor_watch(),
        updates_tx.clone(),
    );
    let network_handle = collect::spawn_network(network_rx, updates_tx.clone());
    let shift_handle = collect::spawn_layout_shift(boundary, shift_rx, updates_tx.clone());
    let vitals_handle = collect::spawn_vitals(
        config.limits.clone(),
        clock.clone(),
        vitals_rx,
        updates_tx,
    );
    let aggregator_handle = spawn_aggregator(session.clone(), origin, updates_rx);

    let forwarder = VitalForwarder::global();
    forwarder.register();
    let token = forwarder.activate(vitals_tx);

    session.start();

    let mut source = TraceSource::new(trace.events.clone());
    while let Some(event) = source.next_event().await {
        match event {
            TraceEvent::Vital { at_ms, report } => {
                clock.set_ms(at_ms);
                forwarder.forward(report);
            }
            TraceEvent::Entries { at_ms, entries } => {
                clock.set_ms(at_ms);
                let recognized: ObserverBatch = entries
                    .into_iter()
                    .filter(|entry| supported.contains(&entry.entry_type()))
                    .collect();

                let resources: ObserverBatch = recognized
                    .iter()
                    .filter(|entry| matches!(entry, RawEntry::Resource { .. }))
                    .cloned()
                    .collect();
                let shifts: ObserverBatch = recognized
                    .iter()
                    .filter(|entry| matches!(entry, RawEntry::LayoutShift { .. }))
                    .cloned()
                    .collect();

                send_batch(&timeline_tx, recognized, "timeline").await?;
                send_batch(&network_tx, resources, "network").await?;
                send_batch(&shift_tx, shifts, "layout-shift").await?;
            }
        }
    }

    // Tear the feeds down so each collector drains and exits; releasing
    // the forwarder slot closes the vitals channel the same way.
    drop(timeline_tx);
    drop(network_tx);
    drop(shift_tx);
    forwarder.deactivate(token);

    timeline_handle.await.map_err(InstrumentError::from)??;
    network_handle.await.map_err(InstrumentError::from)??;
    shift_handle.await.map_err(InstrumentError::from)??;
    vitals_handle.await.map_err(InstrumentError::from)??;
    aggregator_handle.await.map_err(InstrumentError::from)??;

    session.stop();

    let snapshot = session.snapshot();
    let suggestions = suggest::analyze(&snapshot);
    let run = session
        .runs_history()
        .into_iter()
        .next()
        .ok_or_else(|| InstrumentError::Trace("replay produced no run record".to_string()))?;

    Ok(ReplayReport {
        run,
        suggestions,
        snapshot,
    })
}
