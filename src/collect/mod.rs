//! Collector task wiring over the platform observation feeds.
//!
//! Each collector runs as an independent task fed by a bounded channel
//! of observer batches and emits its refreshed view to the aggregator
//! whenever its stored set changes. Dropping a feed sender tears the
//! collector down; a notification delivered after that is never
//! processed because the task has already left its receive loop.

use std::sync::Arc;

use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
};
use tracing::warn;

use crate::{
    InstrumentError, ObserverBatch,
    config::CaptureLimits,
    session::Clock,
    vitals::{RawVitalReport, VitalsCollector, VitalsView},
};

pub mod layout_shift;
pub mod network;
pub mod timeline;

use self::layout_shift::{LayoutShiftCollector, LayoutShiftView, ShiftBoundary};
use self::network::{NetworkCollector, NetworkView};
use self::timeline::{TimelineCollector, TimelineModel};

/// Refreshed collector output pushed to the aggregator.
#[derive(Debug, Clone, PartialEq)]
pub enum CollectorUpdate {
    WebVitals(VitalsView),
    Timeline(TimelineModel),
    Network(NetworkView),
    LayoutShift(LayoutShiftView),
}

/// Sender type alias for observer feeds.
pub type FeedSender = mpsc::Sender<ObserverBatch>;
/// Receiver type alias for observer feeds.
pub type FeedReceiver = mpsc::Receiver<ObserverBatch>;
/// Sender type alias for collector updates.
pub type UpdateSender = mpsc::Sender<CollectorUpdate>;
/// Receiver type alias for collector updates.
pub type UpdateReceiver = mpsc::Receiver<CollectorUpdate>;

/// Creates a bounded channel carrying observer batches to a collector.
pub fn feed_channel(capacity: usize) -> (FeedSender, FeedReceiver) {
    mpsc::channel(capacity)
}

/// Creates the bounded channel carrying collector updates downstream.
pub fn update_channel(capacity: usize) -> (UpdateSender, UpdateReceiver) {
    mpsc::channel(capacity)
}

async fn emit(updates: &UpdateSender, update: CollectorUpdate, collector: &'static str) -> bool {
    if updates.send(update).await.is_err() {
        warn!(target: "collect", collector, "downstream dropped");
        return false;
    }
    true
}

/// Spawns the timeline collector. Re-emits on every stored-set change
/// and on every session-anchor change, including anchor changes with no
/// new entries.
pub fn spawn_timeline(
    limits: CaptureLimits,
    time_origin: f64,
    mut feed: FeedReceiver,
    mut anchor: watch::Receiver<Option<f64>>,
    updates: UpdateSender,
) -> JoinHandle<Result<(), InstrumentError>> {
    tokio::spawn(async move {
        let mut collector = TimelineCollector::new(&limits, time_origin);
        collector.set_anchor(*anchor.borrow_and_update());
        let mut anchor_open = true;

        loop {
            tokio::select! {
                changed = anchor.changed(), if anchor_open => {
                    match changed {
                        Ok(()) => {
                            collector.set_anchor(*anchor.borrow_and_update());
                            if !emit(&updates, CollectorUpdate::Timeline(collector.model()), "timeline").await {
                                break;
                            }
                        }
                        // Anchor source gone; keep draining the feed.
                        Err(_) => anchor_open = false,
                    }
                }
                batch = feed.recv() => {
                    match batch {
                        Some(batch) => {
                            if collector.ingest_batch(&batch)
                                && !emit(&updates, CollectorUpdate::Timeline(collector.model()), "timeline").await
                            {
                                break;
                            }
                        }
                        None => break,
                    }
                }
            }
        }
        Ok(())
    })
}

/// Spawns the network collector.
pub fn spawn_network(
    mut feed: FeedReceiver,
    updates: UpdateSender,
) -> JoinHandle<Result<(), InstrumentError>> {
    tokio::spawn(async move {
        let mut collector = NetworkCollector::new();
        while let Some(batch) = feed.recv().await {
            if collector.ingest_batch(&batch)
                && !emit(&updates, CollectorUpdate::Network(collector.view()), "network").await
            {
                break;
            }
        }
        Ok(())
    })
}

/// Spawns the layout-shift collector with an optional scoping boundary.
pub fn spawn_layout_shift(
    boundary: Option<Arc<dyn ShiftBoundary>>,
    mut feed: FeedReceiver,
    updates: UpdateSender,
) -> JoinHandle<Result<(), InstrumentError>> {
    tokio::spawn(async move {
        let mut collector = LayoutShiftCollector::new(boundary);
        while let Some(batch) = feed.recv().await {
            if collector.ingest_batch(&batch)
                && !emit(
                    &updates,
                    CollectorUpdate::LayoutShift(collector.view()),
                    "layout-shift",
                )
                .await
            {
                break;
            }
        }
        Ok(())
    })
}

/// Spawns the vitals collector consuming forwarded metric reports.
pub fn spawn_vitals(
    limits: CaptureLimits,
    clock: Arc<dyn Clock>,
    mut reports: mpsc::UnboundedReceiver<RawVitalReport>,
    updates: UpdateSender,
) -> JoinHandle<Result<(), InstrumentError>> {
    tokio::spawn(async move {
        let mut collector = VitalsCollector::new(limits.max_vitals_history);
        while let Some(report) = reports.recv().await {
            if collector.ingest(&report, clock.unix_ms())
                && !emit(&updates, CollectorUpdate::WebVitals(collector.view()), "vitals").await
            {
                break;
            }
        }
        Ok(())
    })
}
