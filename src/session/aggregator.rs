//! Aggregator merging collector updates into the session snapshot.
//!
//! A push pipeline with no state of its own: every collector output
//! change arrives as a message, and the aggregator forwards it to the
//! session machine only while the machine reports Recording. Collectors
//! keep running in the background regardless; gated-off updates are
//! simply dropped.

use tokio::task::JoinHandle;
use tracing::{debug, instrument};
use url::Url;

use crate::{
    InstrumentError,
    collect::{CollectorUpdate, UpdateReceiver},
    collect::network::{NetworkResourceEntry, NetworkView},
};

use super::{SessionHandle, snapshot::SnapshotUpdate};

fn same_origin(url: &str, origin: &Url) -> bool {
    Url::parse(url)
        .map(|parsed| parsed.origin() == origin.origin())
        .unwrap_or(false)
}

/// Session-scopes a network view: same-origin entries starting at or
/// after the anchor, re-based so 0 = session start, end time recomputed.
///
/// The network collector itself does not anchor, so this mirrors the
/// timeline collector's normalization independently.
pub fn scope_network(view: &NetworkView, anchor: f64, origin: &Url) -> NetworkView {
    let entries: Vec<NetworkResourceEntry> = view
        .entries
        .iter()
        .filter(|entry| entry.start_time >= anchor && same_origin(&entry.url, origin))
        .map(|entry| {
            let mut rebased = entry.clone();
            rebased.start_time -= anchor;
            rebased
        })
        .collect();
    NetworkView {
        end_time: NetworkView::end_time_of(&entries),
        entries,
    }
}

/// Spawns the aggregator loop; ends when every update sender has dropped.
#[instrument(skip_all)]
pub fn spawn_aggregator(
    session: SessionHandle,
    origin: Url,
    mut updates: UpdateReceiver,
) -> JoinHandle<Result<(), InstrumentError>> {
    tokio::spawn(async move {
        while let Some(update) = updates.recv().await {
            if !session.is_recording() {
                debug!(target: "aggregator", "update dropped while not recording");
                continue;
            }

            let partial = match update {
                CollectorUpdate::WebVitals(view) => SnapshotUpdate {
                    web_vitals: Some(view),
                    ..SnapshotUpdate::default()
                },
                CollectorUpdate::Timeline(model) => SnapshotUpdate {
                    timeline: Some(model),
                    ..SnapshotUpdate::default()
                },
                CollectorUpdate::Network(view) => {
                    let Some(anchor) = session.session_anchor() else {
                        debug!(target: "aggregator", "network update dropped without anchor");
                        continue;
                    };
                    SnapshotUpdate {
                        network: Some(scope_network(&view, anchor, &origin)),
                        ..SnapshotUpdate::default()
                    }
                }
                CollectorUpdate::LayoutShift(view) => SnapshotUpdate {
                    layout_shift: Some(view),
                    ..SnapshotUpdate::default()
                },
            };

            session.update_snapshot(partial);
        }
        Ok(())
    })
}
