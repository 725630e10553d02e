//! Aggregate session snapshot and its merge semantics.

use serde::{Deserialize, Serialize};

use crate::{
    collect::{layout_shift::LayoutShiftView, network::NetworkView, timeline::TimelineModel},
    vitals::{VitalName, VitalsView},
};

/// Point-in-time view of all captured telemetry for one session.
///
/// Owned exclusively by the session state machine: replaced wholesale on
/// start/reset, merged field-by-field on update.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstrumentationSnapshot {
    pub web_vitals: VitalsView,
    pub timeline: TimelineModel,
    pub network: NetworkView,
    pub layout_shift: LayoutShiftView,
}

impl InstrumentationSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Shallow-merges each present top-level field into the snapshot.
    pub fn apply(&mut self, update: SnapshotUpdate) {
        if let Some(web_vitals) = update.web_vitals {
            self.web_vitals = web_vitals;
        }
        if let Some(timeline) = update.timeline {
            self.timeline = timeline;
        }
        if let Some(network) = update.network {
            self.network = network;
        }
        if let Some(layout_shift) = update.layout_shift {
            self.layout_shift = layout_shift;
        }
    }
}

/// Partial snapshot update produced by the aggregator.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SnapshotUpdate {
    pub web_vitals: Option<VitalsView>,
    pub timeline: Option<TimelineModel>,
    pub network: Option<NetworkView>,
    pub layout_shift: Option<LayoutShiftView>,
}

/// Digest of one completed run, computed once at stop time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub total_cls: f64,
    pub lcp: Option<f64>,
    pub fcp: Option<f64>,
    pub network_count: usize,
    pub timeline_entry_count: usize,
}

impl RunSummary {
    pub fn from_snapshot(snapshot: &InstrumentationSnapshot) -> Self {
        let vital_value = |name: VitalName| {
            snapshot
                .web_vitals
                .metrics_list
                .iter()
                .find(|metric| metric.name == name)
                .map(|metric| metric.value)
        };
        Self {
            total_cls: snapshot.layout_shift.total_cls,
            lcp: vital_value(VitalName::Lcp),
            fcp: vital_value(VitalName::Fcp),
            network_count: snapshot.network.entries.len(),
            timeline_entry_count: snapshot.timeline.entries.len(),
        }
    }
}
