//! Timeline collector normalizing heterogeneous performance entries.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::{RawEntry, config::CaptureLimits};

/// Minimum visual duration assigned to zero-duration layout shifts.
const SHIFT_MIN_DURATION_MS: f64 = 2.0;

/// Semantic type of a normalized timeline entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TimelineEntryKind {
    Paint,
    Resource,
    Navigation,
    LayoutShift,
}

impl TimelineEntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimelineEntryKind::Paint => "paint",
            TimelineEntryKind::Resource => "resource",
            TimelineEntryKind::Navigation => "navigation",
            TimelineEntryKind::LayoutShift => "layout-shift",
        }
    }
}

/// Normalized entry shared by every timeline consumer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEntry {
    pub id: String,
    pub name: String,
    pub start_time: f64,
    pub duration: f64,
    #[serde(rename = "entryType")]
    pub kind: TimelineEntryKind,
    /// Resource initiator, paint event name, or layout-shift score text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Layout-shift score when the kind is `LayoutShift`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
}

/// Time-ordered view emitted after every collector change.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineModel {
    pub entries: Vec<TimelineEntry>,
    pub time_origin: f64,
    /// End of timeline in ms from `time_origin` (max start + duration).
    pub end_time: f64,
}

/// Stable identity key: type + truncated name + start time, with
/// whitespace runs collapsed to `_`.
fn entry_id(kind: TimelineEntryKind, name: &str, start_time: f64) -> String {
    let truncated: String = name.chars().take(80).collect();
    let raw = format!("{}-{}-{:.2}", kind.as_str(), truncated, start_time);
    let mut id = String::with_capacity(raw.len());
    let mut in_whitespace = false;
    for ch in raw.chars() {
        if ch.is_whitespace() {
            if !in_whitespace {
                id.push('_');
            }
            in_whitespace = true;
        } else {
            id.push(ch);
            in_whitespace = false;
        }
    }
    id
}

/// Short display name for a resource URL; malformed URLs fall back to the
/// truncated raw string.
fn resource_display_name(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(url) => {
            let path = url.path();
            if path.is_empty() {
                raw.to_string()
            } else {
                path.to_string()
            }
        }
        Err(_) => {
            let truncated: String = raw.chars().take(60).collect();
            if truncated.is_empty() {
                "resource".to_string()
            } else {
                truncated
            }
        }
    }
}

/// Normalizes one raw entry into the timeline model shape.
pub fn normalize_entry(entry: &RawEntry) -> TimelineEntry {
    match entry {
        RawEntry::Paint {
            name,
            start_time,
            duration,
        } => {
            let name = if name.is_empty() { "paint" } else { name.as_str() }.to_string();
            TimelineEntry {
                id: entry_id(TimelineEntryKind::Paint, &name, *start_time),
                detail: Some(name.clone()),
                name,
                start_time: *start_time,
                duration: *duration,
                kind: TimelineEntryKind::Paint,
                value: None,
            }
        }
        RawEntry::Resource {
            url,
            start_time,
            duration,
            initiator_type,
            ..
        } => {
            let name = resource_display_name(url);
            TimelineEntry {
                id: entry_id(TimelineEntryKind::Resource, &name, *start_time),
                name,
                start_time: *start_time,
                duration: *duration,
                kind: TimelineEntryKind::Resource,
                detail: initiator_type.clone(),
                value: None,
            }
        }
        RawEntry::Navigation {
            nav_type,
            start_time,
            duration,
        } => TimelineEntry {
            id: entry_id(TimelineEntryKind::Navigation, "Document", *start_time),
            name: "Document".to_string(),
            start_time: *start_time,
            duration: *duration,
            kind: TimelineEntryKind::Navigation,
            detail: Some(nav_type.clone()),
            value: None,
        },
        RawEntry::LayoutShift {
            value,
            start_time,
            duration,
            ..
        } => TimelineEntry {
            id: entry_id(TimelineEntryKind::LayoutShift, "Layout shift", *start_time),
            name: "Layout shift".to_string(),
            start_time: *start_time,
            duration: if *duration == 0.0 {
                SHIFT_MIN_DURATION_MS
            } else {
                *duration
            },
            kind: TimelineEntryKind::LayoutShift,
            detail: Some(format!("Score: {value:.3}")),
            value: Some(*value),
        },
    }
}

/// Keyed store of normalized entries with bounded retention and
/// anchor-relative time normalization.
#[derive(Debug)]
pub struct TimelineCollector {
    entries: HashMap<String, TimelineEntry>,
    anchor: Option<f64>,
    time_origin: f64,
    max_entries: usize,
    max_resources: usize,
}

impl TimelineCollector {
    pub fn new(limits: &CaptureLimits, time_origin: f64) -> Self {
        Self {
            entries: HashMap::new(),
            anchor: None,
            time_origin,
            max_entries: limits.max_timeline_entries,
            max_resources: limits.max_timeline_resources,
        }
    }

    /// Updates the session anchor; the next emitted model is re-normalized
    /// even when no new entries arrived.
    pub fn set_anchor(&mut self, anchor: Option<f64>) {
        self.anchor = anchor;
    }

    pub fn anchor(&self) -> Option<f64> {
        self.anchor
    }

    /// Ingests one notification batch in delivery order. Entries already
    /// present by identity key are skipped, so buffered replay cannot
    /// inflate the store. Returns true when the stored set changed.
    pub fn ingest_batch(&mut self, batch: &[RawEntry]) -> bool {
        let mut changed = false;
        for raw in batch {
            let normalized = normalize_entry(raw);
            if self.entries.contains_key(&normalized.id) {
                continue;
            }
            self.entries.insert(normalized.id.clone(), normalized);
            changed = true;
        }
        if changed {
            self.enforce_bounds();
        }
        changed
    }

    /// Caps resource entries, then total entries, keeping the earliest by
    /// start time in both passes so cold-start capture stays visible.
    fn enforce_bounds(&mut self) {
        let mut resources: Vec<(String, f64)> = self
            .entries
            .values()
            .filter(|entry| entry.kind == TimelineEntryKind::Resource)
            .map(|entry| (entry.id.clone(), entry.start_time))
            .collect();
        if resources.len() > self.max_resources {
            resources.sort_by(|a, b| a.1.total_cmp(&b.1));
            for (id, _) in resources.drain(self.max_resources..) {
                self.entries.remove(&id);
            }
        }

        if self.entries.len() > self.max_entries {
            let mut all: Vec<(String, f64)> = self
                .entries
                .values()
                .map(|entry| (entry.id.clone(), entry.start_time))
                .collect();
            all.sort_by(|a, b| a.1.total_cmp(&b.1));
            for (id, _) in all.drain(self.max_entries..) {
                self.entries.remove(&id);
            }
        }
    }

    /// Emits the sorted, time-normalized model. With an anchor set,
    /// entries earlier than the anchor are excluded and kept entries are
    /// re-based so 0 = session start; otherwise platform-origin time is
    /// preserved.
    pub fn model(&self) -> TimelineModel {
        let (mut list, time_origin) = match self.anchor {
            Some(anchor) => {
                let list: Vec<TimelineEntry> = self
                    .entries
                    .values()
                    .filter(|entry| entry.start_time >= anchor)
                    .map(|entry| {
                        let mut rebased = entry.clone();
                        rebased.start_time -= anchor;
                        rebased
                    })
                    .collect();
                (list, 0.0)
            }
            None => (
                self.entries.values().cloned().collect(),
                self.time_origin,
            ),
        };
        list.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));

        let end_time = list
            .iter()
            .map(|entry| entry.start_time + entry.duration)
            .fold(0.0_f64, f64::max);

        TimelineModel {
            entries: list,
            time_origin,
            end_time,
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
