//! Layout-shift collector with optional attribution scoping.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{NodeRef, RawEntry, RawShiftSource, Rect};

/// Spatial containment capability scoping layout-shift attribution.
///
/// Collectors depend only on this capability, never on a raw node
/// handle: `contains` answers whether a reported node lies inside the
/// boundary, `bounding_rect` exposes the boundary's own viewport box for
/// consumers that re-project stored rects.
pub trait ShiftBoundary: Send + Sync {
    fn contains(&self, node: &NodeRef) -> bool;
    fn bounding_rect(&self) -> Option<Rect>;
}

/// Boundary matching nodes whose document path starts with a prefix.
pub struct PathBoundary {
    prefix: String,
    rect: Option<Rect>,
}

impl PathBoundary {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            rect: None,
        }
    }

    pub fn with_rect(mut self, rect: Rect) -> Self {
        self.rect = Some(rect);
        self
    }
}

impl ShiftBoundary for PathBoundary {
    fn contains(&self, node: &NodeRef) -> bool {
        node.path.starts_with(&self.prefix)
    }

    fn bounding_rect(&self) -> Option<Rect> {
        self.rect
    }
}

/// Stored attribution: node label plus both rects at capture time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutShiftSourceStored {
    pub node_label: String,
    pub previous_rect: Rect,
    pub current_rect: Rect,
}

/// One stored layout-shift event with its surviving sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutShiftEntryStored {
    pub id: String,
    pub value: f64,
    pub had_recent_input: bool,
    pub start_time: f64,
    pub sources: Vec<LayoutShiftSourceStored>,
}

/// Layout-shift slice of the session snapshot.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutShiftView {
    pub entries: Vec<LayoutShiftEntryStored>,
    pub total_cls: f64,
}

fn node_label(node: Option<&NodeRef>) -> String {
    match node {
        Some(node) if !node.label.is_empty() => {
            let truncated: String = node.label.chars().take(60).collect();
            truncated
        }
        _ => "unknown".to_string(),
    }
}

/// True when the source should be kept: inside the boundary, or no
/// boundary configured. Unattributed sources are excluded once a
/// boundary is set.
fn source_in_scope(source: &RawShiftSource, boundary: Option<&dyn ShiftBoundary>) -> bool {
    let Some(boundary) = boundary else {
        return true;
    };
    match &source.node {
        Some(node) => boundary.contains(node),
        None => false,
    }
}

/// Accumulates scoped layout-shift events plus a running total score.
pub struct LayoutShiftCollector {
    boundary: Option<Arc<dyn ShiftBoundary>>,
    entries: Vec<LayoutShiftEntryStored>,
    total_cls: f64,
    id_counter: u64,
}

impl LayoutShiftCollector {
    pub fn new(boundary: Option<Arc<dyn ShiftBoundary>>) -> Self {
        Self {
            boundary,
            entries: Vec::new(),
            total_cls: 0.0,
            id_counter: 0,
        }
    }

    /// Ingests one raw entry; non-shift entries and events whose sources
    /// all fall outside the boundary are discarded whole. Returns true
    /// when an event was stored.
    pub fn ingest(&mut self, entry: &RawEntry) -> bool {
        let RawEntry::LayoutShift {
            value,
            had_recent_input,
            start_time,
            sources,
            ..
        } = entry
        else {
            return false;
        };
        if sources.is_empty() {
            return false;
        }

        let boundary = self.boundary.as_deref();
        let kept: Vec<LayoutShiftSourceStored> = sources
            .iter()
            .filter(|source| source_in_scope(source, boundary))
            .map(|source| LayoutShiftSourceStored {
                node_label: node_label(source.node.as_ref()),
                previous_rect: source.previous_rect,
                current_rect: source.current_rect,
            })
            .collect();
        if kept.is_empty() {
            return false;
        }

        self.id_counter += 1;
        self.entries.push(LayoutShiftEntryStored {
            id: format!("cls-{}-{}", self.id_counter, start_time),
            value: *value,
            had_recent_input: *had_recent_input,
            start_time: *start_time,
            sources: kept,
        });
        // Running sum over stored entries, never recomputed from scratch.
        self.total_cls += value;
        true
    }

    pub fn ingest_batch(&mut self, batch: &[RawEntry]) -> bool {
        let mut changed = false;
        for entry in batch {
            changed |= self.ingest(entry);
        }
        changed
    }

    /// Current layout-shift slice for the snapshot.
    pub fn view(&self) -> LayoutShiftView {
        LayoutShiftView {
            entries: self.entries.clone(),
            total_cls: self.total_cls,
        }
    }

    pub fn boundary_rect(&self) -> Option<Rect> {
        self.boundary.as_ref().and_then(|b| b.bounding_rect())
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.total_cls = 0.0;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
