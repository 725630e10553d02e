//! Network collector deriving waterfall entries from resource timings.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::RawEntry;

/// Timing breakdown in ms; each field is present only when both endpoint
/// marks were reported by the platform.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TimingBreakdown {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dns: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connect: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<f64>,
}

impl TimingBreakdown {
    fn is_empty(&self) -> bool {
        self.dns.is_none()
            && self.connect.is_none()
            && self.request.is_none()
            && self.response.is_none()
    }
}

/// Normalized resource entry for the network waterfall.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkResourceEntry {
    pub id: String,
    /// Full URL, kept for same-origin filtering and links.
    pub url: String,
    /// Short display name derived from the URL.
    pub name: String,
    pub start_time: f64,
    pub duration: f64,
    /// Transfer size in bytes; `None` when no size signal was available.
    pub size: Option<f64>,
    /// Resource initiator type, `other` when unreported.
    #[serde(rename = "type")]
    pub initiator: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timing: Option<TimingBreakdown>,
}

/// Network slice of the session snapshot.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkView {
    pub entries: Vec<NetworkResourceEntry>,
    pub end_time: f64,
}

impl NetworkView {
    /// End time invariant: max(start + duration) over entries, 0 when empty.
    pub fn end_time_of(entries: &[NetworkResourceEntry]) -> f64 {
        entries
            .iter()
            .map(|entry| entry.start_time + entry.duration)
            .fold(0.0_f64, f64::max)
    }
}

/// Identity key for a resource timing: URL plus start time.
fn resource_id(url: &str, start_time: f64) -> String {
    format!("{url}-{start_time:.2}")
}

/// Short display name: last path segment, else host, else the URL
/// truncated to 40; malformed URLs fall back to the raw string truncated
/// to 60.
fn resource_display_name(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(url) => {
            let last_segment = url
                .path_segments()
                .and_then(|segments| segments.filter(|s| !s.is_empty()).next_back())
                .map(str::to_string);
            last_segment
                .or_else(|| url.host_str().map(str::to_string))
                .unwrap_or_else(|| raw.chars().take(40).collect())
        }
        Err(_) => raw.chars().take(60).collect(),
    }
}

fn mark_delta(end: Option<f64>, start: Option<f64>) -> Option<f64> {
    match (end, start) {
        (Some(end), Some(start)) => Some(end - start),
        _ => None,
    }
}

/// Normalizes one raw resource timing; non-resource entries yield `None`.
pub fn normalize_resource(entry: &RawEntry) -> Option<NetworkResourceEntry> {
    let RawEntry::Resource {
        url,
        start_time,
        duration,
        initiator_type,
        transfer_size,
        encoded_body_size,
        domain_lookup_start,
        domain_lookup_end,
        connect_start,
        connect_end,
        request_start,
        response_start,
        response_end,
    } = entry
    else {
        return None;
    };

    let size_signal = (*transfer_size).or(*encoded_body_size).unwrap_or(0.0);
    let size = (size_signal > 0.0).then_some(size_signal);

    let timing = TimingBreakdown {
        dns: mark_delta(*domain_lookup_end, *domain_lookup_start),
        connect: mark_delta(*connect_end, *connect_start),
        request: mark_delta(*response_start, *request_start),
        response: mark_delta(*response_end, *response_start),
    };

    let initiator = match initiator_type {
        Some(kind) if !kind.is_empty() => kind.clone(),
        _ => "other".to_string(),
    };

    Some(NetworkResourceEntry {
        id: resource_id(url, *start_time),
        name: resource_display_name(url),
        url: url.clone(),
        start_time: *start_time,
        duration: *duration,
        size,
        initiator,
        timing: (!timing.is_empty()).then_some(timing),
    })
}

/// Accumulates deduplicated resource entries in start-time order.
///
/// Unlike the timeline collector there is no retention cap; very long
/// sessions grow this list without bound (see DESIGN.md).
#[derive(Debug, Default)]
pub struct NetworkCollector {
    seen: HashSet<String>,
    entries: Vec<NetworkResourceEntry>,
}

impl NetworkCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ingests one raw entry; duplicates by identity key are skipped.
    /// Returns true when the stored list changed.
    pub fn ingest(&mut self, entry: &RawEntry) -> bool {
        let Some(normalized) = normalize_resource(entry) else {
            return false;
        };
        if !self.seen.insert(normalized.id.clone()) {
            return false;
        }
        self.entries.push(normalized);
        self.entries
            .sort_by(|a, b| a.start_time.total_cmp(&b.start_time));
        true
    }

    pub fn ingest_batch(&mut self, batch: &[RawEntry]) -> bool {
        let mut changed = false;
        for entry in batch {
            changed |= self.ingest(entry);
        }
        changed
    }

    /// Current network slice with its derived end time.
    pub fn view(&self) -> NetworkView {
        NetworkView {
            end_time: NetworkView::end_time_of(&self.entries),
            entries: self.entries.clone(),
        }
    }

    pub fn clear(&mut self) {
        self.seen.clear();
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
