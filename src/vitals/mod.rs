//! Core Web Vitals model, thresholds, and the vitals collector.

pub mod forwarder;

use serde::{Deserialize, Serialize};

/// The five collected Core Web Vitals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VitalName {
    #[serde(rename = "LCP")]
    Lcp,
    #[serde(rename = "FCP")]
    Fcp,
    #[serde(rename = "CLS")]
    Cls,
    #[serde(rename = "INP")]
    Inp,
    #[serde(rename = "TTFB")]
    Ttfb,
}

/// Display order for metric lists.
pub const VITALS_ORDER: [VitalName; 5] = [
    VitalName::Lcp,
    VitalName::Fcp,
    VitalName::Cls,
    VitalName::Inp,
    VitalName::Ttfb,
];

impl VitalName {
    pub fn as_str(&self) -> &'static str {
        match self {
            VitalName::Lcp => "LCP",
            VitalName::Fcp => "FCP",
            VitalName::Cls => "CLS",
            VitalName::Inp => "INP",
            VitalName::Ttfb => "TTFB",
        }
    }

    /// Maps a platform report name onto a collected vital; unknown names
    /// (e.g. FID) are not collected.
    pub fn from_report_name(name: &str) -> Option<Self> {
        match name {
            "LCP" => Some(VitalName::Lcp),
            "FCP" => Some(VitalName::Fcp),
            "CLS" => Some(VitalName::Cls),
            "INP" => Some(VitalName::Inp),
            "TTFB" => Some(VitalName::Ttfb),
            _ => None,
        }
    }

    /// Fixed thresholds as (good, poor); milliseconds except CLS (unitless).
    pub fn thresholds(&self) -> (f64, f64) {
        match self {
            VitalName::Lcp => (2500.0, 4000.0),
            VitalName::Fcp => (1800.0, 3000.0),
            VitalName::Cls => (0.1, 0.25),
            VitalName::Inp => (200.0, 500.0),
            VitalName::Ttfb => (800.0, 1800.0),
        }
    }

    fn order_index(&self) -> usize {
        VITALS_ORDER
            .iter()
            .position(|name| name == self)
            .unwrap_or(VITALS_ORDER.len())
    }
}

/// Rating derived from the fixed per-metric thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VitalRating {
    Good,
    NeedsImprovement,
    Poor,
}

impl VitalRating {
    pub fn as_str(&self) -> &'static str {
        match self {
            VitalRating::Good => "good",
            VitalRating::NeedsImprovement => "needs-improvement",
            VitalRating::Poor => "poor",
        }
    }
}

/// Rates a reported value against the metric's fixed thresholds.
pub fn rating_for(name: VitalName, value: f64) -> VitalRating {
    let (good, poor) = name.thresholds();
    if value <= good {
        VitalRating::Good
    } else if value <= poor {
        VitalRating::NeedsImprovement
    } else {
        VitalRating::Poor
    }
}

/// Raw metric report delivered by the platform vitals feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawVitalReport {
    pub name: String,
    pub value: f64,
    pub id: String,
    pub delta: f64,
    pub navigation_type: String,
}

/// Normalized metric with its derived rating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebVitalMetric {
    pub name: VitalName,
    pub value: f64,
    pub rating: VitalRating,
    pub delta: f64,
    pub id: String,
    pub navigation_type: String,
}

/// History point holding the current value per vital at one wall-clock time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VitalsHistoryPoint {
    #[serde(rename = "LCP")]
    pub lcp: Option<f64>,
    #[serde(rename = "FCP")]
    pub fcp: Option<f64>,
    #[serde(rename = "CLS")]
    pub cls: Option<f64>,
    #[serde(rename = "INP")]
    pub inp: Option<f64>,
    #[serde(rename = "TTFB")]
    pub ttfb: Option<f64>,
    pub timestamp: u64,
}

/// Vitals slice of the session snapshot.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VitalsView {
    pub metrics_list: Vec<WebVitalMetric>,
    pub history: Vec<VitalsHistoryPoint>,
}

/// Accumulates forwarded vital reports into the latest-per-metric list
/// plus a bounded rolling history.
#[derive(Debug)]
pub struct VitalsCollector {
    latest: Vec<WebVitalMetric>,
    history: Vec<VitalsHistoryPoint>,
    max_history: usize,
}

impl VitalsCollector {
    pub fn new(max_history: usize) -> Self {
        Self {
            latest: Vec::new(),
            history: Vec::new(),
            max_history,
        }
    }

    /// Ingests one report; returns false when the metric name is not
    /// collected. Each accepted report replaces the per-name latest value
    /// and appends a history point stamped with `now_unix_ms`.
    pub fn ingest(&mut self, report: &RawVitalReport, now_unix_ms: u64) -> bool {
        let Some(name) = VitalName::from_report_name(&report.name) else {
            return false;
        };

        let metric = WebVitalMetric {
            name,
            value: report.value,
            rating: rating_for(name, report.value),
            delta: report.delta,
            id: report.id.clone(),
            navigation_type: report.navigation_type.clone(),
        };

        self.latest.retain(|existing| existing.name != name);
        self.latest.push(metric);
        self.latest
            .sort_by_key(|metric| metric.name.order_index());

        let point = self.history_point(now_unix_ms);
        self.history.push(point);
        if self.history.len() > self.max_history {
            let overflow = self.history.len() - self.max_history;
            self.history.drain(..overflow);
        }
        true
    }

    fn history_point(&self, timestamp: u64) -> VitalsHistoryPoint {
        let value_of = |name: VitalName| {
            self.latest
                .iter()
                .find(|metric| metric.name == name)
                .map(|metric| metric.value)
        };
        VitalsHistoryPoint {
            lcp: value_of(VitalName::Lcp),
            fcp: value_of(VitalName::Fcp),
            cls: value_of(VitalName::Cls),
            inp: value_of(VitalName::Inp),
            ttfb: value_of(VitalName::Ttfb),
            timestamp,
        }
    }

    /// Current vitals slice for the snapshot.
    pub fn view(&self) -> VitalsView {
        VitalsView {
            metrics_list: self.latest.clone(),
            history: self.history.clone(),
        }
    }

    pub fn clear(&mut self) {
        self.latest.clear();
        self.history.clear();
    }
}
