//! Rule-based suggestion engine scoring a session snapshot.

use serde::{Serialize, Serializer};

use crate::{
    session::snapshot::InstrumentationSnapshot,
    vitals::{VitalName, VitalRating},
};

/// Suggestion priority, highest first in output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionPriority {
    High,
    Medium,
    Low,
}

impl SuggestionPriority {
    fn rank(&self) -> u8 {
        match self {
            SuggestionPriority::High => 0,
            SuggestionPriority::Medium => 1,
            SuggestionPriority::Low => 2,
        }
    }
}

/// Suggestion severity, used as the tie-break within equal priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionSeverity {
    Error,
    Warning,
    Info,
}

impl SuggestionSeverity {
    fn rank(&self) -> u8 {
        match self {
            SuggestionSeverity::Error => 0,
            SuggestionSeverity::Warning => 1,
            SuggestionSeverity::Info => 2,
        }
    }
}

/// Metric a suggestion refers to: one of the vitals or a general note.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuggestionMetric {
    Vital(VitalName),
    General,
}

impl SuggestionMetric {
    pub fn as_str(&self) -> &'static str {
        match self {
            SuggestionMetric::Vital(name) => name.as_str(),
            SuggestionMetric::General => "general",
        }
    }
}

impl Serialize for SuggestionMetric {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// One prioritized recommendation derived from the snapshot. Regenerated
/// on every analysis, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    pub id: String,
    pub title: String,
    pub description: String,
    pub priority: SuggestionPriority,
    pub severity: SuggestionSeverity,
    pub metric: SuggestionMetric,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub improvement_hint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc_url: Option<String>,
}

const LCP_HINT: &str = "Optimize LCP: reduce server response time, use a CDN, preload the LCP image or font, and minimize render-blocking resources.";
const FCP_HINT: &str = "Improve FCP: minimize critical path length, reduce render-blocking CSS/JS, and optimize server response.";
const CLS_HINT: &str = "Reduce layout shifts: set explicit width/height on images and embeds, avoid inserting content above existing content, and reserve space for dynamic content.";
const INP_HINT: &str = "Improve interactivity: break up long JavaScript tasks, reduce main-thread work, and avoid heavy execution during user input.";
const TTFB_HINT: &str = "Improve TTFB: optimize server response, use a CDN, enable caching, and reduce server-side work.";

const VITALS_DOC_URL: &str = "https://web.dev/vitals/";

fn metric_hint(name: VitalName) -> &'static str {
    match name {
        VitalName::Lcp => LCP_HINT,
        VitalName::Fcp => FCP_HINT,
        VitalName::Cls => CLS_HINT,
        VitalName::Inp => INP_HINT,
        VitalName::Ttfb => TTFB_HINT,
    }
}

/// CLS is unitless with three decimals; the time metrics render as
/// rounded milliseconds.
fn format_value(name: VitalName, value: f64) -> String {
    if name == VitalName::Cls {
        format!("{value:.3}")
    } else {
        format!("{} ms", value.round() as i64)
    }
}

fn rating_words(rating: VitalRating) -> String {
    rating.as_str().replace('-', " ")
}

/// One suggestion per non-good vital; severity and priority follow the
/// rating, and the description cites the threshold the value missed.
fn add_vital_suggestions(snapshot: &InstrumentationSnapshot, out: &mut Vec<Suggestion>) {
    for metric in &snapshot.web_vitals.metrics_list {
        let (priority, severity) = match metric.rating {
            VitalRating::Good => continue,
            VitalRating::Poor => (SuggestionPriority::High, SuggestionSeverity::Error),
            VitalRating::NeedsImprovement => {
                (SuggestionPriority::Medium, SuggestionSeverity::Warning)
            }
        };
        let (good, poor) = metric.name.thresholds();
        let limit = if metric.rating == VitalRating::Poor {
            poor
        } else {
            good
        };
        out.push(Suggestion {
            id: format!("vital-{}-{}", metric.name.as_str(), metric.id),
            title: format!("Improve {}", metric.name.as_str()),
            description: format!(
                "{} is {} ({}; threshold {}).",
                metric.name.as_str(),
                rating_words(metric.rating),
                format_value(metric.name, metric.value),
                format_value(metric.name, limit),
            ),
            priority,
            severity,
            metric: SuggestionMetric::Vital(metric.name),
            improvement_hint: Some(metric_hint(metric.name).to_string()),
            action: None,
            doc_url: Some(VITALS_DOC_URL.to_string()),
        });
    }
}

fn add_layout_shift_suggestions(snapshot: &InstrumentationSnapshot, out: &mut Vec<Suggestion>) {
    let shift_count = snapshot.layout_shift.entries.len();
    let total_cls = snapshot.layout_shift.total_cls;

    if total_cls > 0.25 || shift_count > 8 {
        // Error only when the score itself is bad; a high count alone
        // downgrades to a warning.
        let (priority, severity) = if total_cls > 0.25 {
            (SuggestionPriority::High, SuggestionSeverity::Error)
        } else {
            (SuggestionPriority::Medium, SuggestionSeverity::Warning)
        };
        let plural = if shift_count == 1 { "" } else { "s" };
        out.push(Suggestion {
            id: "layout-shift-summary".to_string(),
            title: "Reduce cumulative layout shift".to_string(),
            description: format!(
                "Total CLS is {total_cls:.3} with {shift_count} shift event{plural}. This can hurt user experience.",
            ),
            priority,
            severity,
            metric: SuggestionMetric::Vital(VitalName::Cls),
            improvement_hint: Some(CLS_HINT.to_string()),
            action: Some("Review the layout shift sources to find affected elements.".to_string()),
            doc_url: None,
        });
    } else if shift_count > 3 && total_cls <= 0.1 {
        out.push(Suggestion {
            id: "layout-shift-count".to_string(),
            title: "Monitor layout shift count".to_string(),
            description: format!(
                "CLS score is good ({total_cls:.3}) but {shift_count} shift events were recorded. Consider reducing shifts to improve stability.",
            ),
            priority: SuggestionPriority::Low,
            severity: SuggestionSeverity::Info,
            metric: SuggestionMetric::Vital(VitalName::Cls),
            improvement_hint: Some(CLS_HINT.to_string()),
            action: None,
            doc_url: None,
        });
    }
}

fn add_network_suggestions(snapshot: &InstrumentationSnapshot, out: &mut Vec<Suggestion>) {
    let network_count = snapshot.network.entries.len();
    if network_count > 40 {
        out.push(Suggestion {
            id: "network-count".to_string(),
            title: "Reduce number of network requests".to_string(),
            description: format!(
                "{network_count} requests were captured during the session. Fewer requests can improve load time.",
            ),
            priority: SuggestionPriority::Medium,
            severity: SuggestionSeverity::Warning,
            metric: SuggestionMetric::General,
            improvement_hint: Some(
                "Combine resources, use lazy loading for below-the-fold content, and leverage caching."
                    .to_string(),
            ),
            action: Some("Review the network waterfall for optimization opportunities.".to_string()),
            doc_url: None,
        });
    }
}

/// Catch-all fired only when no prior rule produced anything.
fn add_timeline_suggestions(snapshot: &InstrumentationSnapshot, out: &mut Vec<Suggestion>) {
    let timeline_count = snapshot.timeline.entries.len();
    if out.is_empty() && timeline_count > 60 {
        out.push(Suggestion {
            id: "timeline-activity".to_string(),
            title: "High timeline activity".to_string(),
            description: format!(
                "Many timeline entries ({timeline_count}) were recorded. Consider profiling to find long tasks or heavy paint.",
            ),
            priority: SuggestionPriority::Low,
            severity: SuggestionSeverity::Info,
            metric: SuggestionMetric::General,
            improvement_hint: Some(
                "Use the timeline view to identify long tasks and optimize critical path."
                    .to_string(),
            ),
            action: None,
            doc_url: None,
        });
    }
}

/// Rule-based analysis of a session snapshot.
///
/// Pure function: every rule is evaluated against the snapshot alone and
/// the result is ordered by priority (high first), tie-broken by
/// severity (error first). The sort is stable, so equal-rank suggestions
/// keep their rule order.
pub fn analyze(snapshot: &InstrumentationSnapshot) -> Vec<Suggestion> {
    let mut suggestions = Vec::new();
    add_vital_suggestions(snapshot, &mut suggestions);
    add_layout_shift_suggestions(snapshot, &mut suggestions);
    add_network_suggestions(snapshot, &mut suggestions);
    add_timeline_suggestions(snapshot, &mut suggestions);

    suggestions.sort_by_key(|suggestion| (suggestion.priority.rank(), suggestion.severity.rank()));
    suggestions
}
