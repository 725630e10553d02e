use vitalscope::{
    collect::{
        layout_shift::{LayoutShiftEntryStored, LayoutShiftView},
        network::{NetworkResourceEntry, NetworkView},
        timeline::{TimelineEntry, TimelineEntryKind, TimelineModel},
    },
    session::snapshot::InstrumentationSnapshot,
    suggest::{SuggestionMetric, SuggestionPriority, SuggestionSeverity, analyze},
    vitals::{VitalName, VitalsView, WebVitalMetric, rating_for},
};

fn metric(name: VitalName, value: f64) -> WebVitalMetric {
    WebVitalMetric {
        name,
        value,
        rating: rating_for(name, value),
        delta: value,
        id: format!("id-{}", name.as_str()),
        navigation_type: "navigate".to_string(),
    }
}

fn with_vitals(metrics: Vec<WebVitalMetric>) -> InstrumentationSnapshot {
    InstrumentationSnapshot {
        web_vitals: VitalsView {
            metrics_list: metrics,
            history: Vec::new(),
        },
        ..InstrumentationSnapshot::empty()
    }
}

fn shift_view(values: &[f64]) -> LayoutShiftView {
    let entries: Vec<LayoutShiftEntryStored> = values
        .iter()
        .enumerate()
        .map(|(index, value)| LayoutShiftEntryStored {
            id: format!("cls-{index}-0"),
            value: *value,
            had_recent_input: false,
            start_time: index as f64 * 10.0,
            sources: Vec::new(),
        })
        .collect();
    LayoutShiftView {
        total_cls: values.iter().sum(),
        entries,
    }
}

fn network_view(count: usize) -> NetworkView {
    let entries: Vec<NetworkResourceEntry> = (0..count)
        .map(|index| NetworkResourceEntry {
            id: format!("https://app.example.com/r{index}-{index}.00"),
            url: format!("https://app.example.com/r{index}"),
            name: format!("r{index}"),
            start_time: index as f64,
            duration: 5.0,
            size: Some(100.0),
            initiator: "fetch".to_string(),
            timing: None,
        })
        .collect();
    NetworkView {
        end_time: NetworkView::end_time_of(&entries),
        entries,
    }
}

fn timeline_model(count: usize) -> TimelineModel {
    let entries: Vec<TimelineEntry> = (0..count)
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
    TimelineModel {
        end_time: count as f64,
        time_origin: 0.0,
        entries,
    }
}

#[test]
fn good_snapshot_yields_no_suggestions() {
    let snapshot = with_vitals(vec![
        metric(VitalName::Lcp, 1200.0),
        metric(VitalName::Cls, 0.02),
    ]);
    assert!(analyze(&snapshot).is_empty());
}

#[test]
fn poor_lcp_yields_high_error_suggestion() {
    let snapshot = with_vitals(vec![metric(VitalName::Lcp, 5000.0)]);
    let suggestions = analyze(&snapshot);
    assert_eq!(suggestions.len(), 1);

    let suggestion = &suggestions[0];
    assert_eq!(suggestion.priority, SuggestionPriority::High);
    assert_eq!(suggestion.severity, SuggestionSeverity::Error);
    assert_eq!(suggestion.metric, SuggestionMetric::Vital(VitalName::Lcp));
    assert!(suggestion.description.contains("5000 ms"));
    assert!(suggestion.description.contains("4000 ms"));
    assert!(suggestion.improvement_hint.is_some());
}

#[test]
fn needs_improvement_cites_good_threshold() {
    let snapshot = with_vitals(vec![metric(VitalName::Ttfb, 1200.0)]);
    let suggestions = analyze(&snapshot);
    assert_eq!(suggestions.len(), 1);
    assert_eq!(suggestions[0].priority, SuggestionPriority::Medium);
    assert_eq!(suggestions[0].severity, SuggestionSeverity::Warning);
    assert!(suggestions[0].description.contains("needs improvement"));
    assert!(suggestions[0].description.contains("800 ms"));
}

#[test]
fn ordering_puts_high_error_first() {
    // The medium/warning vital rule runs before the high/error layout
    // shift rule; ordering must not depend on generation order.
    let mut snapshot = with_vitals(vec![metric(VitalName::Ttfb, 1200.0)]);
    snapshot.layout_shift = shift_view(&[0.3]);

    let suggestions = analyze(&snapshot);
    assert_eq!(suggestions.len(), 2);
    assert_eq!(suggestions[0].priority, SuggestionPriority::High);
    assert_eq!(suggestions[0].severity, SuggestionSeverity::Error);
    assert_eq!(suggestions[0].id, "layout-shift-summary");
    assert_eq!(suggestions[1].priority, SuggestionPriority::Medium);
}

#[test]
fn high_total_cls_triggers_score_rule_not_count_rule() {
    let mut snapshot = InstrumentationSnapshot::empty();
    snapshot.layout_shift = shift_view(&[0.05, 0.05, 0.2]);

    let suggestions = analyze(&snapshot);
    assert_eq!(suggestions.len(), 1);
    assert_eq!(suggestions[0].id, "layout-shift-summary");
    assert_eq!(suggestions[0].priority, SuggestionPriority::High);
    assert_eq!(suggestions[0].severity, SuggestionSeverity::Error);
}

#[test]
fn count_only_condition_downgrades_to_warning() {
    let mut snapshot = InstrumentationSnapshot::empty();
    snapshot.layout_shift = shift_view(&[0.02; 9]);

    let suggestions = analyze(&snapshot);
    assert_eq!(suggestions.len(), 1);
    assert_eq!(suggestions[0].id, "layout-shift-summary");
    assert_eq!(suggestions[0].priority, SuggestionPriority::Medium);
    assert_eq!(suggestions[0].severity, SuggestionSeverity::Warning);
}

#[test]
fn frequent_small_shifts_yield_info_note() {
    let mut snapshot = InstrumentationSnapshot::empty();
    snapshot.layout_shift = shift_view(&[0.01, 0.01, 0.02, 0.02]);

    let suggestions = analyze(&snapshot);
    assert_eq!(suggestions.len(), 1);
    assert_eq!(suggestions[0].id, "layout-shift-count");
    assert_eq!(suggestions[0].priority, SuggestionPriority::Low);
    assert_eq!(suggestions[0].severity, SuggestionSeverity::Info);
}

#[test]
fn heavy_network_usage_fires_once() {
    let mut snapshot = InstrumentationSnapshot::empty();
    snapshot.network = network_view(45);

    let suggestions = analyze(&snapshot);
    let network: Vec<_> = suggestions
        .iter()
        .filter(|suggestion| suggestion.id == "network-count")
        .collect();
    assert_eq!(network.len(), 1);
    assert_eq!(network[0].priority, SuggestionPriority::Medium);
    assert_eq!(network[0].metric, SuggestionMetric::General);
}

#[test]
fn timeline_rule_is_a_catch_all() {
    let mut snapshot = InstrumentationSnapshot::empty();
    snapshot.timeline = timeline_model(61);

    let suggestions = analyze(&snapshot);
    assert_eq!(suggestions.len(), 1);
    assert_eq!(suggestions[0].id, "timeline-activity");
    assert_eq!(suggestions[0].priority, SuggestionPriority::Low);

    // Any earlier rule suppresses it.
    snapshot.network = network_view(45);
    let suggestions = analyze(&snapshot);
    assert_eq!(suggestions.len(), 1);
    assert_eq!(suggestions[0].id, "network-count");
}
