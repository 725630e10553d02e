use std::path::PathBuf;

use tempfile::NamedTempFile;
use vitalscope::{
    config::{AppConfig, CliArgs},
    replay,
    suggest::{SuggestionPriority, SuggestionSeverity},
    vitals::VitalName,
};

const TRACE: &str = r#"{
  "origin": "https://app.example.com",
  "timeOrigin": 0.0,
  "startMs": 1000.0,
  "supported": ["resource", "navigation"],
  "events": [
    {
      "kind": "entries",
      "atMs": 1010.0,
      "entries": [
        { "entryType": "navigation", "navType": "navigate", "startTime": 900.0, "duration": 100.0 },
        { "entryType": "paint", "name": "first-paint", "startTime": 1100.0, "duration": 0.0 }
      ]
    },
    {
      "kind": "entries",
      "atMs": 1350.0,
      "entries": [
        { "entryType": "resource", "url": "https://app.example.com/kept.js", "startTime": 1200.0, "duration": 40.0, "initiatorType": "script", "transferSize": 2048.0 },
        { "entryType": "resource", "url": "https://cdn.example.net/vendor.js", "startTime": 1300.0, "duration": 20.0, "initiatorType": "script", "transferSize": 4096.0 },
        { "entryType": "layout-shift", "value": 0.5, "hadRecentInput": false, "startTime": 1320.0, "sources": [] }
      ]
    },
    {
      "kind": "vital",
      "atMs": 4000.0,
      "report": { "name": "LCP", "value": 5000.0, "id": "v-lcp", "delta": 5000.0, "navigationType": "navigate" }
    }
  ]
}"#;

fn cli_for_trace(trace: PathBuf) -> CliArgs {
    CliArgs {
        trace,
        capture: PathBuf::from("capture.toml"),
        output: None,
        origin: None,
        boundary: None,
        pretty: false,
    }
}

#[tokio::test]
async fn unsupported_types_and_anchor_scope_the_capture() {
    let trace_file = NamedTempFile::new().expect("temp trace");
    std::fs::write(trace_file.path(), TRACE).expect("write trace");

    let config = AppConfig::load(cli_for_trace(trace_file.path().to_path_buf()))
        .await
        .expect("config load");
    let report = replay::execute_replay(&config).await.expect("replay execution");

    // The paint and layout-shift feeds are unsupported in this trace, so
    // their collectors stay empty; the navigation entry predates the
    // anchor and is excluded from the normalized model.
    assert_eq!(report.snapshot.layout_shift.entries.len(), 0);
    assert_eq!(report.snapshot.layout_shift.total_cls, 0.0);
    assert_eq!(report.run.summary.timeline_entry_count, 2);
    assert!(report
        .snapshot
        .timeline
        .entries
        .iter()
        .all(|entry| entry.name != "Document" && entry.name != "first-paint"));
    assert!((report.snapshot.timeline.entries[0].start_time - 200.0).abs() < 1e-9);

    // Network scoping keeps the same-origin resource only.
    assert_eq!(report.run.summary.network_count, 1);
    assert_eq!(report.snapshot.network.entries[0].name, "kept.js");

    // The poor LCP report produces the single high/error suggestion.
    assert_eq!(report.suggestions.len(), 1);
    assert_eq!(report.suggestions[0].priority, SuggestionPriority::High);
    assert_eq!(report.suggestions[0].severity, SuggestionSeverity::Error);
    assert_eq!(report.suggestions[0].metric.as_str(), VitalName::Lcp.as_str());
}
