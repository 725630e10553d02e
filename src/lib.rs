//! Core library for the Vitalscope instrumentation pipeline.
//!
//! The crate exposes the raw platform event model shared across the
//! asynchronous collector tasks, configuration loading utilities, the
//! session state machine, and the replay entry point used by the CLI
//! application.

pub mod collect;
pub mod config;
pub mod replay;
pub mod session;
pub mod suggest;
pub mod vitals;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::instrument;

/// Axis-aligned box in viewport coordinates at capture time.
///
/// Conversion to any other coordinate space is the consumer's
/// responsibility; the pipeline stores rects exactly as reported.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Reference to the platform node a layout shift attributes to.
///
/// The `path` identifies the node's position in the document (used by
/// scoping boundaries); the `label` is a short display string captured
/// at report time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRef {
    pub path: String,
    pub label: String,
}

/// One attribution source carried by a raw layout-shift entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawShiftSource {
    /// Originating node, absent when the platform could not attribute.
    pub node: Option<NodeRef>,
    pub previous_rect: Rect,
    pub current_rect: Rect,
}

/// Raw performance entry as delivered by the platform observation feed.
///
/// One variant per recognized semantic type; normalization matches on
/// this exhaustively so adding an entry type is a compile-time-checked
/// extension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "entryType", rename_all = "kebab-case")]
pub enum RawEntry {
    #[serde(rename_all = "camelCase")]
    Paint {
        name: String,
        start_time: f64,
        duration: f64,
    },
    #[serde(rename_all = "camelCase")]
    Resource {
        url: String,
        start_time: f64,
        duration: f64,
        #[serde(default)]
        initiator_type: Option<String>,
        #[serde(default)]
        transfer_size: Option<f64>,
        #[serde(default)]
        encoded_body_size: Option<f64>,
        #[serde(default)]
        domain_lookup_start: Option<f64>,
        #[serde(default)]
        domain_lookup_end: Option<f64>,
        #[serde(default)]
        connect_start: Option<f64>,
        #[serde(default)]
        connect_end: Option<f64>,
        #[serde(default)]
        request_start: Option<f64>,
        #[serde(default)]
        response_start: Option<f64>,
        #[serde(default)]
        response_end: Option<f64>,
    },
    #[serde(rename_all = "camelCase")]
    Navigation {
        nav_type: String,
        start_time: f64,
        duration: f64,
    },
    #[serde(rename_all = "camelCase")]
    LayoutShift {
        value: f64,
        had_recent_input: bool,
        start_time: f64,
        #[serde(default)]
        duration: f64,
        #[serde(default)]
        sources: Vec<RawShiftSource>,
    },
}

impl RawEntry {
    /// Platform name of the entry type, matching the feed filter labels.
    pub fn entry_type(&self) -> &'static str {
        match self {
            RawEntry::Paint { .. } => "paint",
            RawEntry::Resource { .. } => "resource",
            RawEntry::Navigation { .. } => "navigation",
            RawEntry::LayoutShift { .. } => "layout-shift",
        }
    }

    /// Raw start time in platform-origin milliseconds.
    pub fn start_time(&self) -> f64 {
        match self {
            RawEntry::Paint { start_time, .. }
            | RawEntry::Resource { start_time, .. }
            | RawEntry::Navigation { start_time, .. }
            | RawEntry::LayoutShift { start_time, .. } => *start_time,
        }
    }
}

/// Batch of raw entries delivered by one observer notification.
pub type ObserverBatch = Vec<RawEntry>;

/// Errors returned by the replay driver and configuration loading.
///
/// Collector-side degradation (unsupported feeds, malformed URLs) is not
/// an error path; those cases fall back to empty or truncated output.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InstrumentError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("trace error: {0}")]
    Trace(String),
    #[error("channel closed: {0}")]
    Channel(String),
    #[error("task join failure: {0}")]
    Join(String),
}

impl From<tokio::task::JoinError> for InstrumentError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Join(err.to_string())
    }
}

/// Replays the configured trace through the pipeline and writes the report.
#[instrument(skip_all)]
pub async fn run(config: config::AppConfig) -> Result<(), InstrumentError> {
    let report = replay::execute_replay(&config).await?;

    let rendered = if config.cli.pretty {
        serde_json::to_string_pretty(&report)
    } else {
        serde_json::to_string(&report)
    }
    .map_err(|err| InstrumentError::Trace(format!("report serialization: {err}")))?;

    match &config.output_path {
        Some(path) => tokio::fs::write(path, rendered.as_bytes())
            .await
            .map_err(|err| InstrumentError::Trace(format!("write report: {err}")))?,
        None => println!("{rendered}"),
    }

    Ok(())
}
