//! Configuration loading and validation utilities.

use std::path::PathBuf;

use clap::Parser;
use serde::Deserialize;
use tokio::fs;
use tracing::instrument;
use url::Url;

use crate::InstrumentError;

/// Command-line arguments used to bootstrap the replay runtime.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Vitalscope performance instrumentation replay")]
pub struct CliArgs {
    /// Location of the recorded platform-event trace.
    #[arg(long, value_name = "PATH", default_value = "trace.json")]
    pub trace: PathBuf,
    /// Location of the capture limits document.
    #[arg(long, value_name = "PATH", default_value = "capture.toml")]
    pub capture: PathBuf,
    /// Output file for the replay report; stdout when omitted.
    #[arg(long, value_name = "PATH")]
    pub output: Option<PathBuf>,
    /// Page origin used for network session scoping.
    #[arg(long, value_name = "ORIGIN", env = "VITALSCOPE_ORIGIN")]
    pub origin: Option<String>,
    /// Node path prefix scoping layout-shift attribution.
    #[arg(long, value_name = "PATH_PREFIX", env = "VITALSCOPE_BOUNDARY")]
    pub boundary: Option<String>,
    /// Pretty-print the JSON report.
    #[arg(long)]
    pub pretty: bool,
}

/// Retention bounds enforced by the collectors and the session machine.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct CaptureLimits {
    /// Total timeline entries kept (earliest by start time retained).
    pub max_timeline_entries: usize,
    /// Resource-type timeline entries kept within the total.
    pub max_timeline_resources: usize,
    /// Completed run records kept (newest first).
    pub max_runs_history: usize,
    /// Web vitals history points kept (newest retained).
    pub max_vitals_history: usize,
}

impl Default for CaptureLimits {
    fn default() -> Self {
        Self {
            max_timeline_entries: 80,
            max_timeline_resources: 50,
            max_runs_history: 50,
            max_vitals_history: 20,
        }
    }
}

/// Replay defaults provided by the capture document.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ReplayDefaults {
    /// Page origin assumed when neither trace nor CLI supplies one.
    pub origin: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
struct CaptureDocument {
    pub limits: CaptureLimits,
    pub replay: ReplayDefaults,
}

/// Fully merged configuration set.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub cli: CliArgs,
    pub limits: CaptureLimits,
    /// Page origin for same-origin network scoping.
    pub origin: Url,
    pub boundary_prefix: Option<String>,
    pub output_path: Option<PathBuf>,
}

impl AppConfig {
    #[instrument(skip_all)]
    pub async fn load(cli: CliArgs) -> Result<Self, InstrumentError> {
        let capture_raw = fs::read_to_string(&cli.capture)
            .await
            .map_err(|err| InstrumentError::Config(format!("failed to read capture: {err}")))?;
        let document: CaptureDocument = toml::from_str(&capture_raw)
            .map_err(|err| InstrumentError::Config(format!("invalid capture document: {err}")))?;

        document.limits.validate()?;

        let origin_raw = cli
            .origin
            .clone()
            .unwrap_or_else(|| document.replay.origin.clone());
        let origin = Url::parse(&origin_raw)
            .map_err(|err| InstrumentError::Config(format!("invalid origin '{origin_raw}': {err}")))?;

        Ok(Self {
            limits: document.limits,
            origin,
            boundary_prefix: cli.boundary.clone(),
            output_path: cli.output.clone(),
            cli,
        })
    }
}

impl CaptureLimits {
    pub fn validate(&self) -> Result<(), InstrumentError> {
        if self.max_timeline_entries == 0 || self.max_timeline_resources == 0 {
            return Err(InstrumentError::Config(
                "timeline limits must be positive".to_string(),
            ));
        }
        if self.max_timeline_resources > self.max_timeline_entries {
            return Err(InstrumentError::Config(format!(
                "resource cap {} exceeds total timeline cap {}",
                self.max_timeline_resources, self.max_timeline_entries
            )));
        }
        if self.max_runs_history == 0 || self.max_vitals_history == 0 {
            return Err(InstrumentError::Config(
                "history limits must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
