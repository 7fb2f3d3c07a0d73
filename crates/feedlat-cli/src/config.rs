//! Application configuration.

use crate::error::{AppError, AppResult};
use feedlat_capture::{CaptureFormat, IdentityField};
use feedlat_core::{KnownPublishers, PublisherId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;

/// How the capture is decoded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Forced capture format. Detected from the extension when unset.
    #[serde(default)]
    pub format: Option<CaptureFormat>,
    /// Network field identifying the publisher.
    #[serde(default)]
    pub identity: IdentityField,
}

/// Correlation and aggregation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Publishers tracked individually. Empty: every identity seen.
    #[serde(default)]
    pub known_publishers: Vec<PublisherId>,
    /// Publishers every event should arrive from. Empty: the known set, or
    /// every identity seen when no known set is configured.
    #[serde(default)]
    pub expected_publishers: Vec<PublisherId>,
    /// Correlation worker threads. 1 streams the capture in one pass.
    #[serde(default = "default_workers")]
    pub workers: usize,
}

fn default_workers() -> usize {
    1
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            known_publishers: Vec::new(),
            expected_publishers: Vec::new(),
            workers: default_workers(),
        }
    }
}

impl AnalysisConfig {
    pub fn known(&self) -> KnownPublishers {
        KnownPublishers::from_ids(self.known_publishers.iter().copied())
    }

    /// Expected set for coverage, `None` meaning every identity seen.
    pub fn expected(&self) -> Option<BTreeSet<PublisherId>> {
        if self.expected_publishers.is_empty() {
            self.known().ids().cloned()
        } else {
            Some(self.expected_publishers.iter().copied().collect())
        }
    }
}

/// Report output settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Events shown from each end of the correlation. 0 disables the preview.
    #[serde(default = "default_preview_events")]
    pub preview_events: usize,
    #[serde(default = "default_chart")]
    pub chart: bool,
    #[serde(default = "default_chart_width")]
    pub chart_width: usize,
    #[serde(default)]
    pub summary_json: Option<PathBuf>,
    #[serde(default)]
    pub events_jsonl: Option<PathBuf>,
    /// Decoded frames re-written as JSON Lines.
    #[serde(default)]
    pub export_frames: Option<PathBuf>,
}

fn default_preview_events() -> usize {
    3
}

fn default_chart() -> bool {
    true
}

fn default_chart_width() -> usize {
    50
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            preview_events: default_preview_events(),
            chart: default_chart(),
            chart_width: default_chart_width(),
            summary_json: None,
            events_jsonl: None,
            export_frames: None,
        }
    }
}

/// Logging and metrics settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Default tracing filter; `RUST_LOG` takes precedence.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Prometheus text exposition written at the end of the run. Counters
    /// are cumulative over the process.
    #[serde(default)]
    pub metrics_out: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            metrics_out: None,
        }
    }
}

/// Main application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub capture: CaptureConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    /// Load from `path`, or defaults when no path is given.
    pub fn load(path: Option<&str>) -> AppResult<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Load from a specific file.
    pub fn from_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read config {path}: {e}")))?;

        toml::from_str(&content)
            .map_err(|e| AppError::Config(format!("Failed to parse config {path}: {e}")))
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.analysis.workers == 0 {
            return Err(AppError::Config("analysis.workers must be at least 1".to_string()));
        }
        if self.report.chart && self.report.chart_width == 0 {
            return Err(AppError::Config(
                "report.chart_width must be at least 1".to_string(),
            ));
        }
        if self.telemetry.log_level.trim().is_empty() {
            return Err(AppError::Config("telemetry.log_level is empty".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.capture.identity, IdentityField::IpId);
        assert_eq!(config.capture.format, None);
        assert_eq!(config.analysis.workers, 1);
        assert_eq!(config.analysis.known(), KnownPublishers::Any);
        assert_eq!(config.analysis.expected(), None);
        assert_eq!(config.report.preview_events, 3);
        assert!(config.report.chart);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml() {
        let config: AppConfig = toml::from_str(
            r#"
            [capture]
            identity = "src_port"
            format = "pcap"

            [analysis]
            known_publishers = [1, 2, 3, 4]
            "#,
        )
        .unwrap();

        assert_eq!(config.capture.identity, IdentityField::SrcPort);
        assert_eq!(config.capture.format, Some(CaptureFormat::Pcap));
        assert_eq!(config.analysis.known_publishers.len(), 4);
        assert_eq!(config.analysis.workers, 1);
        assert_eq!(config.report.chart_width, 50);
        assert_eq!(config.telemetry.log_level, "info");
    }

    #[test]
    fn test_expected_falls_back_to_known() {
        let mut analysis = AnalysisConfig {
            known_publishers: vec![PublisherId(1), PublisherId(2)],
            ..AnalysisConfig::default()
        };
        assert_eq!(analysis.expected().unwrap().len(), 2);

        analysis.expected_publishers = vec![PublisherId(3)];
        assert_eq!(
            analysis.expected().unwrap().into_iter().collect::<Vec<_>>(),
            vec![PublisherId(3)]
        );
    }

    #[test]
    fn test_validate_rejects_zero_workers() {
        let mut config = AppConfig::default();
        config.analysis.workers = 0;
        assert!(matches!(config.validate(), Err(AppError::Config(_))));
    }

    #[test]
    fn test_config_serialization() {
        let config = AppConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        assert!(toml_str.contains("identity"));
        assert!(toml_str.contains("chart_width"));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            AppConfig::from_file("/nonexistent/feedlat.toml"),
            Err(AppError::Config(_))
        ));
        assert_eq!(AppConfig::load(None).unwrap(), AppConfig::default());
    }
}
