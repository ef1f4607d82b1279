//! Configuration type definitions.

use crate::cluster::ClusterSettings;
use crate::constants::{DEFAULT_ACCEPTANCE_MULTIPLIER, DEFAULT_FPS, DEFAULT_LOCATION_INTERVAL_MS};
use serde::{Deserialize, Serialize};

/// Complete application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Temporal alignment settings.
    pub alignment: AlignmentConfig,

    /// Spatial clustering settings.
    pub clustering: ClusterSettings,

    /// Detection filtering settings.
    pub detection: DetectionConfig,

    /// Output settings.
    pub output: OutputConfig,
}

/// Temporal alignment defaults.
///
/// A recording's own metadata overrides the interval and frame rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlignmentConfig {
    /// Nominal GPS sampling period in milliseconds.
    pub location_update_interval_ms: u64,

    /// Multiplier on the sampling period for the match window.
    pub acceptance_multiplier: f64,

    /// Frame rate used when the recording does not report one.
    pub default_fps: f64,
}

impl Default for AlignmentConfig {
    fn default() -> Self {
        Self {
            location_update_interval_ms: DEFAULT_LOCATION_INTERVAL_MS,
            acceptance_multiplier: DEFAULT_ACCEPTANCE_MULTIPLIER,
            default_fps: DEFAULT_FPS,
        }
    }
}

/// Detection filtering applied before alignment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Minimum confidence threshold.
    pub min_confidence: f32,

    /// Minimum frames between kept detecting frames (0 disables).
    pub min_frame_gap: u64,
}

/// Output settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Output formats.
    pub formats: Vec<OutputFormat>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            formats: vec![OutputFormat::Json],
        }
    }
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Full JSON report (detections, clusters, summary).
    Json,
    /// One CSV row per detection.
    Csv,
    /// Cluster centers as GeoJSON points.
    Geojson,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Json => write!(f, "json"),
            Self::Csv => write!(f, "csv"),
            Self::Geojson => write!(f, "geojson"),
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" | "report" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            "geojson" | "map" => Ok(Self::Geojson),
            other => Err(format!("unknown output format: {other}")),
        }
    }
}
