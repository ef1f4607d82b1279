//! Error types for geoalign.

use crate::pipeline::ProcessingStatus;

/// Result type alias for geoalign operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for geoalign.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration directory could not be determined.
    #[error("could not determine configuration directory for this platform")]
    ConfigDirNotFound,

    /// Failed to read configuration file.
    #[error("failed to read config file '{path}'")]
    ConfigRead {
        /// Path to the config file.
        path: std::path::PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse configuration file.
    #[error("failed to parse config file '{path}'")]
    ConfigParse {
        /// Path to the config file.
        path: std::path::PathBuf,
        /// Underlying parse error.
        #[source]
        source: toml::de::Error,
    },

    /// Configuration validation failed.
    #[error("configuration validation failed: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    /// Failed to write configuration file.
    #[error("failed to write config file '{path}'")]
    ConfigWrite {
        /// Path to the config file.
        path: std::path::PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to serialize configuration.
    #[error("failed to serialize config")]
    ConfigSerialize {
        /// Underlying serialization error.
        #[source]
        source: toml::ser::Error,
    },

    /// No recording metadata files found.
    #[error("no recording metadata files found in the provided paths")]
    NoRecordingsFound,

    /// Recording metadata could not be parsed.
    #[error("failed to parse recording metadata '{path}'")]
    MetadataParse {
        /// Path to the metadata file.
        path: std::path::PathBuf,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },

    /// A recording has no location samples.
    #[error("recording has no location samples")]
    EmptyLocationData,

    /// Two location samples share a frame number.
    #[error("duplicate location sample for frame {frame_number}")]
    DuplicateSampleFrame {
        /// The repeated frame number.
        frame_number: u64,
    },

    /// A location sample has an unusable coordinate.
    #[error("invalid coordinate ({latitude}, {longitude}) at frame {frame_number}")]
    InvalidCoordinate {
        /// Frame number of the offending sample.
        frame_number: u64,
        /// Latitude in degrees.
        latitude: f64,
        /// Longitude in degrees.
        longitude: f64,
    },

    /// A location sample lies before the start of the recording.
    #[error("negative relative time {relative_time_ms} ms at frame {frame_number}")]
    NegativeRelativeTime {
        /// Frame number of the offending sample.
        frame_number: u64,
        /// The negative offset.
        relative_time_ms: i64,
    },

    /// Frame rate must be finite and positive.
    #[error("invalid frame rate: {value} (must be > 0)")]
    InvalidFrameRate {
        /// Invalid value.
        value: f64,
    },

    /// Location update interval must be positive.
    #[error("invalid location update interval: {value} ms (must be > 0)")]
    InvalidLocationInterval {
        /// Invalid value.
        value: u64,
    },

    /// Acceptance multiplier must be finite and positive.
    #[error("invalid acceptance multiplier: {value} (must be > 0)")]
    InvalidAcceptanceMultiplier {
        /// Invalid value.
        value: f64,
    },

    /// Cluster threshold must be finite and positive.
    #[error("invalid cluster threshold {name}: {value} (must be > 0)")]
    InvalidClusterThreshold {
        /// Name of the threshold.
        name: &'static str,
        /// Invalid value.
        value: f64,
    },

    /// Failed to read a detection file.
    #[error("failed to parse detection file '{path}'")]
    DetectionParseFailed {
        /// Path to the detection file.
        path: std::path::PathBuf,
        /// Underlying error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Invalid detection file contents.
    #[error("invalid detection file format: {message}")]
    InvalidDetectionFormat {
        /// Description of the format error.
        message: String,
    },

    /// Detection file for a recording does not exist.
    #[error("detection file not found for recording '{metadata_path}', expected '{detection_path}'")]
    DetectionFileNotFound {
        /// Path to the recording metadata.
        metadata_path: std::path::PathBuf,
        /// Expected detection file path.
        detection_path: std::path::PathBuf,
    },

    /// The same detection key appeared twice in one recording.
    #[error("duplicate detection {detection_index} on frame {frame_number}")]
    DuplicateDetection {
        /// Frame number.
        frame_number: u64,
        /// Ordinal within the frame.
        detection_index: u32,
    },

    /// Detections arrived out of frame order.
    #[error("frame {frame_number} arrived after frame {previous}")]
    FrameOrder {
        /// Frame that arrived late.
        frame_number: u64,
        /// Last frame seen before it.
        previous: u64,
    },

    /// A status edit named a detection that is not in the report.
    #[error("no detection {detection_index} on frame {frame_number} in this recording")]
    UnknownDetection {
        /// Frame number.
        frame_number: u64,
        /// Ordinal within the frame.
        detection_index: u32,
    },

    /// External detection collaborator failed.
    #[error("detection source failed: {reason}")]
    DetectionSource {
        /// Description of the failure.
        reason: String,
    },

    /// Processing was cancelled between frames.
    #[error("processing cancelled")]
    Cancelled,

    /// Illegal processing status change.
    #[error("cannot move from {from} to {to}")]
    InvalidTransition {
        /// Current status.
        from: ProcessingStatus,
        /// Requested status.
        to: ProcessingStatus,
    },

    /// A recording's pipeline run failed.
    #[error("processing failed for recording '{recording}'")]
    PipelineFailed {
        /// Recording identifier.
        recording: String,
        /// What went wrong.
        #[source]
        source: Box<Self>,
    },

    /// Failed to read a report file.
    #[error("failed to read report file '{path}'")]
    ReportRead {
        /// Path to the report file.
        path: std::path::PathBuf,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },

    /// Failed to write JSON output file.
    #[error("failed to write JSON output file '{path}'")]
    JsonWrite {
        /// Path to the JSON file.
        path: std::path::PathBuf,
        /// Underlying serialization error.
        #[source]
        source: serde_json::Error,
    },

    /// Failed to create output directory.
    #[error("failed to create output directory '{path}'")]
    OutputDirCreateFailed {
        /// Path to the output directory.
        path: std::path::PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Internal error (for unexpected failures).
    #[error("internal error: {message}")]
    Internal {
        /// Error message.
        message: String,
    },
}

impl Error {
    /// Whether this error describes malformed or unusable input.
    pub fn is_invalid_input(&self) -> bool {
        match self {
            Self::MetadataParse { .. }
            | Self::EmptyLocationData
            | Self::DuplicateSampleFrame { .. }
            | Self::InvalidCoordinate { .. }
            | Self::NegativeRelativeTime { .. }
            | Self::InvalidFrameRate { .. }
            | Self::InvalidLocationInterval { .. }
            | Self::InvalidAcceptanceMultiplier { .. }
            | Self::InvalidClusterThreshold { .. }
            | Self::InvalidDetectionFormat { .. }
            | Self::DuplicateDetection { .. }
            | Self::FrameOrder { .. } => true,
            Self::PipelineFailed { source, .. } => source.is_invalid_input(),
            _ => false,
        }
    }

    /// Whether this error, or the failure it wraps, is a cancellation.
    pub fn is_cancelled(&self) -> bool {
        match self {
            Self::Cancelled => true,
            Self::PipelineFailed { source, .. } => source.is_cancelled(),
            _ => false,
        }
    }

    /// Wrap this error as the failure of one recording's pipeline run.
    pub fn in_recording(self, recording: &str) -> Self {
        match self {
            already @ Self::PipelineFailed { .. } => already,
            other => Self::PipelineFailed {
                recording: recording.to_string(),
                source: Box::new(other),
            },
        }
    }
}
