//! Recording metadata parsing.
//!
//! The capture app uploads one JSON document per video describing the
//! recording and every GPS fix taken while filming. Absent fields fall back
//! to neutral values (`0` or `None`) instead of failing the whole document.

use super::LocationSample;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

/// Metadata document for one recording.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordingMetadata {
    /// Name of the video file, used as the recording identifier when present.
    pub video_name: Option<String>,
    /// Unix timestamp (ms) when recording started.
    pub recording_start_time: i64,
    /// Total recording duration in milliseconds.
    pub recording_duration_ms: i64,
    /// Nominal interval between GPS fixes.
    pub location_update_interval_ms: Option<u64>,
    /// Number of fixes the capture app claims to have written.
    pub total_location_points: Option<usize>,
    /// Nominal frame rate of the video, when the capture app knows it.
    pub video_fps: Option<f64>,
    /// The GPS fixes.
    pub location_data: Vec<LocationRecord>,
}

/// One GPS fix as it appears in the metadata document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationRecord {
    /// Frame index at capture time.
    pub frame_number: u64,
    /// Unix timestamp in milliseconds.
    pub timestamp: i64,
    /// Milliseconds since recording start.
    pub relative_time_ms: i64,
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Altitude in meters.
    pub altitude: Option<f64>,
    /// Accuracy in meters.
    pub accuracy: Option<f32>,
    /// Bearing in degrees.
    pub bearing: Option<f32>,
    /// Speed in m/s.
    pub speed: Option<f32>,
}

impl RecordingMetadata {
    /// Parse a metadata document.
    pub fn from_json_str(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Sampling interval declared by the recording. Zero counts as absent.
    pub fn location_interval_ms(&self) -> Option<u64> {
        self.location_update_interval_ms.filter(|&ms| ms > 0)
    }

    /// Frame rate declared by the recording, if usable.
    pub fn fps(&self) -> Option<f64> {
        self.video_fps.filter(|fps| fps.is_finite() && *fps > 0.0)
    }

    /// Convert the raw records into location samples.
    ///
    /// Negative relative times are rejected. Duplicate frames and bad
    /// coordinates are left for [`LocationTimeline::new`](super::LocationTimeline::new)
    /// to reject.
    pub fn to_samples(&self) -> Result<Vec<LocationSample>> {
        if let Some(declared) = self.total_location_points
            && declared != self.location_data.len()
        {
            warn!(
                "Metadata declares {} location points but contains {}",
                declared,
                self.location_data.len()
            );
        }

        self.location_data
            .iter()
            .map(LocationRecord::to_sample)
            .collect()
    }
}

impl LocationRecord {
    /// Convert to a [`LocationSample`].
    pub fn to_sample(&self) -> Result<LocationSample> {
        let relative_time_ms =
            u64::try_from(self.relative_time_ms).map_err(|_| Error::NegativeRelativeTime {
                frame_number: self.frame_number,
                relative_time_ms: self.relative_time_ms,
            })?;

        Ok(LocationSample {
            frame_number: self.frame_number,
            timestamp_ms: self.timestamp,
            relative_time_ms,
            latitude: self.latitude,
            longitude: self.longitude,
            altitude: self.altitude,
            accuracy: self.accuracy,
            bearing: self.bearing,
            speed: self.speed,
        })
    }
}

/// Load a recording metadata file.
pub fn load_metadata(path: &Path) -> Result<RecordingMetadata> {
    let contents = std::fs::read_to_string(path)?;
    RecordingMetadata::from_json_str(&contents).map_err(|e| Error::MetadataParse {
        path: path.to_path_buf(),
        source: e,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE_DOC: &str = r#"{
        "video_name": "VID_20240611_101500.mp4",
        "recording_start_time": 1718100900000,
        "recording_duration_ms": 12000,
        "location_update_interval_ms": 1000,
        "total_location_points": 2,
        "location_data": [
            {"frame_number": 0, "timestamp": 1718100900000, "relative_time_ms": 0,
             "latitude": 60.1699, "longitude": 24.9384, "altitude": 12.5, "accuracy": 4.0},
            {"frame_number": 30, "timestamp": 1718100901000, "relative_time_ms": 1000,
             "latitude": 60.1700, "longitude": 24.9386, "bearing": 90.0, "speed": 1.4}
        ]
    }"#;

    #[test]
    fn test_parse_full_document() {
        let meta = RecordingMetadata::from_json_str(SAMPLE_DOC).unwrap();
        assert_eq!(meta.video_name.as_deref(), Some("VID_20240611_101500.mp4"));
        assert_eq!(meta.location_interval_ms(), Some(1000));
        assert_eq!(meta.fps(), None);

        let samples = meta.to_samples().unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].altitude, Some(12.5));
        assert_eq!(samples[1].relative_time_ms, 1000);
        assert_eq!(samples[1].bearing, Some(90.0));
        assert_eq!(samples[1].accuracy, None);
    }

    #[test]
    fn test_missing_fields_default_to_neutral() {
        let meta = RecordingMetadata::from_json_str(
            r#"{"location_data": [{"latitude": 1.0, "longitude": 2.0}]}"#,
        )
        .unwrap();
        assert_eq!(meta.recording_duration_ms, 0);
        assert_eq!(meta.location_interval_ms(), None);

        let samples = meta.to_samples().unwrap();
        assert_eq!(samples[0].frame_number, 0);
        assert_eq!(samples[0].relative_time_ms, 0);
        assert_eq!(samples[0].speed, None);
    }

    #[test]
    fn test_zero_interval_counts_as_absent() {
        let meta =
            RecordingMetadata::from_json_str(r#"{"location_update_interval_ms": 0}"#).unwrap();
        assert_eq!(meta.location_interval_ms(), None);
    }

    #[test]
    fn test_negative_relative_time_rejected() {
        let meta = RecordingMetadata::from_json_str(
            r#"{"location_data": [{"frame_number": 4, "relative_time_ms": -20}]}"#,
        )
        .unwrap();
        assert!(matches!(
            meta.to_samples(),
            Err(Error::NegativeRelativeTime {
                frame_number: 4,
                relative_time_ms: -20
            })
        ));
    }

    #[test]
    fn test_load_malformed_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{{ not json").unwrap();
        let result = load_metadata(file.path());
        assert!(matches!(result, Err(Error::MetadataParse { .. })));
    }
}
