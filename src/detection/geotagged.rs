//! Detections after temporal alignment.

use super::{DetectionEvent, DetectionId};
use crate::location::LocationSample;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Clean-up status of a detection, edited by a supervisor outside this crate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectionStatus {
    /// Not yet handled.
    #[default]
    Pending,
    /// Cleaned up on site.
    Cleaned,
}

impl fmt::Display for DetectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Cleaned => write!(f, "cleaned"),
        }
    }
}

impl FromStr for DetectionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "cleaned" => Ok(Self::Cleaned),
            other => Err(format!("unknown detection status: {other}")),
        }
    }
}

/// Location copied from the matched GPS fix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedLocation {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Frame number of the matched sample (its key within the recording).
    pub sample_frame: u64,
    /// Relative time of the matched sample.
    pub sample_time_ms: u64,
    /// Signed offset from the detection's elapsed time to the sample.
    pub offset_ms: f64,
    /// Horizontal accuracy of the fix, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f32>,
}

impl ResolvedLocation {
    /// Copy the coordinates of `sample`, matched at `elapsed_ms`.
    #[allow(clippy::cast_precision_loss)]
    pub fn from_sample(sample: &LocationSample, elapsed_ms: f64) -> Self {
        Self {
            latitude: sample.latitude,
            longitude: sample.longitude,
            sample_frame: sample.frame_number,
            sample_time_ms: sample.relative_time_ms,
            offset_ms: sample.relative_time_ms as f64 - elapsed_ms,
            accuracy: sample.accuracy,
        }
    }
}

/// A detection with its resolved location, or none if alignment failed.
///
/// Only `status` changes after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeotaggedDetection {
    /// The raw event.
    #[serde(flatten)]
    pub event: DetectionEvent,
    /// Estimated milliseconds since recording start.
    pub elapsed_ms: f64,
    /// Matched location. `None` means unresolved.
    #[serde(default)]
    pub location: Option<ResolvedLocation>,
    /// Clean-up status.
    #[serde(default)]
    pub status: DetectionStatus,
}

impl GeotaggedDetection {
    /// Key of this detection within its recording.
    pub const fn id(&self) -> DetectionId {
        self.event.id()
    }

    /// Whether a location was found.
    pub const fn is_resolved(&self) -> bool {
        self.location.is_some()
    }

    /// `(latitude, longitude)` if resolved.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        self.location.as_ref().map(|l| (l.latitude, l.longitude))
    }

    /// Change the clean-up status.
    pub fn set_status(&mut self, status: DetectionStatus) {
        self.status = status;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parse_and_display() {
        assert_eq!("Cleaned".parse::<DetectionStatus>(), Ok(DetectionStatus::Cleaned));
        assert_eq!(DetectionStatus::Pending.to_string(), "pending");
        assert!("done".parse::<DetectionStatus>().is_err());
        assert_eq!(DetectionStatus::default(), DetectionStatus::Pending);
    }

    #[test]
    fn test_resolved_location_copies_sample() {
        let mut sample = LocationSample::new(150, 5000, 60.17, 24.94);
        sample.accuracy = Some(3.5);
        let loc = ResolvedLocation::from_sample(&sample, 4800.0);
        assert_eq!(loc.latitude, 60.17);
        assert_eq!(loc.sample_frame, 150);
        assert_eq!(loc.offset_ms, 200.0);
        assert_eq!(loc.accuracy, Some(3.5));
    }

    #[test]
    fn test_json_shape_is_flat() {
        let detection = GeotaggedDetection {
            event: DetectionEvent::new(30, 0, 0.9),
            elapsed_ms: 1000.0,
            location: None,
            status: DetectionStatus::Cleaned,
        };
        let value = serde_json::to_value(&detection).unwrap();
        assert_eq!(value["frame_number"], 30);
        assert_eq!(value["status"], "cleaned");
        assert!(value["location"].is_null());

        let back: GeotaggedDetection = serde_json::from_value(value).unwrap();
        assert_eq!(back, detection);
    }
}
